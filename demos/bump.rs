use std::io::Read;

use bumpmalloc::{Config, Heap, print_alloc};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect the mapping with `pmap` or `gdb` between
/// steps. Pass `--no-wait` to run straight through.
fn block_until_enter_pressed(wait: bool) {
  if !wait {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the heap's base and cursor.
fn print_cursor(
  label: &str,
  heap: &Heap,
) {
  println!(
    "[{}] PID = {}, base = {:?}, cursor = {:?}, used = {} bytes",
    label,
    std::process::id(),
    heap.arena().base(),
    heap.arena().cursor(),
    heap.arena().used(),
  );
}

fn main() {
  let wait = !std::env::args().any(|arg| arg == "--no-wait");

  // A private heap, so the demo does not depend on LD_PRELOAD.
  let heap = Heap::with_config(Config::DEFAULT.with_budget(1 << 30));

  unsafe {
    // Nothing is reserved until the first allocation.
    print_cursor("start", &heap);
    block_until_enter_pressed(wait);

    // --------------------------------------------------------------------
    // 1) First allocation reserves the region (1 GiB + 1 GiB guard).
    // --------------------------------------------------------------------
    let first_block = heap.allocate(4);
    println!("\n[1] Allocate 4 bytes");
    print_alloc(4, first_block, &heap);

    let first_ptr = first_block as *mut u32;
    first_ptr.write(0xDEADBEEF);
    println!("[1] Value written to first_block = 0x{:X}", first_ptr.read());

    block_until_enter_pressed(wait);

    // --------------------------------------------------------------------
    // 2) Two more small blocks. Each costs a 32 byte header plus the
    //    payload rounded up to 32.
    // --------------------------------------------------------------------
    let second_block = heap.allocate(12);
    println!("\n[2] Allocate 12 bytes");
    print_alloc(12, second_block, &heap);

    let third_block = heap.allocate(64);
    println!("\n[2] Allocate 64 bytes");
    print_alloc(64, third_block, &heap);

    block_until_enter_pressed(wait);

    // --------------------------------------------------------------------
    // 3) Free the first block. It is not on top, so the cursor stays put
    //    and the block is gone for good.
    // --------------------------------------------------------------------
    heap.deallocate(first_block);
    println!("\n[3] Deallocated first_block at {:?} (leaked)", first_block);
    print_cursor("after free of first", &heap);

    block_until_enter_pressed(wait);

    // --------------------------------------------------------------------
    // 4) Free the third block. It is on top, so the cursor moves back and
    //    the next allocation lands in the same place.
    // --------------------------------------------------------------------
    heap.deallocate(third_block);
    print_cursor("after free of third", &heap);

    let fourth_block = heap.allocate(48);
    println!("\n[4] Allocate 48 bytes (check reuse of the freed top block)");
    print_alloc(48, fourth_block, &heap);
    println!(
      "[4] fourth_block == third_block? {}",
      if fourth_block == third_block {
        "Yes, the top block was reclaimed"
      } else {
        "No, it allocated somewhere else"
      }
    );

    block_until_enter_pressed(wait);

    // --------------------------------------------------------------------
    // 5) Grow the top block in place, then grow the second block which is
    //    no longer on top and therefore has to move.
    // --------------------------------------------------------------------
    let grown = heap.reallocate(fourth_block, 1000);
    println!("\n[5] realloc(fourth_block, 1000) = {:?} (same pointer: {})", grown, grown == fourth_block);

    let moved = heap.reallocate(second_block, 1000);
    println!("[5] realloc(second_block, 1000) = {:?} (same pointer: {})", moved, moved == second_block);
    print_cursor("after realloc", &heap);

    block_until_enter_pressed(wait);

    // --------------------------------------------------------------------
    // 6) A large request reserves 3x its size, so growing it stays cheap.
    // --------------------------------------------------------------------
    let big_block = heap.allocate(64 * 1024);
    println!("\n[6] Allocate 64 KiB");
    print_alloc(64 * 1024, big_block, &heap);
    println!("[6] usable size = {:?}", heap.usable_size(big_block));

    // --------------------------------------------------------------------
    // 7) End of demo. The region is unmapped when `heap` goes out of scope.
    // --------------------------------------------------------------------
    println!("\n[7] End of example.");
  }
}
