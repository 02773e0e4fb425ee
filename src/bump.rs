use std::{
  alloc::{GlobalAlloc, Layout},
  ptr::{self, NonNull},
};

use crate::{
  align::{self, ALIGN},
  align_to,
  block::{self, HEADER_SIZE, Header},
  config::Config,
  error::{HeapError, fatal},
  heap_log,
  region::Arena,
};

/// Prints where an allocation landed and where the cursor is now.
pub fn print_alloc(
  size: usize,
  addr: *mut u8,
  heap: &Heap,
) {
  heap_log!(
    "allocated {} bytes, address = {:?}, cursor = {:?}, used = {}",
    size,
    addr,
    heap.arena().cursor(),
    heap.arena().used()
  );
}

/// Lock-free bump heap with per-block headers.
///
/// Every block carries a [`Header`] so that `free` and `realloc` can find
/// the block's extent. Space is only ever reclaimed for the topmost block:
/// freeing in reverse allocation order behaves like a stack, anything else
/// leaks until exit.
///
/// The unchecked methods (`allocate`, `deallocate`, ...) follow the C
/// allocator contract and abort on misuse. The `try_*` methods report the
/// same conditions as [`HeapError`]s instead.
pub struct Heap {
  arena: Arena,
}

impl Heap {
  pub const fn new() -> Self {
    Self::with_config(Config::DEFAULT)
  }

  pub const fn with_config(config: Config) -> Self {
    Self {
      arena: Arena::new(config),
    }
  }

  pub fn arena(&self) -> &Arena {
    &self.arena
  }

  /// Header of a live block, refusing anything whose header would lie
  /// outside the handed-out part of the arena.
  unsafe fn header<'a>(
    &self,
    ptr: *mut u8,
  ) -> Result<&'a mut Header, HeapError> {
    let header = Header::of(ptr) as *const u8;

    if !align::is_aligned(ptr as usize, ALIGN) || !self.arena.contains(header) {
      return Err(HeapError::BadSignature { ptr: ptr as usize });
    }

    unsafe { Header::check(ptr) }
  }

  pub fn try_allocate(
    &self,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let total =
      block::block_size(size, self.arena.config()).ok_or(HeapError::OutOfAddressSpace { requested: size })?;

    let block = self.arena.bump(total)?;
    let payload = unsafe { Header::write(block, total - HEADER_SIZE) };

    NonNull::new(payload).ok_or(HeapError::OutOfAddressSpace { requested: size })
  }

  /// `malloc`: never returns null, aborts when the address space runs out.
  pub fn allocate(
    &self,
    size: usize,
  ) -> *mut u8 {
    match self.try_allocate(size) {
      Ok(payload) => payload.as_ptr(),
      Err(err) => fatal(err),
    }
  }

  pub fn try_zero_allocate(
    &self,
    count: usize,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let total = count.checked_mul(size).ok_or(HeapError::SizeOverflow)?;
    let payload = self.try_allocate(total)?;

    // Reclaimed blocks come back dirty.
    unsafe { ptr::write_bytes(payload.as_ptr(), 0, total) };

    Ok(payload)
  }

  /// `calloc`: null when `count * size` overflows.
  pub fn zero_allocate(
    &self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    match self.try_zero_allocate(count, size) {
      Ok(payload) => payload.as_ptr(),
      Err(err) if !err.is_fatal() => ptr::null_mut(),
      Err(err) => fatal(err),
    }
  }

  /// Releases `ptr`, handing its space back if it is the topmost block.
  ///
  /// # Safety
  ///
  /// `ptr` is null or was returned by this heap and not freed since.
  pub unsafe fn try_deallocate(
    &self,
    ptr: *mut u8,
  ) -> Result<(), HeapError> {
    if ptr.is_null() {
      return Ok(());
    }

    let header = unsafe { self.header(ptr)? };
    header.release();

    // Fails if anything was bumped after this block; the block then stays
    // dead until exit.
    self.arena.retreat(header.end(), header.block());

    Ok(())
  }

  /// `free`: null is a no-op, a bad pointer aborts.
  ///
  /// # Safety
  ///
  /// See [`Heap::try_deallocate`].
  pub unsafe fn deallocate(
    &self,
    ptr: *mut u8,
  ) {
    if let Err(err) = unsafe { self.try_deallocate(ptr) } {
      fatal(err);
    }
  }

  /// Grows or shrinks `ptr` to `new_size`, in place whenever possible.
  ///
  /// Returns null for `new_size == 0`, after freeing `ptr`.
  ///
  /// # Safety
  ///
  /// See [`Heap::try_deallocate`].
  pub unsafe fn try_reallocate(
    &self,
    ptr: *mut u8,
    new_size: usize,
  ) -> Result<*mut u8, HeapError> {
    if new_size == 0 {
      unsafe { self.try_deallocate(ptr)? };
      return Ok(ptr::null_mut());
    }

    if ptr.is_null() {
      return self.try_allocate(new_size).map(NonNull::as_ptr);
    }

    let header = unsafe { self.header(ptr)? };

    if header.real_size >= new_size {
      return Ok(ptr);
    }

    let new_total = block::padded(new_size).ok_or(HeapError::OutOfAddressSpace { requested: new_size })?;
    let new_end = header.block().wrapping_add(new_total);

    if self.arena.extend(header.end(), new_end) {
      header.real_size = new_total - HEADER_SIZE;
      return Ok(ptr);
    }

    // Somebody allocated past us. The old block is left behind, not freed.
    let old_size = header.real_size;
    let fresh = self.try_allocate(new_size)?.as_ptr();

    unsafe { ptr::copy_nonoverlapping(ptr, fresh, old_size.min(new_size)) };

    Ok(fresh)
  }

  /// `realloc`.
  ///
  /// # Safety
  ///
  /// See [`Heap::try_deallocate`].
  pub unsafe fn reallocate(
    &self,
    ptr: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    match unsafe { self.try_reallocate(ptr, new_size) } {
      Ok(ptr) => ptr,
      Err(err) => fatal(err),
    }
  }

  /// Allocates `size` bytes aligned to `align`, which may not exceed
  /// [`ALIGN`].
  pub fn try_aligned_allocate(
    &self,
    align: usize,
    size: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    if !align.is_power_of_two() || align > ALIGN {
      return Err(HeapError::UnsupportedAlignment { align });
    }

    let total = align.checked_add(size).ok_or(HeapError::SizeOverflow)?;
    let payload = self.try_allocate(total)?;

    let addr = payload.as_ptr() as usize;
    let aligned = align_to!(addr, align);

    // Payloads are ALIGN-aligned, so rounding never moves the pointer. A
    // moved pointer would not survive `free`.
    if aligned != addr {
      return Err(HeapError::UnsupportedAlignment { align });
    }

    Ok(payload)
  }

  /// `posix_memalign`. Returns `0`, or `ENOMEM` when `align + size`
  /// overflows; unsupported alignments abort.
  ///
  /// # Safety
  ///
  /// `out` must be valid for a pointer-sized write.
  pub unsafe fn aligned_allocate(
    &self,
    out: *mut *mut u8,
    align: usize,
    size: usize,
  ) -> i32 {
    match self.try_aligned_allocate(align, size) {
      Ok(payload) => {
        unsafe { out.write(payload.as_ptr()) };
        0
      }
      Err(err) if !err.is_fatal() => libc::ENOMEM,
      Err(err) => fatal(err),
    }
  }

  /// Payload capacity of `ptr`, growth slack included. Zero for null.
  ///
  /// # Safety
  ///
  /// See [`Heap::try_deallocate`].
  pub unsafe fn usable_size(
    &self,
    ptr: *mut u8,
  ) -> Result<usize, HeapError> {
    if ptr.is_null() {
      return Ok(0);
    }

    unsafe { self.header(ptr).map(|header| header.real_size) }
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

fn supported(layout: &Layout) -> bool {
  layout.align() <= ALIGN
}

unsafe impl GlobalAlloc for Heap {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if !supported(&layout) {
      return ptr::null_mut();
    }

    self.try_allocate(layout.size()).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if !supported(&layout) {
      return ptr::null_mut();
    }

    self.try_zero_allocate(1, layout.size()).map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.deallocate(ptr) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if !supported(&layout) {
      return ptr::null_mut();
    }

    match unsafe { self.try_reallocate(ptr, new_size) } {
      Ok(ptr) => ptr,
      Err(HeapError::OutOfAddressSpace { .. }) => ptr::null_mut(),
      Err(err) => fatal(err),
    }
  }
}
