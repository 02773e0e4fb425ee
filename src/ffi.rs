//! C allocator entry points.
//!
//! Only exported with the `interpose` feature. Build the cdylib with it and
//! load it ahead of libc:
//!
//! ```text
//!   cargo build --release --features interpose
//!   LD_PRELOAD=target/release/libbumpmalloc.so ./program
//! ```

use libc::{c_int, c_void, size_t};

#[cfg(not(feature = "headerless"))]
use crate::bump::Heap as ProcessHeap;
#[cfg(feature = "headerless")]
use crate::leak::LeakHeap as ProcessHeap;

/// The heap behind every interposed symbol in the process. Test builds
/// compile these functions unexported, over this same static.
static HEAP: ProcessHeap = ProcessHeap::new();

#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn malloc(size: size_t) -> *mut c_void {
  HEAP.allocate(size).cast()
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn calloc(
  count: size_t,
  size: size_t,
) -> *mut c_void {
  HEAP.zero_allocate(count, size).cast()
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn realloc(
  ptr: *mut c_void,
  size: size_t,
) -> *mut c_void {
  unsafe { HEAP.reallocate(ptr.cast(), size).cast() }
}

#[cfg(not(feature = "headerless"))]
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
  unsafe { HEAP.deallocate(ptr.cast()) }
}

#[cfg(feature = "headerless")]
#[cfg_attr(not(test), unsafe(no_mangle))]
pub extern "C" fn free(ptr: *mut c_void) {
  HEAP.deallocate(ptr.cast())
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn posix_memalign(
  out: *mut *mut c_void,
  align: size_t,
  size: size_t,
) -> c_int {
  unsafe { HEAP.aligned_allocate(out.cast(), align, size) }
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn aligned_alloc(
  align: size_t,
  size: size_t,
) -> *mut c_void {
  let mut out = std::ptr::null_mut();

  match unsafe { HEAP.aligned_allocate(&mut out, align, size) } {
    0 => out.cast(),
    _ => std::ptr::null_mut(),
  }
}

#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn memalign(
  align: size_t,
  size: size_t,
) -> *mut c_void {
  unsafe { aligned_alloc(align, size) }
}

#[cfg(not(feature = "headerless"))]
#[cfg_attr(not(test), unsafe(no_mangle))]
pub unsafe extern "C" fn malloc_usable_size(ptr: *mut c_void) -> size_t {
  match unsafe { HEAP.usable_size(ptr.cast()) } {
    Ok(size) => size,
    Err(err) => crate::error::fatal(err),
  }
}
