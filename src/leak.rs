use std::{
  alloc::{GlobalAlloc, Layout},
  ptr,
};

use crate::{
  align,
  align::ALIGN,
  config::Config,
  error::{HeapError, fatal},
  region::Arena,
};

/// Header-less bump heap that never gives anything back.
///
/// No per-block bookkeeping: `deallocate` does nothing and every
/// `reallocate` copies. Growth anticipation is pointless here and ignored.
pub struct LeakHeap {
  arena: Arena,
}

impl LeakHeap {
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

  pub fn try_allocate(
    &self,
    size: usize,
  ) -> Result<*mut u8, HeapError> {
    // Zero-sized requests still get a unique address.
    let size = size.max(1);

    if size > usize::MAX - ALIGN {
      return Err(HeapError::OutOfAddressSpace { requested: size });
    }

    self.arena.bump(align!(size))
  }

  pub fn allocate(
    &self,
    size: usize,
  ) -> *mut u8 {
    self.try_allocate(size).unwrap_or_else(|err| fatal(err))
  }

  pub fn zero_allocate(
    &self,
    count: usize,
    size: usize,
  ) -> *mut u8 {
    let Some(total) = count.checked_mul(size) else {
      return ptr::null_mut();
    };

    let p = self.allocate(total);
    unsafe { ptr::write_bytes(p, 0, total) };
    p
  }

  /// Does nothing: blocks are never reclaimed.
  pub fn deallocate(
    &self,
    _ptr: *mut u8,
  ) {
  }

  /// Always moves. Without a header the old size is unknown, so the copy is
  /// clamped to the live part of the heap above `ptr`.
  ///
  /// # Safety
  ///
  /// `ptr` is null or was returned by this heap.
  pub unsafe fn reallocate(
    &self,
    ptr: *mut u8,
    new_size: usize,
  ) -> *mut u8 {
    let fresh = self.allocate(new_size);

    if !ptr.is_null() {
      let live = fresh as usize - ptr as usize;
      unsafe { ptr::copy_nonoverlapping(ptr, fresh, live.min(new_size)) };
    }

    fresh
  }

  /// # Safety
  ///
  /// `out` must be valid for a pointer-sized write.
  pub unsafe fn aligned_allocate(
    &self,
    out: *mut *mut u8,
    align: usize,
    size: usize,
  ) -> i32 {
    if !align.is_power_of_two() || align > ALIGN {
      fatal(HeapError::UnsupportedAlignment { align });
    }

    let Some(total) = align.checked_add(size) else {
      return libc::ENOMEM;
    };

    unsafe { out.write(self.allocate(total)) };
    0
  }
}

impl Default for LeakHeap {
  fn default() -> Self {
    Self::new()
  }
}

unsafe impl GlobalAlloc for LeakHeap {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    if layout.align() > ALIGN {
      return ptr::null_mut();
    }

    self.try_allocate(layout.size()).unwrap_or(ptr::null_mut())
  }

  unsafe fn dealloc(
    &self,
    _ptr: *mut u8,
    _layout: Layout,
  ) {
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    if layout.align() > ALIGN {
      return ptr::null_mut();
    }

    let Ok(fresh) = self.try_allocate(new_size) else {
      return ptr::null_mut();
    };

    unsafe { ptr::copy_nonoverlapping(ptr, fresh, layout.size().min(new_size)) };
    fresh
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::align::is_aligned;

  fn heap() -> LeakHeap {
    LeakHeap::with_config(Config::DEFAULT.with_budget(16 * 1024 * 1024))
  }

  #[test]
  fn test_allocations_are_packed_and_aligned() {
    let heap = heap();

    let a = heap.allocate(1);
    let b = heap.allocate(0);
    let c = heap.allocate(33);

    assert!(is_aligned(a as usize, ALIGN));
    assert_eq!(b as usize, a as usize + ALIGN);
    assert_eq!(c as usize, b as usize + ALIGN);
    assert_eq!(heap.arena().used(), 4 * ALIGN);
  }

  #[test]
  fn test_free_never_reclaims() {
    let heap = heap();

    let a = heap.allocate(64);
    heap.deallocate(a);

    assert_ne!(heap.allocate(64), a);
    assert_eq!(heap.arena().used(), 128);
  }

  #[test]
  fn test_realloc_always_copies() {
    let heap = heap();

    unsafe {
      let p = heap.allocate(16);
      ptr::write_bytes(p, 5, 16);

      let q = heap.reallocate(p, 100);
      assert_ne!(q, p);
      assert!(std::slice::from_raw_parts(q, 16).iter().all(|&b| b == 5));

      let shrunk = heap.reallocate(q, 8);
      assert_ne!(shrunk, q);
      assert!(std::slice::from_raw_parts(shrunk, 8).iter().all(|&b| b == 5));

      assert!(!heap.reallocate(ptr::null_mut(), 8).is_null());
      assert!(!heap.reallocate(shrunk, 0).is_null());
    }
  }

  #[test]
  fn test_zero_allocate_and_aligned() {
    let heap = heap();

    assert!(heap.zero_allocate(usize::MAX, usize::MAX).is_null());

    let z = heap.zero_allocate(8, 8);
    unsafe { assert!(std::slice::from_raw_parts(z, 64).iter().all(|&b| b == 0)) };

    let mut out = ptr::null_mut();
    unsafe {
      assert_eq!(heap.aligned_allocate(&mut out, 32, 10), 0);
      assert!(is_aligned(out as usize, 32));
      assert_eq!(heap.aligned_allocate(&mut out, 8, usize::MAX), libc::ENOMEM);
    }
  }

  #[test]
  fn test_global_alloc() {
    let heap = heap();

    unsafe {
      let layout = Layout::array::<u32>(4).unwrap();
      let p = GlobalAlloc::alloc(&heap, layout);
      p.cast::<u32>().write(77);

      let q = GlobalAlloc::realloc(&heap, p, layout, 64);
      assert_eq!(q.cast::<u32>().read(), 77);

      GlobalAlloc::dealloc(&heap, q, Layout::array::<u8>(64).unwrap());
      assert!(GlobalAlloc::alloc(&heap, Layout::from_size_align(1, 64).unwrap()).is_null());
    }
  }
}
