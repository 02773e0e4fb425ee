//! Address-space reservation and the shared bump cursor.
//!
//! ```text
//!   base                     limit = base + budget              base + 2*budget
//!   ┌──────────────────────────┬──────────────────────────────────┐
//!   │  read/write, bump area   │   PROT_NONE guard half           │
//!   └──────────────────────────┴──────────────────────────────────┘
//!               ▲
//!               └── cursor: first byte past the highest block handed out
//! ```

use std::{
  ptr,
  sync::atomic::{AtomicPtr, AtomicUsize, Ordering},
};

use crate::{config::Config, error::HeapError};

fn page_size() -> usize {
  match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
    size if size > 0 => size as usize,
    _ => 4096,
  }
}

/// A `2 * budget` mapping whose upper half is inaccessible.
#[derive(Debug)]
pub struct Region {
  base: *mut u8,
  budget: usize,
}

impl Region {
  /// Maps a single region, or returns `None` if the kernel refuses.
  pub fn reserve(budget: usize) -> Option<Region> {
    let page = page_size();
    let budget = budget & !(page - 1);

    if budget == 0 {
      return None;
    }

    let len = budget.checked_mul(2)?;

    unsafe {
      let base = libc::mmap(
        ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
        -1,
        0,
      );

      if base == libc::MAP_FAILED {
        return None;
      }

      let base = base as *mut u8;

      if libc::mprotect(base.add(budget).cast(), budget, libc::PROT_NONE) != 0 {
        libc::munmap(base.cast(), len);
        return None;
      }

      Some(Region { base, budget })
    }
  }

  /// Tries `budget`, then half of it, and so on until a mapping succeeds.
  pub fn reserve_halving(budget: usize) -> Result<Region, HeapError> {
    let mut current = budget;

    while current > 0 {
      if let Some(region) = Region::reserve(current) {
        return Ok(region);
      }
      current >>= 1;
    }

    Err(HeapError::OutOfAddressSpace { requested: budget })
  }

  pub fn base(&self) -> *mut u8 {
    self.base
  }

  /// Size of the usable (read/write) half.
  pub fn budget(&self) -> usize {
    self.budget
  }
}

/// The heap's only shared state: where the region lives and the cursor.
///
/// The cursor is a plain address. Zero means "not reserved yet", which is
/// what lets the first `fetch_add` double as the initialization check.
pub struct Arena {
  config: Config,
  base: AtomicPtr<u8>,
  budget: AtomicUsize,
  cursor: AtomicUsize,
}

impl Arena {
  pub const fn new(config: Config) -> Self {
    Self {
      config,
      base: AtomicPtr::new(ptr::null_mut()),
      budget: AtomicUsize::new(0),
      cursor: AtomicUsize::new(0),
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Hands out `size` fresh bytes by advancing the cursor.
  ///
  /// The very first call reserves the region. That path is not synchronized:
  /// the first allocation must happen before a second thread can call into
  /// the same arena. Process start-up always allocates before spawning
  /// threads, which is what the interposed heap relies on.
  pub fn bump(
    &self,
    size: usize,
  ) -> Result<*mut u8, HeapError> {
    let budget = self.budget.load(Ordering::Acquire);

    // Keeps the cursor from wrapping around the address space.
    if budget != 0 && size > budget {
      return Err(HeapError::OutOfAddressSpace { requested: size });
    }

    let start = self.cursor.fetch_add(size, Ordering::Relaxed);

    if start == 0 {
      return self.initialize(size);
    }

    let base = self.base.load(Ordering::Acquire);
    if start + size > base as usize + budget {
      // Give the bytes back so the cursor stays at the last block handed
      // out. If another bump landed on top meanwhile it fails the same way
      // and undoes its own part.
      let _ = self.cursor.compare_exchange(start + size, start, Ordering::AcqRel, Ordering::Relaxed);
      return Err(HeapError::OutOfAddressSpace { requested: size });
    }

    Ok(self.at(base, start))
  }

  #[cold]
  fn initialize(
    &self,
    size: usize,
  ) -> Result<*mut u8, HeapError> {
    let region = Region::reserve_halving(self.config.max_budget)?;

    if size > region.budget() {
      self.cursor.store(0, Ordering::Relaxed);
      unsafe { libc::munmap(region.base().cast(), 2 * region.budget()) };
      return Err(HeapError::OutOfAddressSpace { requested: size });
    }

    self.base.store(region.base(), Ordering::Release);
    self.budget.store(region.budget(), Ordering::Release);
    self.cursor.store(region.base() as usize + size, Ordering::Release);

    Ok(region.base())
  }

  /// Moves the cursor back from `end` to `to`, but only if nothing was
  /// bumped past `end` in the meantime.
  pub fn retreat(
    &self,
    end: *mut u8,
    to: *mut u8,
  ) -> bool {
    self
      .cursor
      .compare_exchange(end as usize, to as usize, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
  }

  /// Moves the cursor forward from `end` to `new_end` if `end` is still the
  /// top of the heap and `new_end` stays inside the usable half.
  pub fn extend(
    &self,
    end: *mut u8,
    new_end: *mut u8,
  ) -> bool {
    let limit = self.limit() as usize;

    if new_end as usize > limit || new_end < end {
      return false;
    }

    self
      .cursor
      .compare_exchange(end as usize, new_end as usize, Ordering::AcqRel, Ordering::Relaxed)
      .is_ok()
  }

  /// Null until the first allocation.
  pub fn base(&self) -> *mut u8 {
    self.base.load(Ordering::Acquire)
  }

  /// One past the last usable byte; the guard half starts here.
  pub fn limit(&self) -> *mut u8 {
    self.base().wrapping_add(self.budget.load(Ordering::Acquire))
  }

  pub fn budget(&self) -> usize {
    self.budget.load(Ordering::Acquire)
  }

  pub fn cursor(&self) -> *mut u8 {
    let base = self.base();

    if base.is_null() {
      return ptr::null_mut();
    }

    self.at(base, self.cursor.load(Ordering::Acquire))
  }

  /// Bytes between the base and the cursor.
  pub fn used(&self) -> usize {
    let base = self.base();

    if base.is_null() {
      return 0;
    }

    self.cursor.load(Ordering::Acquire) - base as usize
  }

  /// Whether `ptr` lies below the cursor inside this arena.
  pub fn contains(
    &self,
    ptr: *const u8,
  ) -> bool {
    let base = self.base() as usize;
    let addr = ptr as usize;

    base != 0 && addr >= base && addr < self.cursor.load(Ordering::Acquire)
  }

  fn at(
    &self,
    base: *mut u8,
    addr: usize,
  ) -> *mut u8 {
    base.wrapping_add(addr - base as usize)
  }
}

impl Drop for Arena {
  fn drop(&mut self) {
    let base = *self.base.get_mut();

    if !base.is_null() {
      unsafe { libc::munmap(base.cast(), 2 * *self.budget.get_mut()) };
    }
  }
}
