use std::fmt;

use crate::heap_log;

/// Everything that can go wrong inside the heap.
///
/// Only [`HeapError::SizeOverflow`] is recoverable on the unchecked surface;
/// the other variants end the process through [`fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  /// No mapping could be obtained, or the reserved half is used up.
  OutOfAddressSpace { requested: usize },
  /// The header before `ptr` does not carry the heap's signature: double
  /// free, foreign pointer, or an overrun that clobbered the header.
  BadSignature { ptr: usize },
  /// `count * size` (or a padded block size) does not fit in `usize`.
  SizeOverflow,
  /// The heap only guarantees its native alignment.
  UnsupportedAlignment { align: usize },
}

impl HeapError {
  pub fn is_fatal(&self) -> bool {
    !matches!(self, HeapError::SizeOverflow)
  }
}

impl fmt::Display for HeapError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      HeapError::OutOfAddressSpace { requested } => {
        write!(f, "out of address space while reserving {requested} bytes")
      }
      HeapError::BadSignature { ptr } => {
        write!(f, "invalid pointer {ptr:#x} (double free or corrupted header)")
      }
      HeapError::SizeOverflow => write!(f, "allocation size overflows usize"),
      HeapError::UnsupportedAlignment { align } => {
        write!(f, "unsupported alignment {align} (max {})", crate::align::ALIGN)
      }
    }
  }
}

impl std::error::Error for HeapError {}

/// Reports `err` on stderr and aborts the process.
///
/// Unwinding out of `malloc` is not an option, and there is no way to
/// report failure to the caller once the heap is in an unknown state.
#[cold]
pub fn fatal(err: HeapError) -> ! {
  heap_log!("fatal: {err}");
  unsafe { libc::abort() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fatal_classification() {
    assert!(HeapError::OutOfAddressSpace { requested: 1 }.is_fatal());
    assert!(HeapError::BadSignature { ptr: 0x10 }.is_fatal());
    assert!(HeapError::UnsupportedAlignment { align: 64 }.is_fatal());
    assert!(!HeapError::SizeOverflow.is_fatal());
  }

  #[test]
  fn test_display() {
    assert_eq!(
      HeapError::BadSignature { ptr: 0x1000 }.to_string(),
      "invalid pointer 0x1000 (double free or corrupted header)"
    );
    assert_eq!(
      HeapError::UnsupportedAlignment { align: 64 }.to_string(),
      "unsupported alignment 64 (max 32)"
    );
  }
}
