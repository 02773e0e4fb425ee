use static_assertions::const_assert;

/// Native alignment of every payload pointer handed out by the heap.
pub const ALIGN: usize = 32;

const_assert!(ALIGN.is_power_of_two());
const_assert!(ALIGN >= 2 * core::mem::size_of::<usize>());

/// Rounds `value` up to the allocator's native alignment ([`ALIGN`]).
///
/// # Examples
///
/// ```rust
/// use bumpmalloc::align;
///
/// assert_eq!(align!(0), 0);
/// assert_eq!(align!(1), 32);
/// assert_eq!(align!(32), 32);
/// assert_eq!(align!(33), 64);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, $crate::align::ALIGN)
  };
}

/// Rounds `value` up to `align`, which must be a power of two.
///
/// ```rust
/// use bumpmalloc::align_to;
///
/// assert_eq!(align_to!(13, 8), 16);
/// assert_eq!(align_to!(4096, 4096), 4096);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    (($value) + ($align) - 1) & !(($align) - 1)
  };
}

/// Whether `addr` is a multiple of `align` (a power of two).
#[inline]
pub const fn is_aligned(
  addr: usize,
  align: usize,
) -> bool {
  addr & (align - 1) == 0
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGN * i + 1)..=(ALIGN * (i + 1));

      let expected_alignment = ALIGN * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert!(is_aligned(align!(size), ALIGN));
      }
    }
  }

  #[test]
  fn test_align_to_smaller_powers() {
    for shift in 0..=5 {
      let align = 1usize << shift;
      assert_eq!(align_to!(0, align), 0);
      assert_eq!(align_to!(1, align), align);
      assert_eq!(align_to!(align + 1, align), 2 * align);
    }
  }

  #[test]
  fn test_is_aligned() {
    assert!(is_aligned(0, ALIGN));
    assert!(is_aligned(4096, 4096));
    assert!(!is_aligned(48, ALIGN));
    assert!(is_aligned(48, 16));
  }
}
