use std::mem;

use static_assertions::const_assert;

use crate::{align, align::ALIGN, config::Config, error::HeapError};

/// Tag written into every live header; anything else means the pointer
/// was freed already or never came from this heap.
pub const SIGNATURE: u32 = 0xdead;

/// Bytes reserved in front of every payload. Padded to [`ALIGN`] so the
/// payload keeps the block's alignment.
pub const HEADER_SIZE: usize = align!(mem::size_of::<Header>());

const_assert!(mem::size_of::<Header>() <= ALIGN);
const_assert!(HEADER_SIZE == ALIGN);

/// Block metadata, stored right before the payload.
///
/// ```text
///   ┌──────────────────────────────┬─────────────────────────────┐
///   │ Header (HEADER_SIZE bytes)   │ payload (real_size bytes)   │
///   │  real_size | signature | pad │                             │
///   └──────────────────────────────┴─────────────────────────────┘
///   ▲                              ▲                             ▲
///   block                          payload (returned)            block end
/// ```
#[derive(Debug)]
#[repr(C)]
pub struct Header {
  /// Usable payload capacity, including growth slack.
  pub real_size: usize,
  pub signature: u32,
}

impl Header {
  /// Header belonging to `payload`. Does not validate anything.
  pub fn of(payload: *mut u8) -> *mut Header {
    payload.wrapping_sub(HEADER_SIZE).cast()
  }

  pub fn payload(block: *mut u8) -> *mut u8 {
    block.wrapping_add(HEADER_SIZE)
  }

  /// Stamps a live header at `block` and returns the payload pointer.
  ///
  /// # Safety
  ///
  /// `block` must point at `HEADER_SIZE + real_size` writable bytes.
  pub unsafe fn write(
    block: *mut u8,
    real_size: usize,
  ) -> *mut u8 {
    unsafe {
      block.cast::<Header>().write(Header {
        real_size,
        signature: SIGNATURE,
      });
    }

    Self::payload(block)
  }

  /// Recovers and validates the header of `payload`.
  ///
  /// # Safety
  ///
  /// The `HEADER_SIZE` bytes before `payload` must be readable.
  pub unsafe fn check<'a>(payload: *mut u8) -> Result<&'a mut Header, HeapError> {
    let header = unsafe { &mut *Self::of(payload) };

    if header.signature != SIGNATURE {
      return Err(HeapError::BadSignature {
        ptr: payload as usize,
      });
    }

    Ok(header)
  }

  /// Marks the block dead. Its storage only comes back through reclamation.
  pub fn release(&mut self) {
    self.signature = 0;
  }

  pub fn block(&mut self) -> *mut u8 {
    (self as *mut Header).cast()
  }

  /// First byte after the payload.
  pub fn end(&mut self) -> *mut u8 {
    Self::payload(self.block()).wrapping_add(self.real_size)
  }
}

/// Total aligned block size for a `requested`-byte allocation, header
/// included, with growth anticipation applied.
pub fn block_size(
  requested: usize,
  config: &Config,
) -> Option<usize> {
  padded(config.anticipate(requested))
}

/// Aligned block size for exactly `payload` bytes, no anticipation.
pub fn padded(payload: usize) -> Option<usize> {
  let total = payload.checked_add(HEADER_SIZE)?.checked_add(ALIGN - 1)?;

  Some(total & !(ALIGN - 1))
}
