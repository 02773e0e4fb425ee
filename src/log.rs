//! Allocation-free diagnostics.
//!
//! Nothing in here may allocate: these messages are emitted from inside
//! `malloc`/`free`, so the usual formatting-to-`String` path would recurse
//! into the allocator. Output goes straight to file descriptor 2.

use core::fmt;

/// Prefix of every line written by [`heap_log!`].
pub const PREFIX: &str = "bumpmalloc: ";

/// Unbuffered writer over `write(2, ..)`.
pub struct Stderr;

impl fmt::Write for Stderr {
  fn write_str(
    &mut self,
    s: &str,
  ) -> fmt::Result {
    let mut bytes = s.as_bytes();

    while !bytes.is_empty() {
      let written = unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };

      if written < 0 {
        if last_errno() == libc::EINTR {
          continue;
        }
        return Err(fmt::Error);
      }

      bytes = &bytes[written as usize..];
    }

    Ok(())
  }
}

fn last_errno() -> i32 {
  std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Writes one formatted line to stderr without allocating.
pub fn write_line(args: fmt::Arguments<'_>) {
  use fmt::Write;

  let mut out = Stderr;
  // Nowhere to report a failed diagnostic.
  let _ = out.write_str(PREFIX);
  let _ = out.write_fmt(args);
  let _ = out.write_str("\n");
}

/// Formats a `bumpmalloc:`-prefixed line to stderr.
///
/// ```rust
/// bumpmalloc::heap_log!("reserved {} bytes", 4096);
/// ```
#[macro_export]
macro_rules! heap_log {
  ($($arg:tt)*) => {
    $crate::log::write_line(format_args!($($arg)*))
  };
}

#[cfg(test)]
mod tests {
  use core::fmt::Write;

  use super::*;

  #[test]
  fn test_stderr_accepts_empty_and_long_writes() {
    let mut out = Stderr;

    assert!(out.write_str("").is_ok());

    let long = "x".repeat(64 * 1024);
    assert!(out.write_str(&long).is_ok());
    assert!(out.write_str("\n").is_ok());
  }

  #[test]
  fn test_heap_log_macro() {
    crate::heap_log!("test line {} {:#x}", 1, 0xdead);
  }
}
