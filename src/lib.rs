//! # bumpmalloc - A Lock-Free Bump Allocator for the Whole Process
//!
//! This crate provides a **bump allocator** meant to replace `malloc`,
//! `calloc`, `realloc`, `free` and `posix_memalign` for an entire process via
//! `LD_PRELOAD`. Allocation is a single atomic `fetch_add`; there is no free
//! list. Memory is only given back when the freed block is the most recent one.
//!
//! ## Overview
//!
//! ```text
//!   Address Space Layout (reserved once, on the first allocation):
//!
//!   ┌──────────────────────────────────────────────┬───────────────────────────────┐
//!   │              read/write half                 │     PROT_NONE guard half      │
//!   │                                              │                               │
//!   │   ┌────┬─────┬────┬──────┬───────────────┐   │                               │
//!   │   │ A1 │ A2  │ A3 │  A4  │  untouched    │   │  overruns fault here instead  │
//!   │   └────┴─────┴────┴──────┴───────────────┘   │  of corrupting other mappings │
//!   │                          ▲                   │                               │
//!   │                          │                   │                               │
//!   │                       Cursor                 │                               │
//!   │                  (one AtomicUsize)           │                               │
//!   └──────────────────────────────────────────────┴───────────────────────────────┘
//!   base                                         base+S                        base+2S
//!
//!   S starts at 1 TiB and is halved until the kernel accepts the mapping.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   bumpmalloc
//!   ├── align      - ALIGN and the align!/align_to! macros
//!   ├── block      - Block header codec (real_size + signature)
//!   ├── config     - Build-time tuning (budget, growth anticipation)
//!   ├── error      - HeapError and the abort path
//!   ├── log        - Allocation-free stderr diagnostics
//!   ├── region     - Address space reservation and the shared cursor
//!   ├── bump       - Heap, the header-tracking allocator
//!   ├── leak       - LeakHeap, the header-less variant
//!   └── ffi        - malloc & friends with C linkage (feature "interpose")
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bumpmalloc::Heap;
//!
//! #[global_allocator]
//! static GLOBAL: Heap = Heap::new();
//! ```
//!
//! Or for any dynamically linked program:
//!
//! ```text
//!   cargo build --release --features interpose
//!   LD_PRELOAD=target/release/libbumpmalloc.so ./program
//! ```
//!
//! ## How It Works
//!
//! Every block is a header followed by the payload:
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ real_size: N    │  │  ┌──────────────────────────┐  │
//!   │  │ signature:0xdead│  │  │                          │  │
//!   │  └─────────────────┘  │  │     N bytes usable       │  │
//!   │      32 bytes         │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! - `malloc` adds the block size to the cursor and writes the header.
//!   Requests above 2 KiB reserve three times their size, expecting a
//!   `realloc` to follow.
//! - `free` clears the signature and tries to compare-and-swap the cursor
//!   from the block's end back to its start. That only works for the
//!   topmost block; anything else leaks.
//! - `realloc` first checks the recorded capacity, then tries to move the
//!   cursor forward from the block's end, and only then copies.
//!
//! ```text
//!   Block lifecycle:
//!
//!   allocated ──► grown in place (repeatable) ──► freed ──► reclaimed
//!        │                                          │
//!        └──────────────────────────────────────────┴──► leaked (not topmost)
//! ```
//!
//! ## Limitations
//!
//! - **First call must be single-threaded**: the region is reserved without
//!   synchronization on the first allocation
//! - **No reuse of middle blocks**: only the topmost block is reclaimed
//! - **Native alignment only**: alignments above 32 bytes abort
//! - **Unix-only**: requires `libc`, `mmap` and `mprotect`
//!
//! ## Safety
//!
//! Freeing or reallocating a pointer that did not come from the heap, or
//! freeing it twice, aborts the process. The `try_*` methods on [`Heap`]
//! report those cases as [`HeapError`] instead.

pub mod align;
pub mod block;
pub mod config;
pub mod error;
pub mod log;
pub mod region;

mod bump;
mod leak;

#[cfg(any(feature = "interpose", test))]
pub mod ffi;

pub use bump::{Heap, print_alloc};
pub use config::Config;
pub use error::HeapError;
pub use leak::LeakHeap;
