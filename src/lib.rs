//! # rallocator — a best-fit boundary-tag heap allocator
//!
//! This crate provides a general-purpose dynamic memory allocator that
//! services byte-granularity `alloc`/`free`/`realloc`/`calloc` requests
//! against a single, monotonically extensible process heap obtained from
//! the operating system via [`libc::sbrk`].
//!
//! ## How it works
//!
//! The heap is a contiguous sequence of boundary-tagged blocks (a size and
//! an allocation bit, stored identically at both ends of every block, so
//! neighbors can be found by stepping forward or backward through the tag
//! stream). Free blocks are additionally indexed by an intrusive,
//! height-balanced binary search tree keyed by `(size, address)`, so
//! `alloc` can find the *smallest* free block that fits — best-fit — in
//! time logarithmic in the number of free blocks, rather than walking the
//! whole heap.
//!
//! ```text
//!   rallocator
//!   ├── align      — alignment macros (align!, align_to!)
//!   ├── block      — boundary-tag header/footer helpers
//!   ├── heap       — the OS heap-extension primitive (sbrk)
//!   ├── index      — the best-fit AVL free-block index
//!   ├── allocator  — the alloc/free/realloc/calloc facade
//!   └── global     — a GlobalAlloc wrapper for #[global_allocator]
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use rallocator::Allocator;
//!
//! let a = Allocator::new();
//! let p = a.alloc(64);
//! assert!(!p.is_null());
//! a.free(p);
//! ```
//!
//! ## As the process's global allocator
//!
//! ```rust,ignore
//! use rallocator::global::LockedAllocator;
//!
//! #[global_allocator]
//! static ALLOCATOR: LockedAllocator = LockedAllocator::new();
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded core**: `Allocator` itself requires external
//!   synchronization if shared across threads; see [`global`] for a
//!   lock-wrapped adapter.
//! - **Never returns memory to the OS**: the heap only grows.
//! - **Unix-only**: built on `sbrk` (POSIX systems).
//!
//! ## Safety
//!
//! This crate manages raw memory directly; most of its internals are
//! `unsafe fn` with documented preconditions. Misuse observable only at
//! the public `alloc`/`free`/`realloc`/`calloc` boundary (double-free,
//! freeing a foreign pointer, writing past a payload) is undefined
//! behavior by design, matching the contract of `malloc`/`free` in C.

pub mod align;
pub mod allocator;
pub mod block;
pub mod global;
pub mod heap;
pub mod index;

pub use allocator::{Allocator, HeapStats};
pub use global::LockedAllocator;

/// Serializes tests that call the real `sbrk` directly or through an
/// [`Allocator`] — the OS program break is one process-wide resource, and
/// the default test harness runs `#[test]` functions on multiple threads.
/// Held for a whole test's duration so its view of `sbrk`'s return values
/// stays internally consistent.
#[cfg(test)]
pub(crate) fn sbrk_test_lock() -> std::sync::MutexGuard<'static, ()> {
  static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
  LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
