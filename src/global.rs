//! A `#[global_allocator]`-compatible wrapper around [`Allocator`].
//!
//! `Allocator`'s own methods take `&self` but mutate process-wide state
//! through raw pointers and `Cell`s — correct only if one call runs to
//! completion before the next begins (see §5 of the allocator's design:
//! "a correct deployment either pins the allocator to one thread or wraps
//! every facade entry in a mutual-exclusion lock"). `LockedAllocator` is
//! that lock.

use core::alloc::{GlobalAlloc, Layout};
use std::sync::Mutex;

use crate::allocator::Allocator;
use crate::block::WORD;

/// Wraps an [`Allocator`] in a [`Mutex`] and implements [`GlobalAlloc`],
/// so it can be installed with `#[global_allocator]`.
///
/// ```rust,ignore
/// use rallocator::global::LockedAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: LockedAllocator = LockedAllocator::new();
/// ```
pub struct LockedAllocator(Mutex<Allocator>);

impl LockedAllocator {
  /// A fresh, empty allocator behind a lock.
  pub const fn new() -> Self {
    Self(Mutex::new(Allocator::new()))
  }
}

impl Default for LockedAllocator {
  fn default() -> Self {
    Self::new()
  }
}

// SAFETY: every entry point below takes the lock before touching the
// inner `Allocator`, so at most one thread executes allocator logic at a
// time. `GlobalAlloc`'s own contract (valid `Layout`s, pointers returned
// by this same allocator passed to `dealloc`/`realloc`) is the caller's
// responsibility, same as for any allocator.
unsafe impl GlobalAlloc for LockedAllocator {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    debug_assert!(layout.align() <= 2 * WORD, "rallocator only guarantees 16-byte alignment");
    self.0.lock().unwrap_or_else(|p| p.into_inner()).alloc(layout.size())
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    self.0.lock().unwrap_or_else(|p| p.into_inner()).free(ptr);
  }

  unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
    self.0.lock().unwrap_or_else(|p| p.into_inner()).realloc(ptr, new_size)
  }

  unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
    let a = self.0.lock().unwrap_or_else(|p| p.into_inner());
    a.calloc(1, layout.size().max(1))
  }
}
