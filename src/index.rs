//! The free-block index: a height-balanced (AVL) binary search tree whose
//! nodes live *inside* the payload of the free blocks they describe.
//!
//! ```text
//!   free block's payload, viewed as an IndexNode while it sits in the tree:
//!
//!   ┌────────┬──────┬────────────┬─────────────┬─────────────────────┐
//!   │ header │ size │ height     │ left, right │ ...unused payload...│
//!   └────────┴──────┴────────────┴─────────────┴─────────────────────┘
//!            ▲
//!            └── same address as the block's payload pointer
//! ```
//!
//! Keys are `(size, address)` pairs, compared lexicographically; address
//! uniqueness (every node lives at a distinct memory location) makes this a
//! strict total order, so no two nodes ever tie. The tree never allocates:
//! every node is a view onto memory the caller already owns.

use core::cmp::Ordering;
use core::ptr;

/// A free-block index node, placed at a free block's payload address.
///
/// `#[repr(C)]` so the field layout is stable for the raw-pointer
/// arithmetic that places this at an arbitrary heap address.
#[repr(C)]
pub struct IndexNode {
  /// Cached copy of the owning block's size; must equal the block's
  /// header size for as long as this node is in the tree.
  pub size: usize,
  height: i32,
  pub(crate) left: *mut IndexNode,
  pub(crate) right: *mut IndexNode,
}

impl IndexNode {
  /// Writes a fresh, out-of-tree node at `addr`, describing a block of
  /// `size` bytes.
  ///
  /// # Safety
  /// `addr` must be a valid, writable address for an `IndexNode`, and
  /// must not already contain a node that is part of some tree.
  pub unsafe fn init(addr: usize, size: usize) -> *mut IndexNode {
    let node = addr as *mut IndexNode;
    unsafe {
      ptr::write(node, IndexNode { size, height: 1, left: ptr::null_mut(), right: ptr::null_mut() });
    }
    node
  }

  fn key(&self) -> (usize, usize) {
    (self.size, self as *const Self as usize)
  }
}

unsafe fn height(n: *mut IndexNode) -> i32 {
  if n.is_null() { 0 } else { unsafe { (*n).height } }
}

unsafe fn update_height(n: *mut IndexNode) {
  unsafe {
    (*n).height = 1 + height((*n).left).max(height((*n).right));
  }
}

unsafe fn balance_factor(n: *mut IndexNode) -> i32 {
  unsafe { height((*n).right) - height((*n).left) }
}

/// `r.right = c.left; c.left = r`, heights fixed up on `r` then `c`. No-op
/// if `r` has no right child.
unsafe fn rotate_left(r: *mut IndexNode) -> *mut IndexNode {
  unsafe {
    let c = (*r).right;
    if c.is_null() {
      return r;
    }
    (*r).right = (*c).left;
    (*c).left = r;
    update_height(r);
    update_height(c);
    c
  }
}

/// Mirror of [`rotate_left`].
unsafe fn rotate_right(r: *mut IndexNode) -> *mut IndexNode {
  unsafe {
    let c = (*r).left;
    if c.is_null() {
      return r;
    }
    (*r).left = (*c).right;
    (*c).right = r;
    update_height(r);
    update_height(c);
    c
  }
}

/// Restores the height cache and, if needed, the AVL balance property at
/// `n`, returning the (possibly different) node now rooting this subtree.
///
/// Uses the `<= 0` / `>= 0` child-balance thresholds from the spec's
/// deletion case throughout. This also covers insertion correctly: right
/// after a single insertion the unbalanced child's own balance factor is
/// never exactly 0 (a single insertion can only have made one side of it
/// one taller), so the `<=`/`>=` and strict `<`/`>` forms pick the same
/// rotation for every state insertion can actually produce.
unsafe fn rebalance(n: *mut IndexNode) -> *mut IndexNode {
  unsafe {
    update_height(n);
    let b = balance_factor(n);

    if b < -1 {
      if balance_factor((*n).left) <= 0 {
        rotate_right(n)
      } else {
        (*n).left = rotate_left((*n).left);
        rotate_right(n)
      }
    } else if b > 1 {
      if balance_factor((*n).right) >= 0 {
        rotate_left(n)
      } else {
        (*n).right = rotate_right((*n).right);
        rotate_left(n)
      }
    } else {
      n
    }
  }
}

/// Inserts `node` (which must not already be in the tree) into the tree
/// rooted at `root`, returning the new root.
///
/// # Safety
/// `node` must be a valid, out-of-tree node (see [`IndexNode::init`]) with
/// a key distinct from every node currently in the tree.
pub unsafe fn insert(root: *mut IndexNode, node: *mut IndexNode) -> *mut IndexNode {
  unsafe {
    if root.is_null() {
      (*node).left = ptr::null_mut();
      (*node).right = ptr::null_mut();
      (*node).height = 1;
      return node;
    }

    match (*node).key().cmp(&(*root).key()) {
      Ordering::Less => (*root).left = insert((*root).left, node),
      _ => (*root).right = insert((*root).right, node),
    }

    rebalance(root)
  }
}

unsafe fn min_node(mut n: *mut IndexNode) -> *mut IndexNode {
  unsafe {
    while !(*n).left.is_null() {
      n = (*n).left;
    }
    n
  }
}

/// Removes `target` (identified by its key, which includes its own
/// address, so this is an identity match) from the tree rooted at `root`,
/// returning the new root.
///
/// # Safety
/// `target` must currently be a node of the tree rooted at `root`.
pub unsafe fn delete(root: *mut IndexNode, target: *mut IndexNode) -> *mut IndexNode {
  unsafe {
    debug_assert!(!root.is_null(), "delete: target not found in tree");

    match (*target).key().cmp(&(*root).key()) {
      Ordering::Less => {
        (*root).left = delete((*root).left, target);
        rebalance(root)
      }
      Ordering::Greater => {
        (*root).right = delete((*root).right, target);
        rebalance(root)
      }
      Ordering::Equal => {
        debug_assert_eq!(root, target, "key collision on distinct nodes");

        if (*root).left.is_null() {
          return (*root).right;
        }
        if (*root).right.is_null() {
          return (*root).left;
        }

        let succ = min_node((*root).right);
        let new_right = delete((*root).right, succ);
        (*succ).left = (*root).left;
        (*succ).right = new_right;
        rebalance(succ)
      }
    }
  }
}

/// Finds the free block of smallest size `>= s`, breaking ties toward the
/// smallest address. Returns null if no block is large enough.
///
/// # Safety
/// `root` must be the root of a well-formed tree (or null).
pub unsafe fn best_fit(mut root: *mut IndexNode, s: usize) -> *mut IndexNode {
  let mut best = ptr::null_mut();
  unsafe {
    while !root.is_null() {
      if (*root).size >= s {
        best = root;
        root = (*root).left;
      } else {
        root = (*root).right;
      }
    }
  }
  best
}

/// Combines [`best_fit`] and [`delete`]: finds and removes the best-fitting
/// node in one pass, returning it alongside the new root. Returns a null
/// node and the unchanged root if no block is large enough.
///
/// # Safety
/// `root` must be the root of a well-formed tree (or null).
pub unsafe fn pop_best_fit(root: *mut IndexNode, s: usize) -> (*mut IndexNode, *mut IndexNode) {
  unsafe {
    let found = best_fit(root, s);
    if found.is_null() {
      return (ptr::null_mut(), root);
    }
    let new_root = delete(root, found);
    (found, new_root)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn leak(size: usize) -> *mut IndexNode {
    let boxed = Box::new(IndexNode { size, height: 1, left: ptr::null_mut(), right: ptr::null_mut() });
    Box::into_raw(boxed)
  }

  unsafe fn free_leaked(n: *mut IndexNode) {
    unsafe { drop(Box::from_raw(n)) };
  }

  unsafe fn check_invariants(root: *mut IndexNode) -> (i32, Option<(usize, usize)>, Option<(usize, usize)>) {
    unsafe {
      if root.is_null() {
        return (0, None, None);
      }

      let (lh, lmin, lmax) = check_invariants((*root).left);
      let (rh, rmin, rmax) = check_invariants((*root).right);

      let expected_height = 1 + lh.max(rh);
      assert_eq!((*root).height, expected_height, "cached height must match recomputed height");
      assert!((rh - lh).abs() <= 1, "balance factor must be within [-1, 1]");

      let key = (*root).key();
      if let Some(m) = lmax {
        assert!(m < key, "BST order violated on the left");
      }
      if let Some(m) = rmin {
        assert!(key < m, "BST order violated on the right");
      }

      (expected_height, Some(lmin.unwrap_or(key)), Some(rmax.unwrap_or(key)))
    }
  }

  #[test]
  fn insert_then_best_fit_finds_smallest_sufficient_block() {
    let sizes = [64, 128, 48, 256, 96];
    let nodes: Vec<_> = sizes.iter().map(|&s| leak(s)).collect();

    let mut root = ptr::null_mut();
    for &n in &nodes {
      root = unsafe { insert(root, n) };
    }
    unsafe { check_invariants(root) };

    let found = unsafe { best_fit(root, 100) };
    assert_eq!(unsafe { (*found).size }, 128);

    for &n in &nodes {
      unsafe { free_leaked(n) };
    }
  }

  #[test]
  fn best_fit_returns_null_when_nothing_fits() {
    let node = leak(32);
    let root = unsafe { insert(ptr::null_mut(), node) };

    assert!(unsafe { best_fit(root, 64) }.is_null());

    unsafe { free_leaked(node) };
  }

  #[test]
  fn pop_best_fit_removes_the_found_node() {
    let sizes = [16, 32, 48, 64];
    let nodes: Vec<_> = sizes.iter().map(|&s| leak(s)).collect();

    let mut root = ptr::null_mut();
    for &n in &nodes {
      root = unsafe { insert(root, n) };
    }

    let (found, new_root) = unsafe { pop_best_fit(root, 40) };
    assert_eq!(unsafe { (*found).size }, 48);
    unsafe { check_invariants(new_root) };
    assert!(unsafe { best_fit(new_root, 48) }.is_null());

    for &n in &nodes {
      if n != found {
        unsafe { free_leaked(n) };
      }
    }
    unsafe { free_leaked(found) };
  }

  #[test]
  fn increasing_sizes_stay_balanced() {
    const N: usize = 200;
    let nodes: Vec<_> = (0..N).map(|i| leak((i + 1) * 16)).collect();

    let mut root = ptr::null_mut();
    for &n in &nodes {
      root = unsafe { insert(root, n) };
    }

    let (h, _, _) = unsafe { check_invariants(root) };
    let bound = 1.44 * ((N + 2) as f64).log2();
    assert!((h as f64) <= bound, "height {h} exceeds AVL bound {bound}");

    for &n in &nodes {
      unsafe { free_leaked(n) };
    }
  }

  /// One step of a random insert/delete sequence: `Insert(size)` or
  /// `DeleteNth(i)`, where `i` picks an existing node modulo the current
  /// live count (so every generated sequence is replayable regardless of
  /// how many nodes happen to be live at that point).
  #[derive(Debug, Clone)]
  enum Op {
    Insert(usize),
    DeleteNth(usize),
  }

  fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
      (1..64usize).prop_map(|units| Op::Insert(units * 16)),
      (0..256usize).prop_map(Op::DeleteNth),
    ]
  }

  proptest! {
    /// After any sequence of inserts and deletes, the tree remains a
    /// valid BST ordered by (size, address) with correct cached heights
    /// and |balance factor| <= 1 everywhere (invariants 4-6 of the spec).
    #[test]
    fn insert_delete_sequence_preserves_avl_invariants(ops in proptest::collection::vec(op_strategy(), 0..300)) {
      let mut root: *mut IndexNode = ptr::null_mut();
      let mut live: Vec<*mut IndexNode> = Vec::new();

      for op in ops {
        match op {
          Op::Insert(size) => {
            let node = leak(size);
            root = unsafe { insert(root, node) };
            live.push(node);
          }
          Op::DeleteNth(i) => {
            if !live.is_empty() {
              let node = live.swap_remove(i % live.len());
              root = unsafe { delete(root, node) };
              unsafe { free_leaked(node) };
            }
          }
        }
        unsafe { check_invariants(root) };
      }

      for node in live {
        unsafe { free_leaked(node) };
      }
    }
  }
}
