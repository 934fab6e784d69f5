//! AVL balance kernel: height maintenance and rotations.
//!
//! Rotations take their pivot by value, rewire the owned children and hand
//! back the new subtree root. Heights are refreshed with the uniform formula
//! `h = 1 + max(h(left), h(right))` with `h(None) = 0`.

use crate::stats::Counters;

use super::node::{height, Link, Node};

/// Refresh the stored height of `n` from its children.
pub(crate) fn update_height(n: &mut Node, c: &mut Counters) {
    n.height = 1 + height(&mut n.left, c).max(height(&mut n.right, c));
}

/// `height(l) > height(r) + 1`: the left tree is too tall to sit beside the
/// right one.
pub(crate) fn is_left_heavy(l: &mut Link, r: &mut Link, c: &mut Counters) -> bool {
    height(l, c) > height(r, c) + 1
}

/// Decide between a single and a double rotation when rebalancing.
///
/// Rebalancing a left-side composition uses a single rotation iff the taller
/// grandchild is on the outer side: `height(left) > height(right)` when
/// `left_side`, the non-strict opposite otherwise.
pub(crate) fn is_single_rotation(n: &mut Node, left_side: bool, c: &mut Counters) -> bool {
    let hl: u64 = height(&mut n.left, c);
    let hr: u64 = height(&mut n.right, c);
    if left_side {
        hl > hr
    } else {
        hl <= hr
    }
}

/// Left rotation around `x`; `x.right` becomes the new root.
pub(crate) fn rotate_left(mut x: Box<Node>, c: &mut Counters) -> Box<Node> {
    let mut y = x.right.take().expect("rotate_left: right child required");
    x.right = y.left.take();
    update_height(&mut x, c);
    y.left = Some(x);
    update_height(&mut y, c);
    y
}

/// Right rotation around `x`; `x.left` becomes the new root.
pub(crate) fn rotate_right(mut x: Box<Node>, c: &mut Counters) -> Box<Node> {
    let mut y = x.left.take().expect("rotate_right: left child required");
    x.left = y.right.take();
    update_height(&mut x, c);
    y.right = Some(x);
    update_height(&mut y, c);
    y
}

/// Right rotation on `x.right`, then a left rotation on `x`.
pub(crate) fn double_rotate_left(mut x: Box<Node>, c: &mut Counters) -> Box<Node> {
    let mut r = x.right.take().expect("double_rotate_left: right child required");
    let mut inner = r.left.take().expect("double_rotate_left: inner grandchild required");
    r.left = inner.right.take();
    update_height(&mut r, c);
    inner.right = Some(r);
    x.right = Some(inner);
    rotate_left(x, c)
}

/// Left rotation on `x.left`, then a right rotation on `x`.
pub(crate) fn double_rotate_right(mut x: Box<Node>, c: &mut Counters) -> Box<Node> {
    let mut l = x.left.take().expect("double_rotate_right: left child required");
    let mut inner = l.right.take().expect("double_rotate_right: inner grandchild required");
    l.right = inner.left.take();
    update_height(&mut l, c);
    inner.left = Some(l);
    x.left = Some(inner);
    rotate_right(x, c)
}
