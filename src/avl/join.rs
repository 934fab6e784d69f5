//! Join/split kernel of the AVL engine.
//!
//! `join` builds a balanced tree whose in-order traversal is
//! `inorder(L) . [(k, v)] . inorder(R)`, given `L < k < R`. The taller side
//! is descended along its spine until the heights meet, and the spine is
//! rebalanced on the way back up. Every other operation here is phrased in
//! terms of `join`: `split` partitions at a key, `split_last` peels the
//! maximum, `join2` concatenates without a pivot, and point insert/delete
//! are split-then-join.
//!
//! Ordering preconditions between `L`, `k` and `R` are assumed; violating
//! them produces a non-BST tree.

use crate::key::Word;
use crate::stats::Counters;

use super::balance::{
    double_rotate_left, double_rotate_right, is_left_heavy, is_single_rotation, rotate_left,
    rotate_right, update_height,
};
use super::dict;
use super::node::{expose, Link, Node};

/// The payload of a key found by [`split`]: the value stored at the key and
/// the nested tree committed under it.
#[derive(Debug)]
pub struct SplitFound {
    /// Value stored at the split key.
    pub value: Option<Word>,
    /// Nested tree committed under the split key.
    pub nested: Link,
}

/// Join `l`, the pivot `(k, v)` with its nested tree, and `r` into one
/// balanced tree.
pub fn join(l: Link, k: Word, v: Option<Word>, nested: Link, r: Link, c: &mut Counters) -> Link {
    let mut l = l;
    let mut r = r;
    if is_left_heavy(&mut l, &mut r, c) {
        join_right(l, k, v, nested, r, c)
    } else if is_left_heavy(&mut r, &mut l, c) {
        join_left(l, k, v, nested, r, c)
    } else {
        join_balanced(l, k, v, nested, r)
    }
}

/// The heights already fit: a fresh pivot node suffices.
fn join_balanced(l: Link, k: Word, v: Option<Word>, nested: Link, r: Link) -> Link {
    Some(Node::new(k, v, l, r, nested))
}

/// Descend the right spine of the taller `l` until `r` fits, then rebalance
/// on unwind.
fn join_right(mut l: Link, k: Word, v: Option<Word>, nested: Link, mut r: Link, c: &mut Counters) -> Link {
    if !is_left_heavy(&mut l, &mut r, c) {
        return join_balanced(l, k, v, nested, r);
    }

    let mut n = l.expect("join_right: taller tree cannot be empty");
    n.right = join_right(n.right.take(), k, v, nested, r, c);

    if is_left_heavy(&mut n.right, &mut n.left, c) {
        let single: bool = is_single_rotation(
            n.right.as_mut().expect("join_right: spine child present"),
            false,
            c,
        );
        if single {
            Some(rotate_left(n, c))
        } else {
            Some(double_rotate_left(n, c))
        }
    } else {
        update_height(&mut n, c);
        Some(n)
    }
}

/// Mirror of [`join_right`]: descend the left spine of the taller `r`.
fn join_left(mut l: Link, k: Word, v: Option<Word>, nested: Link, mut r: Link, c: &mut Counters) -> Link {
    if !is_left_heavy(&mut r, &mut l, c) {
        return join_balanced(l, k, v, nested, r);
    }

    let mut n = r.expect("join_left: taller tree cannot be empty");
    n.left = join_left(l, k, v, nested, n.left.take(), c);

    if is_left_heavy(&mut n.left, &mut n.right, c) {
        let single: bool = is_single_rotation(
            n.left.as_mut().expect("join_left: spine child present"),
            true,
            c,
        );
        if single {
            Some(rotate_right(n, c))
        } else {
            Some(double_rotate_right(n, c))
        }
    } else {
        update_height(&mut n, c);
        Some(n)
    }
}

/// Partition `t` into keys `< k` and keys `> k`.
///
/// The middle component is `Some` iff `k` occurred, carrying the value and
/// nested tree that were stored at `k`.
pub fn split(t: Link, k: Word, c: &mut Counters) -> (Link, Option<SplitFound>, Link) {
    let Some(node) = t else {
        return (None, None, None);
    };

    let (m, v, l, r, nested) = expose(node, c);
    match k.cmp(&m) {
        std::cmp::Ordering::Equal => (l, Some(SplitFound { value: v, nested }), r),

        std::cmp::Ordering::Less => {
            let (ll, found, lr) = split(l, k, c);
            let right = join(lr, m, v, nested, r, c);
            (ll, found, right)
        }

        std::cmp::Ordering::Greater => {
            let (rl, found, rr) = split(r, k, c);
            let left = join(l, m, v, nested, rl, c);
            (left, found, rr)
        }
    }
}

/// Peel the maximum entry off `t`, returning the remainder and the entry.
pub fn split_last(t: Box<Node>, c: &mut Counters) -> (Link, Word, Option<Word>, Link) {
    let (m, v, l, r, nested) = expose(t, c);
    match r {
        None => (l, m, v, nested),
        Some(rn) => {
            let (rest, k, kv, knested) = split_last(rn, c);
            (join(l, m, v, nested, rest, c), k, kv, knested)
        }
    }
}

/// Concatenate two ordered trees with no separating pivot.
///
/// The pivot is recovered by peeling the maximum of `l`; `join2(None, r)`
/// degenerates to `r`.
pub fn join2(l: Link, r: Link, c: &mut Counters) -> Link {
    match l {
        None => r,
        Some(ln) => {
            let (rest, k, v, nested) = split_last(ln, c);
            join(rest, k, v, nested, r, c)
        }
    }
}

/// Insert `(k, v)` with a nested tree `nested`, replacing any previous value
/// at `k` and folding a previously nested tree into the new one.
pub fn insert(t: Link, k: Word, v: Option<Word>, nested: Link, c: &mut Counters) -> Link {
    let (l, found, r) = split(t, k, c);
    let old_nested: Link = found.and_then(|f| f.nested);
    let merged: Link = dict::union(nested, dict::node_to_dict(old_nested), c);
    join(l, k, v, merged, r, c)
}

/// Remove `k` (and the nested tree committed under it) if present.
pub fn delete(t: Link, k: Word, c: &mut Counters) -> Link {
    let (l, _found, r) = split(t, k, c);
    join2(l, r, c)
}
