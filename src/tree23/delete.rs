//! Bulk delete over the 2-3 tree.
//!
//! `delete` mutates the subtree in place and reports two things upward: a
//! next-key update for the left neighbour's chain slot, and the subtree's
//! exit separator (mirroring the upsert contract). The update channel
//! distinguishes "unchanged" from "set to absent", so a fully emptied right
//! flank correctly clears the chain slot of whatever survives to its left.
//!
//! Children are visited right to left. A child whose subtree first key
//! changed (or that emptied) stamps the new value into the preceding child's
//! rightmost leaf *before* any structural fix-up, so merges always see a
//! current chain. A child that lost height - its reshape kept a single
//! survivor - is merged into a sibling: [`merge_right_to_left`] grafts it
//! onto the right edge of the preceding child, [`merge_left_to_right`] onto
//! the left edge of the nearest surviving successor. Grafting descends to
//! the matching depth and resolves overflow by splitting on the way back up;
//! the split partner takes the slot vacated by the merged-away child, so the
//! parent never exceeds three children.

use crate::key::Word;
use crate::stats::Stats;
use crate::tracing_helpers::trace_log;

use super::node::{make_internal, make_leaf, InternalNode, LeafNode, Node23};

/// Chain-slot signal a delete step sends to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NextKeyUpdate {
    /// The subtree's first key is what it was.
    Unchanged,
    /// The subtree's first key changed (or the subtree emptied): the left
    /// neighbour's chain slot must become this value.
    Set(Option<Word>),
}

impl NextKeyUpdate {
    /// The propagated key, if any.
    pub(crate) fn into_key(self) -> Option<Word> {
        match self {
            Self::Unchanged => None,
            Self::Set(key) => key,
        }
    }
}

/// Result of a recursive delete step: the chain signal and the subtree's
/// exit separator (empty when the subtree died or is the rightmost).
pub(crate) type DeleteOutcome = (NextKeyUpdate, Vec<Word>);

/// Delete `keys_to_delete` (sorted, duplicate-free) from the subtree.
///
/// The node is left empty (no canonical keys / no children) when everything
/// under it was removed; the caller sweeps empty children during reshape.
pub(crate) fn delete(node: &mut Node23, keys_to_delete: &[Word], stats: &mut Stats) -> DeleteOutcome {
    debug_assert!(
        crate::key::is_strictly_sorted(keys_to_delete),
        "delete: batch not sorted"
    );

    if keys_to_delete.is_empty() {
        // Untouched subtrees still report their exit separator, so parents
        // can rebuild separator arrays without re-deriving them.
        return (NextKeyUpdate::Unchanged, node.exit_key().into_iter().collect());
    }

    match node {
        Node23::Leaf(leaf) => delete_leaf(leaf, keys_to_delete, stats),
        Node23::Internal(_) => delete_internal(node, keys_to_delete, stats),
    }
}

/// Remove matching canonical keys from a leaf.
fn delete_leaf(leaf: &mut LeafNode, keys_to_delete: &[Word], stats: &mut Stats) -> DeleteOutcome {
    leaf.mark_exposed(stats);

    let old_first: Option<Word> = leaf.keys.first().copied();
    let mut kept_keys: Vec<Word> = Vec::with_capacity(leaf.keys.len());
    let mut kept_values: Vec<Word> = Vec::with_capacity(leaf.values.len());

    for (&key, &value) in leaf.keys.iter().zip(leaf.values.iter()) {
        if keys_to_delete.binary_search(&key).is_ok() {
            stats.deleted_count += 1;
        } else {
            kept_keys.push(key);
            kept_values.push(value);
        }
    }
    leaf.keys = kept_keys;
    leaf.values = kept_values;

    if leaf.keys.is_empty() {
        // The leaf dies; its chain slot is what the left neighbour must now
        // point at (possibly absent, when this was the rightmost leaf).
        return (NextKeyUpdate::Set(leaf.next_key), Vec::new());
    }

    let exit: Vec<Word> = leaf.next_key.into_iter().collect();
    let first: Word = leaf.keys[0];
    if Some(first) == old_first {
        (NextKeyUpdate::Unchanged, exit)
    } else {
        (NextKeyUpdate::Set(Some(first)), exit)
    }
}

/// Partition a sorted key batch by the separator keys, one subset per child.
pub(crate) fn split_keys<'a>(separators: &[Word], mut keys: &'a [Word]) -> Vec<&'a [Word]> {
    let mut subsets: Vec<&'a [Word]> = Vec::with_capacity(separators.len() + 1);
    for &separator in separators {
        let split: usize = keys.partition_point(|&k| k < separator);
        subsets.push(&keys[..split]);
        keys = &keys[split..];
    }
    subsets.push(keys);
    subsets
}

/// Recursive delete through an internal node.
fn delete_internal(node: &mut Node23, keys_to_delete: &[Word], stats: &mut Stats) -> DeleteOutcome {
    let Node23::Internal(n) = node else {
        unreachable!("delete_internal: dispatched on a leaf")
    };
    n.mark_exposed(stats);

    let child_height: usize = n.children[0].height();
    let subsets: Vec<&[Word]> = split_keys(&n.keys, keys_to_delete);
    debug_assert_eq!(subsets.len(), n.children.len(), "delete: subset per child");

    let original_count: usize = n.children.len();
    let mut bubbled: NextKeyUpdate = NextKeyUpdate::Unchanged;

    for i in (0..original_count).rev() {
        let (update, _child_exit) = delete(&mut n.children[i], subsets[i], stats);

        // Chain propagation first, while the preceding child's rightmost
        // leaf is still the boundary leaf.
        if let NextKeyUpdate::Set(next) = update {
            if i > 0 {
                n.children[i - 1].set_exit_key(next, stats);
            } else {
                bubbled = update;
            }
        }

        // A surviving child that lost height is rebalanced into a sibling.
        if !n.children[i].is_empty() && n.children[i].height() < child_height {
            if i > 0 {
                merge_right_to_left(n, i, stats);
            } else {
                merge_left_to_right(n, stats);
            }
        }
    }

    // Reshape: drop emptied children.
    n.children.retain(|child| !child.is_empty());

    match n.children.len() {
        0 => {
            n.keys.clear();
            (bubbled, Vec::new())
        }
        1 => {
            // Single survivor: this level disappears and the parent sees a
            // shorter subtree to merge sideways.
            let only: Node23 = n.children.pop().expect("single survivor");
            n.keys.clear();
            *node = only;
            let exit: Vec<Word> = node.exit_key().into_iter().collect();
            (bubbled, exit)
        }
        count => {
            // Separators come back off the leaf chain: keys[i] is the exit
            // next-key of children[i].
            n.keys = n.children[..count - 1]
                .iter()
                .map(|child| {
                    child
                        .exit_key()
                        .expect("interior child must carry an exit separator")
                })
                .collect();
            let exit: Vec<Word> = n.children[count - 1].exit_key().into_iter().collect();
            (bubbled, exit)
        }
    }
}

fn empty_shell() -> Node23 {
    Node23::Internal(InternalNode {
        keys: Vec::new(),
        children: Vec::new(),
        exposed: true,
    })
}

/// Merge the height-deficient child at `i` into the preceding sibling.
fn merge_right_to_left(n: &mut InternalNode, i: usize, stats: &mut Stats) {
    trace_log!(index = i, "merging deficient child into left sibling");
    let short: Node23 = std::mem::replace(&mut n.children[i], empty_shell());
    if let Some(extra) = graft_right(&mut n.children[i - 1], short, stats) {
        n.children.insert(i, extra);
    }
}

/// Merge the height-deficient leftmost child into the nearest surviving
/// successor. With no survivor to the right the child stays put; the reshape
/// then keeps it as the single survivor and the level collapses.
fn merge_left_to_right(n: &mut InternalNode, stats: &mut Stats) {
    let Some(j) = (1..n.children.len()).find(|&j| !n.children[j].is_empty()) else {
        return;
    };
    trace_log!(target = j, "merging deficient first child into right sibling");
    let short: Node23 = std::mem::replace(&mut n.children[0], empty_shell());
    if let Some(extra) = graft_left(&mut n.children[j], short, stats) {
        n.children.insert(j + 1, extra);
    }
}

/// Graft `short` onto the right edge of `target`, at the depth where the
/// heights meet. Overflow splits on the way back up; a split of `target`
/// itself is returned for the caller to place as a new right sibling.
fn graft_right(target: &mut Node23, short: Node23, stats: &mut Stats) -> Option<Node23> {
    let gap: usize = target.height() - short.height();
    debug_assert!(gap >= 1, "graft_right: target must be taller");
    let Node23::Internal(t) = target else {
        unreachable!("graft_right: cannot graft into a leaf")
    };
    t.mark_exposed(stats);

    if gap == 1 {
        let separator: Word = short
            .first_leaf_key()
            .expect("graft_right: grafted subtree is non-empty");
        t.keys.push(separator);
        t.children.push(short);
    } else {
        let last: &mut Node23 = t.children.last_mut().expect("internal node has children");
        if let Some(extra) = graft_right(last, short, stats) {
            let separator: Word = extra
                .first_leaf_key()
                .expect("graft_right: split node is non-empty");
            t.keys.push(separator);
            t.children.push(extra);
        }
    }

    split_overflow(t, stats)
}

/// Mirror of [`graft_right`]: graft onto the left edge of `target`.
fn graft_left(target: &mut Node23, short: Node23, stats: &mut Stats) -> Option<Node23> {
    let gap: usize = target.height() - short.height();
    debug_assert!(gap >= 1, "graft_left: target must be taller");
    let Node23::Internal(t) = target else {
        unreachable!("graft_left: cannot graft into a leaf")
    };
    t.mark_exposed(stats);

    if gap == 1 {
        let separator: Word = t.children[0]
            .first_leaf_key()
            .expect("graft_left: sibling subtree is non-empty");
        t.keys.insert(0, separator);
        t.children.insert(0, short);
    } else {
        let first: &mut Node23 = t.children.first_mut().expect("internal node has children");
        if let Some(extra) = graft_left(first, short, stats) {
            let separator: Word = extra
                .first_leaf_key()
                .expect("graft_left: split node is non-empty");
            t.keys.insert(0, separator);
            t.children.insert(1, extra);
        }
    }

    split_overflow(t, stats)
}

/// Split a 4-child node into two 2-child nodes, keeping the left pair in
/// place and returning the right pair. The separator between the pairs is
/// recomputed by the caller from the split node's leftmost leaf.
fn split_overflow(t: &mut InternalNode, stats: &mut Stats) -> Option<Node23> {
    if t.children.len() <= 3 {
        return None;
    }
    debug_assert_eq!(t.children.len(), 4, "split_overflow: at most one extra child");

    let right_children: Vec<Node23> = t.children.split_off(2);
    let mut right_keys: Vec<Word> = t.keys.split_off(1);
    right_keys.remove(0);
    Some(make_internal(right_children, right_keys, stats))
}

/// Root-level reducer applied after a delete.
///
/// Collapses a childless or single-child root and fuses a root of exactly
/// two single-entry leaves into one leaf. The fusion is part of the normal
/// form: equal content yields equal shape, so root hashes stay comparable.
pub(crate) fn demote(
    node: Option<Node23>,
    next_key: Option<Word>,
    stats: &mut Stats,
) -> (Option<Node23>, Option<Word>) {
    let Some(node) = node else {
        return (None, next_key);
    };

    match node {
        Node23::Leaf(leaf) => {
            if leaf.keys.is_empty() {
                (None, next_key)
            } else {
                (Some(Node23::Leaf(leaf)), next_key)
            }
        }
        Node23::Internal(mut n) => match n.children.len() {
            0 => (None, next_key),
            1 => (Some(n.children.pop().expect("single child")), next_key),
            2 => {
                let fusable: bool = matches!(
                    (&n.children[0], &n.children[1]),
                    (Node23::Leaf(a), Node23::Leaf(b)) if a.keys.len() == 1 && b.keys.len() == 1
                );
                if fusable {
                    let Some(Node23::Leaf(right)) = n.children.pop() else {
                        unreachable!("checked leaf")
                    };
                    let Some(Node23::Leaf(left)) = n.children.pop() else {
                        unreachable!("checked leaf")
                    };
                    let fused = make_leaf(
                        vec![left.keys[0], right.keys[0]],
                        vec![left.values[0], right.values[0]],
                        right.next_key,
                        right.next_value,
                        stats,
                    );
                    (Some(fused), next_key)
                } else {
                    (Some(Node23::Internal(n)), next_key)
                }
            }
            _ => (Some(Node23::Internal(n)), next_key),
        },
    }
}
