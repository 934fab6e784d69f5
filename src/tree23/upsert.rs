//! Bulk upsert over the 2-3 tree.
//!
//! `upsert` returns one or more *fragments* - subtrees at the same height as
//! its input, several when fission split it - together with the subtree's
//! possibly-changed first key and the *intermediate keys*: the separators the
//! parent needs between consecutive fragments and after the last one.
//!
//! The empty-batch paths are load-bearing: a child receiving no items still
//! reports its exit next-key, so the parent can rebuild its separator array
//! without re-deriving it from the children.

use crate::key::{KeyValue, Word};
use crate::stats::Stats;
use crate::tracing_helpers::trace_log;

use super::node::{make_empty_leaf, make_internal, make_leaf, InternalNode, LeafNode, Node23};

/// Result of a recursive upsert step: `(fragments, new_first_key,
/// intermediate_keys)`.
pub(crate) type UpsertOutcome = (Vec<Node23>, Option<Word>, Vec<Word>);

/// Upsert `kv` (sorted, duplicate-free) into the subtree `n`.
///
/// A `None` subtree grows from a fresh empty leaf; a `None` subtree with an
/// empty batch stays empty (no fragments).
pub(crate) fn upsert(n: Option<Node23>, kv: &[KeyValue], stats: &mut Stats) -> UpsertOutcome {
    debug_assert!(
        crate::key::is_strictly_sorted_by_key(kv),
        "upsert: batch not sorted"
    );

    let node: Node23 = match n {
        Some(node) => node,
        None => {
            if kv.is_empty() {
                return (Vec::new(), None, Vec::new());
            }
            make_empty_leaf(stats)
        }
    };

    match node {
        Node23::Leaf(leaf) => upsert_leaf(leaf, kv, stats),
        Node23::Internal(internal) => upsert_internal(internal, kv, stats),
    }
}

/// Merge a batch into a leaf, splitting it into 3-key groups when the merge
/// overflows the canonical capacity.
fn upsert_leaf(mut leaf: LeafNode, kv: &[KeyValue], stats: &mut Stats) -> UpsertOutcome {
    if kv.is_empty() {
        let intermediate: Vec<Word> = leaf.next_key.into_iter().collect();
        return (vec![Node23::Leaf(leaf)], None, intermediate);
    }

    leaf.mark_exposed(stats);

    let old_first: Option<Word> = leaf.keys.first().copied();
    merge_into_leaf(&mut leaf, kv, stats);
    let first: Word = *leaf.keys.first().expect("merged leaf cannot be empty");
    let new_first_key: Option<Word> = (Some(first) != old_first).then_some(first);

    let mut fragments: Vec<Node23> = Vec::new();
    let mut intermediate_keys: Vec<Word> = Vec::new();

    // Fission: peel two canonical keys at a time; the key after each peeled
    // pair becomes both the fresh leaf's next-key and a separator.
    while leaf.keys.len() > 2 {
        let keys: Vec<Word> = leaf.keys.drain(..2).collect();
        let values: Vec<Word> = leaf.values.drain(..2).collect();
        let next_key: Word = leaf.keys[0];
        let next_value: Word = leaf.values[0];
        trace_log!(next_key, "leaf fission");
        intermediate_keys.push(next_key);
        fragments.push(make_leaf(keys, values, Some(next_key), Some(next_value), stats));
    }

    if let Some(exit) = leaf.next_key {
        intermediate_keys.push(exit);
    }
    fragments.push(Node23::Leaf(leaf));

    (fragments, new_first_key, intermediate_keys)
}

/// Sorted merge of the batch into the canonical entries, replacing values on
/// equal keys.
fn merge_into_leaf(leaf: &mut LeafNode, kv: &[KeyValue], stats: &mut Stats) {
    let old_keys: Vec<Word> = std::mem::take(&mut leaf.keys);
    let old_values: Vec<Word> = std::mem::take(&mut leaf.values);

    let mut keys: Vec<Word> = Vec::with_capacity(old_keys.len() + kv.len());
    let mut values: Vec<Word> = Vec::with_capacity(old_values.len() + kv.len());

    let mut i: usize = 0;
    for item in kv {
        while i < old_keys.len() && old_keys[i] < item.key {
            keys.push(old_keys[i]);
            values.push(old_values[i]);
            i += 1;
        }
        if i < old_keys.len() && old_keys[i] == item.key {
            i += 1;
            stats.updated_count += 1;
        }
        keys.push(item.key);
        values.push(item.value);
    }
    while i < old_keys.len() {
        keys.push(old_keys[i]);
        values.push(old_values[i]);
        i += 1;
    }

    leaf.keys = keys;
    leaf.values = values;
}

/// Partition a sorted batch by the separator keys: items `< keys[0]`, then
/// `[keys[0], keys[1])`, ..., then `>= keys[last]`. One subset per child.
pub(crate) fn split_items<'a>(separators: &[Word], mut kv: &'a [KeyValue]) -> Vec<&'a [KeyValue]> {
    let mut subsets: Vec<&'a [KeyValue]> = Vec::with_capacity(separators.len() + 1);
    for &key in separators {
        let split: usize = kv.partition_point(|item| item.key < key);
        subsets.push(&kv[..split]);
        kv = &kv[split..];
    }
    subsets.push(kv);
    subsets
}

/// Recursive upsert through an internal node, regrouping the children's
/// fragments.
fn upsert_internal(mut n: InternalNode, kv: &[KeyValue], stats: &mut Stats) -> UpsertOutcome {
    if kv.is_empty() {
        let exit: Option<Word> = n
            .children
            .last()
            .expect("internal node has children")
            .exit_key();
        return (
            vec![Node23::Internal(n)],
            None,
            exit.into_iter().collect(),
        );
    }

    n.mark_exposed(stats);

    let subsets: Vec<&[KeyValue]> = split_items(&n.keys, kv);
    debug_assert_eq!(subsets.len(), n.children.len(), "upsert: subset per child");

    let mut old_children: Vec<Node23> = std::mem::take(&mut n.children);
    let mut rev_children: Vec<Node23> = Vec::new();
    let mut rev_keys: Vec<Word> = Vec::new();
    let mut new_first_key: Option<Word> = None;

    // Right to left, so a changed first key can be written into the
    // preceding (not yet visited) child's rightmost leaf.
    for i in (0..old_children.len()).rev() {
        let child: Node23 = old_children.pop().expect("child present");
        let (fragments, child_new_first, child_intermediate) = upsert(Some(child), subsets[i], stats);

        rev_children.extend(fragments.into_iter().rev());
        rev_keys.extend(child_intermediate.into_iter().rev());

        if let Some(first) = child_new_first {
            if i > 0 {
                old_children
                    .last_mut()
                    .expect("preceding child present")
                    .set_exit_key(Some(first), stats);
            } else {
                new_first_key = Some(first);
            }
        }
    }

    rev_children.reverse();
    rev_keys.reverse();
    let mut children: Vec<Node23> = rev_children;
    let mut keys: Vec<Word> = rev_keys;
    let child_count: usize = children.len();

    if child_count > 3 {
        // Separator bookkeeping must line up with the fragment count, or
        // downstream hashing would silently diverge.
        assert!(
            keys.len() >= child_count - 1
                || (child_count % 2 == 0 && !keys.is_empty() && child_count % keys.len() == 0),
            "upsert: {child_count} fragments with {} separator keys",
            keys.len()
        );

        // With one key per fragment boundary, every other key separates the
        // emitted groups; with half as many, every key is within-group.
        let has_intermediate_keys: bool =
            keys.len() == child_count - 1 || keys.len() == child_count;

        let mut fragments: Vec<Node23> = Vec::new();
        let mut intermediate_keys: Vec<Word> = Vec::new();

        while children.len() > 3 {
            let group: Vec<Node23> = children.drain(..2).collect();
            let within: Word = keys.remove(0);
            fragments.push(make_internal(group, vec![within], stats));
            if has_intermediate_keys {
                intermediate_keys.push(keys.remove(0));
            }
        }

        match children.len() {
            2 => {
                let within: Word = keys.remove(0);
                fragments.push(make_internal(children, vec![within], stats));
                intermediate_keys.extend(keys);
            }
            3 => {
                let first: Word = keys.remove(0);
                let second: Word = keys.remove(0);
                fragments.push(make_internal(children, vec![first, second], stats));
                intermediate_keys.extend(keys);
            }
            count => unreachable!("upsert: remainder group of {count}"),
        }

        (fragments, new_first_key, intermediate_keys)
    } else {
        let mut intermediate_keys: Vec<Word> = Vec::new();
        if keys.len() == child_count {
            let exit: Word = keys.pop().expect("separator present");
            intermediate_keys.push(exit);
        }
        assert_eq!(
            keys.len(),
            child_count - 1,
            "upsert: separator count must be one less than the child count"
        );

        n.children = children;
        n.keys = keys;
        (vec![Node23::Internal(n)], new_first_key, intermediate_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::{split_items, upsert};
    use crate::key::KeyValue;
    use crate::stats::Stats;

    fn kv(keys: &[u64]) -> Vec<KeyValue> {
        keys.iter().map(|&k| KeyValue::new(k, k)).collect()
    }

    #[test]
    fn test_upsert_nil_with_empty_batch() {
        let mut stats = Stats::default();
        let (fragments, first, intermediate) = upsert(None, &[], &mut stats);
        assert!(fragments.is_empty());
        assert!(first.is_none());
        assert!(intermediate.is_empty());
    }

    #[test]
    fn test_upsert_nil_grows_single_leaf() {
        let mut stats = Stats::default();
        let (mut fragments, first, intermediate) = upsert(None, &kv(&[4, 9]), &mut stats);
        assert_eq!(fragments.len(), 1);
        assert_eq!(first, Some(4));
        assert!(intermediate.is_empty());

        let root = fragments.pop().unwrap();
        assert_eq!(root.leaf_chain(), vec![(vec![4, 9], None)]);
    }

    #[test]
    fn test_upsert_leaf_fission_five_keys() {
        let mut stats = Stats::default();
        let (fragments, _, intermediate) = upsert(None, &kv(&[1, 2, 3, 4, 5]), &mut stats);

        let chains: Vec<_> = fragments.iter().flat_map(|f| f.leaf_chain()).collect();
        assert_eq!(
            chains,
            vec![
                (vec![1, 2], Some(3)),
                (vec![3, 4], Some(5)),
                (vec![5], None)
            ]
        );
        assert_eq!(intermediate, vec![3, 5]);
    }

    #[test]
    fn test_upsert_replaces_values_and_counts_updates() {
        let mut stats = Stats::default();
        let (fragments, ..) = upsert(None, &kv(&[10, 20]), &mut stats);
        let root = fragments.into_iter().next().unwrap();

        let mut stats = Stats::default();
        let batch = [KeyValue::new(10, 100), KeyValue::new(20, 200)];
        let (fragments, first, _) = upsert(Some(root), &batch, &mut stats);
        assert_eq!(stats.updated_count, 2);
        assert!(first.is_none());

        let root = fragments.into_iter().next().unwrap();
        assert_eq!(root.leaf_entries(), vec![(10, 100), (20, 200)]);
    }

    #[test]
    fn test_upsert_reports_changed_first_key() {
        let mut stats = Stats::default();
        let (fragments, ..) = upsert(None, &kv(&[5, 9]), &mut stats);
        let root = fragments.into_iter().next().unwrap();

        let (_, first, _) = upsert(Some(root), &kv(&[2]), &mut stats);
        assert_eq!(first, Some(2));
    }

    #[test]
    fn test_split_items_partitions_at_separators() {
        let items = kv(&[1, 3, 5, 7, 9]);
        let subsets = split_items(&[4, 8], &items);
        assert_eq!(subsets.len(), 3);
        assert_eq!(subsets[0], &items[..2]);
        assert_eq!(subsets[1], &items[2..4]);
        assert_eq!(subsets[2], &items[4..]);
    }

    #[test]
    fn test_split_items_separator_key_goes_right() {
        let items = kv(&[4]);
        let subsets = split_items(&[4], &items);
        assert!(subsets[0].is_empty());
        assert_eq!(subsets[1], &items[..]);
    }
}
