//! 2-3 (B+-tree variant) bulk engine over sorted key batches.
//!
//! All entries live in the leaves; leaves sit at uniform depth and form a
//! chain through copied next-keys. Bulk upsert descends with key-range
//! partitioning, fissions overflowing leaves into *fragments* and regroups
//! them bottom-up; [`promote`] stacks leftover fragments into a new root.
//! Bulk delete removes keys, merges height-deficient subtrees sideways and
//! demotes the root when levels fold away.
//!
//! Every operation exposes the nodes it reads. After the operation the tree
//! reports how many nodes a Merkleization would have to re-hash, then clears
//! the flags so the next operation's counters start fresh.

pub(crate) mod delete;
pub mod node;
pub(crate) mod upsert;

use crate::error::{TreeError, TreeResult};
use crate::hash::{Hash2, Sha256Hash2};
use crate::key::{is_strictly_sorted, is_strictly_sorted_by_key, KeyValue, Word};
use crate::stats::Stats;
use crate::tracing_helpers::debug_log;

use node::{make_internal, Node23};

/// The 2-3 tree, owner of the current version's root.
#[derive(Debug, Default)]
pub struct Tree23 {
    root: Option<Node23>,
}

impl Tree23 {
    /// The empty tree.
    #[must_use]
    pub fn empty() -> Self {
        Self { root: None }
    }

    /// Bulk-load a tree from a sorted, duplicate-free batch.
    ///
    /// # Errors
    /// [`TreeError::InvariantViolated`] when the batch is not strictly
    /// ascending by key.
    pub fn new(kv: &[KeyValue]) -> TreeResult<Self> {
        let mut tree = Self::empty();
        let mut stats = Stats::default();
        tree.upsert_with_stats(kv, &mut stats)?;
        Ok(tree)
    }

    /// The root node, when the tree is non-empty.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<&Node23> {
        self.root.as_ref()
    }

    /// Is the tree empty?
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn size(&self) -> usize {
        self.root.as_ref().map_or(0, Node23::size)
    }

    /// Structural height; 0 for the empty tree, 1 for a single leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, Node23::height)
    }

    /// Canonical keys concatenated level by level, root first.
    #[must_use]
    pub fn keys_in_level_order(&self) -> Vec<Word> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        (0..root.height())
            .flat_map(|level| root.keys_by_level(level))
            .collect()
    }

    /// Canonical leaf keys, left to right: the sorted key set of the tree.
    #[must_use]
    pub fn walk_keys_post_order(&self) -> Vec<Word> {
        self.root
            .as_ref()
            .map_or_else(Vec::new, |root| {
                root.leaf_entries().into_iter().map(|(k, _)| k).collect()
            })
    }

    /// Canonical `(key, value)` pairs, left to right.
    #[must_use]
    pub fn entries(&self) -> Vec<(Word, Word)> {
        self.root.as_ref().map_or_else(Vec::new, Node23::leaf_entries)
    }

    /// Does the 2-3 structural invariant hold?
    #[must_use]
    pub fn is_two_three(&self) -> bool {
        self.root.as_ref().map_or(true, Node23::is_two_three)
    }

    /// Check shape and leaf-chain coherence, reporting corruption.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] naming the first violated invariant.
    pub fn validate(&self) -> TreeResult<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };

        if !root.is_two_three() {
            return Err(TreeError::Corrupted("2-3 shape violated".into()));
        }

        let chain: Vec<(Vec<Word>, Option<Word>)> = root.leaf_chain();
        for window in chain.windows(2) {
            let (_, next) = &window[0];
            let (successor_keys, _) = &window[1];
            if *next != successor_keys.first().copied() {
                return Err(TreeError::Corrupted(
                    "leaf chain next-key does not match the successor's first key".into(),
                ));
            }
        }
        if let Some((_, last_next)) = chain.last() {
            if last_next.is_some() {
                return Err(TreeError::Corrupted(
                    "rightmost leaf must have an absent next-key".into(),
                ));
            }
        }

        let keys: Vec<Word> = chain.iter().flat_map(|(k, _)| k.iter().copied()).collect();
        if !is_strictly_sorted(&keys) {
            return Err(TreeError::Corrupted(
                "concatenated leaf keys are not strictly ascending".into(),
            ));
        }
        Ok(())
    }

    /// Merkleize the tree with the test combiner (SHA-256 over 8-byte
    /// big-endian words). Empty digest for the empty tree.
    #[must_use]
    pub fn root_hash(&self) -> Vec<u8> {
        self.root_hash_with::<Sha256Hash2>()
    }

    /// Merkleize the tree with a caller-supplied 2-to-1 combiner.
    #[must_use]
    pub fn root_hash_with<H: Hash2>(&self) -> Vec<u8> {
        self.root
            .as_ref()
            .map_or_else(Vec::new, Node23::hash_with::<H>)
    }

    /// Bulk upsert without counter reporting.
    ///
    /// # Errors
    /// [`TreeError::InvariantViolated`] when the batch is not strictly
    /// ascending by key; the tree is unchanged in that case.
    pub fn upsert(&mut self, kv: &[KeyValue]) -> TreeResult<()> {
        let mut stats = Stats::default();
        self.upsert_with_stats(kv, &mut stats)
    }

    /// Bulk upsert, accumulating observation counters.
    ///
    /// # Errors
    /// [`TreeError::InvariantViolated`] when the batch is not strictly
    /// ascending by key; the tree is unchanged in that case.
    pub fn upsert_with_stats(&mut self, kv: &[KeyValue], stats: &mut Stats) -> TreeResult<()> {
        if !is_strictly_sorted_by_key(kv) {
            return Err(TreeError::InvariantViolated(
                "upsert batch must be sorted ascending without duplicate keys".into(),
            ));
        }
        debug_log!(batch = kv.len(), "bulk upsert");

        let (mut fragments, _new_first_key, intermediate_keys) =
            upsert::upsert(self.root.take(), kv, stats);

        self.root = match fragments.len() {
            0 | 1 => {
                assert!(
                    intermediate_keys.is_empty(),
                    "upsert: the root cannot emit an exit separator"
                );
                fragments.pop()
            }
            _ => Some(promote(fragments, intermediate_keys, stats)),
        };

        self.finalize(stats);
        Ok(())
    }

    /// Bulk delete without counter reporting.
    ///
    /// # Errors
    /// [`TreeError::InvariantViolated`] when the key batch is not strictly
    /// ascending; the tree is unchanged in that case.
    pub fn delete(&mut self, keys: &[Word]) -> TreeResult<()> {
        let mut stats = Stats::default();
        self.delete_with_stats(keys, &mut stats)
    }

    /// Bulk delete, accumulating observation counters.
    ///
    /// # Errors
    /// [`TreeError::InvariantViolated`] when the key batch is not strictly
    /// ascending; the tree is unchanged in that case.
    pub fn delete_with_stats(&mut self, keys: &[Word], stats: &mut Stats) -> TreeResult<()> {
        if !is_strictly_sorted(keys) {
            return Err(TreeError::InvariantViolated(
                "delete batch must be sorted ascending without duplicate keys".into(),
            ));
        }
        debug_log!(batch = keys.len(), "bulk delete");

        if let Some(mut root) = self.root.take() {
            let (update, intermediate_keys) = delete::delete(&mut root, keys, stats);
            assert!(
                intermediate_keys.is_empty(),
                "delete: the root cannot emit an exit separator"
            );
            let (new_root, _next_key) = delete::demote(Some(root), update.into_key(), stats);
            self.root = new_root;
        }

        self.finalize(stats);
        Ok(())
    }

    /// Clear all exposure flags so the next operation's counters are
    /// meaningful.
    pub fn reset(&mut self) {
        if let Some(root) = self.root.as_mut() {
            root.reset();
        }
    }

    /// Take the end-of-operation census, then reset the flags.
    fn finalize(&mut self, stats: &mut Stats) {
        if let Some(root) = &self.root {
            root.collect_closing(stats);
        }
        self.reset();
    }
}

/// Stack fragments into a single root, adding internal levels as needed.
///
/// Fragments are grouped into 2- or 3-child internal nodes: each pair
/// consumes its within-group separator, each group boundary promotes one
/// separator to the next level up.
pub(crate) fn promote(mut nodes: Vec<Node23>, mut keys: Vec<Word>, stats: &mut Stats) -> Node23 {
    debug_assert!(nodes.len() >= 2, "promote: nothing to promote");
    assert_eq!(
        keys.len(),
        nodes.len() - 1,
        "promote: one separator per fragment boundary"
    );

    let mut upper_nodes: Vec<Node23> = Vec::new();
    let mut upper_keys: Vec<Word> = Vec::new();

    while nodes.len() > 3 {
        let group: Vec<Node23> = nodes.drain(..2).collect();
        let within: Word = keys.remove(0);
        upper_nodes.push(make_internal(group, vec![within], stats));
        upper_keys.push(keys.remove(0));
    }
    let group_keys: Vec<Word> = std::mem::take(&mut keys);
    upper_nodes.push(make_internal(nodes, group_keys, stats));

    if upper_nodes.len() == 1 {
        upper_nodes.pop().expect("single promoted root")
    } else {
        promote(upper_nodes, upper_keys, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::Tree23;
    use crate::error::TreeError;
    use crate::key::KeyValue;
    use crate::stats::Stats;

    fn kv(keys: &[u64]) -> Vec<KeyValue> {
        keys.iter().map(|&k| KeyValue::new(k, k)).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree23::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.size(), 0);
        assert!(tree.keys_in_level_order().is_empty());
        assert!(tree.root_hash().is_empty());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_bulk_load_five_keys() {
        let tree = Tree23::new(&kv(&[1, 2, 3, 4, 5])).unwrap();
        assert_eq!(tree.height(), 2);
        assert_eq!(tree.keys_in_level_order(), vec![3, 5, 1, 2, 3, 4, 5]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_unsorted_batch_is_rejected_without_mutation() {
        let mut tree = Tree23::new(&kv(&[1, 2, 3])).unwrap();
        let before = tree.keys_in_level_order();

        let err = tree.upsert(&kv(&[9, 4])).unwrap_err();
        assert!(matches!(err, TreeError::InvariantViolated(_)));
        assert_eq!(tree.keys_in_level_order(), before);

        let err = tree.delete(&[5, 5]).unwrap_err();
        assert!(matches!(err, TreeError::InvariantViolated(_)));
        assert_eq!(tree.keys_in_level_order(), before);
    }

    #[test]
    fn test_upsert_then_delete_round() {
        let mut tree = Tree23::new(&kv(&[10, 15, 20])).unwrap();
        tree.upsert(&kv(&[12, 18])).unwrap();
        assert_eq!(tree.walk_keys_post_order(), vec![10, 12, 15, 18, 20]);

        tree.delete(&[12, 15]).unwrap();
        assert_eq!(tree.walk_keys_post_order(), vec![10, 18, 20]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_counters_on_fresh_load() {
        let mut tree = Tree23::empty();
        let mut stats = Stats::default();
        tree.upsert_with_stats(&kv(&[1, 2, 3, 4, 5]), &mut stats)
            .unwrap();

        // Nothing pre-existed: no exposures, everything created and
        // re-hashed. Three leaves plus one internal root.
        assert_eq!(stats.exposed_count, 0);
        assert_eq!(stats.created_count, 4);
        assert_eq!(stats.rehashed_count, 4);
        assert_eq!(stats.updated_count, 0);
        assert!(stats.closing_hashes > 0);
    }

    #[test]
    fn test_counters_reset_between_operations() {
        let mut tree = Tree23::new(&kv(&[1, 2, 3, 4, 5])).unwrap();

        let mut stats = Stats::default();
        tree.upsert_with_stats(&kv(&[6]), &mut stats).unwrap();

        // The touched path is the root and the rightmost leaf.
        assert_eq!(stats.exposed_count, 2);
        assert_eq!(stats.created_count, 0);
        assert_eq!(stats.rehashed_count, 2);
    }

    #[test]
    fn test_value_update_counts() {
        let mut tree = Tree23::new(&kv(&[10, 20])).unwrap();
        let mut stats = Stats::default();
        tree.upsert_with_stats(&[KeyValue::new(10, 99)], &mut stats)
            .unwrap();
        assert_eq!(stats.updated_count, 1);
        assert_eq!(tree.entries(), vec![(10, 99), (20, 20)]);
    }
}
