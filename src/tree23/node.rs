//! 2-3 node representation.
//!
//! A node is either a leaf or an internal node. A leaf stores 1 or 2
//! *canonical* key/value pairs (transiently 0 during empty-leaf construction
//! and up to 4 mid-fission, never observable at root handoff) plus the
//! next-key/next-value pair: a copy of the first entry of the successor leaf
//! in the in-order sequence, absent on the rightmost leaf. The next-key is a
//! value, never a pointer - the leaf holds no reference to its neighbour.
//!
//! An internal node owns 2 or 3 children and one separator key between each
//! adjacent pair: `keys[i]` is the minimum of the subtree under
//! `children[i + 1]`, equivalently the exit next-key of `children[i]`.
//! Separators are always supplied explicitly by the caller - they are never
//! derived by peeking into an internal child, whose own last key is a
//! separator of its subtree, not the subtree's exit key.
//!
//! Nodes are born exposed; a pre-existing node becomes exposed the first
//! time a bulk operation reads it. The census of exposed nodes at the end of
//! an operation is exactly the set a Merkleization must re-hash.

use crate::hash::Hash2;
use crate::key::Word;
use crate::stats::Stats;

/// A node of the 2-3 engine.
#[derive(Debug)]
pub enum Node23 {
    /// A leaf holding canonical entries and the chain slot.
    Leaf(LeafNode),
    /// An internal node holding separators and children.
    Internal(InternalNode),
}

/// Leaf payload.
#[derive(Debug)]
pub struct LeafNode {
    pub(crate) keys: Vec<Word>,
    pub(crate) values: Vec<Word>,
    pub(crate) next_key: Option<Word>,
    pub(crate) next_value: Option<Word>,
    pub(crate) exposed: bool,
}

/// Internal-node payload.
#[derive(Debug)]
pub struct InternalNode {
    pub(crate) keys: Vec<Word>,
    pub(crate) children: Vec<Node23>,
    pub(crate) exposed: bool,
}

/// Build a leaf from canonical entries and its chain slot.
pub(crate) fn make_leaf(
    keys: Vec<Word>,
    values: Vec<Word>,
    next_key: Option<Word>,
    next_value: Option<Word>,
    stats: &mut Stats,
) -> Node23 {
    debug_assert_eq!(keys.len(), values.len(), "make_leaf: keys/values cardinality");
    stats.created_count += 1;

    Node23::Leaf(LeafNode {
        keys,
        values,
        next_key,
        next_value,
        exposed: true,
    })
}

/// Build the empty leaf a nil root grows from.
pub(crate) fn make_empty_leaf(stats: &mut Stats) -> Node23 {
    make_leaf(Vec::new(), Vec::new(), None, None, stats)
}

/// Build an internal node from children and their separator keys.
pub(crate) fn make_internal(children: Vec<Node23>, keys: Vec<Word>, stats: &mut Stats) -> Node23 {
    debug_assert!(
        (2..=3).contains(&children.len()),
        "make_internal: {} children",
        children.len()
    );
    debug_assert_eq!(
        keys.len(),
        children.len() - 1,
        "make_internal: separator cardinality"
    );
    stats.created_count += 1;

    Node23::Internal(InternalNode {
        keys,
        children,
        exposed: true,
    })
}

impl Node23 {
    /// Is this a leaf?
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Has this node lost all content?
    ///
    /// A leaf is empty once no canonical keys remain (only the chain slot);
    /// an internal node is empty once it has no children. Empty nodes occur
    /// only mid-delete and are swept by the reshape step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Leaf(l) => l.keys.is_empty(),
            Self::Internal(n) => n.children.is_empty(),
        }
    }

    /// Canonical key count of a leaf, separator count of an internal node.
    #[must_use]
    pub fn key_count(&self) -> usize {
        match self {
            Self::Leaf(l) => l.keys.len(),
            Self::Internal(n) => n.keys.len(),
        }
    }

    /// The canonical keys at this node (not the subtree).
    #[must_use]
    pub fn canonical_keys(&self) -> &[Word] {
        match self {
            Self::Leaf(l) => &l.keys,
            Self::Internal(n) => &n.keys,
        }
    }

    /// First canonical key of the leftmost leaf of this subtree.
    #[must_use]
    pub fn first_leaf_key(&self) -> Option<Word> {
        match self {
            Self::Leaf(l) => l.keys.first().copied(),
            Self::Internal(n) => n.children.first().and_then(Node23::first_leaf_key),
        }
    }

    /// Exit next-key of this subtree: the next-key of its rightmost leaf.
    ///
    /// Equals the first key of the subtree's in-order successor, `None` on
    /// the rightmost spine of the tree.
    #[must_use]
    pub fn exit_key(&self) -> Option<Word> {
        match self {
            Self::Leaf(l) => l.next_key,
            Self::Internal(n) => n.children.last().and_then(Node23::exit_key),
        }
    }

    /// Rewrite the exit next-key of this subtree, descending to the
    /// rightmost leaf.
    ///
    /// Every node on the descent is exposed: the leaf's content changes and
    /// with it the hash of each ancestor on the path.
    pub(crate) fn set_exit_key(&mut self, next_key: Option<Word>, stats: &mut Stats) {
        match self {
            Self::Leaf(l) => {
                l.mark_exposed(stats);
                l.next_key = next_key;
            }
            Self::Internal(n) => {
                n.mark_exposed(stats);
                n.children
                    .last_mut()
                    .expect("set_exit_key: internal node without children")
                    .set_exit_key(next_key, stats);
            }
        }
    }

    /// Structural height: 1 for a leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Internal(n) => {
                1 + n
                    .children
                    .first()
                    .map_or(0, Node23::height)
            }
        }
    }

    /// Node count of this subtree.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Internal(n) => 1 + n.children.iter().map(Node23::size).sum::<usize>(),
        }
    }

    /// Canonical keys of the nodes `level` steps below this one,
    /// left to right.
    #[must_use]
    pub fn keys_by_level(&self, level: usize) -> Vec<Word> {
        if level == 0 {
            return self.canonical_keys().to_vec();
        }
        match self {
            Self::Leaf(_) => Vec::new(),
            Self::Internal(n) => n
                .children
                .iter()
                .flat_map(|child| child.keys_by_level(level - 1))
                .collect(),
        }
    }

    /// Visit every node in post-order.
    pub fn for_each_node_post_order(&self, f: &mut impl FnMut(&Node23)) {
        if let Self::Internal(n) = self {
            for child in &n.children {
                child.for_each_node_post_order(f);
            }
        }
        f(self);
    }

    /// Canonical `(key, value)` pairs of all leaves, left to right.
    #[must_use]
    pub fn leaf_entries(&self) -> Vec<(Word, Word)> {
        let mut entries: Vec<(Word, Word)> = Vec::new();
        self.for_each_node_post_order(&mut |node| {
            if let Self::Leaf(l) = node {
                entries.extend(l.keys.iter().copied().zip(l.values.iter().copied()));
            }
        });
        entries
    }

    /// Per-leaf `(canonical keys, next-key)` pairs, left to right; the raw
    /// material of the leaf-chain coherence check.
    #[must_use]
    pub fn leaf_chain(&self) -> Vec<(Vec<Word>, Option<Word>)> {
        let mut chain: Vec<(Vec<Word>, Option<Word>)> = Vec::new();
        self.for_each_node_post_order(&mut |node| {
            if let Self::Leaf(l) = node {
                chain.push((l.keys.clone(), l.next_key));
            }
        });
        chain
    }

    /// 2-3 structural check: leaves hold 1-2 canonical keys, internal nodes
    /// hold 2-3 children of equal height with one separator per adjacent
    /// pair, recursively.
    #[must_use]
    pub fn is_two_three(&self) -> bool {
        match self {
            Self::Leaf(l) => (1..=2).contains(&l.keys.len()),
            Self::Internal(n) => {
                if !(2..=3).contains(&n.children.len()) || n.keys.len() != n.children.len() - 1 {
                    return false;
                }
                let depth: usize = n.children[0].height();
                n.children
                    .iter()
                    .all(|child| child.height() == depth && child.is_two_three())
            }
        }
    }

    /// Number of combiner invocations this node alone contributes to a root
    /// hash (the fan-in of the hashing contract).
    #[must_use]
    pub fn how_many_hashes(&self) -> u64 {
        match self {
            Self::Leaf(l) => l.fan_in(),
            Self::Internal(n) => n.fan_in(),
        }
    }

    /// Merkleize this subtree with the combiner `H`.
    ///
    /// Leaf of one entry: `H(k, v)`, folded with the next-key when present.
    /// Leaf of two entries: `H(H(k1, v1), H(k2, v2))`, same fold. Internal
    /// nodes combine child digests left to right.
    #[must_use]
    pub fn hash_with<H: Hash2>(&self) -> Vec<u8> {
        match self {
            Self::Leaf(l) => {
                let body: Vec<u8> = match l.keys.len() {
                    1 => H::hash_pair(l.keys[0], l.values[0]),
                    2 => {
                        let h1 = H::hash_pair(l.keys[0], l.values[0]);
                        let h2 = H::hash_pair(l.keys[1], l.values[1]);
                        H::hash2(&h1, &h2)
                    }
                    count => panic!("hash_with: leaf with {count} canonical keys"),
                };
                match l.next_key {
                    None => body,
                    Some(nk) => H::hash_with_word(&body, nk),
                }
            }
            Self::Internal(n) => match n.children.len() {
                2 => H::hash2(&n.children[0].hash_with::<H>(), &n.children[1].hash_with::<H>()),
                3 => {
                    let h01 = H::hash2(
                        &n.children[0].hash_with::<H>(),
                        &n.children[1].hash_with::<H>(),
                    );
                    H::hash2(&h01, &n.children[2].hash_with::<H>())
                }
                count => panic!("hash_with: internal node with {count} children"),
            },
        }
    }

    /// Mark this node exposed, counting the first exposure and the cost of
    /// opening its previous commitment.
    pub(crate) fn mark_exposed(&mut self, stats: &mut Stats) {
        match self {
            Self::Leaf(l) => l.mark_exposed(stats),
            Self::Internal(n) => n.mark_exposed(stats),
        }
    }

    /// Is the exposure flag set?
    #[must_use]
    pub(crate) const fn exposed(&self) -> bool {
        match self {
            Self::Leaf(l) => l.exposed,
            Self::Internal(n) => n.exposed,
        }
    }

    /// Census of exposed nodes ("new hashes") and the cost of re-closing
    /// the commitment over them. Taken before [`Node23::reset`].
    pub(crate) fn collect_closing(&self, stats: &mut Stats) {
        self.for_each_node_post_order(&mut |node| {
            if node.exposed() {
                stats.rehashed_count += 1;
                stats.closing_hashes += node.how_many_hashes();
            }
        });
    }

    /// Clear the exposure flags of the whole subtree.
    pub(crate) fn reset(&mut self) {
        match self {
            Self::Leaf(l) => l.exposed = false,
            Self::Internal(n) => {
                n.exposed = false;
                for child in &mut n.children {
                    child.reset();
                }
            }
        }
    }
}

impl LeafNode {
    /// The canonical keys.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Word] {
        &self.keys
    }

    /// The canonical values.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Word] {
        &self.values
    }

    /// The chain slot's key.
    #[inline]
    #[must_use]
    pub const fn next_key(&self) -> Option<Word> {
        self.next_key
    }

    /// The chain slot's value.
    #[inline]
    #[must_use]
    pub const fn next_value(&self) -> Option<Word> {
        self.next_value
    }

    /// Fan-in of this leaf alone (see [`Node23::how_many_hashes`]).
    pub(crate) fn fan_in(&self) -> u64 {
        match self.keys.len() {
            1 => 1 + u64::from(self.next_key.is_some()),
            2 => 3 + u64::from(self.next_key.is_some()),
            _ => 0,
        }
    }

    /// Mark exposed, counting the first exposure.
    pub(crate) fn mark_exposed(&mut self, stats: &mut Stats) {
        if !self.exposed {
            stats.exposed_count += 1;
            stats.opening_hashes += self.fan_in();
            self.exposed = true;
        }
    }
}

impl InternalNode {
    /// The separator keys.
    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Word] {
        &self.keys
    }

    /// The children.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Node23] {
        &self.children
    }

    /// Fan-in of this node alone (see [`Node23::how_many_hashes`]).
    pub(crate) fn fan_in(&self) -> u64 {
        match self.children.len() {
            2 => 1,
            3 => 2,
            _ => 0,
        }
    }

    /// Mark exposed, counting the first exposure.
    pub(crate) fn mark_exposed(&mut self, stats: &mut Stats) {
        if !self.exposed {
            stats.exposed_count += 1;
            stats.opening_hashes += self.fan_in();
            self.exposed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{make_empty_leaf, make_internal, make_leaf, Node23};
    use crate::hash::{to_hex, Sha256Hash2};
    use crate::stats::Stats;

    fn leaf(keys: &[u64], next: Option<u64>, stats: &mut Stats) -> Node23 {
        make_leaf(keys.to_vec(), keys.to_vec(), next, next, stats)
    }

    /// Leaves [1,2|3] [3,4|5] [5|_] under one root.
    fn small_tree(stats: &mut Stats) -> Node23 {
        let children = vec![
            leaf(&[1, 2], Some(3), stats),
            leaf(&[3, 4], Some(5), stats),
            leaf(&[5], None, stats),
        ];
        make_internal(children, vec![3, 5], stats)
    }

    #[test]
    fn test_builders_and_counts() {
        let mut stats = Stats::default();
        let t = small_tree(&mut stats);
        assert_eq!(stats.created_count, 4);
        assert_eq!(t.height(), 2);
        assert_eq!(t.size(), 4);
        assert!(t.is_two_three());
        assert!(!t.is_empty());
    }

    #[test]
    fn test_empty_leaf_is_empty() {
        let mut stats = Stats::default();
        let l = make_empty_leaf(&mut stats);
        assert!(l.is_empty());
        assert!(l.is_leaf());
        assert_eq!(l.exit_key(), None);
    }

    #[test]
    fn test_keys_by_level() {
        let mut stats = Stats::default();
        let t = small_tree(&mut stats);
        assert_eq!(t.keys_by_level(0), vec![3, 5]);
        assert_eq!(t.keys_by_level(1), vec![1, 2, 3, 4, 5]);
        assert!(t.keys_by_level(2).is_empty());
    }

    #[test]
    fn test_exit_and_first_leaf_key() {
        let mut stats = Stats::default();
        let t = small_tree(&mut stats);
        assert_eq!(t.first_leaf_key(), Some(1));
        assert_eq!(t.exit_key(), None);

        let mut t = t;
        t.reset();
        let mut stats = Stats::default();
        t.set_exit_key(Some(9), &mut stats);
        assert_eq!(t.exit_key(), Some(9));
        // The rewritten leaf and its ancestor are both re-exposed.
        assert_eq!(stats.exposed_count, 2);
    }

    #[test]
    fn test_leaf_chain_and_entries() {
        let mut stats = Stats::default();
        let t = small_tree(&mut stats);
        assert_eq!(
            t.leaf_entries(),
            vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]
        );
        assert_eq!(
            t.leaf_chain(),
            vec![
                (vec![1, 2], Some(3)),
                (vec![3, 4], Some(5)),
                (vec![5], None)
            ]
        );
    }

    #[test]
    fn test_is_two_three_rejects_uneven_depth() {
        let mut stats = Stats::default();
        let shallow = leaf(&[1], Some(3), &mut stats);
        let deep = make_internal(
            vec![leaf(&[3], Some(4), &mut stats), leaf(&[4], None, &mut stats)],
            vec![4],
            &mut stats,
        );
        let lopsided = make_internal(vec![shallow, deep], vec![3], &mut stats);
        assert!(!lopsided.is_two_three());
    }

    #[test]
    fn test_hash_vectors() {
        let mut stats = Stats::default();
        let single = leaf(&[1], None, &mut stats);
        assert_eq!(
            to_hex(&single.hash_with::<Sha256Hash2>()),
            "532deabf88729cb43995ab5a9cd49bf9b90a079904dc0645ecda9e47ce7345a9"
        );

        let double = leaf(&[1, 2], None, &mut stats);
        assert_eq!(
            to_hex(&double.hash_with::<Sha256Hash2>()),
            "d3782c59c224da5b6344108ef3431ba4e01d2c30b6570137a91b8b383908c361"
        );
    }

    #[test]
    fn test_how_many_hashes_fan_in() {
        let mut stats = Stats::default();
        assert_eq!(leaf(&[1], None, &mut stats).how_many_hashes(), 1);
        assert_eq!(leaf(&[1], Some(2), &mut stats).how_many_hashes(), 2);
        assert_eq!(leaf(&[1, 2], None, &mut stats).how_many_hashes(), 3);
        assert_eq!(leaf(&[1, 2], Some(3), &mut stats).how_many_hashes(), 4);
        assert_eq!(small_tree(&mut stats).how_many_hashes(), 2);
    }

    #[test]
    fn test_exposure_marking_and_reset() {
        let mut stats = Stats::default();
        let mut t = small_tree(&mut stats);

        // Fresh nodes are born exposed: the whole tree is a "new hash".
        let mut closing = Stats::default();
        t.collect_closing(&mut closing);
        assert_eq!(closing.rehashed_count, 4);

        t.reset();
        let mut after = Stats::default();
        t.collect_closing(&mut after);
        assert_eq!(after.rehashed_count, 0);

        t.mark_exposed(&mut stats);
        t.mark_exposed(&mut stats);
        assert_eq!(stats.exposed_count, 1);
        assert_eq!(stats.opening_hashes, 2);
    }
}
