//! Dictionary side-channel variant of the AVL engine.
//!
//! A [`Dict`] describes a batch of pending modifications as a tree shaped
//! like the state itself: alongside `left`/`right` it carries two channels,
//! `upserts` and `deletes`, each a dictionary over the *nested* tree at this
//! key. Folding a dictionary into a state tree performs a hierarchical merge
//! in one pass: at every pivot the nested tree becomes
//! `union(difference(nested, deletes), upserts)`.

use crate::key::Word;
use crate::stats::Counters;

use super::join::{join, join2, split};
use super::node::{Link, Node};

/// An owned, possibly empty dictionary tree.
pub type DictLink = Option<Box<Dict>>;

/// A node of a state-change dictionary.
///
/// Exactly one of `upserts`, `deletes` or a direct `value` is meaningful per
/// node; the other slots are `None`.
#[derive(Debug)]
pub struct Dict {
    pub(crate) key: Word,
    pub(crate) value: Option<Word>,
    pub(crate) height: u64,
    pub(crate) left: DictLink,
    pub(crate) right: DictLink,
    pub(crate) upserts: DictLink,
    pub(crate) deletes: DictLink,
}

impl Dict {
    /// Build a dictionary node over two subtrees and two change channels.
    #[must_use]
    pub fn new(
        key: Word,
        value: Option<Word>,
        left: DictLink,
        right: DictLink,
        upserts: DictLink,
        deletes: DictLink,
    ) -> Box<Self> {
        let height: u64 = 1 + height_dict(&left).max(height_dict(&right));

        Box::new(Self {
            key,
            value,
            height,
            left,
            right,
            upserts,
            deletes,
        })
    }

    /// Build a childless dictionary node.
    #[must_use]
    pub fn leaf(key: Word, value: Option<Word>) -> Box<Self> {
        Self::new(key, value, None, None, None, None)
    }

    /// The node's key.
    #[inline]
    #[must_use]
    pub const fn key(&self) -> Word {
        self.key
    }

    /// The node's value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> Option<Word> {
        self.value
    }

    /// The pending upserts for the nested tree at this key.
    #[inline]
    #[must_use]
    pub const fn upserts(&self) -> &DictLink {
        &self.upserts
    }

    /// The pending deletes for the nested tree at this key.
    #[inline]
    #[must_use]
    pub const fn deletes(&self) -> &DictLink {
        &self.deletes
    }
}

/// Stored height of a dictionary tree, `0` for the empty one.
#[inline]
#[must_use]
fn height_dict(d: &DictLink) -> u64 {
    d.as_ref().map_or(0, |n| n.height)
}

/// Keys of the dictionary in ascending order (current level only).
#[must_use]
pub fn dict_keys_in_order(d: &DictLink) -> Vec<Word> {
    fn walk(d: &DictLink, out: &mut Vec<Word>) {
        if let Some(n) = d {
            walk(&n.left, out);
            out.push(n.key);
            walk(&n.right, out);
        }
    }

    let mut keys: Vec<Word> = Vec::new();
    walk(d, &mut keys);
    keys
}

/// Total node count, change channels included.
#[must_use]
pub fn dict_size(d: &DictLink) -> usize {
    match d {
        None => 0,
        Some(n) => {
            1 + dict_size(&n.left)
                + dict_size(&n.right)
                + dict_size(&n.upserts)
                + dict_size(&n.deletes)
        }
    }
}

/// Forget the change channels and view a dictionary as a plain tree.
#[must_use]
pub fn dict_to_node(d: DictLink) -> Link {
    d.map(|boxed| {
        let d = *boxed;
        Node::new(
            d.key,
            d.value,
            dict_to_node(d.left),
            dict_to_node(d.right),
            None,
        )
    })
}

/// View a tree as a dictionary of pure upserts: each node's nested tree
/// becomes its `upserts` channel.
#[must_use]
pub fn node_to_dict(t: Link) -> DictLink {
    t.map(|boxed| {
        let n = *boxed;
        Dict::new(
            n.key,
            n.value,
            node_to_dict(n.left),
            node_to_dict(n.right),
            node_to_dict(n.nested),
            None,
        )
    })
}

/// Join that folds a dictionary's change channels into the pivot's nested
/// tree: `N = union(difference(nested, deletes), upserts)`.
pub fn join_with_dicts(
    k: Word,
    v: Option<Word>,
    upserts: DictLink,
    deletes: DictLink,
    l: Link,
    r: Link,
    nested: Link,
    c: &mut Counters,
) -> Link {
    let folded: Link = union(difference(nested, deletes, c), upserts, c);
    join(l, k, v, folded, r, c)
}

/// Apply a dictionary to a state tree: the union of key sets, with the
/// dictionary winning value collisions and its change channels folded into
/// the nested trees.
pub fn union(t: Link, d: DictLink, c: &mut Counters) -> Link {
    match (t, d) {
        (t, None) => t,

        (None, d) => dict_to_node(d),

        (t @ Some(_), Some(boxed)) => {
            let d = *boxed;
            let (tl, found, tr) = split(t, d.key, c);
            let l: Link = union(tl, d.left, c);
            let r: Link = union(tr, d.right, c);
            let nested: Link = found.and_then(|f| f.nested);
            join_with_dicts(d.key, d.value, d.upserts, d.deletes, l, r, nested, c)
        }
    }
}

/// Remove every key of the dictionary from the state tree. The removed keys
/// take their nested trees with them.
pub fn difference(t: Link, d: DictLink, c: &mut Counters) -> Link {
    match (t, d) {
        (None, _) => None,

        (t, None) => t,

        (t @ Some(_), Some(boxed)) => {
            let d = *boxed;
            let (tl, _found, tr) = split(t, d.key, c);
            let l: Link = difference(tl, d.left, c);
            let r: Link = difference(tr, d.right, c);
            join2(l, r, c)
        }
    }
}
