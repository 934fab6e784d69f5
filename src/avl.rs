//! AVL join/split engine for unsorted or scattered updates.
//!
//! A join-based balanced search tree in the Blelloch-Ferizovic-Sun style:
//! every operation is phrased in terms of `join`, `split` and `join2`, so
//! set-level operations (`union`, `intersect`, `difference`) decompose into
//! independent subproblems over disjoint key ranges and leave shared
//! subtrees untouched.
//!
//! Each node carries an optional *nested* subtree - a second-level
//! commitment under its key - and observation flags that measure how many
//! nodes an operation exposes (and therefore how many hashes a subsequent
//! Merkleization must recompute). The [`dict`] variant drives a single-pass
//! state transition: a dictionary tree with per-key `upserts`/`deletes`
//! channels is folded into the state's nested trees during the merge.

mod balance;
pub mod csv;
pub mod dict;
mod join;
mod node;
mod set_ops;

pub use join::{delete, insert, join, join2, split, split_last, SplitFound};
pub use node::{
    for_each_node, heights_consistent, is_balanced, is_bst, keys_in_order, reset, search, size,
    Link, Node,
};
pub use set_ops::{difference, intersect, union, PARALLEL_HEIGHT_CUTOFF};

use crate::error::{TreeError, TreeResult};

/// Check the structural invariants of a tree, reporting corruption.
///
/// Verifies BST ordering, AVL balance and height-field consistency; intended
/// for test builds and explicit caller request, not the hot path.
pub fn validate(t: &Link) -> TreeResult<()> {
    if !is_bst(t) {
        return Err(TreeError::Corrupted("BST ordering violated".into()));
    }
    if !is_balanced(t) {
        return Err(TreeError::Corrupted("AVL balance violated".into()));
    }
    if !heights_consistent(t) {
        return Err(TreeError::Corrupted(
            "stored heights disagree with structure".into(),
        ));
    }
    Ok(())
}
