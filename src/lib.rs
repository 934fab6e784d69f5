//! # bulktree
//!
//! Bulk-update algorithms on balanced ordered trees used as authenticated
//! state commitments.
//!
//! Two engines share a key/value domain of fixed-width unsigned words:
//!
//! - An **AVL join/split engine** ([`avl`]) for unsorted or scattered
//!   updates: join-based set algebra (`union`, `intersect`, `difference`)
//!   in the Blelloch-Ferizovic-Sun style, with an optional *nested* subtree
//!   per node encoding a hierarchical commitment and a dictionary variant
//!   that folds per-key upsert/delete channels into the nested trees in a
//!   single pass.
//! - A **2-3 tree bulk engine** ([`tree23`]) over sorted key batches: bulk
//!   upsert with leaf fission and fragment promotion, bulk delete with
//!   sibling merging and root demotion, and a leaf chain of copied
//!   next-keys that keeps internal separators reconstructible in one pass.
//!
//! Both engines preserve their balance invariants, leave untouched subtrees
//! structurally shared with the previous version, and expose how many nodes
//! a subsequent Merkleization would have to re-hash ([`stats`]). The hash
//! function itself stays a caller-supplied 2-to-1 combiner ([`hash`]).
//!
//! ## Example
//!
//! ```rust
//! use bulktree::key::KeyValue;
//! use bulktree::tree23::Tree23;
//!
//! let batch: Vec<KeyValue> = (1..=5).map(|k| KeyValue::new(k, k * 10)).collect();
//! let mut tree = Tree23::new(&batch)?;
//! assert_eq!(tree.keys_in_level_order(), vec![3, 5, 1, 2, 3, 4, 5]);
//!
//! tree.delete(&[2, 4])?;
//! assert_eq!(tree.walk_keys_post_order(), vec![1, 3, 5]);
//! # Ok::<(), bulktree::error::TreeError>(())
//! ```

mod tracing_helpers;

pub mod avl;
pub mod error;
pub mod hash;
pub mod key;
pub mod stats;
pub mod stream;
pub mod tree23;

pub use error::{TreeError, TreeResult};
pub use key::{KeyValue, Word};
pub use stats::{Counters, Stats};
pub use stream::KeyBinaryFactory;
pub use tree23::Tree23;
