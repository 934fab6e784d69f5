//! Per-operation observation counters.
//!
//! Both engines measure how much of a tree a bulk operation touches, because
//! every touched node is a node a subsequent Merkleization has to re-hash.
//! The counters are advisory: they never influence the result of an
//! operation.

/// Counters reported by the 2-3 engine after each bulk operation.
///
/// `rehashed_count` is the census of nodes whose `exposed` flag is set at the
/// end of the operation ("new hashes"): pre-existing nodes that were read on
/// a modified path plus nodes created by the operation. The census is taken
/// before the post-operation flag reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Pre-existing nodes exposed for the first time during the operation.
    pub exposed_count: u64,

    /// Nodes whose hash must be recomputed for the new version.
    pub rehashed_count: u64,

    /// Nodes created during the operation.
    pub created_count: u64,

    /// Values replaced by an upsert.
    pub updated_count: u64,

    /// Keys removed by a delete.
    pub deleted_count: u64,

    /// Hash invocations needed to open the previous commitment: the hash
    /// fan-in of each pre-existing node, accumulated at exposure time.
    pub opening_hashes: u64,

    /// Hash invocations needed to close the new commitment: the hash fan-in
    /// summed over all end-of-operation exposed nodes.
    pub closing_hashes: u64,
}

/// Counters reported by the AVL engine after each bulk operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    /// Nodes exposed for the first time during the operation.
    pub exposed_count: u64,

    /// Height probes on nodes whose height had not been taken yet.
    pub height_count: u64,
}

impl Counters {
    /// Fold another task's counters into this one.
    ///
    /// Parallel recursion gives each task a local `Counters`; the results
    /// are summed before the combining join returns.
    pub fn merge(&mut self, other: Counters) {
        self.exposed_count += other.exposed_count;
        self.height_count += other.height_count;
    }
}
