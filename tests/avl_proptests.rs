//! Property-based tests for the AVL set algebra.
//!
//! Differential testing against `BTreeSet`: `union`, `intersect` and
//! `difference` must agree with the standard set operations on key sets
//! while preserving BST order, AVL balance and height consistency.

use bulktree::avl::{self, delete, difference, insert, intersect, keys_in_order, search, union, Link};
use bulktree::key::Word;
use bulktree::stats::Counters;
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
//  Strategies
// ============================================================================

fn key_set(max_len: usize) -> impl Strategy<Value = Vec<Word>> {
    prop::collection::vec(0u64..300, 0..=max_len)
}

fn build(keys: &[Word]) -> Link {
    let mut c = Counters::default();
    let mut t: Link = None;
    for &k in keys {
        t = insert(t, k, Some(k), None, &mut c);
    }
    t
}

fn as_set(keys: &[Word]) -> BTreeSet<Word> {
    keys.iter().copied().collect()
}

fn check_invariants(t: &Link) -> Result<(), TestCaseError> {
    prop_assert!(avl::is_bst(t), "BST order violated");
    prop_assert!(avl::is_balanced(t), "AVL balance violated");
    prop_assert!(avl::heights_consistent(t), "stored heights stale");
    Ok(())
}

// ============================================================================
//  Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_insert_builds_the_key_set(keys in key_set(100)) {
        let t = build(&keys);
        check_invariants(&t)?;
        prop_assert_eq!(
            keys_in_order(&t),
            as_set(&keys).into_iter().collect::<Vec<_>>()
        );
    }

    #[test]
    fn prop_point_delete_removes_one_key(keys in key_set(80), victim in 0u64..300) {
        let mut c = Counters::default();
        let t = build(&keys);
        let t = delete(t, victim, &mut c);
        check_invariants(&t)?;

        let mut expected = as_set(&keys);
        expected.remove(&victim);
        prop_assert_eq!(keys_in_order(&t), expected.into_iter().collect::<Vec<_>>());
    }

    #[test]
    fn prop_union_matches_oracle(a in key_set(80), b in key_set(80)) {
        let mut c = Counters::default();
        let u = union(build(&a), build(&b), &mut c);
        check_invariants(&u)?;

        let expected: Vec<Word> = as_set(&a).union(&as_set(&b)).copied().collect();
        prop_assert_eq!(keys_in_order(&u), expected);
    }

    #[test]
    fn prop_union_key_sets_commute(a in key_set(60), b in key_set(60)) {
        let mut c = Counters::default();
        let ab = union(build(&a), build(&b), &mut c);
        let ba = union(build(&b), build(&a), &mut c);
        prop_assert_eq!(keys_in_order(&ab), keys_in_order(&ba));
    }

    #[test]
    fn prop_union_is_associative_on_key_sets(
        a in key_set(40),
        b in key_set(40),
        d in key_set(40),
    ) {
        let mut c = Counters::default();
        let left = union(union(build(&a), build(&b), &mut c), build(&d), &mut c);
        let right = union(build(&a), union(build(&b), build(&d), &mut c), &mut c);
        prop_assert_eq!(keys_in_order(&left), keys_in_order(&right));
    }

    #[test]
    fn prop_intersect_matches_oracle(a in key_set(80), b in key_set(80)) {
        let mut c = Counters::default();
        let i = intersect(build(&a), build(&b), &mut c);
        check_invariants(&i)?;

        let expected: Vec<Word> = as_set(&a).intersection(&as_set(&b)).copied().collect();
        prop_assert_eq!(keys_in_order(&i), expected);
    }

    #[test]
    fn prop_difference_matches_oracle(a in key_set(80), b in key_set(80)) {
        let mut c = Counters::default();
        let d = difference(build(&a), build(&b), &mut c);
        check_invariants(&d)?;

        let expected: Vec<Word> = as_set(&a).difference(&as_set(&b)).copied().collect();
        prop_assert_eq!(keys_in_order(&d), expected);
    }

    #[test]
    fn prop_set_algebra_laws(a in key_set(60), b in key_set(60)) {
        let mut c = Counters::default();

        // (A \ B) and (A n B) partition A.
        let diff = difference(build(&a), build(&b), &mut c);
        let inter = intersect(build(&a), build(&b), &mut c);
        let reunited = union(diff, inter, &mut c);
        prop_assert_eq!(
            keys_in_order(&reunited),
            as_set(&a).into_iter().collect::<Vec<_>>()
        );

        // A u B == A u (B \ A).
        let u1 = union(build(&a), build(&b), &mut c);
        let b_minus_a = difference(build(&b), build(&a), &mut c);
        let u2 = union(build(&a), b_minus_a, &mut c);
        prop_assert_eq!(keys_in_order(&u1), keys_in_order(&u2));
    }

    #[test]
    fn prop_union_prefers_second_operand_values(keys in key_set(40)) {
        let mut c = Counters::default();
        let t1 = build(&keys);

        // Rebuild the same key set with shifted values.
        let mut t2: Link = None;
        for &k in &as_set(&keys) {
            t2 = insert(t2, k, Some(k + 1000), None, &mut c);
        }

        let u = union(t1, t2, &mut c);
        for &k in &as_set(&keys) {
            prop_assert_eq!(search(&u, k).map(|n| n.value()), Some(Some(k + 1000)));
        }
    }

    #[test]
    fn prop_search_finds_exactly_the_inserted_keys(keys in key_set(60), probe in 0u64..300) {
        let t = build(&keys);
        let expected = as_set(&keys).contains(&probe);
        prop_assert_eq!(search(&t, probe).is_some(), expected);
    }
}
