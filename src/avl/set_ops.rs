//! Set algebra over whole AVL trees.
//!
//! `union`, `intersect` and `difference` follow the divide-and-conquer
//! scheme: expose the second tree at its root, split the first at that key,
//! recurse into the two disjoint halves, and combine with `join` or `join2`.
//! The two recursive calls are independent - they receive disjoint owned
//! subtrees - and are the crate's only fork-join points. They run under
//! `rayon::join` once both operands are tall enough to pay for a task spawn,
//! and sequentially below that, with each parallel task accumulating into a
//! local [`Counters`] summed after the join.

use crate::key::Word;
use crate::stats::Counters;

use super::join::{join, join2, split};
use super::node::{expose, Link};

/// Minimum stored height of *both* operands before a recursion level is
/// forked onto worker tasks. Below this the subproblems are too small to
/// amortise the spawn.
pub const PARALLEL_HEIGHT_CUTOFF: u64 = 12;

#[inline]
fn tall(t: &Link) -> bool {
    t.as_ref().is_some_and(|n| n.height() >= PARALLEL_HEIGHT_CUTOFF)
}

fn fork<F, G>(left: F, right: G, c: &mut Counters) -> (Link, Link)
where
    F: FnOnce(&mut Counters) -> Link + Send,
    G: FnOnce(&mut Counters) -> Link + Send,
{
    let ((l, cl), (r, cr)) = rayon::join(
        move || {
            let mut cl = Counters::default();
            let t = left(&mut cl);
            (t, cl)
        },
        move || {
            let mut cr = Counters::default();
            let t = right(&mut cr);
            (t, cr)
        },
    );
    c.merge(cl);
    c.merge(cr);
    (l, r)
}

/// Union of the key sets of `t1` and `t2`.
///
/// On a key collision `t2`'s value wins and the nested trees of the two
/// occurrences are themselves unioned.
pub fn union(t1: Link, t2: Link, c: &mut Counters) -> Link {
    match (t1, t2) {
        (None, t2) => t2,

        (t1, None) => t1,

        (t1 @ Some(_), Some(n2)) => {
            let parallel: bool = tall(&t1) && n2.height() >= PARALLEL_HEIGHT_CUTOFF;
            let (k2, v2, l2, r2, nested2) = expose(n2, c);
            let (l1, found, r1) = split(t1, k2, c);

            let (lu, ru) = if parallel {
                fork(
                    move |c| union(l1, l2, c),
                    move |c| union(r1, r2, c),
                    c,
                )
            } else {
                let lu = union(l1, l2, c);
                let ru = union(r1, r2, c);
                (lu, ru)
            };

            let nested: Link = match found {
                Some(f) => union(f.nested, nested2, c),
                None => nested2,
            };
            join(lu, k2, v2, nested, ru, c)
        }
    }
}

/// Intersection of the key sets of `t1` and `t2`.
///
/// Surviving keys keep `t2`'s value and the union of both nested trees.
pub fn intersect(t1: Link, t2: Link, c: &mut Counters) -> Link {
    match (t1, t2) {
        (None, _) | (_, None) => None,

        (t1 @ Some(_), Some(n2)) => {
            let parallel: bool = tall(&t1) && n2.height() >= PARALLEL_HEIGHT_CUTOFF;
            let (k2, v2, l2, r2, nested2) = expose(n2, c);
            let (l1, found, r1) = split(t1, k2, c);

            let (li, ri) = if parallel {
                fork(
                    move |c| intersect(l1, l2, c),
                    move |c| intersect(r1, r2, c),
                    c,
                )
            } else {
                let li = intersect(l1, l2, c);
                let ri = intersect(r1, r2, c);
                (li, ri)
            };

            match found {
                Some(f) => {
                    let nested: Link = union(f.nested, nested2, c);
                    join(li, k2, v2, nested, ri, c)
                }
                None => join2(li, ri, c),
            }
        }
    }
}

/// Keys of `t1` that do not occur in `t2`.
pub fn difference(t1: Link, t2: Link, c: &mut Counters) -> Link {
    match (t1, t2) {
        (None, _) => None,

        (t1, None) => t1,

        (t1 @ Some(_), Some(n2)) => {
            let parallel: bool = tall(&t1) && n2.height() >= PARALLEL_HEIGHT_CUTOFF;
            let (k2, _v2, l2, r2, _nested2) = expose(n2, c);
            let (l1, _found, r1) = split(t1, k2, c);

            let (ld, rd) = if parallel {
                fork(
                    move |c| difference(l1, l2, c),
                    move |c| difference(r1, r2, c),
                    c,
                )
            } else {
                let ld = difference(l1, l2, c);
                let rd = difference(r1, r2, c);
                (ld, rd)
            };

            join2(ld, rd, c)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{difference, intersect, union};
    use crate::avl::join::insert;
    use crate::avl::node::{
        heights_consistent, is_balanced, is_bst, keys_in_order, search, Link,
    };
    use crate::stats::Counters;

    fn from_keys(keys: &[u64]) -> Link {
        let mut c = Counters::default();
        let mut t: Link = None;
        for &k in keys {
            t = insert(t, k, Some(k), None, &mut c);
        }
        t
    }

    fn assert_avl(t: &Link, expected: &[u64]) {
        assert!(is_bst(t), "BST property failed: {:?}", keys_in_order(t));
        assert!(is_balanced(t), "balance failed: {:?}", keys_in_order(t));
        assert!(heights_consistent(t), "stale heights: {:?}", keys_in_order(t));
        assert_eq!(keys_in_order(t), expected);
    }

    #[test]
    fn test_union_of_interleaved_leaves() {
        let mut c = Counters::default();
        let u = union(from_keys(&[1, 3, 5]), from_keys(&[2, 4, 6]), &mut c);
        assert_avl(&u, &[1, 2, 3, 4, 5, 6]);
        assert!(u.as_ref().unwrap().height() <= 3);
    }

    #[test]
    fn test_union_with_empty_sides() {
        let mut c = Counters::default();
        assert_avl(&union(None, from_keys(&[1, 2]), &mut c), &[1, 2]);
        assert_avl(&union(from_keys(&[1, 2]), None, &mut c), &[1, 2]);
        assert!(union(None, None, &mut c).is_none());
    }

    #[test]
    fn test_union_key_sets_commute() {
        let mut c = Counters::default();
        let a = [10u64, 20, 30, 35, 40];
        let b = [5u64, 20, 25, 40, 50];
        let ab = union(from_keys(&a), from_keys(&b), &mut c);
        let ba = union(from_keys(&b), from_keys(&a), &mut c);
        assert_eq!(keys_in_order(&ab), keys_in_order(&ba));
    }

    #[test]
    fn test_union_second_operand_wins_values() {
        let mut c = Counters::default();
        let t1 = insert(None, 9, Some(1), None, &mut c);
        let t2 = insert(None, 9, Some(2), None, &mut c);
        let u = union(t1, t2, &mut c);
        assert_eq!(search(&u, 9).unwrap().value(), Some(2));
    }

    #[test]
    fn test_intersect() {
        let mut c = Counters::default();
        let i = intersect(from_keys(&[1, 2, 3, 4, 5, 6]), from_keys(&[2, 4, 6, 8]), &mut c);
        assert_avl(&i, &[2, 4, 6]);

        assert!(intersect(from_keys(&[1]), None, &mut c).is_none());
        assert!(intersect(None, from_keys(&[1]), &mut c).is_none());
        assert!(intersect(from_keys(&[1, 3]), from_keys(&[2, 4]), &mut c).is_none());
    }

    #[test]
    fn test_difference_both_directions() {
        let mut c = Counters::default();
        let all = [3u64, 2, 1, 7, 4, 5];

        let d1 = difference(from_keys(&all), from_keys(&[4, 1, 5]), &mut c);
        assert_avl(&d1, &[2, 3, 7]);

        let d2 = difference(from_keys(&all), from_keys(&[3, 2, 7]), &mut c);
        assert_avl(&d2, &[1, 4, 5]);
    }

    #[test]
    fn test_difference_with_empty_sides() {
        let mut c = Counters::default();
        assert!(difference(None, from_keys(&[1]), &mut c).is_none());
        assert_avl(&difference(from_keys(&[1, 2]), None, &mut c), &[1, 2]);
    }

    #[test]
    fn test_set_laws_on_larger_trees() {
        let mut c = Counters::default();
        let a: Vec<u64> = (0..200).map(|i| i * 3).collect();
        let b: Vec<u64> = (0..200).map(|i| i * 5).collect();

        let u = union(from_keys(&a), from_keys(&b), &mut c);
        let mut expected: Vec<u64> = a.iter().chain(b.iter()).copied().collect();
        expected.sort_unstable();
        expected.dedup();
        assert_avl(&u, &expected);

        // (A u B) \ B == A \ B
        let left = difference(u, from_keys(&b), &mut c);
        let right = difference(from_keys(&a), from_keys(&b), &mut c);
        assert_eq!(keys_in_order(&left), keys_in_order(&right));
    }
}
