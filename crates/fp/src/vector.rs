use itertools::{EitherOrBoth, Itertools};

use crate::prime::Prime;

/// A vector over $\mathbb{F}_p$ stored as its nonzero entries, sorted by index.
///
/// Boundary columns of simplicial complexes have at most `dim + 1` nonzero entries, so a dense
/// representation would waste both time and memory. The pivot of a vector is its largest nonzero
/// index, which is the convention used by the standard persistence reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseVector<P: Prime> {
    p: P,
    entries: Vec<(usize, u32)>,
}

impl<P: Prime> SparseVector<P> {
    pub fn new(p: P) -> Self {
        Self {
            p,
            entries: Vec::new(),
        }
    }

    /// Build a vector from signed coefficients. Repeated indices are summed and zero entries are
    /// dropped.
    pub fn from_signed(p: P, entries: impl IntoIterator<Item = (usize, i64)>) -> Self {
        let mut raw: Vec<(usize, i64)> = entries.into_iter().collect();
        raw.sort_unstable_by_key(|&(i, _)| i);
        let entries = raw
            .into_iter()
            .coalesce(|(i, a), (j, b)| if i == j { Ok((i, a + b)) } else { Err(((i, a), (j, b))) })
            .map(|(i, v)| (i, p.reduce(v)))
            .filter(|&(_, v)| v != 0)
            .collect();
        Self { p, entries }
    }

    pub fn prime(&self) -> P {
        self.p
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of nonzero entries.
    pub fn weight(&self) -> usize {
        self.entries.len()
    }

    /// The largest index with a nonzero entry, together with that entry.
    pub fn pivot(&self) -> Option<(usize, u32)> {
        self.entries.last().copied()
    }

    pub fn entry(&self, index: usize) -> u32 {
        match self.entries.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(pos) => self.entries[pos].1,
            Err(_) => 0,
        }
    }

    pub fn iter_nonzero(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.entries.iter().copied()
    }

    pub fn scale(&mut self, c: u32) {
        let p = self.p;
        let c = c % p.as_u32();
        if c == 0 {
            self.entries.clear();
            return;
        }
        for (_, v) in &mut self.entries {
            *v = p.product(*v, c);
        }
    }

    /// Replace `self` by `self + c * other`.
    pub fn add(&mut self, other: &Self, c: u32) {
        let p = self.p;
        let c = c % p.as_u32();
        if c == 0 || other.is_zero() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .merge_join_by(other.entries.iter().copied(), |a, b| a.0.cmp(&b.0))
            .filter_map(|pair| match pair {
                EitherOrBoth::Left(x) => Some(x),
                EitherOrBoth::Right((i, v)) => Some((i, p.product(v, c))),
                EitherOrBoth::Both((i, a), (_, b)) => {
                    let v = p.sum(a, p.product(b, c));
                    (v != 0).then_some((i, v))
                }
            })
            .collect();
    }

    /// Clear the pivot of `self` using `other`, which must have the same pivot index.
    pub fn eliminate_pivot(&mut self, other: &Self) {
        let p = self.p;
        let (Some((i, a)), Some((j, b))) = (self.pivot(), other.pivot()) else {
            return;
        };
        debug_assert_eq!(i, j);
        let c = p.neg(p.product(a, p.inverse(b)));
        self.add(other, c);
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::prime::{ValidPrime, P2, P3};

    fn dense<P: Prime>(v: &SparseVector<P>, len: usize) -> Vec<u32> {
        (0..len).map(|i| v.entry(i)).collect()
    }

    #[test]
    fn from_signed_normalizes() {
        let v = SparseVector::from_signed(P3, [(4, -1), (0, 3), (2, 1), (4, 5), (2, 1)]);
        assert_eq!(v.iter_nonzero().collect::<Vec<_>>(), vec![(2, 2), (4, 1)]);
        assert_eq!(v.pivot(), Some((4, 1)));
    }

    #[test]
    fn eliminate_pivot_over_f2() {
        let mut a = SparseVector::from_signed(P2, [(0, 1), (3, 1)]);
        let b = SparseVector::from_signed(P2, [(1, 1), (3, 1)]);
        a.eliminate_pivot(&b);
        assert_eq!(a.pivot(), Some((1, 1)));
        assert_eq!(dense(&a, 4), vec![1, 1, 0, 0]);
    }

    #[test]
    fn scale_by_zero_clears() {
        let mut a = SparseVector::from_signed(P3, [(0, 1), (3, 2)]);
        a.scale(3);
        assert!(a.is_zero());
    }

    fn signed_entries() -> impl Strategy<Value = Vec<(usize, i64)>> {
        proptest::collection::vec((0usize..12, -6i64..6), 0..10)
    }

    proptest! {
        #[test]
        fn add_matches_dense(
            p: ValidPrime,
            a in signed_entries(),
            b in signed_entries(),
            c in 0u32..50,
        ) {
            let mut x = SparseVector::from_signed(p, a);
            let y = SparseVector::from_signed(p, b);
            let expected: Vec<u32> = dense(&x, 12)
                .into_iter()
                .zip(dense(&y, 12))
                .map(|(u, v)| p.sum(u, p.product(v, c % p.as_u32())))
                .collect();
            x.add(&y, c);
            prop_assert_eq!(dense(&x, 12), expected);
            prop_assert!(x.iter_nonzero().all(|(_, v)| v != 0));
        }

        #[test]
        fn eliminate_pivot_lowers_pivot(
            p: ValidPrime,
            k in 1usize..12,
            a in signed_entries(),
            b in signed_entries(),
            ca in 0u32..1000,
            cb in 0u32..1000,
        ) {
            let lead = |c: u32| (c % (p.as_u32() - 1) + 1) as i64;
            let below = |v: Vec<(usize, i64)>| v.into_iter().filter(move |&(i, _)| i < k);
            let mut x = SparseVector::from_signed(p, below(a).chain([(k, lead(ca))]));
            let y = SparseVector::from_signed(p, below(b).chain([(k, lead(cb))]));
            x.eliminate_pivot(&y);
            prop_assert!(x.pivot().map_or(true, |(i, _)| i < k));
        }
    }
}
