//! At every step, the bars alive there count the homology of the complex at that step.

use std::collections::BTreeSet;

use fp::{
    prime::{Prime, ValidPrime},
    vector::SparseVector,
};
use proptest::prelude::*;
use zigzag::{Operation, Simplex};

const VERTICES: u32 = 5;

fn all_simplices() -> Vec<Simplex> {
    let mut out = Vec::new();
    for a in 0..VERTICES {
        out.push(vec![a]);
        for b in a + 1..VERTICES {
            out.push(vec![a, b]);
            for c in b + 1..VERTICES {
                out.push(vec![a, b, c]);
            }
        }
    }
    out
}

fn faces(s: &[u32]) -> impl Iterator<Item = Simplex> + '_ {
    (0..s.len()).filter(move |_| s.len() > 1).map(move |t| {
        s.iter()
            .enumerate()
            .filter_map(|(k, &v)| (k != t).then_some(v))
            .collect()
    })
}

/// Turn a list of choices into a valid insertion/deletion sequence.
fn build_sequence(choices: &[(bool, usize)]) -> Vec<Operation> {
    let universe = all_simplices();
    let mut present: BTreeSet<Simplex> = BTreeSet::new();
    let mut ops = Vec::new();
    for &(prefer_insert, k) in choices {
        let insertable: Vec<&Simplex> = universe
            .iter()
            .filter(|s| !present.contains(*s) && faces(s).all(|f| present.contains(&f)))
            .collect();
        let deletable: Vec<&Simplex> = present
            .iter()
            .filter(|s| !present.iter().any(|t| t.len() == s.len() + 1 && faces(t).any(|f| &f == *s)))
            .collect();
        let op = if (prefer_insert || deletable.is_empty()) && !insertable.is_empty() {
            Operation::insert(insertable[k % insertable.len()].clone())
        } else if !deletable.is_empty() {
            Operation::delete(deletable[k % deletable.len()].clone())
        } else {
            continue;
        };
        if op.insertion {
            present.insert(op.simplex.clone());
        } else {
            present.remove(&op.simplex);
        }
        ops.push(op);
    }
    ops
}

fn rank<P: Prime>(columns: Vec<SparseVector<P>>, rows: usize) -> usize {
    let mut owner: Vec<Option<usize>> = vec![None; rows];
    let mut reduced: Vec<SparseVector<P>> = Vec::new();
    let mut rank = 0;
    for mut col in columns {
        while let Some((low, _)) = col.pivot() {
            match owner[low] {
                Some(k) => col.eliminate_pivot(&reduced[k]),
                None => {
                    owner[low] = Some(reduced.len());
                    rank += 1;
                    break;
                }
            }
        }
        reduced.push(col);
    }
    rank
}

fn betti<P: Prime>(p: P, complex: &BTreeSet<Simplex>, dim: usize) -> usize {
    let of_dim = |d: usize| -> Vec<&Simplex> { complex.iter().filter(|s| s.len() == d + 1).collect() };
    let boundary_rank = |d: usize| -> usize {
        if d == 0 {
            return 0;
        }
        let rows = of_dim(d - 1);
        let columns = of_dim(d)
            .into_iter()
            .map(|s| {
                SparseVector::from_signed(
                    p,
                    faces(s).enumerate().map(|(t, f)| {
                        let i = rows.iter().position(|r| **r == f).unwrap();
                        (i, if t % 2 == 0 { 1 } else { -1 })
                    }),
                )
            })
            .collect();
        rank(columns, rows.len())
    };
    of_dim(dim).len() - boundary_rank(dim) - boundary_rank(dim + 1)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bars_count_homology(
        p: ValidPrime,
        choices in proptest::collection::vec((proptest::bool::weighted(0.65), 0usize..64), 1..40),
    ) {
        let ops = build_sequence(&choices);
        let bars = zigzag::compute(&ops, p).unwrap();
        let mut complex = BTreeSet::new();
        for (idx, op) in ops.iter().enumerate() {
            if op.insertion {
                complex.insert(op.simplex.clone());
            } else {
                complex.remove(&op.simplex);
            }
            let step = idx + 1;
            for dim in 0..3 {
                let alive = bars.iter().filter(|b| b.dim == dim && b.contains(step)).count();
                prop_assert_eq!(alive, betti(p, &complex, dim), "dim {} step {}", dim, step);
            }
        }
        prop_assert!(bars.iter().all(|b| b.birth >= 1 && b.birth <= b.death && b.death <= ops.len()));
    }
}
