//! Zigzag persistent homology of simplex-wise filtrations.
//!
//! The input is a sequence of [`Operation`]s, each inserting or deleting one simplex. Writing
//! $K_0 = \emptyset$ and $K_i$ for the complex after the $i$th operation, the output is the
//! barcode of the zigzag module
//! $$ H_*(K_0) \leftrightarrow H_*(K_1) \leftrightarrow \cdots \leftrightarrow H_*(K_n). $$
//!
//! Bars are closed: a [`Bar`] with `birth = b` and `death = d` is a class that lives in $K_b,
//! \ldots, K_d$. A class that survives to the end has `death = n`.
//!
//! The computation reduces zigzag persistence to ordinary persistence of a coned filtration. The
//! sequence is first closed off by deleting every surviving simplex. Each simplex instance is
//! added at the time it was inserted, and the cone over it is added, in reverse order of
//! deletion, after all insertions. A single column reduction over $\mathbb{F}_p$ then yields
//! every bar.

mod coned;
mod operation;
mod reduce;

pub use operation::{Bar, Operation, Simplex};

use fp::prime::{ValidPrime, P2};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZigzagError {
    /// The simplex is already present in the complex.
    DuplicateInsertion { step: usize, simplex: Simplex },
    /// A codimension one face of the inserted simplex is not present.
    MissingFace { step: usize, simplex: Simplex },
    /// The deleted simplex is not present.
    MissingSimplex { step: usize, simplex: Simplex },
    /// The deleted simplex is still a face of a present simplex.
    DanglingCoface { step: usize, simplex: Simplex },
    /// A simplex with no vertices.
    EmptySimplex { step: usize },
}

impl std::fmt::Display for ZigzagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateInsertion { step, simplex } => {
                write!(f, "step {step}: {simplex:?} is inserted twice")
            }
            Self::MissingFace { step, simplex } => {
                write!(f, "step {step}: {simplex:?} is inserted before its faces")
            }
            Self::MissingSimplex { step, simplex } => {
                write!(f, "step {step}: {simplex:?} is deleted but not present")
            }
            Self::DanglingCoface { step, simplex } => {
                write!(f, "step {step}: {simplex:?} is deleted before its cofaces")
            }
            Self::EmptySimplex { step } => write!(f, "step {step}: empty simplex"),
        }
    }
}

impl std::error::Error for ZigzagError {}

/// Compute the barcode of `operations` with coefficients in $\mathbb{F}_p$.
///
/// Bars of every dimension are returned, sorted by dimension, then birth, then death. Steps are
/// numbered from 1 in errors and in bars.
#[tracing::instrument(skip(operations), fields(len = operations.len(), p = %p))]
pub fn compute(operations: &[Operation], p: ValidPrime) -> Result<Vec<Bar>, ZigzagError> {
    let filtration = coned::ConedFiltration::new(operations)?;
    let pairs = if p == 2 {
        reduce::persistence_pairs(P2, &filtration)
    } else {
        reduce::persistence_pairs(p, &filtration)
    };
    let n = operations.len();
    let mut bars: Vec<Bar> = pairs
        .into_iter()
        .filter_map(|(creator, destroyer)| filtration.bar(creator, destroyer))
        .filter(|bar| bar.birth <= n)
        .map(|bar| Bar {
            death: bar.death.min(n),
            ..bar
        })
        .collect();
    bars.sort_unstable();
    tracing::debug!(bars = bars.len(), "zigzag barcode computed");
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use rstest::rstest;

    use super::*;

    fn ins(s: &[u32]) -> Operation {
        Operation::insert(s.to_vec())
    }

    fn del(s: &[u32]) -> Operation {
        Operation::delete(s.to_vec())
    }

    fn triples(bars: &[Bar]) -> Vec<(usize, usize, usize)> {
        bars.iter().map(|b| (b.dim, b.birth, b.death)).collect()
    }

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(5)]
    fn filled_triangle(#[case] p: u32) {
        let ops = [
            ins(&[0]),
            ins(&[1]),
            ins(&[2]),
            ins(&[0, 1]),
            ins(&[0, 2]),
            ins(&[1, 2]),
            ins(&[0, 1, 2]),
        ];
        let bars = compute(&ops, ValidPrime::new(p)).unwrap();
        assert_eq!(
            triples(&bars),
            vec![(0, 1, 7), (0, 2, 3), (0, 3, 4), (1, 6, 6)]
        );
    }

    #[test]
    fn component_reappears_after_edge_deletion() {
        let ops = [ins(&[0]), ins(&[1]), ins(&[0, 1]), del(&[0, 1]), del(&[1])];
        let bars = compute(&ops, fp::prime::TWO).unwrap();
        assert_eq!(triples(&bars), vec![(0, 1, 5), (0, 2, 2), (0, 4, 4)]);
    }

    #[test]
    fn square_with_rerouted_edges() {
        let ops = [
            ins(&[0]),
            ins(&[1]),
            ins(&[2]),
            ins(&[3]),
            ins(&[0, 1]),
            ins(&[1, 2]),
            ins(&[2, 3]),
            ins(&[0, 3]),
            del(&[1, 2]),
            ins(&[1, 2]),
            ins(&[0, 2]),
            del(&[0, 3]),
        ];
        let bars = compute(&ops, ValidPrime::new(3)).unwrap();
        assert_eq!(
            triples(&bars),
            vec![
                (0, 1, 12),
                (0, 2, 4),
                (0, 3, 5),
                (0, 4, 6),
                (1, 8, 8),
                (1, 10, 11),
                (1, 11, 12)
            ]
        );
    }

    #[test]
    fn deleting_a_two_simplex_creates_a_cycle() {
        let ops = [
            ins(&[0]),
            ins(&[1]),
            ins(&[2]),
            ins(&[0, 1]),
            ins(&[1, 2]),
            ins(&[0, 2]),
            ins(&[0, 1, 2]),
            del(&[0, 1, 2]),
            del(&[0, 2]),
        ];
        let bars = compute(&ops, fp::prime::TWO).unwrap();
        assert_eq!(
            triples(&bars),
            vec![(0, 1, 9), (0, 2, 3), (0, 3, 4), (1, 6, 6), (1, 8, 8)]
        );
    }

    #[test]
    fn empty_sequence() {
        assert!(compute(&[], fp::prime::TWO).unwrap().is_empty());
    }

    #[test]
    fn malformed_sequences() {
        let p = fp::prime::TWO;
        assert_eq!(
            compute(&[ins(&[0, 1])], p).unwrap_err(),
            ZigzagError::MissingFace {
                step: 1,
                simplex: vec![0, 1]
            }
        );
        assert_eq!(
            compute(&[ins(&[0]), ins(&[0])], p).unwrap_err(),
            ZigzagError::DuplicateInsertion {
                step: 2,
                simplex: vec![0]
            }
        );
        assert_eq!(
            compute(&[del(&[0])], p).unwrap_err(),
            ZigzagError::MissingSimplex {
                step: 1,
                simplex: vec![0]
            }
        );
        let err = compute(&[ins(&[0]), ins(&[1]), ins(&[0, 1]), del(&[1])], p).unwrap_err();
        expect![["step 4: [1] is deleted before its cofaces"]].assert_eq(&err.to_string());
    }
}
