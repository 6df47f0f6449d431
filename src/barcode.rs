//! Running the zigzag oracle on linearized paths and reading the bars back in ladder columns.

use fp::prime::ValidPrime;
use rustc_hash::FxHashMap;
use zigzag::{Bar, Operation};

use crate::{
    error::{LadderError, Result},
    linearize::Linearization,
};

/// Anything that computes zigzag barcodes.
///
/// Bars must follow the conventions of [`zigzag::compute`]: steps are numbered from 1, bars are
/// closed, and a class alive after the last operation dies at `operations.len()`.
pub trait ZigzagOracle: Send + Sync {
    fn barcode(&self, operations: &[Operation], prime: ValidPrime) -> anyhow::Result<Vec<Bar>>;
}

/// The in-process oracle of the `zigzag` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FastZigzag;

impl ZigzagOracle for FastZigzag {
    fn barcode(&self, operations: &[Operation], prime: ValidPrime) -> anyhow::Result<Vec<Bar>> {
        Ok(zigzag::compute(operations, prime)?)
    }
}

/// Bar counts of a row path, by `(birth column, death column)`.
pub type RowDifferences = FxHashMap<(usize, usize), i64>;

/// Bar counts of the bent path through `(b0, d1)`, by `(d0, b1)`: bars born in upper column `b1`
/// and last alive in lower column `d0`.
pub type BentDifferences = FxHashMap<(usize, usize), i64>;

/// Runs an oracle in a fixed homological dimension and characteristic.
#[derive(Clone, Copy)]
pub struct BarcodeComputer<'a> {
    oracle: &'a dyn ZigzagOracle,
    prime: ValidPrime,
    dim: usize,
}

impl<'a> BarcodeComputer<'a> {
    pub fn new(oracle: &'a dyn ZigzagOracle, prime: ValidPrime, dim: usize) -> Self {
        Self { oracle, prime, dim }
    }

    pub fn prime(&self) -> ValidPrime {
        self.prime
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The bars of `path` in the chosen dimension. Bars that are out of range in any dimension
    /// are reported as an [`LadderError::OracleFailure`].
    #[tracing::instrument(skip(self, path), fields(path = %path.description, len = path.len()))]
    pub fn bars(&self, path: &Linearization) -> Result<Vec<Bar>> {
        let len = path.len();
        let bars = self
            .oracle
            .barcode(&path.operations, self.prime)
            .map_err(|e| LadderError::oracle(&path.description, format!("{e:#}")))?;
        let max_dim = path.operations.iter().map(Operation::dim).max();
        for bar in &bars {
            if bar.birth < 1 {
                return Err(LadderError::oracle(
                    &path.description,
                    format!("birth {} out of range", bar.birth),
                ));
            }
            if bar.death + 1 < bar.birth || bar.death > len {
                return Err(LadderError::oracle(
                    &path.description,
                    format!("death {} of a bar born at {} out of range", bar.death, bar.birth),
                ));
            }
            if max_dim.map_or(true, |d| bar.dim > d) {
                return Err(LadderError::oracle(
                    &path.description,
                    format!("bar in dimension {} of a complex with no such simplices", bar.dim),
                ));
            }
        }
        let bars: Vec<Bar> = bars.into_iter().filter(|b| b.dim == self.dim).collect();
        tracing::debug!(bars = bars.len(), "barcode computed");
        Ok(bars)
    }

    /// Bar counts of a row path of a ladder of length `length`.
    pub fn row_differences(&self, path: &Linearization, length: usize) -> Result<RowDifferences> {
        let mut d_ss = RowDifferences::default();
        for bar in self.bars(path)? {
            let b = path
                .aligner
                .birth_slot(bar.birth)
                .filter(|&b| b < length)
                .ok_or_else(|| misplaced(path, &bar))?;
            let Some(k) = path.aligner.death_slot(bar.death) else {
                return Err(misplaced(path, &bar));
            };
            // The bar lives through column k - 1 and dies while column k is built.
            if k >= 1 && b <= k - 1 {
                *d_ss.entry((b, k - 1)).or_default() += 1;
            }
        }
        Ok(d_ss)
    }

    /// Bar counts of the bent path through `(b0, d1)`. Only bars that survive the walk from the
    /// upper node at `d1` to the lower node at `b0` are counted.
    pub fn bent_differences(
        &self,
        path: &Linearization,
        b0: usize,
        d1: usize,
    ) -> Result<BentDifferences> {
        let aligner = &path.aligner;
        let (Some(top), Some(bottom)) = (aligner.get(d1 + 1), aligner.get(d1 + 2)) else {
            return Err(LadderError::inconsistent(format!(
                "{} has too few columns",
                path.description
            )));
        };
        let mut d_ss = BentDifferences::default();
        for bar in self.bars(path)? {
            if top < bar.birth || bar.death < bottom {
                continue;
            }
            let b1 = aligner
                .birth_slot(bar.birth)
                .ok_or_else(|| misplaced(path, &bar))?;
            let d0 = aligner
                .death_slot(bar.death)
                .filter(|&k| k >= d1 + 2 && k + 1 < aligner.len())
                .map(|k| b0 + k - (d1 + 2))
                .ok_or_else(|| misplaced(path, &bar))?;
            if b1 > d0 {
                continue;
            }
            if b1 > b0 || d0 < d1 {
                return Err(LadderError::inconsistent(format!(
                    "{} has a bar from upper column {b1} to lower column {d0}",
                    path.description
                )));
            }
            *d_ss.entry((d0, b1)).or_default() += 1;
        }
        Ok(d_ss)
    }

    /// The number of bars of a tour that are born in its first node and survive to the end.
    pub fn full_bars(&self, path: &Linearization) -> Result<i64> {
        let start = path.aligner.get(1).unwrap_or(0);
        let len = path.len();
        Ok(self
            .bars(path)?
            .iter()
            .filter(|b| b.birth <= start && b.death == len)
            .count() as i64)
    }
}

fn misplaced(path: &Linearization, bar: &Bar) -> LadderError {
    LadderError::oracle(
        &path.description,
        format!(
            "bar [{}, {}] does not fit the aligner {:?}",
            bar.birth,
            bar.death,
            path.aligner.positions()
        ),
    )
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use super::*;
    use crate::{
        filtration::{CLFiltration, Row},
        linearize::{LadderComplexes, LadderLinearizer},
        store::MemoryStore,
    };

    /// An oracle returning a fixed barcode.
    struct Canned(Vec<Bar>);

    impl ZigzagOracle for Canned {
        fn barcode(&self, _: &[Operation], _: ValidPrime) -> anyhow::Result<Vec<Bar>> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl ZigzagOracle for Failing {
        fn barcode(&self, _: &[Operation], _: ValidPrime) -> anyhow::Result<Vec<Bar>> {
            anyhow::bail!("out of memory")
        }
    }

    /// Three vertices. The upper row joins two of them at column 2 and closes a loop at column 3,
    /// the lower row has no edges.
    fn ladder() -> LadderLinearizer {
        let f = CLFiltration::new(
            3,
            vec![1.0, 2.0, 3.0],
            vec![
                (vec![0], 1),
                (vec![1], 1),
                (vec![2], 1),
                (vec![0, 1], 2),
                (vec![0, 2], 3),
                (vec![1, 2], 3),
            ],
            vec![(vec![0], 1), (vec![1], 1), (vec![2], 1)],
        )
        .unwrap();
        LadderLinearizer::new(&LadderComplexes::new(&f, 0), Box::new(MemoryStore::new())).unwrap()
    }

    fn sorted(d: &FxHashMap<(usize, usize), i64>) -> Vec<((usize, usize), i64)> {
        let mut v: Vec<_> = d.iter().map(|(k, v)| (*k, *v)).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn row_columns() {
        let l = ladder();
        let c = BarcodeComputer::new(&FastZigzag, fp::prime::TWO, 0);
        let upper = c.row_differences(&l.row_path(Row::Upper).unwrap(), 3).unwrap();
        expect![["[((0, 0), 1), ((0, 1), 1), ((0, 2), 1)]"]].assert_eq(&format!("{:?}", sorted(&upper)));
        let lower = c.row_differences(&l.row_path(Row::Lower).unwrap(), 3).unwrap();
        expect![["[((0, 2), 3)]"]].assert_eq(&format!("{:?}", sorted(&lower)));

        let c1 = BarcodeComputer::new(&FastZigzag, fp::prime::TWO, 1);
        let loops = c1.row_differences(&l.row_path(Row::Upper).unwrap(), 3).unwrap();
        expect![["[((2, 2), 1)]"]].assert_eq(&format!("{:?}", sorted(&loops)));
    }

    #[test]
    fn bent_columns() {
        let l = ladder();
        let c = BarcodeComputer::new(&FastZigzag, fp::prime::TWO, 0);
        // Up the upper row to column 2, back to column 0 and along the lower row.
        let bent = c.bent_differences(&l.bent_path(0, 2).unwrap(), 0, 2).unwrap();
        expect![["[((2, 0), 1)]"]].assert_eq(&format!("{:?}", sorted(&bent)));
    }

    #[test]
    fn full_bars_of_tour() {
        let l = ladder();
        let c = BarcodeComputer::new(&FastZigzag, fp::prime::TWO, 0);
        let tour = l
            .tour(&[(0, Row::Lower), (1, Row::Lower), (1, Row::Upper), (2, Row::Upper)])
            .unwrap();
        assert_eq!(c.full_bars(&tour).unwrap(), 1);
        let back = l.tour(&[(2, Row::Upper), (2, Row::Lower)]).unwrap();
        assert_eq!(c.full_bars(&back).unwrap(), 1);
    }

    #[test]
    fn rejects_bad_bars() {
        let l = ladder();
        let path = l.row_path(Row::Upper).unwrap();
        let bad = |bar: Bar| {
            BarcodeComputer::new(&Canned(vec![bar]), fp::prime::TWO, 0)
                .row_differences(&path, 3)
                .unwrap_err()
                .to_string()
        };
        expect![["zigzag oracle failed on upper row: birth 0 out of range"]]
            .assert_eq(&bad(Bar { dim: 0, birth: 0, death: 2 }));
        expect![["zigzag oracle failed on upper row: death 9 of a bar born at 2 out of range"]]
            .assert_eq(&bad(Bar { dim: 0, birth: 2, death: 9 }));
        expect![["zigzag oracle failed on upper row: bar in dimension 4 of a complex with no such simplices"]]
            .assert_eq(&bad(Bar { dim: 4, birth: 2, death: 3 }));

        // The bent path (0, 2) walks back from the upper node at column 2 between positions 6
        // and 9. A bar born at position 4 starts in upper column 1, right of b0 = 0.
        let bent = l.bent_path(0, 2).unwrap();
        let early = Canned(vec![Bar { dim: 0, birth: 4, death: 9 }]);
        let err = BarcodeComputer::new(&early, fp::prime::TWO, 0)
            .bent_differences(&bent, 0, 2)
            .unwrap_err();
        expect![["arithmetic inconsistency: bent path (0, 2) has a bar from upper column 1 to lower column 2"]]
            .assert_eq(&err.to_string());

        // A row path has no block after its last column to walk down through.
        let err = BarcodeComputer::new(&Canned(vec![]), fp::prime::TWO, 0)
            .bent_differences(&path, 0, 3)
            .unwrap_err();
        expect![["arithmetic inconsistency: upper row has too few columns"]]
            .assert_eq(&err.to_string());

        let err = BarcodeComputer::new(&Failing, fp::prime::TWO, 0)
            .bars(&path)
            .unwrap_err();
        expect![["zigzag oracle failed on upper row: out of memory"]].assert_eq(&err.to_string());
    }
}
