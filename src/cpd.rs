//! Connected persistence diagrams.
//!
//! The connected persistence diagram of a ladder is the signed interval decomposition obtained by
//! Möbius inversion of the cumulative bar counts $c$ over the lattice of intervals,
//! $$ \Delta(I) = \sum_{S \subseteq \mathrm{cover}(I)} (-1)^{|S|} c(\textstyle\bigvee S \vee I). $$
//! The counts $c$ are read off the barcodes of the two rows and of the bent paths: $c(I)$ is the
//! number of bars of the relevant path that contain the corners of $I$.
//!
//! The diagram is presented as a set of dots, one per nonzero row bar, and a set of lines joining
//! the lower and upper halves of the diagram for intervals meeting both rows.

use std::fmt;

use itertools::Itertools;
use maybe_rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    barcode::{BarcodeComputer, BentDifferences, RowDifferences, ZigzagOracle},
    error::{LadderError, Result},
    filtration::{CLFiltration, Row},
    lattice::{join, Interval, IntervalLattice, LatticeCache, Span},
    linearize::{LadderComplexes, LadderLinearizer},
    utils::Config,
};

/// Which half of the diagram a dot lies in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Area {
    /// Upper row, above the diagonal.
    U,
    /// Lower row, below the diagonal.
    D,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U => write!(f, "U"),
            Self::D => write!(f, "D"),
        }
    }
}

/// A dot at `(x, y)` in 1-based column coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot {
    pub x: usize,
    pub y: usize,
    pub multiplicity: i64,
    pub area: Area,
}

/// A line from the lower dot `(x0, y0)` to the upper dot `(x1, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
    pub multiplicity: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectedPersistenceDiagram {
    pub ladder_length: usize,
    pub dim: usize,
    /// The filtration values of the columns.
    pub radii: Vec<f64>,
    pub dots: Vec<Dot>,
    pub lines: Vec<Line>,
    /// Intervals with nonzero signed multiplicity, in lattice order.
    #[serde(skip)]
    pub dec: Vec<(Interval, i64)>,
}

impl ConnectedPersistenceDiagram {
    /// The decomposition keyed by interval labels such as `0,3,1,2`.
    pub fn labelled_dec(&self) -> Vec<(String, i64)> {
        self.dec.iter().map(|(i, v)| (i.to_string(), *v)).collect()
    }

    /// The signed multiplicity of the row bar `[b, d]` (0-based columns) on the diagram.
    pub fn row_multiplicity(&self, row: Row, b: usize, d: usize) -> i64 {
        let (x, y, area) = match row {
            Row::Upper => (b + 1, d + 1, Area::U),
            Row::Lower => (d + 1, b + 1, Area::D),
        };
        self.dots
            .iter()
            .filter(|dot| dot.area == area && dot.x == x && dot.y == y)
            .map(|dot| dot.multiplicity)
            .sum()
    }

    /// Whether the dots of `row` reproduce the bar counts of that row.
    pub fn reproduces_row(&self, row: Row, d_ss: &RowDifferences) -> bool {
        let m = self.ladder_length;
        (0..m).all(|b| {
            (b..m).all(|d| {
                self.row_multiplicity(row, b, d) == d_ss.get(&(b, d)).copied().unwrap_or(0)
            })
        })
    }
}

/// Cumulative bar counts, keyed by intervals and by the sentinel corners just outside the grid.
#[derive(Debug, Default)]
struct CornerCounts(FxHashMap<Interval, i64>);

impl CornerCounts {
    fn get(&self, key: &Interval) -> Result<i64> {
        self.0.get(key).copied().ok_or_else(|| {
            LadderError::inconsistent(format!("no cumulative count for {key}"))
        })
    }

    fn set(&mut self, key: Interval, value: i64) {
        self.0.insert(key, value);
    }

    fn zero(&mut self, key: Interval) {
        self.set(key, 0);
    }
}

fn span(b: i64, d: i64) -> Span {
    Span::new(b as i32, d as i32)
}

/// Computes connected persistence diagrams.
pub struct CPDAssembler<'a> {
    config: &'a Config,
    lattices: &'a LatticeCache,
    oracle: &'a dyn ZigzagOracle,
}

impl<'a> CPDAssembler<'a> {
    pub fn new(config: &'a Config, lattices: &'a LatticeCache, oracle: &'a dyn ZigzagOracle) -> Self {
        Self {
            config,
            lattices,
            oracle,
        }
    }

    #[tracing::instrument(skip(self, filtration), fields(length = filtration.length(), prime = %self.config.prime))]
    pub fn assemble(
        &self,
        filtration: &CLFiltration,
        dim: usize,
    ) -> Result<ConnectedPersistenceDiagram> {
        let m = filtration.length();
        let lattice = self.lattices.get(m, 2)?;
        let complexes = LadderComplexes::new(filtration, dim);
        let linearizer = LadderLinearizer::new(&complexes, self.config.path_store())?;
        let computer = BarcodeComputer::new(self.oracle, self.config.prime, dim);

        self.config.install(|| {
            let (upper, lower) = maybe_rayon::join(
                || row_differences(&computer, &linearizer, Row::Upper),
                || row_differences(&computer, &linearizer, Row::Lower),
            );
            let (upper, lower) = (upper?, lower?);

            let mut counts = CornerCounts::default();
            for interval in lattice.intervals() {
                counts.zero(interval.clone());
            }
            accumulate_row(&mut counts, Row::Upper, &upper, m)?;
            accumulate_row(&mut counts, Row::Lower, &lower, m)?;
            tracing::info!("row barcodes accumulated");

            let e = Span::empty(m);
            let mut pairs = Vec::new();
            for b0 in 0..m {
                for d1 in b0..m {
                    let s = span(b0 as i64, d1 as i64);
                    if counts.get(&Interval::ladder(s, e))? != 0
                        && counts.get(&Interval::ladder(e, s))? != 0
                    {
                        pairs.push((b0, d1));
                    }
                }
            }
            tracing::info!(pairs = pairs.len(), "computing bent paths");

            let bent: Vec<(usize, usize, BentDifferences)> = pairs
                .into_maybe_par_iter()
                .map(|(b0, d1)| {
                    let path = linearizer.bent_path(b0, d1)?;
                    Ok((b0, d1, computer.bent_differences(&path, b0, d1)?))
                })
                .collect::<Result<_>>()?;
            for (b0, d1, d_ss) in &bent {
                accumulate_bent(&mut counts, *b0, *d1, d_ss, m)?;
            }

            let deltas: Vec<i64> = lattice
                .intervals()
                .into_maybe_par_iter()
                .map(|interval| delta(&lattice, &counts, interval))
                .collect::<Result<_>>()?;
            let dec: Vec<(Interval, i64)> = lattice
                .intervals()
                .iter()
                .zip(deltas)
                .filter(|(_, v)| *v != 0)
                .map(|(i, v)| (i.clone(), v))
                .collect();

            let diagram = ConnectedPersistenceDiagram {
                ladder_length: m,
                dim,
                radii: filtration.values().to_vec(),
                dots: dots(&dec, m),
                lines: lines(&dec),
                dec,
            };
            check_rows(&diagram, &upper, &lower)?;
            tracing::info!(
                intervals = diagram.dec.len(),
                lines = diagram.lines.len(),
                "connected persistence diagram assembled"
            );
            Ok(diagram)
        })
    }
}

/// The dots of each row must add up to the bar counts of that row.
fn check_rows(
    diagram: &ConnectedPersistenceDiagram,
    upper: &RowDifferences,
    lower: &RowDifferences,
) -> Result<()> {
    for (row, d_ss) in [(Row::Upper, upper), (Row::Lower, lower)] {
        if !diagram.reproduces_row(row, d_ss) {
            return Err(LadderError::inconsistent(format!(
                "dots do not reproduce the {row} row barcode"
            )));
        }
    }
    Ok(())
}

fn row_differences(
    computer: &BarcodeComputer<'_>,
    linearizer: &LadderLinearizer,
    row: Row,
) -> Result<RowDifferences> {
    let path = linearizer.row_path(row)?;
    computer.row_differences(&path, linearizer.length())
}

/// The key of a row-only interval.
fn row_key(row: Row, s: Span, m: usize) -> Interval {
    match row {
        Row::Upper => Interval::ladder(Span::empty(m), s),
        Row::Lower => Interval::ladder(s, Span::empty(m)),
    }
}

/// `c(b, d)` is the number of bars of the row containing `[b, d]`.
fn accumulate_row(
    counts: &mut CornerCounts,
    row: Row,
    d_ss: &RowDifferences,
    m: usize,
) -> Result<()> {
    let mi = m as i64;
    let key = |b: i64, d: i64| row_key(row, span(b, d), m);
    counts.zero(key(-1, mi));
    for i in 0..mi {
        counts.zero(key(i, mi));
        counts.zero(key(-1, i));
    }
    for l in (0..mi).rev() {
        for b in 0..mi - l {
            let d = b + l;
            let value = d_ss.get(&(b as usize, d as usize)).copied().unwrap_or(0)
                + counts.get(&key(b - 1, d))?
                + counts.get(&key(b, d + 1))?
                - counts.get(&key(b - 1, d + 1))?;
            counts.set(key(b, d), value);
        }
    }
    Ok(())
}

/// `c((b0, d0), (b1, d1))` is the number of bars of the bent path through `(b0, d1)` born by
/// upper column `b1` and alive in lower column `d0`.
fn accumulate_bent(
    counts: &mut CornerCounts,
    b0: usize,
    d1: usize,
    d_ss: &BentDifferences,
    m: usize,
) -> Result<()> {
    let (b0, d1, mi) = (b0 as i64, d1 as i64, m as i64);
    let key = |d0: i64, b1: i64| Interval::ladder(span(b0, d0), span(b1, d1));
    counts.zero(key(mi, -1));
    for i in d1..mi {
        counts.zero(key(i, -1));
    }
    for i in 0..=b0 {
        counts.zero(key(mi, i));
    }
    for l in (d1 - b0..mi).rev() {
        for b1 in 0..mi - l {
            if b1 > b0 {
                break;
            }
            let d0 = b1 + l;
            if d0 < d1 || d0 > mi - 1 {
                continue;
            }
            let value = d_ss.get(&(d0 as usize, b1 as usize)).copied().unwrap_or(0)
                + counts.get(&key(d0, b1 - 1))?
                + counts.get(&key(d0 + 1, b1))?
                - counts.get(&key(d0 + 1, b1 - 1))?;
            counts.set(key(d0, b1), value);
        }
    }
    Ok(())
}

/// The signed multiplicity of `interval`, by inclusion-exclusion over its covers.
fn delta(lattice: &IntervalLattice, counts: &CornerCounts, interval: &Interval) -> Result<i64> {
    let covers = lattice.covers(interval).ok_or_else(|| {
        LadderError::inconsistent(format!("{interval} is not in the lattice"))
    })?;
    let mut total = 0;
    for subset in covers.iter().powerset() {
        let sign = if subset.len() % 2 == 0 { 1 } else { -1 };
        let joined = subset
            .into_iter()
            .fold(interval.clone(), |acc, cover| join(&acc, cover));
        total += sign * counts.get(&joined)?;
    }
    Ok(total)
}

/// Project the decomposition onto its rows.
fn dots(dec: &[(Interval, i64)], m: usize) -> Vec<Dot> {
    let mut lower = FxHashMap::<Span, i64>::default();
    let mut upper = FxHashMap::<Span, i64>::default();
    for (interval, v) in dec {
        *lower.entry(interval.lower()).or_default() += v;
        *upper.entry(interval.upper()).or_default() += v;
    }
    let mut out = Vec::new();
    for i in 0..m {
        for j in i..m {
            let s = Span::new(i as i32, j as i32);
            let d = lower.get(&s).copied().unwrap_or(0);
            let u = upper.get(&s).copied().unwrap_or(0);
            if d != 0 {
                out.push(Dot {
                    x: j + 1,
                    y: i + 1,
                    multiplicity: d,
                    area: Area::D,
                });
            }
            if u != 0 {
                out.push(Dot {
                    x: i + 1,
                    y: j + 1,
                    multiplicity: u,
                    area: Area::U,
                });
            }
        }
    }
    out
}

fn lines(dec: &[(Interval, i64)]) -> Vec<Line> {
    dec.iter()
        .filter_map(|(interval, v)| {
            let (lo, up) = (interval.lower(), interval.upper());
            let (b1, d1) = (lo.birth + 1, lo.death + 1);
            let (b2, d2) = (up.birth + 1, up.death + 1);
            if d1 <= 0 || d2 <= 0 || (b1 == d1 && b2 == d2) || d2 - b1 > d1 - b2 {
                return None;
            }
            Some(Line {
                x0: d1 as usize,
                y0: b1 as usize,
                x1: b2 as usize,
                y1: d2 as usize,
                multiplicity: *v,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use expect_test::expect;

    use super::*;
    use crate::barcode::FastZigzag;

    fn iv(b0: i32, d0: i32, b1: i32, d1: i32) -> Interval {
        Interval::ladder(Span::new(b0, d0), Span::new(b1, d1))
    }

    #[test]
    fn projection() {
        // The six point decomposition in degree 0.
        let dec = vec![(iv(4, -1, 0, 0), 1), (iv(0, 0, 0, 0), 2), (iv(0, 3, 0, 3), 1)];
        let dots: Vec<String> = dots(&dec, 4)
            .iter()
            .map(|d| format!("({}, {}, {}, {})", d.x, d.y, d.multiplicity, d.area))
            .collect();
        expect![["(1, 1, 2, D) (1, 1, 3, U) (4, 1, 1, D) (1, 4, 1, U)"]].assert_eq(&dots.join(" "));
        expect![[r#"
            [
                Line {
                    x0: 4,
                    y0: 1,
                    x1: 1,
                    y1: 4,
                    multiplicity: 1,
                },
            ]
        "#]]
        .assert_debug_eq(&lines(&dec));
    }

    #[test]
    fn lines_keep_sign() {
        let dec = vec![(iv(2, 3, 1, 2), -1), (iv(2, 3, 1, 3), 1), (iv(2, 3, 2, 2), 1)];
        let rows: Vec<_> = lines(&dec)
            .iter()
            .map(|l| (l.x0, l.y0, l.x1, l.y1, l.multiplicity))
            .collect();
        assert_eq!(rows, vec![(4, 3, 2, 3, -1), (4, 3, 2, 4, 1), (4, 3, 3, 3, 1)]);
    }

    #[test]
    fn single_vertex() {
        let f = CLFiltration::new(
            3,
            vec![0.0, 1.0, 2.0],
            vec![(vec![0], 1)],
            vec![(vec![0], 1)],
        )
        .unwrap();
        let config = Config::default().with_threads(1);
        let lattices = LatticeCache::default();
        let cpd = CPDAssembler::new(&config, &lattices, &FastZigzag);

        let h0 = cpd.assemble(&f, 0).unwrap();
        assert_eq!(h0.labelled_dec(), vec![("0,2,0,2".to_string(), 1)]);
        assert_eq!(h0.lines.len(), 1);
        assert_eq!(h0.row_multiplicity(Row::Upper, 0, 2), 1);
        assert_eq!(h0.row_multiplicity(Row::Lower, 0, 2), 1);

        let h1 = cpd.assemble(&f, 1).unwrap();
        assert!(h1.dots.is_empty() && h1.lines.is_empty() && h1.dec.is_empty());
    }

    /// Counts the paths it is asked about.
    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ZigzagOracle for Counting {
        fn barcode(
            &self,
            operations: &[zigzag::Operation],
            prime: fp::prime::ValidPrime,
        ) -> anyhow::Result<Vec<zigzag::Bar>> {
            self.0.fetch_add(1, Ordering::Relaxed);
            FastZigzag.barcode(operations, prime)
        }
    }

    #[test]
    fn pruned_pairs() {
        // A vertex present in the whole upper row but only from column 1 in the lower row. No
        // lower bar passes through column 0, so the bent paths with b0 = 0 are skipped.
        let f = CLFiltration::new(
            3,
            vec![0.0, 1.0, 2.0],
            vec![(vec![0], 1)],
            vec![(vec![0], 2)],
        )
        .unwrap();
        let config = Config::default().with_threads(1);
        let lattices = LatticeCache::default();
        let oracle = Counting::default();
        let h0 = CPDAssembler::new(&config, &lattices, &oracle)
            .assemble(&f, 0)
            .unwrap();

        // Two rows and the bent paths through (1, 1), (1, 2) and (2, 2).
        assert_eq!(oracle.0.load(Ordering::Relaxed), 5);
        assert_eq!(h0.labelled_dec(), vec![("1,2,0,2".to_string(), 1)]);
        assert_eq!(h0.row_multiplicity(Row::Upper, 0, 2), 1);
        assert_eq!(h0.row_multiplicity(Row::Lower, 1, 2), 1);
        assert_eq!(h0.row_multiplicity(Row::Lower, 0, 2), 0);
        let lines: Vec<_> = h0
            .lines
            .iter()
            .map(|l| (l.x0, l.y0, l.x1, l.y1, l.multiplicity))
            .collect();
        assert_eq!(lines, vec![(3, 2, 1, 3, 1)]);
    }

    #[test]
    fn rows_must_match_dots() {
        let diagram = ConnectedPersistenceDiagram {
            ladder_length: 3,
            dim: 0,
            radii: vec![0.0, 1.0, 2.0],
            dots: dots(&[(iv(0, 2, 0, 2), 1)], 3),
            lines: vec![],
            dec: vec![(iv(0, 2, 0, 2), 1)],
        };
        let full = RowDifferences::from_iter([((0, 2), 1)]);
        let short = RowDifferences::from_iter([((0, 1), 1)]);
        assert_eq!(check_rows(&diagram, &full, &full), Ok(()));

        expect![["arithmetic inconsistency: dots do not reproduce the upper row barcode"]]
            .assert_eq(&check_rows(&diagram, &short, &full).unwrap_err().to_string());
        expect![["arithmetic inconsistency: dots do not reproduce the lower row barcode"]]
            .assert_eq(&check_rows(&diagram, &full, &short).unwrap_err().to_string());
    }

    #[test]
    fn json_shape() {
        let diagram = ConnectedPersistenceDiagram {
            ladder_length: 2,
            dim: 0,
            radii: vec![0.5, 1.0],
            dots: vec![Dot {
                x: 1,
                y: 2,
                multiplicity: 1,
                area: Area::U,
            }],
            lines: vec![],
            dec: vec![(iv(2, -1, 0, 1), 1)],
        };
        expect![[r#"{"ladder_length":2,"dim":0,"radii":[0.5,1.0],"dots":[{"x":1,"y":2,"multiplicity":1,"area":"U"}],"lines":[]}"#]]
            .assert_eq(&serde_json::to_string(&diagram).unwrap());
    }
}
