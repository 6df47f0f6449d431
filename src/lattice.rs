//! The lattice of interval shapes of a ladder.
//!
//! An interval of the $n \times m$ grid is a connected, convex set of nodes. Row by row it is a
//! list of [`Span`]s, with the sentinel span `(m, -1)` standing for an empty row. Non-empty rows
//! form a contiguous block, and consecutive non-empty rows `j`, `j + 1` satisfy
//! $b_{j+1} \le b_j \le d_{j+1} \le d_j$.
//!
//! Intervals are produced in a fixed breadth-first order which also names them: the `k`th interval
//! of the $2 \times 4$ lattice is the class `I{k+1}` of the finite-type decomposition.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{LadderError, Result};
use crate::filtration::Row;
use crate::save::LatticeDirectory;

/// Largest supported ladder length and height.
pub const MAX_SIZE: usize = 999;

/// A closed range of columns in one row, or one of the sentinel keys used by the cumulative
/// counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Span {
    pub birth: i32,
    pub death: i32,
}

impl Span {
    pub const fn new(birth: i32, death: i32) -> Self {
        Self { birth, death }
    }

    /// The empty row of a ladder of length `m`.
    pub const fn empty(m: usize) -> Self {
        Self {
            birth: m as i32,
            death: -1,
        }
    }

    pub fn is_present(self) -> bool {
        self.death > -1
    }

    /// The number of columns covered.
    pub fn len(self) -> usize {
        (self.death - self.birth + 1).max(0) as usize
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn contains(self, column: usize) -> bool {
        let c = column as i32;
        self.birth <= c && c <= self.death
    }
}

impl From<(i32, i32)> for Span {
    fn from((birth, death): (i32, i32)) -> Self {
        Self { birth, death }
    }
}

impl From<Span> for (i32, i32) {
    fn from(s: Span) -> Self {
        (s.birth, s.death)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interval(Vec<Span>);

impl Interval {
    pub fn new(rows: Vec<Span>) -> Self {
        Self(rows)
    }

    /// An interval of a ladder, lower row first.
    pub fn ladder(lower: Span, upper: Span) -> Self {
        Self(vec![lower, upper])
    }

    pub fn rows(&self) -> &[Span] {
        &self.0
    }

    pub fn row(&self, row: Row) -> Span {
        self.0[row.index()]
    }

    pub fn lower(&self) -> Span {
        self.0[0]
    }

    pub fn upper(&self) -> Span {
        self.0[1]
    }

    pub fn height(&self) -> usize {
        self.0.len()
    }

    /// The first and last non-empty rows.
    pub fn support(&self) -> Option<(usize, usize)> {
        let s = self.0.iter().position(|r| r.is_present())?;
        let t = self.0.iter().rposition(|r| r.is_present())?;
        Some((s, t))
    }

    /// The number of nodes in the interval.
    pub fn size(&self) -> usize {
        self.0.iter().map(|r| r.len()).sum()
    }

    pub fn contains_node(&self, column: usize, row: usize) -> bool {
        self.0.get(row).is_some_and(|r| r.contains(column))
    }

    /// Replace the span in row `j`.
    fn with_row(&self, j: usize, span: Span) -> Self {
        let mut rows = self.0.clone();
        rows[j] = span;
        Self(rows)
    }
}

/// Intervals are written as their comma separated spans, lower row first, e.g. `0,3,1,2`.
impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for r in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{},{}", r.birth, r.death)?;
        }
        Ok(())
    }
}

/// The row-wise hull of two intervals, corrected so that adjacent rows still overlap.
pub fn join(x: &Interval, y: &Interval) -> Interval {
    let mut z: Vec<Span> = x
        .0
        .iter()
        .zip(&y.0)
        .map(|(a, b)| Span::new(a.birth.min(b.birth), a.death.max(b.death)))
        .collect();
    let n = z.len();
    let s = z.iter().position(|r| r.is_present()).unwrap_or(n);
    let t = z.iter().rposition(|r| r.is_present()).unwrap_or(0);
    if s < t && z[s].death < z[s + 1].death {
        z[s].death += 1;
    }
    if s < t && z[t].birth > z[t - 1].birth {
        z[t].birth -= 1;
    }
    Interval(z)
}

/// The intervals of an `height x length` grid with their covers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IntervalLattice {
    length: usize,
    height: usize,
    intervals: Vec<Interval>,
    covers: Vec<Vec<Interval>>,
    #[serde(skip)]
    index: FxHashMap<Interval, usize>,
}

impl PartialEq for IntervalLattice {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length
            && self.height == other.height
            && self.intervals == other.intervals
            && self.covers == other.covers
    }
}

impl IntervalLattice {
    #[tracing::instrument]
    pub fn generate(length: usize, height: usize) -> Result<Self> {
        if !(1..=MAX_SIZE).contains(&length) || !(1..=MAX_SIZE).contains(&height) {
            return Err(LadderError::unsupported(format!(
                "lattice of size {height}x{length}: both sides must lie in 1..={MAX_SIZE}"
            )));
        }
        let m = length as i32;
        let e = Span::empty(length);

        let mut queue: VecDeque<Vec<Span>> = VecDeque::new();
        for k in 0..height {
            for b in 0..m {
                for d in b..m {
                    let mut rows = vec![e; k];
                    rows.push(Span::new(b, d));
                    queue.push_back(rows);
                }
            }
        }
        let mut intervals = Vec::new();
        while let Some(mut rows) = queue.pop_front() {
            if rows.len() < height {
                let Span { birth: p, death: q } = rows[rows.len() - 1];
                for b in 0..=p {
                    for d in p..=q {
                        let mut next = rows.clone();
                        next.push(Span::new(b, d));
                        queue.push_back(next);
                    }
                }
            }
            rows.resize(height, e);
            intervals.push(Interval(rows));
        }

        let covers = intervals.iter().map(|i| cover(i, length)).collect();
        let lattice = Self::from_parts(length, height, intervals, covers);
        tracing::info!(intervals = lattice.len(), "interval lattice generated");
        Ok(lattice)
    }

    fn from_parts(
        length: usize,
        height: usize,
        intervals: Vec<Interval>,
        covers: Vec<Vec<Interval>>,
    ) -> Self {
        let index = intervals
            .iter()
            .enumerate()
            .map(|(i, x)| (x.clone(), i))
            .collect();
        Self {
            length,
            height,
            intervals,
            covers,
            index,
        }
    }

    /// Restore the lookup table after deserializing, and check that the data is consistent.
    pub(crate) fn reindex(self) -> Result<Self> {
        let Self {
            length,
            height,
            intervals,
            covers,
            ..
        } = self;
        if covers.len() != intervals.len()
            || intervals.iter().any(|i| i.height() != height)
        {
            return Err(LadderError::Storage(format!(
                "malformed {height}x{length} lattice"
            )));
        }
        Ok(Self::from_parts(length, height, intervals, covers))
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn position(&self, interval: &Interval) -> Option<usize> {
        self.index.get(interval).copied()
    }

    pub fn covers(&self, interval: &Interval) -> Option<&[Interval]> {
        self.position(interval).map(|i| self.covers[i].as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Interval, &[Interval])> {
        self.intervals
            .iter()
            .zip(&self.covers)
            .map(|(i, c)| (i, c.as_slice()))
    }
}

/// The intervals obtained from `x` by adding one node.
fn cover(x: &Interval, m: usize) -> Vec<Interval> {
    let n = x.height();
    let Some((s, t)) = x.support() else {
        return Vec::new();
    };
    let rows = x.rows();
    let b = rows[t].birth;
    let d = rows[s].death;
    let mut out = Vec::new();
    if t + 1 < n {
        out.push(x.with_row(t + 1, Span::new(b, b)));
    }
    if s > 0 {
        out.push(x.with_row(s - 1, Span::new(d, d)));
    }
    if b > 0 {
        out.push(x.with_row(t, Span::new(b - 1, rows[t].death)));
    }
    for j in (s..t).rev() {
        if rows[j + 1].birth < rows[j].birth {
            out.push(x.with_row(j, Span::new(rows[j].birth - 1, rows[j].death)));
        }
    }
    if d < m as i32 - 1 {
        out.push(x.with_row(s, Span::new(rows[s].birth, d + 1)));
    }
    for j in s + 1..=t {
        if rows[j - 1].death > rows[j].death {
            out.push(x.with_row(j, Span::new(rows[j].birth, rows[j].death + 1)));
        }
    }
    out
}

/// Lattices by `(length, height)`, shared between computations.
///
/// A lattice is looked up in memory, then in the read directory, and is generated otherwise.
/// Generated lattices are written to the write directory if there is one.
#[derive(Debug, Default)]
pub struct LatticeCache {
    lattices: DashMap<(usize, usize), Arc<IntervalLattice>>,
    directory: LatticeDirectory,
}

impl LatticeCache {
    pub fn new(directory: LatticeDirectory) -> Self {
        Self {
            lattices: DashMap::new(),
            directory,
        }
    }

    pub fn directory(&self) -> &LatticeDirectory {
        &self.directory
    }

    pub fn get(&self, length: usize, height: usize) -> Result<Arc<IntervalLattice>> {
        if let Some(l) = self.lattices.get(&(length, height)) {
            return Ok(Arc::clone(&l));
        }
        let lattice = match self.directory.load_lattice(length, height)? {
            Some(l) => l,
            None => {
                let l = IntervalLattice::generate(length, height)?;
                self.directory.save_lattice(&l)?;
                l
            }
        };
        let lattice = Arc::new(lattice);
        self.lattices
            .insert((length, height), Arc::clone(&lattice));
        Ok(lattice)
    }

    pub fn invalidate(&self, length: usize, height: usize) {
        self.lattices.remove(&(length, height));
    }

    pub fn clear(&self) {
        self.lattices.clear();
    }

    pub fn len(&self) -> usize {
        self.lattices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lattices.is_empty()
    }
}
