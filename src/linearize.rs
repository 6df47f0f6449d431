//! Zigzag paths through a commutative ladder.
//!
//! The homology of a ladder is read off by restricting it to paths that visit nodes of the grid
//! and walk along its arrows, forwards or backwards. Along such a path the ladder becomes a
//! zigzag of complexes, which is turned into a sequence of single simplex insertions and
//! deletions by walking the arrows one [`Segment`] at a time.
//!
//! Within a segment, simplices are inserted in graded order (fewer vertices first, then
//! lexicographically) and deleted in the reverse order, so every intermediate step is a
//! simplicial complex.

use std::{borrow::Cow, cmp::Ordering, fmt};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use zigzag::{Operation, Simplex};

use crate::{
    error::{LadderError, Result},
    filtration::{CLFiltration, Row},
    store::PathStore,
};

/// A node of the ladder, as (column, row). Columns are counted from 0.
pub type Node = (usize, Row);

/// An elementary piece of a path, stored as the simplices it inserts when walked forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Every simplex of the complex at a node.
    Node(usize, Row),
    /// The arrow from column `i` to column `i + 1` within a row.
    Horizontal(Row, usize),
    /// The arrow from the lower to the upper row at a column.
    Vertical(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(i, row) => write!(f, "node ({i}, {row})"),
            Self::Horizontal(row, i) => write!(f, "{row} {i} -> {}", i + 1),
            Self::Vertical(i) => write!(f, "vertical at {i}"),
        }
    }
}

/// Insertion order within a segment.
pub fn graded(a: &Simplex, b: &Simplex) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// The complexes of a filtration, truncated to the simplices relevant for homology in a fixed
/// dimension.
#[derive(Clone, Debug)]
pub struct LadderComplexes {
    length: usize,
    upper: Vec<(Simplex, usize)>,
    lower: Vec<(Simplex, usize)>,
    lower_column: FxHashMap<Simplex, usize>,
}

impl LadderComplexes {
    /// Keep the simplices of dimension at most `homology_dim + 1`. Columns are stored from 0.
    pub fn new(filtration: &CLFiltration, homology_dim: usize) -> Self {
        let keep = |row: Row| -> Vec<(Simplex, usize)> {
            filtration
                .stream(row)
                .iter()
                .filter(|(s, _)| s.len() <= homology_dim + 2)
                .map(|(s, col)| (s.clone(), col - 1))
                .collect()
        };
        let upper = keep(Row::Upper);
        let lower = keep(Row::Lower);
        let lower_column = lower.iter().cloned().collect();
        Self {
            length: filtration.length(),
            upper,
            lower,
            lower_column,
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn row(&self, row: Row) -> &[(Simplex, usize)] {
        match row {
            Row::Upper => &self.upper,
            Row::Lower => &self.lower,
        }
    }

    fn collect(&self, row: Row, pred: impl Fn(&Simplex, usize) -> bool) -> Vec<Simplex> {
        let mut out: Vec<Simplex> = self
            .row(row)
            .iter()
            .filter(|(s, col)| pred(s, *col))
            .map(|(s, _)| s.clone())
            .collect();
        out.sort_unstable_by(graded);
        out
    }

    /// The complex at a node.
    pub fn node(&self, column: usize, row: Row) -> Vec<Simplex> {
        self.collect(row, |_, col| col <= column)
    }

    /// The simplices added from `column` to `column + 1`.
    pub fn horizontal(&self, row: Row, column: usize) -> Vec<Simplex> {
        self.collect(row, |_, col| col == column + 1)
    }

    /// The simplices of the upper complex at `column` missing from the lower one.
    pub fn vertical(&self, column: usize) -> Vec<Simplex> {
        self.collect(Row::Upper, |s, col| {
            col <= column && self.lower_column.get(s).map_or(true, |&c| c > column)
        })
    }

    pub fn segment(&self, segment: Segment) -> Vec<Simplex> {
        match segment {
            Segment::Node(i, row) => self.node(i, row),
            Segment::Horizontal(row, i) => self.horizontal(row, i),
            Segment::Vertical(i) => self.vertical(i),
        }
    }

    /// Every segment of the ladder.
    pub fn segments(&self) -> impl Iterator<Item = Segment> {
        let m = self.length;
        Row::ALL.into_iter().flat_map(move |row| {
            (0..m)
                .map(move |i| Segment::Node(i, row))
                .chain((0..m - 1).map(move |i| Segment::Horizontal(row, i)))
        })
        .chain((0..m).map(Segment::Vertical))
    }
}

/// Positions in a linearized path at which the ladder columns are complete.
///
/// For a path that builds the columns one after the other, entry `j + 1` is the number of
/// operations after which column `j` is fully built. The first entry is 0 and the last is one
/// past the end of the path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAligner(Vec<usize>);

impl IndexAligner {
    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    pub fn get(&self, i: usize) -> Option<usize> {
        self.0.get(i).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `j` with `S[j] < p <= S[j + 1]`, i.e. the block during which position `p` is reached.
    pub fn birth_slot(&self, p: usize) -> Option<usize> {
        let j = self.0.partition_point(|&s| s < p).checked_sub(1)?;
        (j + 1 < self.0.len()).then_some(j)
    }

    /// The `k` with `S[k] <= q < S[k + 1]`, i.e. the last block boundary at or before `q`.
    pub fn death_slot(&self, q: usize) -> Option<usize> {
        let k = self.0.partition_point(|&s| s <= q).checked_sub(1)?;
        (k + 1 < self.0.len()).then_some(k)
    }
}

/// A path through the ladder as a sequence of insertions and deletions.
#[derive(Clone, Debug)]
pub struct Linearization {
    pub description: String,
    pub operations: Vec<Operation>,
    pub aligner: IndexAligner,
}

impl Linearization {
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builds paths from the segments of a ladder.
pub struct LadderLinearizer {
    length: usize,
    store: Box<dyn PathStore>,
}

impl fmt::Debug for LadderLinearizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LadderLinearizer")
            .field("length", &self.length)
            .field("segments", &self.store.len())
            .finish()
    }
}

impl LadderLinearizer {
    /// Compute every segment of `complexes` into `store`.
    #[tracing::instrument(skip_all, fields(length = complexes.length()))]
    pub fn new(complexes: &LadderComplexes, mut store: Box<dyn PathStore>) -> Result<Self> {
        for segment in complexes.segments() {
            if !store.contains(&segment) {
                store.insert(segment, complexes.segment(segment))?;
            }
        }
        tracing::debug!(segments = store.len(), "segments stored");
        Ok(Self {
            length: complexes.length(),
            store,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    fn segment(&self, segment: Segment) -> Result<Cow<'_, [Simplex]>> {
        self.store
            .get(&segment)?
            .ok_or_else(|| LadderError::inconsistent(format!("segment {segment} is not stored")))
    }

    /// Append the insertions of `segment` and return how many there were.
    fn forward(&self, segment: Segment, ops: &mut Vec<Operation>) -> Result<usize> {
        let simplices = self.segment(segment)?;
        ops.extend(simplices.iter().cloned().map(Operation::insert));
        Ok(simplices.len())
    }

    /// Append the deletions undoing `segment` and return how many there were.
    fn backward(&self, segment: Segment, ops: &mut Vec<Operation>) -> Result<usize> {
        let simplices = self.segment(segment)?;
        ops.extend(simplices.iter().rev().cloned().map(Operation::delete));
        Ok(simplices.len())
    }

    /// The path along one row, from the first column to the last.
    pub fn row_path(&self, row: Row) -> Result<Linearization> {
        let mut operations = Vec::new();
        let mut aligner = vec![0];
        aligner.push(self.forward(Segment::Node(0, row), &mut operations)?);
        for i in 0..self.length - 1 {
            self.forward(Segment::Horizontal(row, i), &mut operations)?;
            aligner.push(operations.len());
        }
        aligner.push(operations.len() + 1);
        Ok(Linearization {
            description: format!("{row} row"),
            operations,
            aligner: IndexAligner(aligner),
        })
    }

    /// The path along the upper row up to column `d1`, back to column `b0`, down to the lower
    /// row and along it to the last column.
    ///
    /// The walk from the upper node at `d1` to the lower node at `b0` is a single block of the
    /// aligner.
    pub fn bent_path(&self, b0: usize, d1: usize) -> Result<Linearization> {
        if b0 > d1 || d1 >= self.length {
            return Err(LadderError::invalid(format!(
                "no bent path from upper column {d1} to lower column {b0} in a ladder of length {}",
                self.length
            )));
        }
        let mut operations = Vec::new();
        let mut aligner = vec![0];
        aligner.push(self.forward(Segment::Node(0, Row::Upper), &mut operations)?);
        for i in 0..d1 {
            self.forward(Segment::Horizontal(Row::Upper, i), &mut operations)?;
            aligner.push(operations.len());
        }
        for i in (b0..d1).rev() {
            self.backward(Segment::Horizontal(Row::Upper, i), &mut operations)?;
        }
        self.backward(Segment::Vertical(b0), &mut operations)?;
        aligner.push(operations.len());
        for i in b0..self.length - 1 {
            self.forward(Segment::Horizontal(Row::Lower, i), &mut operations)?;
            aligner.push(operations.len());
        }
        aligner.push(operations.len() + 1);
        Ok(Linearization {
            description: format!("bent path ({b0}, {d1})"),
            operations,
            aligner: IndexAligner(aligner),
        })
    }

    /// The path visiting `nodes` in order. Consecutive nodes must be joined by an arrow of the
    /// ladder. The aligner is `[0, n]` where `n` is the size of the complex at the first node.
    pub fn tour(&self, nodes: &[Node]) -> Result<Linearization> {
        let describe = || {
            let steps: Vec<String> = nodes.iter().map(|(i, r)| format!("({i}, {r})")).collect();
            format!("tour {}", steps.join(" "))
        };
        let in_range = |&(i, _): &Node| i < self.length;
        let Some(&(c, r)) = nodes.first().filter(|n| in_range(*n)) else {
            return Err(LadderError::invalid(format!("{} has no valid start", describe())));
        };

        let mut operations = Vec::new();
        let start = self.forward(Segment::Node(c, r), &mut operations)?;
        for pair in nodes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if !in_range(&b) {
                return Err(LadderError::invalid(format!(
                    "{} leaves the ladder",
                    describe()
                )));
            }
            match (a, b) {
                ((i, r), (j, s)) if r == s && j == i + 1 => {
                    self.forward(Segment::Horizontal(r, i), &mut operations)?
                }
                ((i, r), (j, s)) if r == s && i == j + 1 => {
                    self.backward(Segment::Horizontal(r, j), &mut operations)?
                }
                ((i, Row::Lower), (j, Row::Upper)) if i == j => {
                    self.forward(Segment::Vertical(i), &mut operations)?
                }
                ((i, Row::Upper), (j, Row::Lower)) if i == j => {
                    self.backward(Segment::Vertical(i), &mut operations)?
                }
                _ => {
                    return Err(LadderError::invalid(format!(
                        "{} jumps from {a:?} to {b:?}",
                        describe()
                    )))
                }
            };
        }
        Ok(Linearization {
            description: describe(),
            operations,
            aligner: IndexAligner(vec![0, start]),
        })
    }
}
