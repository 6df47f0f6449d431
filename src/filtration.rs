//! Commutative ladder filtrations.
//!
//! A CL filtration of length $m$ is a $2 \times m$ grid of simplicial complexes
//! $$ \begin{array}{ccccccc}
//! U_1 & \to & U_2 & \to & \cdots & \to & U_m \\
//! \uparrow & & \uparrow & & & & \uparrow \\
//! L_1 & \to & L_2 & \to & \cdots & \to & L_m
//! \end{array} $$
//! where every arrow is an inclusion. It is described by two streams of simplices, one per row,
//! each simplex stamped with the first column in which it appears.

use std::io::BufRead;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use zigzag::Simplex;

use crate::error::{LadderError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Row {
    Lower,
    Upper,
}

impl Row {
    pub const ALL: [Row; 2] = [Row::Lower, Row::Upper];

    /// The row index used by intervals and tours: 0 for the lower row and 1 for the upper.
    pub fn index(self) -> usize {
        match self {
            Row::Lower => 0,
            Row::Upper => 1,
        }
    }

    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(Row::Lower),
            1 => Some(Row::Upper),
            _ => None,
        }
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Row::Lower => write!(f, "lower"),
            Row::Upper => write!(f, "upper"),
        }
    }
}

/// A simplex together with the first column (counted from 1) in which it is present.
pub type Stamped = (Simplex, usize);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFiltration", into = "RawFiltration")]
pub struct CLFiltration {
    length: usize,
    values: Vec<f64>,
    upper: Vec<Stamped>,
    lower: Vec<Stamped>,
}

#[derive(Serialize, Deserialize)]
struct RawFiltration {
    #[serde(default)]
    length: Option<usize>,
    values: Vec<f64>,
    upper: Vec<Stamped>,
    lower: Vec<Stamped>,
}

impl TryFrom<RawFiltration> for CLFiltration {
    type Error = LadderError;

    fn try_from(raw: RawFiltration) -> Result<Self> {
        let length = raw.length.unwrap_or(raw.values.len());
        Self::new(length, raw.values, raw.upper, raw.lower)
    }
}

impl From<CLFiltration> for RawFiltration {
    fn from(f: CLFiltration) -> Self {
        Self {
            length: Some(f.length),
            values: f.values,
            upper: f.upper,
            lower: f.lower,
        }
    }
}

impl CLFiltration {
    /// Build a filtration from its two simplex streams.
    ///
    /// The streams must describe simplicial complexes: every simplex is a strictly increasing
    /// list of vertices whose faces appear no later in the same row, and every simplex of the
    /// lower row appears in the upper row no later than in the lower row.
    pub fn new(
        length: usize,
        values: Vec<f64>,
        upper: Vec<Stamped>,
        lower: Vec<Stamped>,
    ) -> Result<Self> {
        if length == 0 {
            return Err(LadderError::invalid("ladder length must be positive"));
        }
        if values.len() != length {
            return Err(LadderError::invalid(format!(
                "expected {length} filtration values, got {}",
                values.len()
            )));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(LadderError::invalid(format!("filtration value {v} is not finite")));
        }
        if let Some(w) = values.windows(2).find(|w| w[0] >= w[1]) {
            return Err(LadderError::invalid(format!(
                "filtration values must be strictly increasing, but {} is followed by {}",
                w[0], w[1]
            )));
        }

        let upper_stamps = check_row(Row::Upper, &upper, length)?;
        check_row(Row::Lower, &lower, length)?;
        for (simplex, col) in &lower {
            match upper_stamps.get(simplex.as_slice()) {
                Some(&c) if c <= *col => {}
                Some(&c) => {
                    return Err(LadderError::invalid(format!(
                        "{simplex:?} enters the lower row at column {col} but the upper row only at column {c}"
                    )))
                }
                None => {
                    return Err(LadderError::invalid(format!(
                        "{simplex:?} is in the lower row but not in the upper row"
                    )))
                }
            }
        }

        Ok(Self {
            length,
            values,
            upper,
            lower,
        })
    }

    /// Parse the line-oriented text format.
    ///
    /// Each line reads `dim time row col v0 ... vdim`, where `row` is 0 for the lower row and 1
    /// for the upper row and `col` is ignored. Blank lines and lines starting with `#` are
    /// skipped. The column of a simplex is the first index whose filtration value is at least
    /// `time`. Parsing stops at the first simplex whose time exceeds the last value, so the
    /// lines should be sorted by time.
    ///
    /// Lower row simplices are added to the upper row as well.
    pub fn parse_text(reader: impl BufRead, values: Vec<f64>) -> Result<Self> {
        let length = values.len();
        let mut upper = StampedStream::default();
        let mut lower = StampedStream::default();

        for (idx, line) in reader.lines().enumerate() {
            let lineno = idx + 1;
            let line = line.map_err(|e| LadderError::invalid(format!("line {lineno}: {e}")))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bad = |what: &str| LadderError::invalid(format!("line {lineno}: {what}: {line:?}"));
            let mut fields = line.split_whitespace();
            let dim: usize = fields
                .next()
                .and_then(|x| x.parse().ok())
                .ok_or_else(|| bad("bad dimension"))?;
            let time: f64 = fields
                .next()
                .and_then(|x| x.parse().ok())
                .ok_or_else(|| bad("bad time"))?;
            let row = fields
                .next()
                .and_then(|x| x.parse().ok())
                .and_then(Row::from_index)
                .ok_or_else(|| bad("row must be 0 or 1"))?;
            fields.next().ok_or_else(|| bad("missing column"))?;
            let simplex: Simplex = fields
                .map(str::parse)
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| bad("bad vertex"))?;
            if simplex.len() != dim + 1 {
                return Err(bad("dimension does not match the number of vertices"));
            }

            let col = values.partition_point(|&v| v < time);
            if col == length {
                break;
            }
            let col = col + 1;
            upper.stamp(&simplex, col);
            if row == Row::Lower {
                lower.stamp(&simplex, col);
            }
        }

        Self::new(length, values, upper.into_vec(), lower.into_vec())
    }

    /// The number of columns $m$.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn stream(&self, row: Row) -> &[Stamped] {
        match row {
            Row::Upper => &self.upper,
            Row::Lower => &self.lower,
        }
    }

    /// The largest simplex dimension in either row.
    pub fn max_dim(&self) -> Option<usize> {
        self.upper.iter().map(|(s, _)| s.len() - 1).max()
    }
}

fn check_row<'a>(
    row: Row,
    stream: &'a [Stamped],
    length: usize,
) -> Result<FxHashMap<&'a [u32], usize>> {
    let mut stamps: FxHashMap<&[u32], usize> = FxHashMap::default();
    for (simplex, col) in stream {
        if simplex.is_empty() {
            return Err(LadderError::invalid(format!("empty simplex in the {row} row")));
        }
        if simplex.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LadderError::invalid(format!(
                "{simplex:?} in the {row} row is not sorted and duplicate free"
            )));
        }
        if !(1..=length).contains(col) {
            return Err(LadderError::invalid(format!(
                "{simplex:?} in the {row} row has column {col} outside 1..={length}"
            )));
        }
        if stamps.insert(simplex.as_slice(), *col).is_some() {
            return Err(LadderError::invalid(format!(
                "{simplex:?} appears twice in the {row} row"
            )));
        }
    }
    for (simplex, col) in stream {
        if simplex.len() < 2 {
            continue;
        }
        for t in 0..simplex.len() {
            let face: Vec<u32> = simplex
                .iter()
                .enumerate()
                .filter_map(|(k, &v)| (k != t).then_some(v))
                .collect();
            match stamps.get(face.as_slice()) {
                Some(c) if c <= col => {}
                _ => {
                    return Err(LadderError::invalid(format!(
                        "face {face:?} of {simplex:?} is missing from column {col} of the {row} row"
                    )))
                }
            }
        }
    }
    Ok(stamps)
}

/// Simplices in order of first appearance, keeping the earliest column of each.
#[derive(Default)]
struct StampedStream {
    entries: Vec<Stamped>,
    position: FxHashMap<Simplex, usize>,
}

impl StampedStream {
    fn stamp(&mut self, simplex: &Simplex, col: usize) {
        match self.position.get(simplex) {
            Some(&i) => {
                let entry = &mut self.entries[i].1;
                *entry = (*entry).min(col);
            }
            None => {
                self.position.insert(simplex.clone(), self.entries.len());
                self.entries.push((simplex.clone(), col));
            }
        }
    }

    fn into_vec(self) -> Vec<Stamped> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use rstest::rstest;

    use super::*;

    const TRIANGLE: &str = "\
# dim time row col vertices
0 0.0 0 0 0
0 0.0 0 0 1
0 0.5 1 0 2
1 1.0 0 1 0 1
1 1.5 1 2 1 2

1 1.5 1 2 0 2
2 2.5 1 2 0 1 2
";

    #[test]
    fn parse_text_format() {
        let f = CLFiltration::parse_text(TRIANGLE.as_bytes(), vec![0.5, 1.0, 2.0]).unwrap();
        assert_eq!(f.length(), 3);
        assert_eq!(
            f.stream(Row::Lower),
            &[(vec![0], 1), (vec![1], 1), (vec![0, 1], 2)]
        );
        // The 2-simplex appears after the last value and ends the stream.
        assert_eq!(
            f.stream(Row::Upper),
            &[
                (vec![0], 1),
                (vec![1], 1),
                (vec![2], 1),
                (vec![0, 1], 2),
                (vec![1, 2], 3),
                (vec![0, 2], 3)
            ]
        );
        assert_eq!(f.max_dim(), Some(1));
    }

    #[test]
    fn parse_text_rejects_dimension_mismatch() {
        let err = CLFiltration::parse_text("1 0.0 1 0 3".as_bytes(), vec![1.0]).unwrap_err();
        expect![[r#"invalid input: line 1: dimension does not match the number of vertices: "1 0.0 1 0 3""#]]
            .assert_eq(&err.to_string());
    }

    fn stamped(v: &[(&[u32], usize)]) -> Vec<Stamped> {
        v.iter().map(|(s, c)| (s.to_vec(), *c)).collect()
    }

    #[rstest]
    #[case::unsorted(stamped(&[(&[1], 1), (&[0], 1), (&[1, 0], 1)]), vec![])]
    #[case::missing_face(stamped(&[(&[0], 1), (&[0, 1], 1)]), vec![])]
    #[case::face_too_late(stamped(&[(&[0], 1), (&[1], 2), (&[0, 1], 1)]), vec![])]
    #[case::column_out_of_range(stamped(&[(&[0], 3)]), vec![])]
    #[case::duplicate(stamped(&[(&[0], 1), (&[0], 2)]), vec![])]
    #[case::lower_not_in_upper(stamped(&[(&[0], 1)]), stamped(&[(&[1], 1)]))]
    #[case::lower_before_upper(stamped(&[(&[0], 2)]), stamped(&[(&[0], 1)]))]
    fn rejects_malformed_streams(#[case] upper: Vec<Stamped>, #[case] lower: Vec<Stamped>) {
        let err = CLFiltration::new(2, vec![0.0, 1.0], upper, lower).unwrap_err();
        assert!(matches!(err, LadderError::InvalidInput(_)), "{err}");
    }

    #[rstest]
    #[case(vec![0.0])]
    #[case(vec![1.0, 1.0])]
    #[case(vec![2.0, 1.0])]
    #[case(vec![0.0, f64::NAN])]
    fn rejects_bad_values(#[case] values: Vec<f64>) {
        let err = CLFiltration::new(2, values, vec![], vec![]).unwrap_err();
        assert!(matches!(err, LadderError::InvalidInput(_)), "{err}");
    }

    #[test]
    fn json_round_trip() {
        let json = r#"{"values": [0.1, 0.2], "upper": [[[0], 1], [[1], 2], [[0, 1], 2]], "lower": [[[0], 1]]}"#;
        let f: CLFiltration = serde_json::from_str(json).unwrap();
        assert_eq!(f.length(), 2);
        let back: CLFiltration = serde_json::from_str(&serde_json::to_string(&f).unwrap()).unwrap();
        assert_eq!(back, f);

        let bad = r#"{"values": [0.1, 0.2], "upper": [[[0, 1], 1]], "lower": []}"#;
        assert!(serde_json::from_str::<CLFiltration>(bad).is_err());
    }
}
