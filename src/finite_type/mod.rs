//! Total decompositions of commutative ladders of length 3 and 4.
//!
//! The ladders $CL(3)$ and $CL(4)$ are of finite representation type: every persistence module
//! over them is a direct sum of finitely many indecomposables, 27 + 2 for $CL(3)$ and 55 + 21 for
//! $CL(4)$. The indecomposables are the intervals of the ladder, labelled `I1, I2, ...` in
//! lattice order, and a few non-interval classes `N1, N2, ...`. `Nk` is the `k`th dimension
//! vector listed in `NON_INTERVALS` of `cl3.rs` or `cl4.rs`, which are sorted by total dimension
//! and then by dimension vector with the lower row first.
//!
//! The multiplicities are determined by one number per tour: the number of full bars of the
//! zigzag module obtained by restricting to the tour. For an interval `I` the interval tour runs
//! along its upper row, back to the start of its lower row and along the lower row. Since an
//! indecomposable `X` contributes a fixed number of full bars to the restriction along a tour
//! `t`, the tour counts `b` and multiplicities `x` satisfy a square linear system `A x = b`,
//! where `A[t][X]` is the number of full bars of `X` along `t`.

mod cl3;
mod cl4;

use std::{collections::BTreeMap, fmt, str::FromStr};

use fp::prime::ValidPrime;
use maybe_rayon::prelude::*;
use serde::{
    de::Error as _,
    ser::{SerializeMap, SerializeStruct},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::{
    barcode::{BarcodeComputer, ZigzagOracle},
    error::{LadderError, Result},
    filtration::{CLFiltration, Row},
    lattice::{Interval, IntervalLattice, LatticeCache},
    linearize::{LadderComplexes, LadderLinearizer},
    utils::Config,
};

/// A node of a ladder in the constant tables, as (column, row) with row 0 the lower row.
type Node = (u8, u8);

const RESIDUAL_TOLERANCE: f64 = 1e-5;

/// The name of an indecomposable class. Both kinds are numbered from 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassLabel {
    NonInterval(usize),
    Interval(usize),
}

impl ClassLabel {
    pub fn is_interval(self) -> bool {
        matches!(self, Self::Interval(_))
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonInterval(i) => write!(f, "N{i}"),
            Self::Interval(i) => write!(f, "I{i}"),
        }
    }
}

impl FromStr for ClassLabel {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || LadderError::invalid(format!("{s:?} is not a class label"));
        let (make, num): (fn(usize) -> Self, _) = if let Some(num) = s.strip_prefix('N') {
            (Self::NonInterval, num)
        } else if let Some(num) = s.strip_prefix('I') {
            (Self::Interval, num)
        } else {
            return Err(bad());
        };
        match num.parse() {
            Ok(0) | Err(_) => Err(bad()),
            Ok(num) => Ok(make(num)),
        }
    }
}

impl Serialize for ClassLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClassLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// The constants of one ladder length.
struct Tables {
    extra_tours: &'static [&'static [Node]],
    coefficients: Vec<&'static [u8]>,
    non_intervals: Vec<&'static [u8]>,
}

fn rows<const K: usize>(table: &'static [[u8; K]]) -> Vec<&'static [u8]> {
    table.iter().map(|row| row.as_slice()).collect()
}

impl Tables {
    fn for_length(length: usize) -> Result<Self> {
        match length {
            3 => Ok(Self {
                extra_tours: &cl3::EXTRA_TOURS,
                coefficients: rows(&cl3::NON_INTERVAL_COEFFICIENTS),
                non_intervals: rows(&cl3::NON_INTERVALS),
            }),
            4 => Ok(Self {
                extra_tours: &cl4::EXTRA_TOURS,
                coefficients: rows(&cl4::NON_INTERVAL_COEFFICIENTS),
                non_intervals: rows(&cl4::NON_INTERVALS),
            }),
            _ => Err(LadderError::unsupported(format!(
                "total decompositions exist for ladders of length 3 and 4, not {length}"
            ))),
        }
    }

    fn num_non_intervals(&self) -> usize {
        self.non_intervals.len()
    }
}

/// The walk through an interval used to detect it: along the upper row, back along it to the
/// start of the lower row, down, and along the lower row.
pub fn interval_tour(interval: &Interval) -> Vec<(usize, Row)> {
    let (lo, up) = (interval.lower(), interval.upper());
    let walk = |row: Row, from: i32, to: i32| (from..=to).map(move |c| (c as usize, row));
    match (lo.is_present(), up.is_present()) {
        (true, false) => walk(Row::Lower, lo.birth, lo.death).collect(),
        (false, true) => walk(Row::Upper, up.birth, up.death).collect(),
        _ => walk(Row::Upper, up.birth, up.death)
            .chain((lo.birth..up.death).rev().map(|c| (c as usize, Row::Upper)))
            .chain(walk(Row::Lower, lo.birth, lo.death))
            .collect(),
    }
}

/// The fixed linear system of a ladder length.
pub struct CoefficientSystem {
    length: usize,
    tours: Vec<Vec<(usize, Row)>>,
    /// Rows are tours, columns are classes, non-intervals first.
    matrix: Vec<Vec<i64>>,
    labels: Vec<ClassLabel>,
    weights: Vec<u64>,
}

impl CoefficientSystem {
    /// The system for the ladder of `lattice`. The non-interval columns are the constants of
    /// `NON_INTERVAL_COEFFICIENTS`. The interval columns are computed here: an interval has one
    /// full bar along a tour if it contains every node of the tour and none otherwise.
    pub fn new(lattice: &IntervalLattice) -> Result<Self> {
        let length = lattice.length();
        let tables = Tables::for_length(length)?;
        if lattice.height() != 2 {
            return Err(LadderError::unsupported("total decompositions need a ladder lattice"));
        }
        let k = tables.num_non_intervals();
        let intervals = lattice.intervals();

        let tours: Vec<Vec<(usize, Row)>> = intervals
            .iter()
            .map(interval_tour)
            .chain(tables.extra_tours.iter().map(|tour| {
                tour.iter()
                    .map(|&(c, r)| (c as usize, if r == 0 { Row::Lower } else { Row::Upper }))
                    .collect()
            }))
            .collect();
        if tours.len() != k + intervals.len() || tables.coefficients.len() != tours.len() {
            return Err(LadderError::inconsistent(format!(
                "{} tours for {} classes",
                tours.len(),
                k + intervals.len()
            )));
        }

        let matrix = tours
            .iter()
            .zip(&tables.coefficients)
            .map(|(tour, non_interval)| {
                non_interval
                    .iter()
                    .map(|&x| i64::from(x))
                    .chain(intervals.iter().map(|interval| {
                        i64::from(
                            tour.iter()
                                .all(|&(c, r)| interval.contains_node(c, r.index())),
                        )
                    }))
                    .collect()
            })
            .collect();

        let labels = (1..=k)
            .map(ClassLabel::NonInterval)
            .chain((1..=intervals.len()).map(ClassLabel::Interval))
            .collect();
        let weights = tables
            .non_intervals
            .iter()
            .map(|dims| dims.iter().map(|&d| u64::from(d)).sum())
            .chain(intervals.iter().map(|i| i.size() as u64))
            .collect();

        Ok(Self {
            length,
            tours,
            matrix,
            labels,
            weights,
        })
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn tours(&self) -> &[Vec<(usize, Row)>] {
        &self.tours
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn matrix(&self) -> &[Vec<i64>] {
        &self.matrix
    }

    /// Solve `A x = b` in floating point and round. The rounded solution must satisfy the system
    /// to within [`RESIDUAL_TOLERANCE`].
    pub fn solve(&self, b: &[i64]) -> Result<Vec<i64>> {
        let n = self.matrix.len();
        if b.len() != n {
            return Err(LadderError::inconsistent(format!(
                "{} tour counts for {n} tours",
                b.len()
            )));
        }
        let mut rows: Vec<Vec<f64>> = self
            .matrix
            .iter()
            .zip(b)
            .map(|(row, &v)| row.iter().map(|&x| x as f64).chain([v as f64]).collect())
            .collect();

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&i, &j| rows[i][col].abs().total_cmp(&rows[j][col].abs()))
                .unwrap_or(col);
            if rows[pivot][col].abs() < 1e-12 {
                return Err(LadderError::inconsistent("coefficient matrix is singular"));
            }
            rows.swap(col, pivot);
            let (done, rest) = rows.split_at_mut(col + 1);
            let p = &done[col];
            for row in rest {
                let factor = row[col] / p[col];
                if factor != 0.0 {
                    for (x, y) in row[col..].iter_mut().zip(&p[col..]) {
                        *x -= factor * y;
                    }
                }
            }
        }
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let s: f64 = (i + 1..n).map(|j| rows[i][j] * x[j]).sum();
            x[i] = (rows[i][n] - s) / rows[i][i];
        }

        let rounded: Vec<i64> = x.iter().map(|v| v.round() as i64).collect();
        let norm = self
            .matrix
            .iter()
            .zip(b)
            .map(|(row, &v)| {
                let r = row.iter().zip(&rounded).map(|(a, x)| a * x).sum::<i64>() - v;
                (r * r) as f64
            })
            .sum::<f64>()
            .sqrt();
        if norm > RESIDUAL_TOLERANCE {
            return Err(LadderError::ResidualMismatch { norm });
        }
        Ok(rounded)
    }

    /// The multiplicities of every class given the full-bar counts of every tour.
    pub fn multiplicities(&self, counts: &[i64]) -> Result<Vec<u64>> {
        self.solve(counts)?
            .into_iter()
            .zip(&self.labels)
            .map(|(x, label)| {
                u64::try_from(x).map_err(|_| {
                    LadderError::inconsistent(format!("multiplicity {x} of {label} is negative"))
                })
            })
            .collect()
    }
}

/// Multiplicities of the indecomposables of a ladder module.
#[derive(Clone, Debug, PartialEq)]
pub struct Decomposition {
    dim: usize,
    prime: ValidPrime,
    labels: Vec<ClassLabel>,
    weights: Vec<u64>,
    mult: Vec<u64>,
}

impl Decomposition {
    fn from_system(
        system: &CoefficientSystem,
        mult: Vec<u64>,
        dim: usize,
        prime: ValidPrime,
    ) -> Self {
        Self {
            dim,
            prime,
            labels: system.labels.clone(),
            weights: system.weights.clone(),
            mult,
        }
    }

    /// Build a decomposition of a ladder of length `length` from its nonzero multiplicities.
    pub fn from_components(
        length: usize,
        components: &BTreeMap<ClassLabel, u64>,
        dim: usize,
        prime: ValidPrime,
    ) -> Result<Self> {
        let system = CoefficientSystem::new(&IntervalLattice::generate(length, 2)?)?;
        let mut mult = vec![0; system.labels.len()];
        for (label, &v) in components {
            let i = system
                .labels
                .iter()
                .position(|l| l == label)
                .ok_or_else(|| LadderError::invalid(format!("no class {label} in CL({length})")))?;
            mult[i] = v;
        }
        Ok(Self::from_system(&system, mult, dim, prime))
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn prime(&self) -> ValidPrime {
        self.prime
    }

    pub fn get(&self, label: ClassLabel) -> u64 {
        self.labels
            .iter()
            .position(|&l| l == label)
            .map_or(0, |i| self.mult[i])
    }

    /// Every class with its multiplicity, non-intervals first.
    pub fn iter(&self) -> impl Iterator<Item = (ClassLabel, u64)> + '_ {
        self.labels.iter().copied().zip(self.mult.iter().copied())
    }

    pub fn nonzero_components(&self) -> Vec<(ClassLabel, u64)> {
        self.iter().filter(|&(_, v)| v != 0).collect()
    }

    pub fn nonzero_non_intervals(&self) -> Vec<(ClassLabel, u64)> {
        self.iter()
            .filter(|&(l, v)| v != 0 && !l.is_interval())
            .collect()
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics::default();
        for (label, v) in self.iter() {
            if label.is_interval() {
                stats.intervals += v;
            } else {
                stats.non_intervals += v;
            }
        }
        stats
    }

    /// The total dimension of the module.
    pub fn agg(&self) -> u64 {
        self.mult.iter().zip(&self.weights).map(|(m, w)| m * w).sum()
    }

    /// The total dimension of the non-interval summands.
    pub fn agg_non_intervals(&self) -> u64 {
        self.iter()
            .zip(&self.weights)
            .filter(|((l, _), _)| !l.is_interval())
            .map(|((_, m), w)| m * w)
            .sum()
    }

    /// The share of the total dimension carried by non-interval summands.
    pub fn ns_const(&self) -> Result<f64> {
        let agg = self.agg();
        if agg == 0 {
            return Err(LadderError::inconsistent("non-interval score of an empty decomposition"));
        }
        Ok(self.agg_non_intervals() as f64 / agg as f64)
    }

    /// As [`Decomposition::ns_const`], with every class weighted by `1 / (1 + exp(d0 - mult))`
    /// so that summands of low multiplicity count less.
    pub fn ns_logistic(&self, d0: f64) -> Result<f64> {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for ((label, m), &w) in self.iter().zip(&self.weights) {
            let m = m as f64;
            let term = m / (1.0 + (d0 - m).exp()) * w as f64;
            denominator += term;
            if !label.is_interval() {
                numerator += term;
            }
        }
        if denominator == 0.0 {
            return Err(LadderError::inconsistent("non-interval score of an empty decomposition"));
        }
        Ok(numerator / denominator)
    }
}

/// Written as the nonzero components, e.g. `{N1: 1, I21: 2}`.
impl fmt::Display for Decomposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, v)) in self.nonzero_components().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{label}: {v}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Decomposition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        struct Nonzero<'a>(&'a Decomposition);

        impl Serialize for Nonzero<'_> {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                let nonzero = self.0.nonzero_components();
                let mut map = serializer.serialize_map(Some(nonzero.len()))?;
                for (label, v) in &nonzero {
                    map.serialize_entry(label, v)?;
                }
                map.end()
            }
        }

        let mut s = serializer.serialize_struct("Decomposition", 3)?;
        s.serialize_field("mult", &Nonzero(self))?;
        s.serialize_field("dim", &self.dim)?;
        s.serialize_field("prime", &self.prime)?;
        s.end()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub intervals: u64,
    pub non_intervals: u64,
}

impl Statistics {
    pub fn total(&self) -> u64 {
        self.intervals + self.non_intervals
    }

    pub fn interval_ratio(&self) -> Option<f64> {
        (self.total() != 0).then(|| self.intervals as f64 / self.total() as f64)
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Intervals: {}, Nonintervals: {}",
            self.intervals, self.non_intervals
        )?;
        if let Some(r) = self.interval_ratio() {
            write!(f, ", Ratio_of_intervals: {r:.2}")?;
        }
        Ok(())
    }
}

/// Computes total decompositions.
pub struct TotalDecomposer<'a> {
    config: &'a Config,
    lattices: &'a LatticeCache,
    oracle: &'a dyn ZigzagOracle,
}

impl<'a> TotalDecomposer<'a> {
    pub fn new(
        config: &'a Config,
        lattices: &'a LatticeCache,
        oracle: &'a dyn ZigzagOracle,
    ) -> Self {
        Self {
            config,
            lattices,
            oracle,
        }
    }

    #[tracing::instrument(skip(self, filtration, prime), fields(length = filtration.length(), prime = %prime))]
    pub fn decompose(
        &self,
        filtration: &CLFiltration,
        dim: usize,
        prime: ValidPrime,
    ) -> Result<Decomposition> {
        let m = filtration.length();
        Tables::for_length(m)?;
        let lattice = self.lattices.get(m, 2)?;
        let system = CoefficientSystem::new(&lattice)?;

        let complexes = LadderComplexes::new(filtration, dim);
        let linearizer = LadderLinearizer::new(&complexes, self.config.path_store())?;
        let computer = BarcodeComputer::new(self.oracle, prime, dim);

        tracing::info!(tours = system.tours.len(), "evaluating tours");
        let counts: Vec<i64> = self.config.install(|| {
            system
                .tours
                .as_slice()
                .into_maybe_par_iter()
                .map(|tour| computer.full_bars(&linearizer.tour(tour)?))
                .collect::<Result<_>>()
        })?;

        let mult = system.multiplicities(&counts)?;
        let decomposition = Decomposition::from_system(&system, mult, dim, prime);
        tracing::info!(%decomposition, "total decomposition computed");
        Ok(decomposition)
    }
}

/// A list of decompositions of one module.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecompositionCollection(Vec<Decomposition>);

impl DecompositionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decomposition: Decomposition) {
        self.0.push(decomposition);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Decomposition> {
        self.0.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decomposition> {
        self.0.iter()
    }

    /// The decompositions in homological dimension `dim`.
    pub fn dim(&self, dim: usize) -> Self {
        Self(self.0.iter().filter(|d| d.dim == dim).cloned().collect())
    }

    /// The decompositions with coefficients in $\mathbb{F}_p$.
    pub fn prime(&self, prime: ValidPrime) -> Self {
        Self(self.0.iter().filter(|d| d.prime == prime).cloned().collect())
    }
}

impl std::ops::Index<usize> for DecompositionCollection {
    type Output = Decomposition;

    fn index(&self, i: usize) -> &Decomposition {
        &self.0[i]
    }
}

impl<'a> IntoIterator for &'a DecompositionCollection {
    type Item = &'a Decomposition;
    type IntoIter = std::slice::Iter<'a, Decomposition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A ladder module of finite type together with the decompositions computed so far.
pub struct LadderQuiver<'a> {
    filtration: &'a CLFiltration,
    decomposer: TotalDecomposer<'a>,
    decompositions: DecompositionCollection,
}

impl<'a> LadderQuiver<'a> {
    pub fn new(filtration: &'a CLFiltration, decomposer: TotalDecomposer<'a>) -> Result<Self> {
        Tables::for_length(filtration.length())?;
        Ok(Self {
            filtration,
            decomposer,
            decompositions: DecompositionCollection::new(),
        })
    }

    pub fn decompositions(&self) -> &DecompositionCollection {
        &self.decompositions
    }

    /// The decomposition in dimension `dim` over $\mathbb{F}_p$. A stored one is returned unless
    /// `recalculate` is set.
    pub fn multiplicity_computation(
        &mut self,
        dim: usize,
        prime: ValidPrime,
        recalculate: bool,
    ) -> Result<&Decomposition> {
        let existing = self
            .decompositions
            .iter()
            .rposition(|d| d.dim == dim && d.prime == prime);
        match existing {
            Some(i) if !recalculate => {
                tracing::info!(dim, %prime, "decomposition already computed");
                Ok(&self.decompositions[i])
            }
            _ => {
                let d = self.decomposer.decompose(self.filtration, dim, prime)?;
                self.decompositions.push(d);
                Ok(&self.decompositions[self.decompositions.len() - 1])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use rstest::rstest;

    use super::*;
    use crate::{barcode::FastZigzag, lattice::Span};

    fn system(m: usize) -> CoefficientSystem {
        CoefficientSystem::new(&IntervalLattice::generate(m, 2).unwrap()).unwrap()
    }

    #[rstest]
    #[case(3, 29, 2)]
    #[case(4, 76, 21)]
    fn system_shape(#[case] m: usize, #[case] n: usize, #[case] k: usize) {
        let s = system(m);
        assert_eq!(s.tours().len(), n);
        assert!(s.matrix().iter().all(|row| row.len() == n));
        assert_eq!(s.labels()[k - 1], ClassLabel::NonInterval(k));
        assert_eq!(s.labels()[k], ClassLabel::Interval(1));
    }

    #[rstest]
    #[case(3)]
    #[case(4)]
    fn non_interval_labels_follow_the_table(#[case] m: usize) {
        let tables = Tables::for_length(m).unwrap();
        let keys: Vec<(u64, &[u8])> = tables
            .non_intervals
            .iter()
            .map(|dims| (dims.iter().map(|&d| u64::from(d)).sum(), *dims))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));

        let s = system(m);
        for (i, (weight, _)) in keys.iter().enumerate() {
            assert_eq!(s.labels()[i], ClassLabel::NonInterval(i + 1));
            assert_eq!(s.weights[i], *weight);
        }
    }

    #[rstest]
    #[case(3)]
    #[case(4)]
    fn system_is_invertible(#[case] m: usize) {
        let s = system(m);
        // Each class on its own is recovered exactly.
        for j in 0..s.labels().len() {
            let b: Vec<i64> = s.matrix().iter().map(|row| row[j]).collect();
            let x = s.solve(&b).unwrap();
            let expected: Vec<i64> = (0..x.len()).map(|i| i64::from(i == j)).collect();
            assert_eq!(x, expected, "class {}", s.labels()[j]);
        }
    }

    #[test]
    fn negative_multiplicity() {
        let s = system(4);
        let b: Vec<i64> = s.matrix().iter().map(|row| -row[2]).collect();
        expect![["arithmetic inconsistency: multiplicity -1 of N3 is negative"]]
            .assert_eq(&s.multiplicities(&b).unwrap_err().to_string());
        assert!(matches!(
            s.solve(&b[1..]),
            Err(LadderError::ArithmeticInconsistency(_))
        ));
    }

    #[test]
    fn interval_tours() {
        let show = |i: Interval| {
            interval_tour(&i)
                .iter()
                .map(|(c, r)| format!("{c}{}", if *r == Row::Upper { 'u' } else { 'l' }))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let e = Span::empty(4);
        expect![["1l 2l 3l"]].assert_eq(&show(Interval::ladder(Span::new(1, 3), e)));
        expect![["0u 1u"]].assert_eq(&show(Interval::ladder(e, Span::new(0, 1))));
        expect![["0u 1u 2u 1u 1l 2l 3l"]]
            .assert_eq(&show(Interval::ladder(Span::new(1, 3), Span::new(0, 2))));
        expect![["2u 2l"]].assert_eq(&show(Interval::ladder(Span::new(2, 2), Span::new(2, 2))));
    }

    #[test]
    fn labels() {
        assert_eq!("N12".parse::<ClassLabel>().unwrap(), ClassLabel::NonInterval(12));
        assert_eq!("I3".parse::<ClassLabel>().unwrap(), ClassLabel::Interval(3));
        for bad in ["", "I", "I0", "X3", "N-1"] {
            assert!(bad.parse::<ClassLabel>().is_err(), "{bad}");
        }
        assert_eq!(ClassLabel::Interval(30).to_string(), "I30");
    }

    fn components(items: &[(&str, u64)]) -> BTreeMap<ClassLabel, u64> {
        items.iter().map(|(l, v)| (l.parse().unwrap(), *v)).collect()
    }

    #[test]
    fn scores() {
        let d = Decomposition::from_components(
            4,
            &components(&[("I1", 2), ("I35", 1), ("N1", 1), ("N6", 2)]),
            1,
            fp::prime::TWO,
        )
        .unwrap();
        // I1 is one node, I35 three and N1, N6 have dimension 6 and 7.
        assert_eq!(d.agg(), 25);
        assert_eq!(d.agg_non_intervals(), 20);
        assert!((d.ns_const().unwrap() - 0.8).abs() < 1e-12);
        expect![["{N1: 1, N6: 2, I1: 2, I35: 1}"]].assert_eq(&d.to_string());
        expect![["Intervals: 3, Nonintervals: 3, Ratio_of_intervals: 0.50"]]
            .assert_eq(&d.statistics().to_string());

        // Large offsets leave only the most frequent classes.
        let d = Decomposition::from_components(
            4,
            &components(&[("I19", 3), ("I55", 3), ("N18", 1)]),
            1,
            fp::prime::TWO,
        )
        .unwrap();
        assert!((d.ns_const().unwrap() - 10.0 / 22.0).abs() < 1e-12);
        let w = |m: f64, d0: f64| m / (1.0 + (d0 - m).exp());
        let expected = 10.0 * w(1.0, 0.0) / (2.0 * w(3.0, 0.0) * 2.0 + 10.0 * w(1.0, 0.0));
        assert!((d.ns_logistic(0.0).unwrap() - expected).abs() < 1e-12);
        assert!(d.ns_logistic(20.0).unwrap() < d.ns_const().unwrap());
    }

    #[test]
    fn empty_scores() {
        let d = Decomposition::from_components(3, &BTreeMap::new(), 0, fp::prime::TWO).unwrap();
        assert!(d.ns_const().is_err());
        assert!(d.ns_logistic(1.0).is_err());
        assert_eq!(d.statistics().interval_ratio(), None);
        expect![["Intervals: 0, Nonintervals: 0"]].assert_eq(&d.statistics().to_string());
        assert!(Decomposition::from_components(
            3,
            &components(&[("N3", 1)]),
            0,
            fp::prime::TWO
        )
        .is_err());
    }

    #[test]
    fn json() {
        let d = Decomposition::from_components(
            4,
            &components(&[("I21", 2), ("N1", 1)]),
            1,
            fp::prime::ValidPrime::new(3),
        )
        .unwrap();
        expect![[r#"{"mult":{"N1":1,"I21":2},"dim":1,"prime":3}"#]]
            .assert_eq(&serde_json::to_string(&d).unwrap());
    }

    fn single_vertex(m: usize) -> CLFiltration {
        let values = (0..m).map(|i| i as f64).collect();
        CLFiltration::new(m, values, vec![(vec![0], 1)], vec![(vec![0], 1)]).unwrap()
    }

    #[test]
    fn quiver_caches() {
        let f = single_vertex(3);
        let config = Config::default().with_threads(1);
        let lattices = LatticeCache::default();
        let decomposer = TotalDecomposer::new(&config, &lattices, &FastZigzag);
        let mut quiver = LadderQuiver::new(&f, decomposer).unwrap();

        let two = fp::prime::TWO;
        let full = quiver.multiplicity_computation(0, two, false).unwrap().clone();
        expect![["{I18: 1}"]].assert_eq(&full.to_string());
        quiver.multiplicity_computation(0, two, false).unwrap();
        assert_eq!(quiver.decompositions().len(), 1);
        quiver.multiplicity_computation(0, two, true).unwrap();
        quiver.multiplicity_computation(1, two, false).unwrap();
        assert_eq!(quiver.decompositions().len(), 3);
        assert_eq!(quiver.decompositions().dim(0).len(), 2);
        assert_eq!(quiver.decompositions().prime(ValidPrime::new(3)).len(), 0);
        assert!(quiver.decompositions()[2].nonzero_components().is_empty());
    }

    #[test]
    fn unsupported_lengths() {
        let config = Config::default();
        let lattices = LatticeCache::default();
        let decomposer = TotalDecomposer::new(&config, &lattices, &FastZigzag);
        let f = single_vertex(5);
        assert!(matches!(
            decomposer.decompose(&f, 0, fp::prime::TWO),
            Err(LadderError::UnsupportedConfiguration(_))
        ));
        assert!(LadderQuiver::new(&f, decomposer).is_err());
    }
}
