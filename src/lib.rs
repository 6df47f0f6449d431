#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::upper_case_acronyms)]
#![warn(clippy::default_trait_access)]
#![warn(clippy::if_not_else)]
#![warn(clippy::needless_continue)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::explicit_into_iter_loop)]

//! Interval decompositions of persistence modules over commutative ladders.
//!
//! A [`filtration::CLFiltration`] is a $2 \times m$ grid of simplicial complexes. Taking homology
//! gives a representation of the commutative ladder $CL(m)$, and this crate computes two
//! summaries of it.
//!
//!  - The connected persistence diagram ([`cpd`]) is the interval-decomposable approximation of
//!    the module. It is computed by Möbius inversion over the lattice of intervals
//!    ([`lattice`]), with every term obtained from a zigzag barcode along a row path or a bent
//!    path of the ladder.
//!  - For $m \leq 4$ the ladder has finite representation type and the module has a total
//!    decomposition into indecomposables ([`finite_type`]), computed from the number of full
//!    bars along a fixed set of tours.
//!
//! Every zigzag barcode goes through a [`barcode::ZigzagOracle`]. The default is the `zigzag`
//! crate, which reduces a coned filtration over $\mathbb{F}_p$.
//!
//! # Example
//! ```
//! use cladder::{cpd::CPDAssembler, lattice::LatticeCache, utils::Config, FastZigzag};
//! use cladder::filtration::CLFiltration;
//!
//! let f = CLFiltration::new(
//!     3,
//!     vec![0.0, 1.0, 2.0],
//!     vec![(vec![0], 1)],
//!     vec![(vec![0], 1)],
//! )
//! .unwrap();
//! let config = Config::default();
//! let lattices = LatticeCache::default();
//! let cpd = CPDAssembler::new(&config, &lattices, &FastZigzag)
//!     .assemble(&f, 0)
//!     .unwrap();
//! assert_eq!(cpd.lines.len(), 1);
//! ```

pub mod barcode;
pub mod cpd;
pub mod error;
pub mod filtration;
pub mod finite_type;
pub mod lattice;
pub mod linearize;
pub mod save;
pub mod store;
pub mod utils;

pub use barcode::{FastZigzag, ZigzagOracle};
pub use error::{LadderError, Result};
pub use filtration::{CLFiltration, Row};
pub use lattice::{Interval, IntervalLattice, Span};
