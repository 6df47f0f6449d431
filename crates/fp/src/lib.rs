#![allow(clippy::many_single_char_names)]
#![allow(clippy::unreadable_literal)]

//! Arithmetic over the prime fields $\mathbb{F}_p$.
//!
//! This crate provides the small amount of linear algebra needed to reduce boundary matrices: a
//! notion of prime ([`prime::Prime`]), with compile-time primes for the common cases, and sparse
//! vectors whose pivot is the largest nonzero index ([`vector::SparseVector`]).

pub mod prime;
pub mod vector;

