//! Constants of the CL(4) decomposition.

use super::Node;

/// Tours other than the interval tours, as (column, row) with row 0 the lower row.
pub(super) const EXTRA_TOURS: [&[Node]; 21] = [
    &[(2, 0), (2, 1), (1, 1), (2, 1), (3, 1)],
    &[(1, 0), (2, 0), (2, 1), (2, 0), (3, 0)],
    &[(2, 0), (1, 0), (1, 1), (0, 1), (0, 0)],
    &[(2, 1), (2, 0), (1, 0), (1, 1), (0, 1)],
    &[(0, 0), (1, 0), (1, 1), (1, 0), (2, 0), (3, 0)],
    &[(3, 1), (3, 0), (2, 0), (2, 1), (1, 1), (0, 1)],
    &[(3, 0), (2, 0), (2, 1), (1, 1), (0, 1), (0, 0)],
    &[(0, 1), (1, 1), (1, 0), (1, 1), (2, 1), (3, 1)],
    &[(3, 0), (2, 0), (2, 1), (2, 0), (1, 0), (1, 1), (0, 1)],
    &[(0, 0), (0, 1), (1, 1), (2, 1), (1, 1), (1, 0), (2, 0), (3, 0)],
    &[(3, 0), (2, 0), (1, 0), (1, 1), (0, 1), (1, 1), (2, 1), (1, 1)],
    &[(2, 0), (1, 0), (1, 1), (1, 0), (0, 0), (1, 0), (2, 0), (3, 0)],
    &[(1, 1), (1, 0), (2, 0), (3, 0), (2, 0), (2, 1), (1, 1), (0, 1)],
    &[(3, 1), (2, 1), (1, 1), (0, 1), (1, 1), (2, 1), (1, 1), (1, 0)],
    &[(3, 0), (2, 0), (1, 0), (1, 1), (0, 1), (0, 0), (0, 1), (1, 1), (2, 1)],
    &[(0, 1), (1, 1), (2, 1), (3, 1), (2, 1), (2, 0), (2, 1), (1, 1), (2, 1)],
    &[(0, 1), (1, 1), (2, 1), (2, 0), (1, 0), (2, 0), (2, 1), (2, 0), (3, 0)],
    &[(1, 0), (1, 1), (2, 1), (3, 1), (3, 0), (2, 0), (2, 1), (1, 1), (0, 1)],
    &[(3, 0), (2, 0), (1, 0), (1, 1), (2, 1), (1, 1), (0, 1), (1, 1), (1, 0), (2, 0)],
    &[(0, 1), (1, 1), (2, 1), (2, 0), (3, 0), (2, 0), (1, 0), (2, 0), (2, 1), (3, 1), (3, 0), (3, 1)],
    &[(0, 0), (1, 0), (2, 0), (2, 1), (1, 1), (0, 1), (1, 1), (1, 0), (2, 0), (3, 0), (2, 0), (1, 0), (2, 0), (3, 0)],
];

/// Full-bar multiplicity of each non-interval class along each tour, interval tours first.
#[rustfmt::skip]
pub(super) const NON_INTERVAL_COEFFICIENTS: [[u8; 21]; 76] = [
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 1, 1, 2, 0, 1, 1, 2, 0, 1, 1, 1, 2, 1, 1, 2, 2, 1, 2, 1, 2],
    [0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 2, 1, 1, 2, 2, 1, 2, 1, 2],
    [0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 2, 1, 1, 1, 2, 1, 1, 1, 2, 2, 2, 1, 2, 2, 2, 2, 2, 2, 2],
    [1, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1],
    [1, 0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2, 1],
    [0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [0, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 2],
    [0, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [1, 2, 1, 1, 1, 2, 1, 1, 2, 2, 2, 1, 1, 2, 2, 2, 1, 2, 2, 2, 2],
    [1, 1, 1, 0, 1, 1, 1, 0, 2, 1, 1, 1, 0, 2, 2, 1, 1, 2, 1, 2, 1],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [2, 1, 1, 0, 2, 1, 1, 0, 2, 1, 1, 1, 0, 2, 2, 1, 1, 2, 1, 2, 1],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 1, 0, 2],
    [0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 2, 1, 1, 2, 1, 2],
    [0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 1, 0, 2],
    [0, 1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 1],
    [0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 2, 1, 1, 2, 1, 2],
    [0, 1, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 1, 1, 1, 1, 1],
    [0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1],
    [0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 1, 1, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1, 1, 1, 1, 1, 1, 1],
    [0, 1, 1, 0, 0, 1, 1, 0, 1, 1, 1, 1, 0, 1, 2, 1, 1, 2, 1, 2, 1],
    [1, 1, 1, 0, 1, 1, 1, 0, 1, 1, 1, 1, 0, 1, 2, 1, 1, 2, 1, 2, 1],
    [0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1, 0, 2, 0],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 0, 0, 0, 1, 1, 0, 0, 1, 0, 2, 0],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 1, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 1],
    [0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 1, 0],
    [0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0],
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0],
];

/// Dimension vectors of the non-interval classes in label order, lower row then upper row.
pub(super) const NON_INTERVALS: [[u8; 8]; 21] = [
    [0, 0, 1, 1, 0, 1, 2, 1],
    [0, 1, 1, 0, 1, 2, 1, 0],
    [0, 1, 2, 1, 0, 1, 1, 0],
    [1, 2, 1, 0, 1, 1, 0, 0],
    [0, 0, 1, 1, 1, 1, 2, 1],
    [0, 1, 1, 1, 1, 2, 1, 0],
    [0, 1, 2, 1, 1, 1, 1, 0],
    [1, 2, 1, 1, 1, 1, 0, 0],
    [0, 0, 1, 1, 1, 2, 2, 1],
    [0, 1, 1, 1, 1, 2, 1, 1],
    [0, 1, 2, 1, 1, 2, 1, 0],
    [1, 1, 2, 1, 1, 1, 1, 0],
    [1, 2, 2, 1, 1, 1, 0, 0],
    [0, 1, 1, 1, 1, 2, 2, 1],
    [0, 1, 2, 1, 1, 2, 2, 0],
    [0, 2, 2, 1, 1, 2, 1, 0],
    [1, 2, 2, 1, 1, 1, 1, 0],
    [0, 1, 2, 1, 1, 2, 2, 1],
    [1, 2, 2, 1, 1, 2, 1, 0],
    [0, 1, 2, 2, 1, 2, 2, 1],
    [1, 2, 2, 1, 2, 2, 1, 0],
];
