use fp::{prime::Prime, vector::SparseVector};

use crate::coned::ConedFiltration;

/// Standard column reduction. Returns the pairs `(creator, destroyer)` of column indices.
pub(crate) fn persistence_pairs<P: Prime>(p: P, filtration: &ConedFiltration) -> Vec<(usize, usize)> {
    let n = filtration.num_columns();
    let mut owner: Vec<Option<usize>> = vec![None; n];
    let mut reduced: Vec<SparseVector<P>> = Vec::with_capacity(n);
    let mut pairs = Vec::new();

    for j in 0..n {
        let mut col = filtration.column(p, j);
        while let Some((low, _)) = col.pivot() {
            match owner[low] {
                Some(k) => col.eliminate_pivot(&reduced[k]),
                None => {
                    owner[low] = Some(j);
                    pairs.push((low, j));
                    break;
                }
            }
        }
        reduced.push(col);
    }
    pairs
}
