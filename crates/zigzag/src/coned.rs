use std::cmp::Reverse;

use fp::{prime::Prime, vector::SparseVector};
use rustc_hash::FxHashMap;

use crate::{Bar, Operation, ZigzagError};

/// One lifetime of a simplex, from an insertion to the matching deletion.
#[derive(Debug)]
struct Instance {
    dim: usize,
    /// Faces as instance indices, with the sign of the face in the boundary.
    boundary: Vec<(usize, i64)>,
    inserted: usize,
    deleted: usize,
    live_cofaces: usize,
}

/// The coned filtration of a closed zigzag sequence.
///
/// Column 0 is the apex $\omega$. Column `u + 1` is the `u`th simplex instance, in order of
/// insertion. The remaining columns are the cones $\omega\sigma$ over the instances, in reverse
/// order of deletion.
#[derive(Debug)]
pub(crate) struct ConedFiltration {
    instances: Vec<Instance>,
    /// Instance indices in reverse order of deletion.
    cones: Vec<usize>,
    cone_column: Vec<usize>,
}

impl ConedFiltration {
    pub fn new(operations: &[Operation]) -> Result<Self, ZigzagError> {
        let mut instances: Vec<Instance> = Vec::with_capacity(operations.len());
        let mut deletions: Vec<usize> = Vec::with_capacity(operations.len());
        let mut alive: FxHashMap<&[u32], usize> = FxHashMap::default();

        for (idx, op) in operations.iter().enumerate() {
            let step = idx + 1;
            let simplex = op.simplex.as_slice();
            if simplex.is_empty() {
                return Err(ZigzagError::EmptySimplex { step });
            }
            if op.insertion {
                if alive.contains_key(simplex) {
                    return Err(ZigzagError::DuplicateInsertion {
                        step,
                        simplex: simplex.to_vec(),
                    });
                }
                let mut boundary = Vec::with_capacity(simplex.len());
                if simplex.len() > 1 {
                    for t in 0..simplex.len() {
                        let face: Vec<u32> = simplex
                            .iter()
                            .enumerate()
                            .filter_map(|(k, &v)| (k != t).then_some(v))
                            .collect();
                        let Some(&f) = alive.get(face.as_slice()) else {
                            return Err(ZigzagError::MissingFace {
                                step,
                                simplex: simplex.to_vec(),
                            });
                        };
                        boundary.push((f, if t % 2 == 0 { 1 } else { -1 }));
                    }
                }
                for &(f, _) in &boundary {
                    instances[f].live_cofaces += 1;
                }
                alive.insert(simplex, instances.len());
                instances.push(Instance {
                    dim: simplex.len() - 1,
                    boundary,
                    inserted: step,
                    deleted: 0,
                    live_cofaces: 0,
                });
            } else {
                let Some(&u) = alive.get(simplex) else {
                    return Err(ZigzagError::MissingSimplex {
                        step,
                        simplex: simplex.to_vec(),
                    });
                };
                if instances[u].live_cofaces > 0 {
                    return Err(ZigzagError::DanglingCoface {
                        step,
                        simplex: simplex.to_vec(),
                    });
                }
                alive.remove(simplex);
                Self::retire(&mut instances, u, step);
                deletions.push(u);
            }
        }

        // Close the sequence. Larger simplices go first so that no deletion leaves a dangling
        // coface.
        let mut survivors: Vec<(&[u32], usize)> = alive.into_iter().collect();
        survivors.sort_unstable_by_key(|&(s, _)| (Reverse(s.len()), s));
        for (k, (_, u)) in survivors.into_iter().enumerate() {
            Self::retire(&mut instances, u, operations.len() + 1 + k);
            deletions.push(u);
        }

        let m = instances.len();
        let cones: Vec<usize> = deletions.into_iter().rev().collect();
        let mut cone_column = vec![0; m];
        for (t, &u) in cones.iter().enumerate() {
            cone_column[u] = m + 1 + t;
        }
        tracing::trace!(instances = m, "coned filtration built");

        Ok(Self {
            instances,
            cones,
            cone_column,
        })
    }

    fn retire(instances: &mut [Instance], u: usize, step: usize) {
        instances[u].deleted = step;
        for i in 0..instances[u].boundary.len() {
            let f = instances[u].boundary[i].0;
            instances[f].live_cofaces -= 1;
        }
    }

    pub fn num_columns(&self) -> usize {
        1 + 2 * self.instances.len()
    }

    fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// The boundary of the `j`th cell of the coned complex.
    pub fn column<P: Prime>(&self, p: P, j: usize) -> SparseVector<P> {
        let m = self.num_instances();
        if j == 0 {
            SparseVector::new(p)
        } else if j <= m {
            let inst = &self.instances[j - 1];
            SparseVector::from_signed(p, inst.boundary.iter().map(|&(f, s)| (f + 1, s)))
        } else {
            // d(ωσ) = σ - ω·dσ, and d(ωv) = v - ω for a vertex v.
            let u = self.cones[j - m - 1];
            let inst = &self.instances[u];
            let base = std::iter::once((u + 1, 1));
            if inst.boundary.is_empty() {
                SparseVector::from_signed(p, base.chain(std::iter::once((0, -1))))
            } else {
                SparseVector::from_signed(
                    p,
                    base.chain(
                        inst.boundary
                            .iter()
                            .map(|&(f, s)| (self.cone_column[f], -s)),
                    ),
                )
            }
        }
    }

    /// Translate a persistence pair of the coned filtration into a bar of the zigzag.
    pub fn bar(&self, creator: usize, destroyer: usize) -> Option<Bar> {
        let m = self.num_instances();
        if creator == 0 {
            return None;
        }
        if creator <= m {
            let a = &self.instances[creator - 1];
            if destroyer <= m {
                let b = &self.instances[destroyer - 1];
                Some(Bar {
                    dim: a.dim,
                    birth: a.inserted,
                    death: b.inserted - 1,
                })
            } else {
                let i = a.inserted;
                let j = self.instances[self.cones[destroyer - m - 1]].deleted;
                if i < j {
                    Some(Bar {
                        dim: a.dim,
                        birth: i,
                        death: j - 1,
                    })
                } else {
                    Some(Bar {
                        dim: a.dim.checked_sub(1)?,
                        birth: j,
                        death: i - 1,
                    })
                }
            }
        } else {
            let a = &self.instances[self.cones[creator - m - 1]];
            let b = &self.instances[self.cones[destroyer - m - 1]];
            Some(Bar {
                dim: a.dim,
                birth: b.deleted,
                death: a.deleted - 1,
            })
        }
    }
}
