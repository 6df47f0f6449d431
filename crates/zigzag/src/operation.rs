use serde::{Deserialize, Serialize};

/// A simplex, given by its vertices in increasing order.
pub type Simplex = Vec<u32>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    pub simplex: Simplex,
    pub insertion: bool,
}

impl Operation {
    pub fn insert(simplex: Simplex) -> Self {
        Self {
            simplex,
            insertion: true,
        }
    }

    pub fn delete(simplex: Simplex) -> Self {
        Self {
            simplex,
            insertion: false,
        }
    }

    pub fn dim(&self) -> usize {
        self.simplex.len().saturating_sub(1)
    }
}

/// A closed interval `[birth, death]` of steps in homological dimension `dim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Bar {
    pub dim: usize,
    pub birth: usize,
    pub death: usize,
}

impl Bar {
    pub fn contains(&self, step: usize) -> bool {
        self.birth <= step && step <= self.death
    }
}
