use std::fmt;

/// Everything that can go wrong inside the library.
///
/// Each variant carries enough context to locate the problem: the offending simplex or line, the
/// linearization whose barcode was bad, or the interval whose count did not add up.
#[derive(Debug, Clone, PartialEq)]
pub enum LadderError {
    /// The filtration or a file describing it is malformed.
    InvalidInput(String),
    /// The computation is not defined for these parameters.
    UnsupportedConfiguration(String),
    /// The zigzag oracle failed or returned a barcode that breaks its contract.
    OracleFailure { path: String, reason: String },
    /// The finite-type linear system has no integral solution.
    ResidualMismatch { norm: f64 },
    /// A count that must exist or be non-negative was not.
    ArithmeticInconsistency(String),
    /// Reading or writing a lattice file failed.
    Storage(String),
}

impl LadderError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(msg.into())
    }

    pub(crate) fn inconsistent(msg: impl Into<String>) -> Self {
        Self::ArithmeticInconsistency(msg.into())
    }

    pub(crate) fn oracle(path: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::OracleFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for LadderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::UnsupportedConfiguration(msg) => write!(f, "unsupported configuration: {msg}"),
            Self::OracleFailure { path, reason } => {
                write!(f, "zigzag oracle failed on {path}: {reason}")
            }
            Self::ResidualMismatch { norm } => write!(
                f,
                "multiplicity system has no integral solution (residual norm {norm:.3e})"
            ),
            Self::ArithmeticInconsistency(msg) => write!(f, "arithmetic inconsistency: {msg}"),
            Self::Storage(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for LadderError {}

pub type Result<T, E = LadderError> = std::result::Result<T, E>;
