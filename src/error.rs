use thiserror::Error;

use crate::params::GreenKernel;

/// Unified error type for `asperity` operations.
#[derive(Debug, Error)]
pub enum ContactError {
    /// Raised when provided arrays or matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension, often the model-implied value.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a scalar parameter fails validation before the solve.
    #[error("parameter {context} must be positive, found {value}")]
    NonPositiveParameter { context: &'static str, value: f64 },

    /// Raised when no shape factor is tabulated for the requested grid count.
    #[error(
        "no {kernel:?} shape factor tabulated for n = {n}; \
         compute one with `calibration::flat_shape_factor`"
    )]
    ShapeFactorUnavailable { n: usize, kernel: GreenKernel },

    /// Raised when a topology file cannot be read.
    #[error("cannot read topology file `{path}`: {source}")]
    TopologyIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Raised when a topology file is not a well-formed square height grid.
    #[error("malformed topology file `{path}` at line {line}: {reason}")]
    TopologyFormat {
        path: String,
        line: usize,
        reason: &'static str,
    },

    /// Raised when the active sub-matrix is singular during the pivoted solve.
    #[error("singular active system of size {active_set_size} in the pressure solver")]
    SingularSystem { active_set_size: usize },

    /// Raised when an influence matrix would exceed the configured byte budget.
    #[error(
        "influence matrix for {system_size} candidates needs {required_bytes} bytes, \
         limit is {limit_bytes}"
    )]
    MatrixTooLarge {
        system_size: usize,
        required_bytes: usize,
        limit_bytes: usize,
    },

    /// Raised when numerical routines produce a non-finite value.
    #[error("encountered a non-finite value during {context}")]
    NumericalError { context: &'static str },
}

impl ContactError {
    /// Helper to format a [`DimensionMismatch`](ContactError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper for rejecting non-positive scalar parameters.
    pub fn non_positive(context: &'static str, value: f64) -> Self {
        Self::NonPositiveParameter { context, value }
    }

    /// Helper to raise when the active sub-matrix cannot be factorized.
    pub fn singular(active_set_size: usize) -> Self {
        Self::SingularSystem { active_set_size }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, ContactError>;
