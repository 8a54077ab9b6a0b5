use thiserror::Error;

/// Unified error type for `cobs` operations.
#[derive(Debug, Error)]
pub enum CobsError {
    /// Raised when `x`/`y` lengths disagree, too few points are supplied, or the
    /// requested spline order is invalid.
    #[error("invalid input in {context}: {detail}")]
    InvalidInput {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// Description of what was wrong with the input.
        detail: String,
    },

    /// Raised when caller-supplied knots are too short or not non-decreasing.
    #[error("invalid knots: {detail}")]
    InvalidKnots {
        /// Description of the knot vector defect.
        detail: String,
    },

    /// Raised when a constraint's `type` tag is outside the supported set.
    #[error("unsupported constraint type `{kind}`")]
    UnsupportedConstraint {
        /// The offending constraint tag.
        kind: String,
    },

    /// Raised when a pointwise constraint's operator is outside {=, <=, >=}.
    #[error("unsupported pointwise operator `{operator}`")]
    UnsupportedOperator {
        /// The offending operator token.
        operator: String,
    },

    /// Raised when linear algebra operations encounter a singular system.
    #[error("matrix in {context} is singular")]
    SingularMatrix {
        /// Human-readable context describing the operation.
        context: &'static str,
    },

    /// Raised when numerical routines produce NaN or infinite values.
    #[error("encountered a non-finite value during {context}")]
    NumericalError {
        /// Human-readable context describing the operation.
        context: &'static str,
    },
}

impl CobsError {
    /// Helper to format an [`InvalidInput`](CobsError::InvalidInput) error.
    pub fn invalid_input(context: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidInput {
            context,
            detail: detail.into(),
        }
    }

    /// Helper to format an [`InvalidKnots`](CobsError::InvalidKnots) error.
    pub fn invalid_knots(detail: impl Into<String>) -> Self {
        Self::InvalidKnots {
            detail: detail.into(),
        }
    }

    /// Helper to raise when a matrix factorization fails due to singularity.
    pub fn singular(context: &'static str) -> Self {
        Self::SingularMatrix { context }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, CobsError>;
