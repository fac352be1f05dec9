//! Error taxonomy for the transform engine.
//!
//! Parameter-domain failures are descriptive and recoverable; internal
//! errors indicate a programming bug at an integration seam. Pixel-level
//! numerical edge cases (NaN, infinity) are never errors; they are
//! resolved by the clamp semantics of the individual renderers.

use crate::dynamic::DynamicPropertyType;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An op parameter is outside its legal domain.
    #[error("{op}: {reason}")]
    InvalidParameter { op: &'static str, reason: String },

    /// Matrix inversion failed.
    #[error("singular matrix cannot be inverted")]
    SingularMatrix,

    /// The requested dynamic property is not referenced by any op.
    #[error("dynamic property {0} is not used by this pipeline")]
    MissingDynamicProperty(DynamicPropertyType),

    /// A programming/integration bug, e.g. combining incompatible ops.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn param(op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            op,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
