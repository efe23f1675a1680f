use zap_types::id::IdError;
use zap_types::models::Region;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// No Moment has activated yet for the region. Points at missing seed
    /// data; retrying will not help until an operator fixes it.
    #[error("no active moment for region {0}")]
    NoActiveMoment(Region),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The access evaluator said no. Policy, not a transient failure.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => Self::Conflict(format!("{field} already exists")),
            StoreError::Backend(e) => Self::Internal(e),
        }
    }
}

impl From<IdError> for CoreError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
