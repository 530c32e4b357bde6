//! Lookup error types

use crate::ibm::http::RemoteError;
use thiserror::Error;

/// Why a single resolution attempt failed
///
/// Every variant is terminal for the attempt; nothing at this layer retries.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The list or get call itself failed
    #[error("{entity}: {operation} failed: {source}")]
    Remote {
        entity: &'static str,
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    /// Pagination was exhausted without a name match
    #[error("{entity} with given name not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Both or neither of the id/name arguments were supplied
    #[error("{entity}: exactly one of {fields} must be set")]
    AmbiguousInput { entity: &'static str, fields: String },

    /// The caller's deadline elapsed or it signalled cancellation
    #[error("{entity}: {operation} cancelled")]
    Cancelled {
        entity: &'static str,
        operation: &'static str,
    },
}

impl LookupError {
    /// Entity type that was being resolved
    pub fn entity(&self) -> &'static str {
        match self {
            LookupError::Remote { entity, .. }
            | LookupError::NotFound { entity, .. }
            | LookupError::AmbiguousInput { entity, .. }
            | LookupError::Cancelled { entity, .. } => entity,
        }
    }

    /// Underlying remote failure, if any
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            LookupError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound { .. })
    }
}
