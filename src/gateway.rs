//! Data-access boundary consumed by effects.
//!
//! One async operation per remote resource verb. REST/JSON is the usual
//! transport behind this seam, but nothing here depends on it; tests
//! implement the trait with in-memory stubs.

use async_trait::async_trait;
use thiserror::Error;

use crate::entity::Entity;

/// Failure surfaced by a [`ResourceGateway`] operation.
///
/// Effects render these into failure-event payloads; they never cross
/// the store boundary as errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The collaborator could not be reached.
    #[error("transport failure: {0}")]
    Transport(String),

    /// No record exists for the given key.
    #[error("no record for key '{0}'")]
    NotFound(String),

    /// The collaborator rejected the operation.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Remote operations over one resource type.
#[async_trait]
pub trait ResourceGateway<T: Entity>: Send + Sync {
    /// Fetch the full collection.
    async fn fetch_all(&self) -> Result<Vec<T>, GatewayError>;

    /// Create one record, returning the stored value.
    async fn create(&self, item: T) -> Result<T, GatewayError>;

    /// Replace one record wholesale, returning the stored value.
    async fn replace(&self, item: T) -> Result<T, GatewayError>;

    /// Delete the record under `key`.
    async fn delete(&self, key: T::Key) -> Result<(), GatewayError>;
}
