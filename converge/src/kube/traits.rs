use crate::error::FetchError;
use async_trait::async_trait;
use common::{ResourceReference, StatusSnapshot};

/// Read access to cluster objects, abstracted to enable testing with mocks
///
/// Implementations never mutate cluster state.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the current status of the referenced object
    async fn fetch(&self, resource: &ResourceReference) -> Result<StatusSnapshot, FetchError>;
}
