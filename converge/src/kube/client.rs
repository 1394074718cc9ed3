use crate::error::{ConvergeError, ConvergeResult, FetchError};
use crate::kube::traits::ResourceFetcher;
use async_trait::async_trait;
use common::{ResourceReference, StatusSnapshot};
use kube::{
    api::{ApiResource, DynamicObject, GroupVersionKind},
    Api, Client,
};
use serde_json::Value;

/// Real Kubernetes client implementation using kube-rs
///
/// Objects are read as `DynamicObject`s so any kind (including OpenShift
/// CRDs without generated bindings) can be observed.
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    /// Create a new Kubernetes client using the default configuration
    /// (in-cluster config or ~/.kube/config)
    pub async fn new() -> ConvergeResult<Self> {
        let client = Client::try_default().await.map_err(|e| {
            ConvergeError::Kubernetes(format!("Failed to create K8s client: {}", e))
        })?;

        Ok(Self { client })
    }

    /// Create a Kubernetes client from an explicit kube::Client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn api_for(&self, resource: &ResourceReference) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(resource.group(), resource.version(), resource.kind());
        let api_resource = match resource.plural() {
            Some(plural) => ApiResource::from_gvk_with_plural(&gvk, plural),
            None => ApiResource::from_gvk(&gvk),
        };

        match resource.namespace() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &api_resource),
            None => Api::all_with(self.client.clone(), &api_resource),
        }
    }
}

#[async_trait]
impl ResourceFetcher for KubeClient {
    async fn fetch(&self, resource: &ResourceReference) -> Result<StatusSnapshot, FetchError> {
        let object = self
            .api_for(resource)
            .get(resource.name())
            .await
            .map_err(classify_error)?;

        let status = object.data.get("status").cloned().unwrap_or(Value::Null);

        Ok(StatusSnapshot::new(object.metadata.generation, status))
    }
}

/// Sort a kube error into something worth retrying or not
///
/// Not-found counts as transient: the object may not have been created yet.
pub fn classify_error(err: kube::Error) -> FetchError {
    match &err {
        kube::Error::Api(response) => match response.code {
            404 | 408 | 429 => FetchError::Transient(err.to_string()),
            code if code >= 500 => FetchError::Transient(err.to_string()),
            _ => FetchError::Permanent(err.to_string()),
        },
        kube::Error::SerdeError(_) | kube::Error::BuildRequest(_) | kube::Error::Auth(_) => {
            FetchError::Permanent(err.to_string())
        }
        _ => FetchError::Transient(err.to_string()),
    }
}
