use crate::error::FetchError;
use crate::kube::traits::ResourceFetcher;
use async_trait::async_trait;
use common::{ResourceReference, StatusSnapshot};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

type Response = Result<StatusSnapshot, FetchError>;

/// Mock implementation of ResourceFetcher for unit testing
///
/// Each reference gets a scripted sequence of responses. Once a script is
/// down to its final entry, that entry is returned on every further fetch.
/// Unscripted references behave like objects that do not exist yet.
#[derive(Clone)]
pub struct MockFetcher {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Response>>>>,
    calls: Arc<Mutex<HashMap<String, u32>>>,
}

impl MockFetcher {
    /// Create a new mock with no scripted objects
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Replace the response sequence for a reference
    pub fn script(&self, resource: &ResourceReference, responses: Vec<Response>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(Self::make_key(resource), responses.into());
    }

    /// Append one response to the sequence for a reference
    pub fn push(&self, resource: &ResourceReference, response: Response) {
        self.scripts
            .lock()
            .unwrap()
            .entry(Self::make_key(resource))
            .or_default()
            .push_back(response);
    }

    /// Number of fetches made for a reference
    pub fn calls(&self, resource: &ResourceReference) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&Self::make_key(resource))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    /// Helper to create a snapshot carrying the given `(type, status)` conditions
    pub fn conditions_snapshot(conditions: &[(&str, &str)]) -> StatusSnapshot {
        let entries: Vec<_> = conditions
            .iter()
            .map(|(type_, status)| json!({ "type": type_, "status": status }))
            .collect();

        StatusSnapshot::new(None, json!({ "conditions": entries }))
    }

    fn make_key(resource: &ResourceReference) -> String {
        format!(
            "{}/{}/{}",
            resource.api_version(),
            resource.namespace().unwrap_or(""),
            resource
        )
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceFetcher for MockFetcher {
    async fn fetch(&self, resource: &ResourceReference) -> Result<StatusSnapshot, FetchError> {
        let key = Self::make_key(resource);

        *self.calls.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let response = scripts.get_mut(&key).and_then(|script| {
            if script.len() > 1 {
                script.pop_front()
            } else {
                script.front().cloned()
            }
        });

        response.unwrap_or_else(|| Err(FetchError::Transient(format!("{} not found", resource))))
    }
}
