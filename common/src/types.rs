use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifies a remote object to observe
///
/// Fields are private so a reference cannot change after validation, and it
/// is only ever built through the validating constructors (no `Deserialize`).
/// A reference without a namespace addresses a cluster-scoped object
/// (MachineConfigPool, Network operator config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    api_version: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plural: Option<String>,
}

impl ResourceReference {
    /// Create a cluster-scoped reference
    pub fn cluster_scoped(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, CommonError> {
        Self::build(api_version.into(), kind.into(), None, name.into())
    }

    /// Create a namespaced reference
    pub fn namespaced(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, CommonError> {
        let namespace = namespace.into();
        if namespace.trim().is_empty() {
            return Err(CommonError::InvalidData(
                "namespace must not be empty".to_string(),
            ));
        }
        Self::build(api_version.into(), kind.into(), Some(namespace), name.into())
    }

    /// Override the plural resource name used to build the API path
    ///
    /// Only needed for kinds whose plural is not `lowercase(kind) + "s"`.
    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = Some(plural.into());
        self
    }

    fn build(
        api_version: String,
        kind: String,
        namespace: Option<String>,
        name: String,
    ) -> Result<Self, CommonError> {
        for (field, value) in [("apiVersion", &api_version), ("kind", &kind), ("name", &name)] {
            if value.trim().is_empty() {
                return Err(CommonError::InvalidData(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }

        if api_version.matches('/').count() > 1
            || api_version.starts_with('/')
            || api_version.ends_with('/')
        {
            return Err(CommonError::InvalidData(format!(
                "apiVersion '{}' is not of the form group/version",
                api_version
            )));
        }

        Ok(Self {
            api_version,
            kind,
            namespace,
            name,
            plural: None,
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// API group, empty for the core group (`v1`)
    pub fn group(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(group, _)| group)
            .unwrap_or("")
    }

    pub fn version(&self) -> &str {
        self.api_version
            .split_once('/')
            .map(|(_, version)| version)
            .unwrap_or(&self.api_version)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plural(&self) -> Option<&str> {
        self.plural.as_deref()
    }
}

impl fmt::Display for ResourceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// One entry of `status.conditions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// Case-insensitive status comparison ("True" matches "true")
    pub fn has_status(&self, status: &str) -> bool {
        self.status.eq_ignore_ascii_case(status)
    }

    /// Reason and message joined for log output
    pub fn summary(&self) -> String {
        match (&self.reason, &self.message) {
            (Some(reason), Some(message)) => format!("{}: {}", reason, message),
            (Some(reason), None) => reason.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => format!("{}={}", self.type_, self.status),
        }
    }
}

/// Observed state of a remote object at one point in time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    #[serde(default)]
    pub status: Value,
}

impl StatusSnapshot {
    pub fn new(generation: Option<i64>, status: Value) -> Self {
        Self { generation, status }
    }

    /// Build a snapshot from a full object (`metadata` + `status`)
    pub fn from_object(object: &Value) -> Self {
        Self {
            generation: object.pointer("/metadata/generation").and_then(Value::as_i64),
            status: object.get("status").cloned().unwrap_or(Value::Null),
        }
    }

    /// Parse a full object from its JSON text
    pub fn from_json(text: &str) -> Result<Self, CommonError> {
        let object: Value = serde_json::from_str(text)?;
        Ok(Self::from_object(&object))
    }

    /// All well-formed conditions, in the order the server reported them
    pub fn conditions(&self) -> Vec<Condition> {
        self.status
            .get("conditions")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Look up a condition by its `type`, independent of array position
    pub fn condition(&self, type_: &str) -> Option<Condition> {
        self.conditions().into_iter().find(|c| c.type_ == type_)
    }

    pub fn observed_generation(&self) -> Option<i64> {
        self.status.get("observedGeneration").and_then(Value::as_i64)
    }

    /// Whether the controller has caught up with the latest spec
    ///
    /// True when the object carries no generation at all.
    pub fn generation_observed(&self) -> bool {
        match self.generation {
            None => true,
            Some(generation) => self
                .observed_generation()
                .is_some_and(|observed| observed >= generation),
        }
    }

    /// Raw access to a status field by JSON pointer (e.g. `/machineCount`)
    pub fn field(&self, pointer: &str) -> Option<&Value> {
        self.status.pointer(pointer)
    }
}
