use crate::error::{FailureKind, PollError};
use common::StatusSnapshot;
use serde::Serialize;
use std::time::Duration;

/// Result of one poll invocation
///
/// Produced once per call and never carried between calls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollOutcome {
    pub resource: String,
    pub satisfied: bool,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_status: Option<StatusSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<PollError>,
    /// Most recent transient fetch failure, if the last attempt failed to fetch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch_error: Option<String>,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl PollOutcome {
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(PollError::kind)
    }

    /// 0 when satisfied, otherwise the exit code of the failure kind
    pub fn exit_code(&self) -> i32 {
        self.failure_kind().map(FailureKind::exit_code).unwrap_or(0)
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }
}
