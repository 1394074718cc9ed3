use common::CommonError;
use serde::Serialize;
use thiserror::Error;

pub type ConvergeResult<T> = Result<T, ConvergeError>;

/// Errors raised while setting up a wait, before any polling starts
#[derive(Error, Debug)]
pub enum ConvergeError {
    #[error("Kubernetes error: {0}")]
    Kubernetes(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl From<kube::Error> for ConvergeError {
    fn from(err: kube::Error) -> Self {
        ConvergeError::Kubernetes(err.to_string())
    }
}

/// Failure of a single fetch, as reported by a `ResourceFetcher`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Worth another attempt (not found yet, timeout, 5xx)
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Retrying cannot help (forbidden, bad request, undecodable)
    #[error("permanent fetch error: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PolicyError {
    #[error("retries must be at least 1")]
    ZeroRetries,
}

/// Why a poll ended without satisfying its predicate
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollError {
    #[error("{resource} reached a terminal condition: {reason}")]
    TerminalCondition { resource: String, reason: String },

    #[error("fetching {resource} failed: {message}")]
    Fetch { resource: String, message: String },

    #[error("{resource} did not converge after {attempts} attempts")]
    DeadlineExceeded { resource: String, attempts: u32 },

    #[error("invalid poll policy: {reason}")]
    InvalidPolicy { reason: PolicyError },
}

impl PollError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PollError::TerminalCondition { .. } => FailureKind::TerminalCondition,
            PollError::Fetch { .. } => FailureKind::FetchFailed,
            PollError::DeadlineExceeded { .. } => FailureKind::DeadlineExceeded,
            PollError::InvalidPolicy { .. } => FailureKind::InvalidPolicy,
        }
    }
}

/// Coarse failure category surfaced to the calling workflow step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TerminalCondition,
    FetchFailed,
    DeadlineExceeded,
    InvalidPolicy,
}

impl FailureKind {
    /// Process exit code for the wait binary
    pub fn exit_code(self) -> i32 {
        match self {
            FailureKind::TerminalCondition => 2,
            FailureKind::DeadlineExceeded => 3,
            FailureKind::FetchFailed => 4,
            FailureKind::InvalidPolicy => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureKind::TerminalCondition => "terminal condition",
            FailureKind::FetchFailed => "fetch failed",
            FailureKind::DeadlineExceeded => "deadline exceeded",
            FailureKind::InvalidPolicy => "invalid policy",
        }
    }
}
