use crate::clock::Clock;
use crate::config::{Config, WaitTarget};
use crate::kube::traits::ResourceFetcher;
use crate::outcome::PollOutcome;
use crate::poller::Poller;
use crate::presets;
use crate::rollout::RolloutOutcome;
use serde::Serialize;

/// What the wait binary prints on stdout
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Poll(PollOutcome),
    Rollout(RolloutOutcome),
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.exit_code() == 0
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Report::Poll(outcome) => outcome.exit_code(),
            Report::Rollout(outcome) => outcome.exit_code(),
        }
    }

    /// One-line result for the log
    pub fn summary(&self) -> String {
        match self {
            Report::Poll(outcome) => match outcome.failure_kind() {
                None => format!(
                    "{} converged after {} attempts",
                    outcome.resource, outcome.attempts
                ),
                Some(kind) => format!(
                    "{} failed ({}) after {} attempts",
                    outcome.resource,
                    kind.label(),
                    outcome.attempts
                ),
            },
            Report::Rollout(outcome) => match outcome.failure {
                None => "rollout complete".to_string(),
                Some(failure) => format!("rollout {}", failure.label()),
            },
        }
    }
}

/// Run the wait described by `config`
pub async fn run<F, C>(config: &Config, poller: &Poller<F, C>) -> Report
where
    F: ResourceFetcher + ?Sized,
    C: Clock + ?Sized,
{
    let resource = config.target.resource();
    if let Some(plan) = config.rollout_plan() {
        return Report::Rollout(poller.wait_for_rollout(resource, &plan).await);
    }

    let predicate = match &config.target {
        WaitTarget::Custom { predicate, .. } => predicate.clone(),
        _ => presets::mcp_updated(),
    };
    Report::Poll(poller.poll(resource, &predicate, &config.policy).await)
}
