use crate::clock::Clock;
use crate::error::{FailureKind, PolicyError};
use crate::kube::traits::ResourceFetcher;
use crate::outcome::PollOutcome;
use crate::poller::Poller;
use crate::policy::PollPolicy;
use crate::predicate::Predicate;
use common::ResourceReference;
use serde::Serialize;

/// Two polls in sequence: wait for an update to start, then for it to finish
pub struct RolloutPlan {
    pub started: Box<dyn Predicate>,
    pub start_policy: PollPolicy,
    pub completed: Box<dyn Predicate>,
    pub completion_policy: PollPolicy,
    /// Go on to the completion phase even if the start was never observed
    pub start_optional: bool,
}

impl RolloutPlan {
    pub fn validate(&self) -> Result<(), PolicyError> {
        self.start_policy.validate()?;
        self.completion_policy.validate()
    }
}

/// Which way a rollout went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutFailure {
    /// The start condition was never observed
    NeverStarted,
    /// Started, but did not finish within the completion budget
    Stuck,
    /// A terminal condition was reported in either phase
    Errored,
    FetchFailed,
    InvalidPolicy,
}

impl RolloutFailure {
    pub fn exit_code(self) -> i32 {
        match self {
            RolloutFailure::Errored => FailureKind::TerminalCondition.exit_code(),
            RolloutFailure::Stuck => FailureKind::DeadlineExceeded.exit_code(),
            RolloutFailure::FetchFailed => FailureKind::FetchFailed.exit_code(),
            RolloutFailure::InvalidPolicy => FailureKind::InvalidPolicy.exit_code(),
            RolloutFailure::NeverStarted => 6,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RolloutFailure::NeverStarted => "never started",
            RolloutFailure::Stuck => "started but stuck",
            RolloutFailure::Errored => "explicitly errored",
            RolloutFailure::FetchFailed => "fetch failed",
            RolloutFailure::InvalidPolicy => "invalid policy",
        }
    }

    fn from_phase(kind: FailureKind, started: bool) -> Self {
        match kind {
            FailureKind::DeadlineExceeded if started => RolloutFailure::Stuck,
            FailureKind::DeadlineExceeded => RolloutFailure::NeverStarted,
            FailureKind::TerminalCondition => RolloutFailure::Errored,
            FailureKind::FetchFailed => RolloutFailure::FetchFailed,
            FailureKind::InvalidPolicy => RolloutFailure::InvalidPolicy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RolloutOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<PollOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<PollOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<RolloutFailure>,
}

impl RolloutOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.failure.map(RolloutFailure::exit_code).unwrap_or(0)
    }
}

impl<F: ResourceFetcher + ?Sized, C: Clock + ?Sized> Poller<F, C> {
    /// Wait for a rollout to start and then to complete
    ///
    /// Both policies are checked before anything is fetched.
    pub async fn wait_for_rollout(
        &self,
        resource: &ResourceReference,
        plan: &RolloutPlan,
    ) -> RolloutOutcome {
        if let Err(reason) = plan.validate() {
            tracing::error!("Refusing to wait for {} rollout: {}", resource, reason);
            return RolloutOutcome {
                start: None,
                completion: None,
                failure: Some(RolloutFailure::InvalidPolicy),
            };
        }

        tracing::info!("Waiting for {} rollout to start", resource);
        let start = self
            .poll(resource, &*plan.started, &plan.start_policy)
            .await;

        match start.failure_kind() {
            None => {}
            Some(FailureKind::DeadlineExceeded) if plan.start_optional => {
                tracing::info!(
                    "Did not observe {} rollout start, checking for completion anyway",
                    resource
                );
            }
            Some(kind) => {
                let failure = RolloutFailure::from_phase(kind, false);
                tracing::error!("{} rollout {}", resource, failure.label());
                return RolloutOutcome {
                    start: Some(start),
                    completion: None,
                    failure: Some(failure),
                };
            }
        }

        tracing::info!("Waiting for {} rollout to complete", resource);
        let completion = self
            .poll(resource, &*plan.completed, &plan.completion_policy)
            .await;

        let failure = completion
            .failure_kind()
            .map(|kind| RolloutFailure::from_phase(kind, true));

        match failure {
            Some(failure) => tracing::error!("{} rollout {}", resource, failure.label()),
            None => tracing::info!("{} rollout complete", resource),
        }

        RolloutOutcome {
            start: Some(start),
            completion: Some(completion),
            failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::error::FetchError;
    use crate::kube::mock::MockFetcher;
    use crate::predicate::ConditionPredicate;
    use common::StatusSnapshot;
    use std::sync::Arc;
    use std::time::Duration;

    fn pool() -> ResourceReference {
        ResourceReference::cluster_scoped(
            "machineconfiguration.openshift.io/v1",
            "MachineConfigPool",
            "worker",
        )
        .unwrap()
    }

    fn state(updating: &str, degraded: &str) -> Result<StatusSnapshot, FetchError> {
        Ok(MockFetcher::conditions_snapshot(&[
            ("Updating", updating),
            ("Degraded", degraded),
        ]))
    }

    fn plan(start_optional: bool) -> RolloutPlan {
        RolloutPlan {
            started: Box::new(
                ConditionPredicate::new()
                    .require("Updating", "True")
                    .fail_on("Degraded", "True"),
            ),
            start_policy: PollPolicy::new(3, Duration::from_secs(10)),
            completed: Box::new(
                ConditionPredicate::new()
                    .require("Updating", "False")
                    .fail_on("Degraded", "True"),
            ),
            completion_policy: PollPolicy::new(5, Duration::from_secs(30)),
            start_optional,
        }
    }

    fn setup() -> (Arc<MockFetcher>, Poller<MockFetcher, FakeClock>) {
        let fetcher = Arc::new(MockFetcher::new());
        let poller = Poller::new(fetcher.clone(), Arc::new(FakeClock::new()));
        (fetcher, poller)
    }

    #[tokio::test]
    async fn test_rollout_succeeds() {
        let (fetcher, poller) = setup();
        fetcher.script(
            &pool(),
            vec![
                state("False", "False"),
                state("True", "False"),
                state("True", "False"),
                state("False", "False"),
            ],
        );

        let outcome = poller.wait_for_rollout(&pool(), &plan(false)).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.start.as_ref().unwrap().attempts, 2);
        assert_eq!(outcome.completion.as_ref().unwrap().attempts, 2);
    }

    #[tokio::test]
    async fn test_rollout_never_started() {
        let (fetcher, poller) = setup();
        fetcher.script(&pool(), vec![state("False", "False")]);

        let outcome = poller.wait_for_rollout(&pool(), &plan(false)).await;

        assert_eq!(outcome.failure, Some(RolloutFailure::NeverStarted));
        assert!(outcome.completion.is_none());
        assert_eq!(fetcher.calls(&pool()), 3);
        assert_eq!(outcome.exit_code(), 6);
    }

    #[tokio::test]
    async fn test_optional_start_checks_completion() {
        let (fetcher, poller) = setup();
        fetcher.script(&pool(), vec![state("False", "False")]);

        let outcome = poller.wait_for_rollout(&pool(), &plan(true)).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.start.as_ref().unwrap().attempts, 3);
        assert_eq!(outcome.completion.as_ref().unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_rollout_stuck() {
        let (fetcher, poller) = setup();
        fetcher.script(&pool(), vec![state("True", "False")]);

        let outcome = poller.wait_for_rollout(&pool(), &plan(false)).await;

        assert_eq!(outcome.failure, Some(RolloutFailure::Stuck));
        assert_eq!(outcome.completion.as_ref().unwrap().attempts, 5);
        assert_eq!(fetcher.calls(&pool()), 6);
    }

    #[tokio::test]
    async fn test_rollout_errored_during_completion() {
        let (fetcher, poller) = setup();
        fetcher.script(
            &pool(),
            vec![state("True", "False"), state("True", "False"), state("True", "True")],
        );

        let outcome = poller.wait_for_rollout(&pool(), &plan(false)).await;

        assert_eq!(outcome.failure, Some(RolloutFailure::Errored));
        assert_eq!(outcome.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_rollout_errored_before_start() {
        let (fetcher, poller) = setup();
        fetcher.script(&pool(), vec![state("False", "True")]);

        let outcome = poller.wait_for_rollout(&pool(), &plan(true)).await;

        assert_eq!(outcome.failure, Some(RolloutFailure::Errored));
        assert!(outcome.completion.is_none());
        assert_eq!(fetcher.calls(&pool()), 1);
    }

    #[tokio::test]
    async fn test_rollout_permanent_fetch_error() {
        let (fetcher, poller) = setup();
        fetcher.script(
            &pool(),
            vec![Err(FetchError::Permanent("403 Forbidden".to_string()))],
        );

        let outcome = poller.wait_for_rollout(&pool(), &plan(false)).await;
        assert_eq!(outcome.failure, Some(RolloutFailure::FetchFailed));
    }

    #[tokio::test]
    async fn test_invalid_completion_policy_rejected_up_front() {
        let (fetcher, poller) = setup();
        fetcher.script(&pool(), vec![state("True", "False")]);

        let mut plan = plan(false);
        plan.completion_policy.retries = 0;

        let outcome = poller.wait_for_rollout(&pool(), &plan).await;

        assert_eq!(outcome.failure, Some(RolloutFailure::InvalidPolicy));
        assert!(outcome.start.is_none());
        assert_eq!(fetcher.calls(&pool()), 0);
    }

    #[test]
    fn test_failure_labels_distinguish_phases() {
        assert_eq!(RolloutFailure::NeverStarted.label(), "never started");
        assert_eq!(RolloutFailure::Stuck.label(), "started but stuck");
        assert_eq!(RolloutFailure::Errored.label(), "explicitly errored");
    }
}
