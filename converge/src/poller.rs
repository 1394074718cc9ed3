use crate::clock::Clock;
use crate::error::{FetchError, PollError};
use crate::kube::traits::ResourceFetcher;
use crate::outcome::PollOutcome;
use crate::policy::PollPolicy;
use crate::predicate::{Predicate, Verdict};
use common::ResourceReference;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Waits for a remote object's status to satisfy a predicate
///
/// Polling is read-only and every call owns its own attempt counter, so one
/// `Poller` can be shared (cloned) between independent call sites.
///
/// States: polling, then exactly one of satisfied, terminal failure or
/// deadline exceeded. Failures never escape as errors; they are reported
/// in the returned `PollOutcome`.
pub struct Poller<F: ResourceFetcher + ?Sized, C: Clock + ?Sized> {
    fetcher: Arc<F>,
    clock: Arc<C>,
}

impl<F: ResourceFetcher + ?Sized, C: Clock + ?Sized> Clone for Poller<F, C> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<F: ResourceFetcher + ?Sized, C: Clock + ?Sized> Poller<F, C> {
    pub fn new(fetcher: Arc<F>, clock: Arc<C>) -> Self {
        Self { fetcher, clock }
    }

    /// Poll `resource` until `predicate` is satisfied or the policy runs out
    ///
    /// Performs at most `policy.retries` fetches with `policy.delay` between
    /// them. Transient fetch errors use up an attempt and are retried; a
    /// permanent fetch error or a terminal verdict ends the poll at once.
    pub async fn poll<P: Predicate + ?Sized>(
        &self,
        resource: &ResourceReference,
        predicate: &P,
        policy: &PollPolicy,
    ) -> PollOutcome {
        let start = self.clock.now();
        let mut outcome = PollOutcome {
            resource: resource.to_string(),
            satisfied: false,
            attempts: 0,
            last_status: None,
            error: None,
            last_fetch_error: None,
            elapsed: Duration::ZERO,
        };

        if let Err(reason) = policy.validate() {
            tracing::error!("Refusing to poll {}: {}", resource, reason);
            outcome.error = Some(PollError::InvalidPolicy { reason });
            return outcome;
        }

        if policy.timeout_unreachable() {
            tracing::warn!(
                "Timeout {:?} for {} is never reached: {} attempts every {:?} stop after {:?}",
                policy.timeout.unwrap_or_default(),
                resource,
                policy.retries,
                policy.delay,
                policy.budget()
            );
        }

        tracing::info!(
            "Waiting for {} ({}), up to {} attempts every {:?}",
            resource,
            predicate.describe(),
            policy.retries,
            policy.delay
        );

        // A timeout past the end of the clock's range is the same as none
        let deadline = policy.timeout.and_then(|timeout| start.checked_add(timeout));

        loop {
            outcome.attempts += 1;

            match self.fetcher.fetch(resource).await {
                Ok(snapshot) => {
                    outcome.last_fetch_error = None;
                    let verdict = predicate.evaluate(&snapshot);
                    outcome.last_status = Some(snapshot);

                    match verdict {
                        Verdict::Satisfied => {
                            outcome.satisfied = true;
                            tracing::info!(
                                "{} converged after {} attempts",
                                resource,
                                outcome.attempts
                            );
                            return self.finish(outcome, start);
                        }
                        Verdict::FailedTerminally(reason) => {
                            tracing::error!("{} failed terminally: {}", resource, reason);
                            outcome.error = Some(PollError::TerminalCondition {
                                resource: resource.to_string(),
                                reason,
                            });
                            return self.finish(outcome, start);
                        }
                        Verdict::NotYet => {
                            tracing::debug!(
                                "{} not converged yet (attempt {}/{})",
                                resource,
                                outcome.attempts,
                                policy.retries
                            );
                        }
                    }
                }
                Err(FetchError::Permanent(message)) => {
                    tracing::error!("Fetching {} failed permanently: {}", resource, message);
                    outcome.error = Some(PollError::Fetch {
                        resource: resource.to_string(),
                        message,
                    });
                    return self.finish(outcome, start);
                }
                Err(FetchError::Transient(message)) => {
                    tracing::warn!(
                        "Fetching {} failed (attempt {}/{}): {}",
                        resource,
                        outcome.attempts,
                        policy.retries,
                        message
                    );
                    outcome.last_fetch_error = Some(message);
                }
            }

            if outcome.attempts >= policy.retries {
                break;
            }

            let mut wait = policy.next_delay();
            if let Some(deadline) = deadline {
                let now = self.clock.now();
                if now >= deadline {
                    break;
                }
                wait = wait.min(deadline.saturating_duration_since(now));
            }

            self.clock.sleep(wait).await;
        }

        tracing::warn!(
            "{} did not converge after {} attempts",
            resource,
            outcome.attempts
        );
        outcome.error = Some(PollError::DeadlineExceeded {
            resource: resource.to_string(),
            attempts: outcome.attempts,
        });
        self.finish(outcome, start)
    }

    fn finish(&self, mut outcome: PollOutcome, start: Instant) -> PollOutcome {
        outcome.elapsed = self.clock.now().saturating_duration_since(start);
        outcome
    }
}
