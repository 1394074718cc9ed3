pub mod clock;
pub mod config;
pub mod error;
pub mod kube;
pub mod outcome;
pub mod policy;
pub mod poller;
pub mod predicate;
pub mod presets;
pub mod rollout;
pub mod wait;

// Re-exports for convenience
pub use clock::{Clock, FakeClock, TokioClock};
pub use config::{Config, WaitTarget};
pub use error::{ConvergeError, ConvergeResult, FailureKind, FetchError, PollError};
pub use outcome::PollOutcome;
pub use policy::PollPolicy;
pub use poller::Poller;
pub use predicate::{ConditionPredicate, Predicate, Verdict};
pub use rollout::{RolloutFailure, RolloutOutcome, RolloutPlan};
pub use wait::Report;
