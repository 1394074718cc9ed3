//! Ready-made references and predicates for the OpenShift objects the
//! deployment workflows wait on.
//!
//! Conditions are looked up by `type`, so the order the operator writes them
//! in does not matter.

use crate::error::ConvergeResult;
use crate::policy::PollPolicy;
use crate::predicate::ConditionPredicate;
use crate::rollout::RolloutPlan;
use common::ResourceReference;
use std::time::Duration;

pub const MCP_API_VERSION: &str = "machineconfiguration.openshift.io/v1";
pub const MCP_KIND: &str = "MachineConfigPool";
pub const NETWORK_API_VERSION: &str = "operator.openshift.io/v1";
pub const NETWORK_KIND: &str = "Network";
pub const CLUSTER_NETWORK_NAME: &str = "cluster";

pub fn machine_config_pool(name: &str) -> ConvergeResult<ResourceReference> {
    Ok(ResourceReference::cluster_scoped(MCP_API_VERSION, MCP_KIND, name)?)
}

pub fn cluster_network() -> ConvergeResult<ResourceReference> {
    Ok(ResourceReference::cluster_scoped(
        NETWORK_API_VERSION,
        NETWORK_KIND,
        CLUSTER_NETWORK_NAME,
    )?)
}

/// The pool has begun rolling out a new rendered config
pub fn mcp_updating() -> ConditionPredicate {
    ConditionPredicate::new()
        .require("Updating", "True")
        .fail_on("Degraded", "True")
}

/// Every node in the pool runs the latest rendered config
pub fn mcp_updated() -> ConditionPredicate {
    ConditionPredicate::new()
        .require("Updated", "True")
        .require("Updating", "False")
        .require_observed_generation()
        .fail_on("Degraded", "True")
        .fail_on("RenderDegraded", "True")
}

/// The network operator is (or is no longer) applying a change
pub fn network_progressing(expected: bool) -> ConditionPredicate {
    let status = if expected { "True" } else { "False" };
    ConditionPredicate::new()
        .require("Progressing", status)
        .fail_on("Degraded", "True")
}

/// Node reboots make MCP rollouts slow: 30 x 10s to start, 60 x 30s to finish
pub fn mcp_rollout_plan() -> RolloutPlan {
    RolloutPlan {
        started: Box::new(mcp_updating()),
        start_policy: PollPolicy::new(30, Duration::from_secs(10)),
        completed: Box::new(mcp_updated()),
        completion_policy: PollPolicy::new(60, Duration::from_secs(30)),
        start_optional: false,
    }
}

pub fn network_rollout_plan() -> RolloutPlan {
    RolloutPlan {
        started: Box::new(network_progressing(true)),
        start_policy: PollPolicy::new(30, Duration::from_secs(10)),
        completed: Box::new(network_progressing(false)),
        completion_policy: PollPolicy::new(60, Duration::from_secs(10)),
        start_optional: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{Predicate, Verdict};
    use common::StatusSnapshot;
    use serde_json::json;

    fn mcp(generation: i64, observed: i64, conditions: serde_json::Value) -> StatusSnapshot {
        StatusSnapshot::new(
            Some(generation),
            json!({ "observedGeneration": observed, "conditions": conditions }),
        )
    }

    #[test]
    fn test_references() {
        let pool = machine_config_pool("worker-cnf").unwrap();
        assert_eq!(pool.to_string(), "MachineConfigPool/worker-cnf");
        assert_eq!(pool.group(), "machineconfiguration.openshift.io");
        assert!(pool.namespace().is_none());

        let network = cluster_network().unwrap();
        assert_eq!(network.to_string(), "Network/cluster");
        assert_eq!(network.group(), "operator.openshift.io");

        assert!(machine_config_pool("").is_err());
    }

    #[test]
    fn test_mcp_updated_waits_for_generation() {
        let conditions = json!([
            { "type": "Updated", "status": "True" },
            { "type": "Updating", "status": "False" },
            { "type": "Degraded", "status": "False" }
        ]);

        assert_eq!(mcp_updated().evaluate(&mcp(3, 2, conditions.clone())), Verdict::NotYet);
        assert_eq!(mcp_updated().evaluate(&mcp(3, 3, conditions)), Verdict::Satisfied);
    }

    #[test]
    fn test_mcp_updated_fails_on_render_degraded() {
        let conditions = json!([
            { "type": "Updated", "status": "False" },
            { "type": "Updating", "status": "True" },
            { "type": "RenderDegraded", "status": "True", "reason": "MissingMachineConfig" }
        ]);

        assert!(matches!(
            mcp_updated().evaluate(&mcp(3, 3, conditions)),
            Verdict::FailedTerminally(_)
        ));
    }

    #[test]
    fn test_mcp_updating() {
        let conditions = json!([{ "type": "Updating", "status": "True" }]);
        assert_eq!(mcp_updating().evaluate(&mcp(1, 1, conditions)), Verdict::Satisfied);
    }

    #[test]
    fn test_network_progressing() {
        let snapshot = StatusSnapshot::new(
            None,
            json!({ "conditions": [
                { "type": "ManagementStateDegraded", "status": "False" },
                { "type": "Degraded", "status": "False" },
                { "type": "Upgradeable", "status": "True" },
                { "type": "Progressing", "status": "True" },
                { "type": "Available", "status": "True" }
            ]}),
        );

        assert_eq!(network_progressing(true).evaluate(&snapshot), Verdict::Satisfied);
        assert_eq!(network_progressing(false).evaluate(&snapshot), Verdict::NotYet);
    }

    #[test]
    fn test_rollout_plans_are_valid() {
        assert!(mcp_rollout_plan().validate().is_ok());
        assert!(network_rollout_plan().validate().is_ok());
        assert!(!mcp_rollout_plan().start_optional);
    }
}
