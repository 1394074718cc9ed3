use crate::policy::PollPolicy;
use crate::predicate::{ConditionMatch, ConditionPredicate};
use crate::presets;
use crate::rollout::RolloutPlan;
use common::ResourceReference;
use std::env;
use std::time::Duration;

/// What the wait binary should wait for
#[derive(Debug, Clone)]
pub enum WaitTarget {
    /// MachineConfigPool starts updating, then finishes
    McpRollout(ResourceReference),
    /// MachineConfigPool is fully updated (single poll)
    McpUpdated(ResourceReference),
    /// Network operator starts progressing, then settles
    NetworkRollout(ResourceReference),
    /// Any object, one named condition
    Custom {
        resource: ResourceReference,
        predicate: ConditionPredicate,
    },
}

impl WaitTarget {
    pub fn resource(&self) -> &ResourceReference {
        match self {
            WaitTarget::McpRollout(resource)
            | WaitTarget::McpUpdated(resource)
            | WaitTarget::NetworkRollout(resource) => resource,
            WaitTarget::Custom { resource, .. } => resource,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub target: WaitTarget,
    /// Used by single-poll targets; rollout presets carry their own budgets
    pub policy: PollPolicy,
    pub start_optional: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let target = match env::var("WAIT_PRESET").ok().filter(|p| !p.is_empty()).as_deref() {
            Some("mcp-rollout") => WaitTarget::McpRollout(presets::machine_config_pool(
                &env::var("RESOURCE_NAME").unwrap_or_else(|_| "worker".to_string()),
            )?),
            Some("mcp-updated") => WaitTarget::McpUpdated(presets::machine_config_pool(
                &env::var("RESOURCE_NAME").unwrap_or_else(|_| "worker".to_string()),
            )?),
            Some("network-rollout") => WaitTarget::NetworkRollout(presets::cluster_network()?),
            Some(other) => anyhow::bail!("Unknown WAIT_PRESET: {}", other),
            None => custom_target_from_env()?,
        };

        let mut policy = PollPolicy::new(
            env::var("POLL_RETRIES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            Duration::from_secs(
                env::var("POLL_DELAY_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
            ),
        );

        if let Some(timeout) = env::var("POLL_TIMEOUT_SECS").ok().filter(|t| !t.is_empty()) {
            policy = policy.with_timeout(Duration::from_secs(timeout.parse()?));
        }

        if env::var("POLL_JITTER")
            .unwrap_or_else(|_| "false".to_string())
            .parse()?
        {
            policy = policy.with_jitter();
        }

        policy
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid POLL_RETRIES: {}", e))?;

        Ok(Self {
            target,
            policy,
            start_optional: env::var("ROLLOUT_START_OPTIONAL")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// The two-phase plan for rollout targets, `None` for single-poll targets
    pub fn rollout_plan(&self) -> Option<RolloutPlan> {
        let mut plan = match self.target {
            WaitTarget::McpRollout(_) => presets::mcp_rollout_plan(),
            WaitTarget::NetworkRollout(_) => presets::network_rollout_plan(),
            WaitTarget::McpUpdated(_) | WaitTarget::Custom { .. } => return None,
        };
        plan.start_optional = self.start_optional;
        Some(plan)
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} must be set", name))
}

fn custom_target_from_env() -> anyhow::Result<WaitTarget> {
    let api_version = required("RESOURCE_API_VERSION")?;
    let kind = required("RESOURCE_KIND")?;
    let name = required("RESOURCE_NAME")?;

    let resource = match env::var("RESOURCE_NAMESPACE").ok().filter(|ns| !ns.is_empty()) {
        Some(namespace) => ResourceReference::namespaced(api_version, kind, namespace, name)?,
        None => ResourceReference::cluster_scoped(api_version, kind, name)?,
    };

    let resource = match env::var("RESOURCE_PLURAL").ok().filter(|p| !p.is_empty()) {
        Some(plural) => resource.with_plural(plural),
        None => resource,
    };

    let predicate = ConditionPredicate::new()
        .require(
            required("CONDITION_TYPE")?,
            env::var("CONDITION_STATUS").unwrap_or_else(|_| "True".to_string()),
        )
        .fail_on_all(parse_terminal_conditions(
            &env::var("TERMINAL_CONDITIONS").unwrap_or_else(|_| "Degraded=True".to_string()),
        )?);

    Ok(WaitTarget::Custom {
        resource,
        predicate,
    })
}

/// Parse `Type=Status[,Type=Status...]`; an empty string means none
pub fn parse_terminal_conditions(text: &str) -> anyhow::Result<Vec<ConditionMatch>> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            ConditionMatch::parse(entry)
                .ok_or_else(|| anyhow::anyhow!("Invalid terminal condition: {}", entry))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "WAIT_PRESET",
        "RESOURCE_API_VERSION",
        "RESOURCE_KIND",
        "RESOURCE_NAME",
        "RESOURCE_NAMESPACE",
        "RESOURCE_PLURAL",
        "CONDITION_TYPE",
        "CONDITION_STATUS",
        "TERMINAL_CONDITIONS",
        "POLL_RETRIES",
        "POLL_DELAY_SECS",
        "POLL_TIMEOUT_SECS",
        "POLL_JITTER",
        "ROLLOUT_START_OPTIONAL",
        "RUST_LOG",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_preset_defaults() {
        clear_env();
        env::set_var("WAIT_PRESET", "mcp-rollout");

        let config = Config::from_env().unwrap();

        match &config.target {
            WaitTarget::McpRollout(resource) => {
                assert_eq!(resource.to_string(), "MachineConfigPool/worker")
            }
            other => panic!("unexpected target {:?}", other),
        }
        assert_eq!(config.policy.retries, 30);
        assert_eq!(config.policy.delay, Duration::from_secs(10));
        assert!(config.policy.timeout.is_none());
        assert!(!config.policy.jitter);
        assert!(!config.start_optional);
        assert_eq!(config.log_level, "info");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_mcp_updated_with_pool_name() {
        clear_env();
        env::set_var("WAIT_PRESET", "mcp-updated");
        env::set_var("RESOURCE_NAME", "worker-cnf");

        let config = Config::from_env().unwrap();
        assert!(matches!(config.target, WaitTarget::McpUpdated(_)));
        assert_eq!(config.target.resource().name(), "worker-cnf");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_network_preset() {
        clear_env();
        env::set_var("WAIT_PRESET", "network-rollout");
        env::set_var("ROLLOUT_START_OPTIONAL", "true");

        let config = Config::from_env().unwrap();
        assert_eq!(config.target.resource().to_string(), "Network/cluster");
        assert!(config.start_optional);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_rollout_plan_ignores_poll_policy() {
        clear_env();
        env::set_var("WAIT_PRESET", "mcp-rollout");
        env::set_var("POLL_RETRIES", "3");
        env::set_var("ROLLOUT_START_OPTIONAL", "true");

        let config = Config::from_env().unwrap();
        let plan = config.rollout_plan().unwrap();

        assert_eq!(plan.start_policy, presets::mcp_rollout_plan().start_policy);
        assert_eq!(plan.completion_policy, presets::mcp_rollout_plan().completion_policy);
        assert_ne!(plan.start_policy.retries, config.policy.retries);
        assert!(plan.start_optional);

        env::set_var("WAIT_PRESET", "mcp-updated");
        assert!(Config::from_env().unwrap().rollout_plan().is_none());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_custom_target() {
        clear_env();
        env::set_var("RESOURCE_API_VERSION", "sriovnetwork.openshift.io/v1");
        env::set_var("RESOURCE_KIND", "SriovNetworkNodeState");
        env::set_var("RESOURCE_NAMESPACE", "openshift-sriov-network-operator");
        env::set_var("RESOURCE_NAME", "worker-0");
        env::set_var("CONDITION_TYPE", "Synced");
        env::set_var("TERMINAL_CONDITIONS", "Degraded=True, Failed=True");
        env::set_var("POLL_RETRIES", "60");
        env::set_var("POLL_DELAY_SECS", "5");
        env::set_var("POLL_TIMEOUT_SECS", "600");
        env::set_var("POLL_JITTER", "true");
        env::set_var("RUST_LOG", "debug");

        let config = Config::from_env().unwrap();

        match &config.target {
            WaitTarget::Custom {
                resource,
                predicate,
            } => {
                assert_eq!(
                    resource.to_string(),
                    "SriovNetworkNodeState/openshift-sriov-network-operator/worker-0"
                );
                assert_eq!(
                    predicate.requirements(),
                    &[ConditionMatch::new("Synced", "True")]
                );
                assert_eq!(predicate.terminal().len(), 2);
            }
            other => panic!("unexpected target {:?}", other),
        }
        assert_eq!(config.policy.retries, 60);
        assert_eq!(config.policy.delay, Duration::from_secs(5));
        assert_eq!(config.policy.timeout, Some(Duration::from_secs(600)));
        assert!(config.policy.jitter);
        assert_eq!(config.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_custom_requires_condition_type() {
        clear_env();
        env::set_var("RESOURCE_API_VERSION", "operator.openshift.io/v1");
        env::set_var("RESOURCE_KIND", "Network");
        env::set_var("RESOURCE_NAME", "cluster");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("CONDITION_TYPE"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_no_target() {
        clear_env();

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("RESOURCE_API_VERSION"));
    }

    #[test]
    #[serial]
    fn test_config_unknown_preset() {
        clear_env();
        env::set_var("WAIT_PRESET", "sriov-rollout");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("sriov-rollout"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_invalid_retries() {
        clear_env();
        env::set_var("WAIT_PRESET", "network-rollout");

        env::set_var("POLL_RETRIES", "invalid");
        assert!(Config::from_env().is_err());

        env::set_var("POLL_RETRIES", "0");
        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_invalid_delay() {
        clear_env();
        env::set_var("WAIT_PRESET", "network-rollout");
        env::set_var("POLL_DELAY_SECS", "-1");

        assert!(Config::from_env().is_err());

        clear_env();
    }

    #[test]
    fn test_parse_terminal_conditions() {
        let parsed = parse_terminal_conditions("Degraded=True,RenderDegraded=True").unwrap();
        assert_eq!(
            parsed,
            vec![
                ConditionMatch::new("Degraded", "True"),
                ConditionMatch::new("RenderDegraded", "True")
            ]
        );

        assert!(parse_terminal_conditions("").unwrap().is_empty());
        assert!(parse_terminal_conditions("Degraded").is_err());
    }
}
