use anyhow::{Context, Result};
/// Test utilities for integration tests
/// Manages kind cluster lifecycle and MachineConfigPool fixtures
use std::process::Command;

pub const CLUSTER_NAME: &str = "converge";
pub const MCP_CRD_NAME: &str = "machineconfigpools.machineconfiguration.openshift.io";
pub const MCP_GROUP: &str = "machineconfiguration.openshift.io";
pub const MCP_VERSION: &str = "v1";
pub const MCP_KIND: &str = "MachineConfigPool";

/// Test fixture that manages kind cluster lifecycle
pub struct KindCluster {
    cluster_name: String,
}

impl KindCluster {
    /// Get or create the test cluster
    /// Idempotent - safe to call multiple times
    pub fn setup() -> Result<Self> {
        let cluster = Self {
            cluster_name: CLUSTER_NAME.to_string(),
        };

        if !cluster.exists()? {
            println!("Creating kind cluster: {}", CLUSTER_NAME);
            cluster.create()?;
        } else {
            println!("Using existing kind cluster: {}", CLUSTER_NAME);
        }

        Ok(cluster)
    }

    /// Check if cluster exists
    fn exists(&self) -> Result<bool> {
        let output = Command::new("kind")
            .args(["get", "clusters"])
            .output()
            .context("Failed to execute 'kind get clusters'")?;

        if !output.status.success() {
            return Ok(false);
        }

        let clusters = String::from_utf8_lossy(&output.stdout);
        Ok(clusters
            .lines()
            .any(|line| line.trim() == self.cluster_name))
    }

    /// Create a single-node kind cluster
    fn create(&self) -> Result<()> {
        let status = Command::new("kind")
            .args(["create", "cluster", "--name", &self.cluster_name])
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .status()
            .context("Failed to run 'kind create cluster'")?;

        if !status.success() {
            anyhow::bail!("kind create cluster failed");
        }

        self.wait_for_ready()
    }

    /// Wait for cluster nodes to be ready
    fn wait_for_ready(&self) -> Result<()> {
        println!("Waiting for cluster nodes to be ready...");

        let status = Command::new("kubectl")
            .args([
                "wait",
                "--for=condition=Ready",
                "nodes",
                "--all",
                "--timeout=60s",
            ])
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .status()
            .context("Failed to wait for nodes")?;

        if !status.success() {
            anyhow::bail!("Nodes did not become ready in time");
        }

        Ok(())
    }

    /// Get cluster name for kubectl context
    pub fn context_name(&self) -> String {
        format!("kind-{}", self.cluster_name)
    }
}

/// Delete the test cluster
/// Call this explicitly if you want to clean up
#[allow(dead_code)]
pub fn teardown_cluster() -> Result<()> {
    println!("Deleting kind cluster: {}", CLUSTER_NAME);

    let status = Command::new("kind")
        .args(["delete", "cluster", "--name", CLUSTER_NAME])
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .context("Failed to delete cluster")?;

    if !status.success() {
        anyhow::bail!("Failed to delete cluster");
    }

    Ok(())
}

fn pool_api(client: kube::Client) -> kube::Api<kube::api::DynamicObject> {
    use kube::api::{ApiResource, GroupVersionKind};

    let gvk = GroupVersionKind::gvk(MCP_GROUP, MCP_VERSION, MCP_KIND);
    kube::Api::all_with(client, &ApiResource::from_gvk(&gvk))
}

/// Install a schemaless MachineConfigPool CRD with a status subresource
/// Idempotent - returns once the CRD is established
pub async fn install_machine_config_pool_crd() -> Result<()> {
    use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1 as apiextensions;
    use kube::{Api, Client};
    use std::time::Duration;
    use tokio::time::sleep;

    let client = Client::try_default().await?;
    let crds: Api<apiextensions::CustomResourceDefinition> = Api::all(client);

    if crds.get_opt(MCP_CRD_NAME).await?.is_none() {
        let crd = serde_json::json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "CustomResourceDefinition",
            "metadata": { "name": MCP_CRD_NAME },
            "spec": {
                "group": MCP_GROUP,
                "scope": "Cluster",
                "names": {
                    "kind": MCP_KIND,
                    "listKind": "MachineConfigPoolList",
                    "plural": "machineconfigpools",
                    "singular": "machineconfigpool",
                },
                "versions": [{
                    "name": MCP_VERSION,
                    "served": true,
                    "storage": true,
                    "subresources": { "status": {} },
                    "schema": {
                        "openAPIV3Schema": {
                            "type": "object",
                            "x-kubernetes-preserve-unknown-fields": true,
                        },
                    },
                }],
            },
        });

        crds.create(&kube::api::PostParams::default(), &serde_json::from_value(crd)?)
            .await
            .context("Failed to create MachineConfigPool CRD")?;
    }

    for _ in 0..30 {
        let crd = crds.get(MCP_CRD_NAME).await?;

        if let Some(status) = &crd.status {
            if let Some(conditions) = &status.conditions {
                if conditions
                    .iter()
                    .any(|c| c.type_ == "Established" && c.status == "True")
                {
                    return Ok(());
                }
            }
        }

        sleep(Duration::from_secs(1)).await;
    }

    anyhow::bail!("CRD {} was not established in time", MCP_CRD_NAME)
}

/// Helper to create an empty MachineConfigPool
pub async fn create_pool(name: &str) -> Result<()> {
    let client = kube::Client::try_default().await?;
    let pools = pool_api(client);

    let pool = serde_json::json!({
        "apiVersion": format!("{}/{}", MCP_GROUP, MCP_VERSION),
        "kind": MCP_KIND,
        "metadata": { "name": name },
        "spec": { "paused": false },
    });

    pools
        .create(&kube::api::PostParams::default(), &serde_json::from_value(pool)?)
        .await
        .context("Failed to create MachineConfigPool")?;

    Ok(())
}

/// Replace a pool's status conditions and mark its generation observed
pub async fn set_pool_conditions(name: &str, conditions: &[(&str, &str)]) -> Result<()> {
    use kube::api::{Patch, PatchParams};

    let client = kube::Client::try_default().await?;
    let pools = pool_api(client);

    let generation = pools.get(name).await?.metadata.generation.unwrap_or(1);

    let entries: Vec<_> = conditions
        .iter()
        .map(|(type_, status)| serde_json::json!({ "type": type_, "status": status }))
        .collect();

    let patch = serde_json::json!({
        "status": {
            "observedGeneration": generation,
            "conditions": entries,
        }
    });

    pools
        .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .context("Failed to patch MachineConfigPool status")?;

    Ok(())
}

/// Helper to delete a MachineConfigPool
pub async fn delete_pool(name: &str) -> Result<()> {
    let client = kube::Client::try_default().await?;
    let pools = pool_api(client);

    pools
        .delete(name, &kube::api::DeleteParams::default())
        .await
        .context("Failed to delete MachineConfigPool")?;

    Ok(())
}
