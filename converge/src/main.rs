use converge::{kube, wait, Clock, Config, Poller, TokioClock};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging; stdout is reserved for the JSON report
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("converge-wait starting");
    tracing::info!("Target: {}", config.target.resource());
    match config.rollout_plan() {
        Some(plan) => {
            tracing::info!("Start policy: {}", plan.start_policy);
            tracing::info!("Completion policy: {}", plan.completion_policy);
        }
        None => tracing::info!("Policy: {}", config.policy),
    }

    // Initialize Kubernetes client
    tracing::info!("Connecting to Kubernetes...");
    let kube_client = kube::KubeClient::new().await?;
    tracing::info!("Connected to Kubernetes");

    // Create poller with dynamic dispatch
    let poller = Poller::new(
        Arc::new(kube_client) as Arc<dyn kube::ResourceFetcher>,
        Arc::new(TokioClock) as Arc<dyn Clock>,
    );

    let report = wait::run(&config, &poller).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.succeeded() {
        tracing::info!("{}", report.summary());
        Ok(())
    } else {
        tracing::error!("{}", report.summary());
        std::process::exit(report.exit_code());
    }
}
