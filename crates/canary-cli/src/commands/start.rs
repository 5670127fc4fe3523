use std::path::PathBuf;

use anyhow::Context;
use canary_core::{config::parse_duration, CanaryConfig, Location, RolloutConfig, RolloutTarget};
use canary_gce::{GceConfig, GceFleetApi};
use canary_rollout::{Orchestrator, Shutdown};
use clap::Args;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Google Cloud project ID.
    #[arg(long)]
    pub project: String,

    /// Region of a regional managed instance group.
    #[arg(long)]
    pub region: Option<String>,

    /// Zone of a zonal managed instance group.
    #[arg(long)]
    pub zone: Option<String>,

    /// Name of the managed instance group.
    #[arg(long)]
    pub group: String,

    /// Name of the instance template to roll out.
    #[arg(long)]
    pub template: String,

    /// Path to a canary.toml with rollout settings.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Wait between stability polls ("60s", "500ms", "2m").
    #[arg(long)]
    pub tick_interval: Option<String>,

    /// Stability polls before giving up.
    #[arg(long)]
    pub max_ticks: Option<u32>,

    /// Compute Engine API endpoint.
    #[arg(long, default_value = canary_gce::client::DEFAULT_ENDPOINT)]
    pub endpoint: String,
}

impl StartArgs {
    fn location(&self) -> anyhow::Result<Location> {
        Ok(Location::from_parts(
            self.region.as_deref(),
            self.zone.as_deref(),
        )?)
    }

    fn target(&self) -> anyhow::Result<RolloutTarget> {
        Ok(RolloutTarget::new(
            &self.project,
            self.location()?,
            &self.group,
            &self.template,
        ))
    }

    /// Defaults, then the config file, then flags.
    fn rollout_config(&self) -> anyhow::Result<RolloutConfig> {
        let file = match &self.config {
            Some(path) => CanaryConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => CanaryConfig::default(),
        };
        let mut config = file.rollout_config()?;

        if let Some(raw) = &self.tick_interval {
            config.tick_interval = parse_duration(raw)
                .with_context(|| format!("invalid --tick-interval '{raw}'"))?;
        }
        if let Some(ticks) = self.max_ticks {
            config.max_ticks = ticks;
        }
        config.validate()?;
        Ok(config)
    }
}

pub async fn run(args: StartArgs) -> anyhow::Result<()> {
    let target = args.target()?;
    let config = args.rollout_config()?;

    let api = GceFleetApi::connect(GceConfig {
        endpoint: args.endpoint.clone(),
        ..Default::default()
    })
    .await
    .context("initializing compute API client")?;

    let orchestrator = Orchestrator::new(api, target, config);

    let (shutdown_tx, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling rollout");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = orchestrator.start(shutdown).await?;
    info!(
        iterations = summary.iterations(),
        canary_sizes = ?summary.canary_sizes,
        "rollout finished"
    );
    Ok(())
}
