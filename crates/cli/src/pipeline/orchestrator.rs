//! Pipeline orchestrator - wires sources, coordinators and receivers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{CancellationToken, ContractError, StreamerBlueprint};
use dispatcher::{MultiStreamCoordinator, ReceiverSet};
use ingestion::JsonLinesSourceFactory;
use tracing::{info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration
    pub blueprint: StreamerBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every source to completion, or until `shutdown` fires
    #[instrument(name = "pipeline_run", skip_all)]
    pub async fn run(self, shutdown: CancellationToken) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let receivers = ReceiverSet::from_configs(&blueprint.receivers)
            .await
            .map_err(|e| CliError::receiver_setup(e.to_string()))?;

        let factory = Arc::new(JsonLinesSourceFactory::from_config(&blueprint.sources));
        let group = match MultiStreamCoordinator::build(
            &shutdown,
            factory,
            blueprint.sources.active_ids(),
            &blueprint.dispatch,
        )
        .await
        {
            Ok(group) => group,
            Err(ContractError::Cancelled) => {
                warn!("shutdown requested while opening sources");
                close_receivers(&receivers).await;
                return Ok(self.stats(Vec::new(), &receivers, start_time.elapsed(), true));
            }
            Err(e) => {
                close_receivers(&receivers).await;
                return Err(CliError::stream(e).into());
            }
        };

        let sources: Vec<String> = group.source_ids().into_iter().map(String::from).collect();
        info!(
            sources = ?sources,
            receivers = receivers.len(),
            max_in_flight = blueprint.dispatch.max_in_flight,
            "Streaming started"
        );

        let result = group.stream_all(&shutdown, &receivers.receivers()).await;
        close_receivers(&receivers).await;

        let stats = self.stats(sources, &receivers, start_time.elapsed(), shutdown.is_cancelled());
        match result {
            Ok(()) => {
                info!(
                    delivered = stats.total_delivered(),
                    cancelled = stats.cancelled,
                    "Pipeline shutdown complete"
                );
                Ok(stats)
            }
            Err(e) => Err(CliError::stream(e).into()),
        }
    }

    fn stats(
        &self,
        sources: Vec<String>,
        receivers: &ReceiverSet,
        duration: Duration,
        cancelled: bool,
    ) -> PipelineStats {
        PipelineStats {
            sources,
            receivers: receivers.snapshots(),
            duration,
            cancelled,
        }
    }
}

async fn close_receivers(receivers: &ReceiverSet) {
    if let Err(e) = receivers.close_all().await {
        warn!(error = %e, "failed to close receivers cleanly");
    }
}
