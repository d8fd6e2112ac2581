//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{CancellationToken, StreamerBlueprint};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::Config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(max_in_flight) = args.max_in_flight {
        info!(max_in_flight, "Overriding dispatch.max_in_flight from CLI");
        blueprint.dispatch.max_in_flight = max_in_flight;
        config_loader::validate(&blueprint).map_err(CliError::Config)?;
    }

    info!(
        sources = blueprint.sources.active_ids().count(),
        receivers = blueprint.receivers.len(),
        max_in_flight = blueprint.dispatch.max_in_flight,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    let signals = tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                warn!("Received shutdown signal, stopping streams...");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install signal handlers"),
        }
    });

    info!("Starting streams...");
    let result = pipeline.run(shutdown).await;
    signals.abort();

    let stats = result.context("Pipeline execution failed")?;
    info!(
        delivered = stats.total_delivered(),
        duration_secs = stats.duration.as_secs_f64(),
        cancelled = stats.cancelled,
        "Pipeline completed"
    );
    stats.print_summary();

    info!("kinestream finished");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &StreamerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Sources:");
    for id in blueprint.sources.active_ids() {
        println!("  - {id}");
    }
    println!(
        "  Files: {}/<id>.{}",
        blueprint.sources.base_path.display(),
        blueprint.sources.extension
    );
    println!("\nDispatch:");
    println!("  Max in flight: {}", blueprint.dispatch.max_in_flight);
    println!("  Drain timeout: {}ms", blueprint.dispatch.drain_timeout_ms);

    println!("\nReceivers ({}):", blueprint.receivers.len());
    for receiver in &blueprint.receivers {
        let translated = if receiver.translation.is_some() {
            " [translated]"
        } else {
            ""
        };
        println!("  - {} ({:?}){translated}", receiver.name, receiver.receiver_type);
    }
    println!();
}
