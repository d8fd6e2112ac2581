//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::{ReceiverConfig, StreamerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sources: SourcesInfo,
    dispatch: DispatchInfo,
    receivers: Vec<ReceiverInfo>,
}

#[derive(Serialize)]
struct SourcesInfo {
    ids: Vec<String>,
    base_path: String,
    extension: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pace_ms: Option<u64>,
}

#[derive(Serialize)]
struct DispatchInfo {
    max_in_flight: usize,
    drain_timeout_ms: u64,
}

#[derive(Serialize)]
struct ReceiverInfo {
    name: String,
    receiver_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    translation: Option<TranslationInfo>,
}

#[derive(Serialize)]
struct TranslationInfo {
    separator: String,
    paths: BTreeMap<String, String>,
    filters: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .map_err(CliError::Config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args.receivers);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &StreamerBlueprint, detailed: bool) -> ConfigInfo {
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sources: SourcesInfo {
            ids: blueprint.sources.active_ids().map(String::from).collect(),
            base_path: blueprint.sources.base_path.display().to_string(),
            extension: blueprint.sources.extension.clone(),
            pace_ms: blueprint.sources.pace_ms,
        },
        dispatch: DispatchInfo {
            max_in_flight: blueprint.dispatch.max_in_flight,
            drain_timeout_ms: blueprint.dispatch.drain_timeout_ms,
        },
        receivers: blueprint
            .receivers
            .iter()
            .map(|r| receiver_info(r, detailed))
            .collect(),
    }
}

fn receiver_info(receiver: &ReceiverConfig, detailed: bool) -> ReceiverInfo {
    let translation = receiver
        .translation
        .as_ref()
        .filter(|_| detailed)
        .map(|t| TranslationInfo {
            separator: t.separator.clone(),
            paths: t.paths.clone(),
            filters: t
                .filters
                .iter()
                .map(|f| format!("{} {} {}", f.field, f.op.as_str(), f.value))
                .collect(),
        });

    ReceiverInfo {
        name: receiver.name.clone(),
        receiver_type: format!("{:?}", receiver.receiver_type).to_lowercase(),
        translation,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Kinestream Configuration ({}) ===\n", info.version);

    println!("Sources ({})", info.sources.ids.len());
    for id in &info.sources.ids {
        println!(
            "   ├─ {id} -> {}/{id}.{}",
            info.sources.base_path, info.sources.extension
        );
    }
    match info.sources.pace_ms {
        Some(pace) => println!("   └─ Pace: {pace}ms"),
        None => println!("   └─ Pace: none"),
    }

    println!("\nDispatch");
    println!("   ├─ Max in flight: {}", info.dispatch.max_in_flight);
    println!("   └─ Drain timeout: {}ms", info.dispatch.drain_timeout_ms);

    println!("\nReceivers ({})", info.receivers.len());
    for (i, receiver) in info.receivers.iter().enumerate() {
        let is_last = i + 1 == info.receivers.len();
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        println!("   {prefix} {} ({})", receiver.name, receiver.receiver_type);

        if let Some(t) = &receiver.translation {
            for (path, dest) in &t.paths {
                println!("   {child_prefix}  {path} -> {dest} (sep '{}')", t.separator);
            }
            for filter in &t.filters {
                println!("   {child_prefix}  filter: {filter}");
            }
        }
    }
    println!();
}
