//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ContractError, StreamerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source_count: usize,
    receiver_count: usize,
    translated_receivers: usize,
    filter_rules: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let invalid = |error: String, field: Option<String>| ValidationResult {
        valid: false,
        config_path: config_path.clone(),
        error: Some(error),
        field,
        warnings: Vec::new(),
        summary: None,
    };

    if !args.config.exists() {
        return invalid(format!("File not found: {}", args.config.display()), None);
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path: config_path.clone(),
            error: None,
            field: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(summarize(&blueprint)),
        },
        Err(e) => {
            let field = match &e {
                ContractError::ConfigValidation { field, .. } => Some(field.clone()),
                _ => None,
            };
            invalid(e.to_string(), field)
        }
    }
}

fn summarize(blueprint: &StreamerBlueprint) -> ConfigSummary {
    let translations = || blueprint.receivers.iter().filter_map(|r| r.translation.as_ref());
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        source_count: blueprint.sources.active_ids().count(),
        receiver_count: blueprint.receivers.len(),
        translated_receivers: translations().count(),
        filter_rules: translations().map(|t| t.filters.len()).sum(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &StreamerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.receivers.is_empty() {
        warnings.push("No receivers configured - records will be scanned and discarded".to_string());
    }

    let skipped = blueprint.sources.ids.iter().filter(|id| id.is_empty()).count();
    if skipped > 0 {
        warnings.push(format!("{skipped} empty source id(s) will be skipped"));
    }

    for receiver in &blueprint.receivers {
        if let Some(translation) = &receiver.translation {
            if translation.paths.is_empty() && translation.filters.is_empty() {
                warnings.push(format!(
                    "Receiver '{}' has an empty translation section - payloads are re-serialized unchanged",
                    receiver.name
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sources: {}", summary.source_count);
            println!("  Receivers: {}", summary.receiver_count);
            println!("  Translated receivers: {}", summary.translated_receivers);
            println!("  Filter rules: {}", summary.filter_rules);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
