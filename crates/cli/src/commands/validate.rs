//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{AveragingPolicy, ChannelKind, PipelineConfig};
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
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    distance_units: String,
    fused_min_interval_ms: u64,
    replay_directory: Option<String>,
    replay_speed: Option<f64>,
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

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    distance_units: format!("{:?}", config.session.distance_units),
                    fused_min_interval_ms: config.session.fused_min_interval_ms,
                    replay_directory: config
                        .replay
                        .as_ref()
                        .map(|r| r.directory.display().to_string()),
                    replay_speed: config.replay.as_ref().map(|r| r.speed),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &PipelineConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.replay.is_none() {
        warnings.push("No [replay] section - `kinefeed replay` will need --dir".to_string());
    }

    for (kind, channel) in config.channels.iter() {
        if channel.capacity.is_none() {
            warnings.push(format!(
                "channels.{kind}.capacity is unbounded - memory grows with every reading"
            ));
        }

        // A count window longer than the buffer can never fill
        if let (AveragingPolicy::CountWindow { size }, Some(capacity)) =
            (channel.policy, channel.capacity)
        {
            if size > capacity {
                warnings.push(format!(
                    "channels.{kind}.policy.size ({size}) exceeds capacity ({capacity})"
                ));
            }
        }
    }

    if config.channels.get(ChannelKind::Heading).policy != AveragingPolicy::MostRecent {
        warnings.push("channels.heading averages compass angles across the 0/360 wrap".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Units: {}", summary.distance_units);
            println!("  Fused interval: {} ms", summary.fused_min_interval_ms);
            match (&summary.replay_directory, summary.replay_speed) {
                (Some(dir), Some(speed)) => println!("  Replay: {} (x{})", dir, speed),
                _ => println!("  Replay: (none)"),
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
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
