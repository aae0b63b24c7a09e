//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelKind, PipelineConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    session: SessionInfo,
    channels: Vec<ChannelInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replay: Option<ReplayInfo>,
}

#[derive(Serialize)]
struct SessionInfo {
    distance_units: String,
    fused_min_interval_ms: u64,
}

#[derive(Serialize)]
struct ChannelInfo {
    channel: ChannelKind,
    /// None = unbounded
    capacity: Option<usize>,
    policy: String,
    min_notify_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording: Option<String>,
}

#[derive(Serialize)]
struct ReplayInfo {
    directory: String,
    speed: f64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &PipelineConfig) -> ConfigInfo {
    let channels = config
        .channels
        .iter()
        .map(|(kind, channel)| ChannelInfo {
            channel: kind,
            capacity: channel.capacity,
            policy: channel.policy.to_string(),
            min_notify_interval_ms: channel.min_notify_interval_ms,
            recording: config
                .replay
                .as_ref()
                .map(|r| r.path_for(kind).display().to_string()),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        session: SessionInfo {
            distance_units: format!("{:?}", config.session.distance_units),
            fused_min_interval_ms: config.session.fused_min_interval_ms,
        },
        channels,
        replay: config.replay.as_ref().map(|r| ReplayInfo {
            directory: r.directory.display().to_string(),
            speed: r.speed,
        }),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Kinefeed Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Session");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Distance units: {}", info.session.distance_units);
    println!(
        "   └─ Fused interval: {} ms",
        info.session.fused_min_interval_ms
    );

    println!("\n📡 Channels");
    println!(
        "   {:<14} {:>10} {:>10}  {}",
        "CHANNEL", "CAPACITY", "INTERVAL", "POLICY"
    );
    for channel in &info.channels {
        let capacity = channel
            .capacity
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unbounded".to_string());
        println!(
            "   {:<14} {:>10} {:>8}ms  {}",
            channel.channel.as_str(),
            capacity,
            channel.min_notify_interval_ms,
            channel.policy
        );
    }

    match &info.replay {
        Some(replay) => {
            println!("\n▶️  Replay");
            println!("   ├─ Directory: {}", replay.directory);
            println!("   ├─ Speed: x{}", replay.speed);
            println!("   └─ Recordings:");
            for channel in &info.channels {
                if let Some(ref path) = channel.recording {
                    println!("        {}: {}", channel.channel, path);
                }
            }
        }
        None => println!("\n▶️  Replay: (none)"),
    }

    println!();
}
