//! Replay session statistics.

use std::time::Duration;

use fusion_engine::ChannelStats;
use observability::FusionStatsAggregator;

/// Statistics from one replay session
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Fused snapshots emitted by the engine
    pub fused_updates: u64,

    /// Snapshots written to the JSON lines output
    pub lines_written: u64,

    /// Wall-clock duration of the session
    pub duration: Duration,

    /// Whether the session ended early (signal or timeout)
    pub interrupted: bool,

    /// Per-channel counters at the end of the session
    pub channels: Vec<ChannelStats>,

    /// Fused metrics aggregator
    pub fusion: FusionStatsAggregator,
}

impl SessionStats {
    /// Fused updates per wall-clock second
    pub fn updates_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.fused_updates as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Replay Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Fused updates: {}", self.fused_updates);
        println!("   ├─ Updates/sec: {:.2}", self.updates_per_sec());
        println!("   ├─ Lines written: {}", self.lines_written);
        println!("   └─ Interrupted: {}", self.interrupted);

        println!("\n📡 Channels");
        for (i, channel) in self.channels.iter().enumerate() {
            let prefix = if i == self.channels.len() - 1 {
                "└─"
            } else {
                "├─"
            };
            println!(
                "   {} {}: received={}, notified={}, buffered={}, dropped={}, out_of_order={}",
                prefix,
                channel.kind,
                channel.received,
                channel.notifications,
                channel.buffered,
                channel.dropped,
                channel.out_of_order
            );
        }

        println!("\n{}", self.fusion.summary());
    }
}
