//! Averaging policy selection.

use serde::{Deserialize, Serialize};

use crate::{ticks_from_millis, Tick};

/// Strategy selecting which buffered samples form a channel's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AveragingPolicy {
    /// Last inserted sample, no averaging
    MostRecent,

    /// Unweighted mean of the last `size` samples
    CountWindow { size: usize },

    /// Unweighted mean of the samples within `window_ms` of now
    TimeWindow { window_ms: u64 },

    /// Linear-ramp weighted mean over the whole buffer, newest weighted highest
    #[default]
    RecencyWeighted,
}

impl AveragingPolicy {
    /// Mean of the last `n` readings.
    pub const fn last_readings(n: usize) -> Self {
        Self::CountWindow { size: n }
    }

    /// Mean of the readings in the last `ms` milliseconds.
    pub const fn last_millis(ms: u64) -> Self {
        Self::TimeWindow { window_ms: ms }
    }

    /// Lookback of a time window in ticks.
    pub fn window_ticks(&self) -> Option<Tick> {
        match self {
            Self::TimeWindow { window_ms } => Some(ticks_from_millis(*window_ms)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MostRecent => "most_recent",
            Self::CountWindow { .. } => "count_window",
            Self::TimeWindow { .. } => "time_window",
            Self::RecencyWeighted => "recency_weighted",
        }
    }
}

impl std::fmt::Display for AveragingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CountWindow { size } => write!(f, "count_window({size})"),
            Self::TimeWindow { window_ms } => write!(f, "time_window({window_ms}ms)"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(
            AveragingPolicy::last_readings(10),
            AveragingPolicy::CountWindow { size: 10 }
        );
        assert_eq!(AveragingPolicy::last_millis(100).window_ticks(), Some(1_000_000));
        assert_eq!(AveragingPolicy::MostRecent.window_ticks(), None);
        assert_eq!(AveragingPolicy::default(), AveragingPolicy::RecencyWeighted);
    }

    #[test]
    fn test_tagged_serde() {
        let p: AveragingPolicy =
            serde_json::from_str(r#"{ "kind": "count_window", "size": 5 }"#).unwrap();
        assert_eq!(p, AveragingPolicy::CountWindow { size: 5 });

        let p: AveragingPolicy = serde_json::from_str(r#"{ "kind": "most_recent" }"#).unwrap();
        assert_eq!(p, AveragingPolicy::MostRecent);
        assert_eq!(p.to_string(), "most_recent");
    }
}
