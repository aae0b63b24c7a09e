//! Callback types connecting sources, channels and the fusion engine.

use std::sync::Arc;

use crate::{FusionSnapshot, Sample, Tick};

/// Push-style raw reading callback (`onReading(value, tick)`).
pub type ReadingCallback<T> = Arc<dyn Fn(Sample<T>) + Send + Sync>;

/// Throttled channel notification carrying the freshly averaged value.
pub type NotifyCallback<T> = Arc<dyn Fn(&T, Tick) + Send + Sync>;

/// Fused-update listener.
pub type FusedUpdateCallback = Arc<dyn Fn(&FusionSnapshot) + Send + Sync>;
