//! Averaging policy evaluation.

use contracts::{Averageable, AveragingPolicy, Tick};

use crate::buffer::SampleBuffer;

/// Compute a channel's current value from its buffer.
///
/// Pure for a fixed buffer and `now`. Empty selections yield `T::zero()`.
/// An unbounded buffer means no smoothing: every policy reports the newest
/// sample.
pub fn evaluate<T: Averageable>(policy: &AveragingPolicy, buffer: &SampleBuffer<T>, now: Tick) -> T {
    if buffer.capacity().is_none() {
        return newest(buffer);
    }

    match policy {
        AveragingPolicy::MostRecent => newest(buffer),
        AveragingPolicy::CountWindow { size } => mean(&buffer.last_n(*size)),
        AveragingPolicy::TimeWindow { .. } => {
            let lookback = policy.window_ticks().unwrap_or(0);
            mean(&buffer.since(now.saturating_sub(lookback)))
        }
        AveragingPolicy::RecencyWeighted => {
            // Oldest sample weighs 1, newest weighs len
            weighted_mean(
                buffer
                    .iter()
                    .enumerate()
                    .map(|(i, (_, v))| (v, (i + 1) as f64)),
            )
        }
    }
}

fn newest<T: Averageable>(buffer: &SampleBuffer<T>) -> T {
    buffer
        .latest()
        .map(|(_, v)| v.clone())
        .unwrap_or_else(T::zero)
}

fn mean<T: Averageable>(values: &[T]) -> T {
    weighted_mean(values.iter().map(|v| (v, 1.0)))
}

fn weighted_mean<'a, T, I>(samples: I) -> T
where
    T: Averageable,
    I: Iterator<Item = (&'a T, f64)>,
{
    let (sum, total_weight) = samples.fold((T::zero(), 0.0), |(sum, total), (v, w)| {
        (sum.weighted_add(v, w), total + w)
    });
    if total_weight > 0.0 {
        sum.scale(1.0 / total_weight)
    } else {
        T::zero()
    }
}
