//! Per-channel sample buffer with tick-based ordering.
//!
//! Samples are keyed by tick in a `BTreeMap`, so an out-of-order arrival is
//! placed by tick and a second sample at the same tick replaces the first.
//! Appends at the end, the common case for a live source, are cheap.

use std::collections::BTreeMap;
use std::fmt;

use contracts::Tick;

/// Bounded, tick-ordered store of one channel's raw readings.
///
/// `capacity = None` never evicts.
#[derive(Clone)]
pub struct SampleBuffer<T> {
    samples: BTreeMap<Tick, T>,
    capacity: Option<usize>,
    dropped_count: u64,
    out_of_order_count: u64,
}

impl<T> fmt::Debug for SampleBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.samples.len())
            .field("capacity", &self.capacity)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl<T> Default for SampleBuffer<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T: Clone> SampleBuffer<T> {
    /// Most recent `min(n, len)` values, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<T> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.values().skip(skip).cloned().collect()
    }

    /// Values with `tick' >= tick`, oldest first.
    ///
    /// Falls back to the single most recent value when nothing is that new,
    /// so a non-empty buffer always yields something.
    pub fn since(&self, tick: Tick) -> Vec<T> {
        let values: Vec<T> = self.samples.range(tick..).map(|(_, v)| v.clone()).collect();
        if values.is_empty() {
            return self.latest().map(|(_, v)| v.clone()).into_iter().collect();
        }
        values
    }
}

impl<T> SampleBuffer<T> {
    /// Create a buffer holding at most `capacity` samples
    #[inline]
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            samples: BTreeMap::new(),
            capacity,
            dropped_count: 0,
            out_of_order_count: 0,
        }
    }

    #[inline]
    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    #[inline]
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Insert a sample, evicting the oldest entries while over capacity.
    pub fn append(&mut self, value: T, tick: Tick) {
        // Track out-of-order arrivals
        if let Some((&last, _)) = self.samples.last_key_value() {
            if tick < last {
                self.out_of_order_count += 1;
            }
        }

        self.samples.insert(tick, value);
        self.evict_to_capacity();
    }

    /// Change the capacity. Shrinking evicts from the front; growing never evicts.
    pub fn set_capacity(&mut self, capacity: Option<usize>) {
        self.capacity = capacity;
        self.evict_to_capacity();
    }

    fn evict_to_capacity(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        while self.samples.len() > capacity {
            if self.samples.pop_first().is_none() {
                break;
            }
            self.dropped_count += 1;
        }
    }

    #[inline]
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Newest sample
    #[inline]
    pub fn latest(&self) -> Option<(Tick, &T)> {
        self.samples.last_key_value().map(|(t, v)| (*t, v))
    }

    /// All samples, oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Tick, &T)> + ExactSizeIterator {
        self.samples.iter().map(|(t, v)| (*t, v))
    }

    /// Number of samples with `tick' > tick`
    pub fn count_after(&self, tick: Tick) -> usize {
        self.samples
            .range((std::ops::Bound::Excluded(tick), std::ops::Bound::Unbounded))
            .count()
    }

    /// Samples evicted so far
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Samples that arrived with a tick older than the newest buffered one
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
