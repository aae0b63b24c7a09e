//! Read-only replay cursor over a recorded dataset.

use std::collections::BTreeMap;

use contracts::Tick;

/// Recorded samples in tick order with a cursor that only moves forward.
#[derive(Debug, Clone)]
pub struct ReplaySession<T> {
    recorded: Vec<(Tick, T)>,
    cursor: usize,
}

impl<T> ReplaySession<T> {
    pub fn new(recorded: BTreeMap<Tick, T>) -> Self {
        Self {
            recorded: recorded.into_iter().collect(),
            cursor: 0,
        }
    }

    /// Total samples, delivered or not
    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    /// Samples not yet taken
    pub fn remaining(&self) -> usize {
        self.recorded.len() - self.cursor
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Tick of the next sample
    pub fn peek_tick(&self) -> Option<Tick> {
        self.recorded.get(self.cursor).map(|(t, _)| *t)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.recorded.len()
    }
}

impl<T: Clone> Iterator for ReplaySession<T> {
    type Item = (Tick, T);

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.recorded.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}
