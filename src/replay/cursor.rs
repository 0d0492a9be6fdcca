use chrono::{DateTime, Utc};

use crate::session::Timestamped;

use super::indexer;

/// Playback position within one sample series.
///
/// The cursor owns its samples (sorted ascending by timestamp) and tracks two
/// indexes: where playback currently sits and the last index that was
/// reported to the consumer. During normal playback the caller's query
/// instants only move forward, so `advance_to` steps linearly and stays
/// amortized O(1) per tick; `seek_to` repositions through a binary search and
/// is the only legal way to move backward.
///
/// None of the operations can fail: an empty series simply has no current
/// sample.
#[derive(Debug, Clone)]
pub struct StreamCursor<T> {
    samples: Vec<T>,
    index: Option<usize>,
    last_emitted: Option<usize>,
}

impl<T: Timestamped> StreamCursor<T> {
    pub fn new(samples: Vec<T>) -> Self {
        let index = if samples.is_empty() { None } else { Some(0) };
        Self {
            samples,
            index,
            last_emitted: None,
        }
    }

    /// Step forward to the last sample at or before `instant`.
    ///
    /// Callers guarantee `instant` does not move backward between calls in
    /// this mode. Returns whether the visible sample changed since the last
    /// report. A starved caller may hand in an instant far ahead; the walk
    /// then degrades to O(samples skipped) but stays correct.
    pub fn advance_to(&mut self, instant: DateTime<Utc>) -> bool {
        let Some(mut index) = self.index else {
            return false;
        };
        while index + 1 < self.samples.len() && self.samples[index + 1].timestamp() <= instant {
            index += 1;
        }
        self.index = Some(index);

        if self.index != self.last_emitted {
            self.last_emitted = self.index;
            true
        } else {
            false
        }
    }

    /// Reposition to `instant` in O(log n), in either direction.
    ///
    /// A seek always counts as a change: the caller is expected to rebuild
    /// whatever it derived from this cursor.
    pub fn seek_to(&mut self, instant: DateTime<Utc>) {
        self.index = indexer::locate(&self.samples, instant);
        self.last_emitted = self.index;
    }

    pub fn current(&self) -> Option<&T> {
        self.index.and_then(|index| self.samples.get(index))
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }
}
