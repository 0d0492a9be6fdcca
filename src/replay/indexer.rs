use chrono::{DateTime, Utc};

use crate::session::Timestamped;

/// Index of the last sample with a timestamp at or before `target`.
///
/// Instants before the first sample clamp to index `0` and instants at or
/// past the last sample clamp to the final index, so any instant maps to a
/// sample as long as the series is non-empty. Empty series have no index.
/// Ties resolve to the last sample of the tied run. O(log n) over a series
/// sorted ascending by timestamp.
pub fn locate<T: Timestamped>(samples: &[T], target: DateTime<Utc>) -> Option<usize> {
    if samples.is_empty() {
        return None;
    }
    let upper = samples.partition_point(|sample| sample.timestamp() <= target);
    Some(upper.saturating_sub(1))
}
