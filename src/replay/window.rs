use std::collections::VecDeque;

/// Fixed-capacity trailing buffer for recent-trend displays.
///
/// During forward playback values are appended one at a time; on a seek the
/// window is rebuilt from the source series. Both paths produce identical
/// contents: `rebuild_from` yields exactly what replaying `push` from the
/// start of the series would have left behind.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        self.buffer.push_back(value);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    /// Reconstruct the window as the trailing slice of `samples` ending at
    /// `index` inclusive, projected through `project`. `None` clears the
    /// window (the cursor has no position).
    pub fn rebuild_from<S>(
        &mut self,
        samples: &[S],
        index: Option<usize>,
        project: impl FnMut(&S) -> T,
    ) {
        self.buffer.clear();
        let Some(index) = index else { return };
        let Some(window) = samples.get(..=index) else {
            return;
        };
        let start = window.len().saturating_sub(self.capacity);
        self.buffer.extend(window[start..].iter().map(project));
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
