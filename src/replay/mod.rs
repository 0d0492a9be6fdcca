//! Playback synchronization for recorded telemetry sessions.
//!
//! The engine owns a virtual session clock and one cursor per telemetry
//! channel, and keeps the independently-sampled, irregularly-spaced series
//! mutually synchronized to that clock. An external scheduler drives it by
//! calling [`SyncEngine::tick`] at a fixed cadence; play/pause, rate changes
//! and seeks are synchronous calls applied between ticks.

pub(crate) mod clock;
pub(crate) mod cursor;
pub(crate) mod engine;
pub(crate) mod indexer;
pub(crate) mod window;

pub use clock::{DEFAULT_PLAYBACK_RATE, PlaybackClock, TickOutcome};
pub use cursor::StreamCursor;
pub use engine::{SPEED_TRACE_CAPACITY, Snapshot, SyncEngine, TRAIL_CAPACITY};
pub use indexer::locate;
pub use window::RollingWindow;
