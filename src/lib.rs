// Library interface for pitwall
// This allows integration tests to access internal modules

pub mod errors;
pub mod replay;
pub mod session;
pub mod ui;
pub mod writer;

// Re-export commonly used types
pub use errors::PitwallError;
pub use replay::{PlaybackClock, RollingWindow, Snapshot, StreamCursor, SyncEngine};
pub use session::{OpenF1Client, RawSession, SessionData, SessionPreset};
