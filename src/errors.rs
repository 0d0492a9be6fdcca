// Error types for pitwall

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PitwallError {
    // Errors while talking to the OpenF1 API
    #[snafu(display("OpenF1 request failed. Check your network and try again."))]
    OpenF1RequestError { source: reqwest::Error },
    #[snafu(display("Could not start the fetch runtime"))]
    FetchRuntimeError { source: io::Error },

    // Errors while assembling a replay session
    #[snafu(display("No telemetry data found for the replay session."))]
    EmptyReplayWindow,

    // Errors for session archives
    #[snafu(display("Invalid session archive: {path}"))]
    InvalidArchiveFile { path: String },
    #[snafu(display("Error reading session archive"))]
    ArchiveReadError { source: io::Error },
    #[snafu(display("Error writing session archive"))]
    ArchiveWriteError { source: io::Error },
    #[snafu(display("Error serializing session archive record"))]
    ArchiveSerializeError { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}
