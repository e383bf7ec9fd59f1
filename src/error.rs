//! Error types for the PCM streaming engine.

use thiserror::Error;

use crate::audio::format::StreamFormat;

/// Fatal stream errors. Transient conditions (xruns, short transfers,
/// decoder underflow) never show up here; they are logged and counted.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("PCM device '{device}' unavailable: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: DeviceError,
    },

    #[error("Hardware negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    #[error("Transfer failed: {0}")]
    Transfer(DeviceError),

    #[error("Xrun not recovered: {0}")]
    XrunUnrecovered(DeviceError),

    #[error("Frame sync lost at byte offset {offset}")]
    SyncLost { offset: usize },

    #[error("Corrupt frame at byte offset {offset}: {reason}")]
    CorruptFrame { offset: usize, reason: String },

    #[error("Stream format changed from {committed} to {found}")]
    FormatDrift {
        committed: StreamFormat,
        found: StreamFormat,
    },

    #[error("Frame of {requested} exceeds limit of {limit}")]
    ResourceExhaustion { requested: usize, limit: usize },

    #[error("Stream format already committed")]
    AlreadyConfigured,

    #[error("Invalid stream state: {0}")]
    InvalidState(&'static str),

    #[error("Invalid stream format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Hardware parameter negotiation errors.
#[derive(Error, Debug)]
pub enum NegotiationError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("access mode not supported: {0}")]
    UnsupportedAccessMode(DeviceError),

    #[error("sample format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("channel count not supported: {0}")]
    UnsupportedChannels(String),

    #[error("sample rate not supported: {0}")]
    UnsupportedRate(DeviceError),

    #[error("period size not supported: {0}")]
    UnsupportedPeriod(String),

    #[error("buffer size not supported: {0}")]
    UnsupportedBuffer(DeviceError),

    #[error("buffer of {buffer} frames is smaller than two periods of {period} frames")]
    BufferTooSmall { period: usize, buffer: usize },

    #[error("failed to commit parameters: {0}")]
    ParamCommitFailed(DeviceError),
}

/// Errors reported by a PCM endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Underrun on playback, overrun on capture.
    #[error("buffer xrun")]
    Xrun,

    #[error("{message} (errno {errno})")]
    Failed { errno: i32, message: String },
}

impl DeviceError {
    pub fn failed(errno: i32, message: impl Into<String>) -> Self {
        DeviceError::Failed {
            errno,
            message: message.into(),
        }
    }
}

/// Result type alias for the engine
pub type Result<T> = std::result::Result<T, StreamError>;
