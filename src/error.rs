use std::net::AddrParseError;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors raised by the relay outside the per-datagram path.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Socket or file I/O failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A setting is missing or out of range
    #[error("config error: {0}")]
    Config(String),

    /// A peer sent something unexpected
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Input too short or malformed
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Integer setting did not parse
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),

    /// Socket address setting did not parse
    #[error("address parse error: {0}")]
    AddrParse(#[from] AddrParseError),

    /// The transmit side has gone away
    #[error("dispatch queue closed")]
    QueueClosed,

    /// A spawned task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, RelayError>;
