//! Error taxonomy shared by the wearable and handheld sides.
//!
//! None of these are fatal. Session errors revert the controller to
//! `Idle` and are published in the snapshot; link errors stay at the
//! link boundary and only ever reach the log.

use thiserror::Error;

/// Failures of a single start attempt. Never retried automatically.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("heart-rate authorization was denied")]
    AuthorizationDenied,

    #[error("sensor collection session could not be created")]
    SessionCreationFailed,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinkError {
    #[error("peer unreachable, message dropped")]
    TransportUnreachable,

    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("threshold {0} bpm is outside the 40..=100 range")]
    ThresholdOutOfRange(f64),
}
