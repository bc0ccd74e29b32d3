//! Error types shared by the extraction core and the stream session layer.

use thiserror::Error;

/// Failures raised while pulling elements out of a media stream.
///
/// The extraction loop performs no retry: any of these ends the current call.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed element at line {line}: {reason}")]
    Decode { line: usize, reason: String },

    #[error("Media stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures raised while establishing a remote media session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A mandatory session input was absent; raised before any network call.
    #[error("Missing mandatory session input: {0}")]
    MissingInput(&'static str),

    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    #[error("Media service error: {0}")]
    Service(String),

    #[error("Media service I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A track name outside the audio directions a call stream carries.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown track name: {0}")]
pub struct UnknownTrack(pub String);
