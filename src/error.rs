//! Error types for scene-kit
//!
//! Centralized error handling using snafu for ergonomic error definitions.

use snafu::Snafu;

/// Boxed error returned by listener, observer and error-handler callbacks
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Main error type for the crate
#[derive(Debug, Snafu)]
pub enum Error {
    /// Invalid input or environment
    #[snafu(display("Invalid: {message}"))]
    Invalid { message: String },

    /// Malformed argument on a public registration call
    #[snafu(display("Invalid argument: {message}"))]
    InvalidArgument { message: String },

    /// State path that cannot be parsed
    #[snafu(display("Invalid state path `{path}`: {reason}"))]
    InvalidPath { path: String, reason: String },

    /// `set` would have to descend through a non-object value
    #[snafu(display("Cannot descend into `{segment}` of `{path}`: not an object"))]
    PathConflict { path: String, segment: String },

    /// Listener received a payload of another type than it registered for
    #[snafu(display("Payload for `{event}` is not a `{expected}`"))]
    PayloadType {
        event: String,
        expected: &'static str,
    },

    /// Dispatch pipeline could not access the listener registry
    #[snafu(display("Event bus is busy: {source}"))]
    BusBorrowed { source: std::cell::BorrowMutError },

    /// IO error (preference files, config files)
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// JSON serialization/deserialization error
    #[snafu(display("JSON error: {source}"))]
    Json { source: serde_json::Error },

    /// TOML deserialization error
    #[snafu(display("TOML parse error: {source}"))]
    TomlDe { source: toml::de::Error },
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io { source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json { source }
    }
}

impl From<toml::de::Error> for Error {
    fn from(source: toml::de::Error) -> Self {
        Error::TomlDe { source }
    }
}

impl From<std::cell::BorrowMutError> for Error {
    fn from(source: std::cell::BorrowMutError) -> Self {
        Error::BusBorrowed { source }
    }
}

/// Result type alias for convenience
pub type Result<T, E = Error> = std::result::Result<T, E>;
