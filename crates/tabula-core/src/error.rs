//! Error types returned at the decode boundaries of the crate.
//!
//! Expected runtime conditions (unknown shape ids, missing properties, empty
//! stacks) are logged and skipped instead; these enums only cover input that
//! could not be understood at all.

use crate::id::LocalId;
use thiserror::Error;

/// Errors raised while decoding or dispatching server traffic.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Malformed server message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unknown floor: {0}")]
    UnknownFloor(String),

    #[error("No pending request with id {0}")]
    UnknownRequest(u64),
}

/// Errors raised while decoding the variant payload of a shape descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("Malformed {kind} payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors a mod hook can report back to the host.
#[derive(Debug, Error)]
pub enum ModError {
    #[error("Mod failed: {0}")]
    Failed(String),

    #[error("Mod referenced missing shape {0}")]
    MissingShape(LocalId),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
