//! Error types for coco-import

use thiserror::Error;

use crate::services::TransportError;

/// Crate-level error for configuration, setup and CLI paths
///
/// Session operations report refusals through `SessionRejection` and never
/// produce this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// coco-common error
    #[error("Common error: {0}")]
    Common(#[from] coco_common::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
