// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Error types for point set construction.

use thiserror::Error;

/// Errors that can occur while setting up or running a search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Invalid configuration/size pair, or a kernel, weight or combiner
    /// parameter outside its domain. Raised at construction.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The fast convolution path is not available for this configuration.
    /// Searches recover from this by falling back to naive CBC.
    #[error("fast CBC unavailable: {reason}")]
    CapabilityMismatch { reason: String },

    /// No admissible generator exists for a coordinate.
    #[error("no admissible generator for coordinate {coordinate}")]
    Exhausted { coordinate: usize },

    /// The search was cancelled through its token.
    #[error("search cancelled at coordinate {coordinate}")]
    Cancelled { coordinate: usize },

    /// The dedicated worker pool could not be created.
    #[error("cannot build worker pool: {0}")]
    ThreadPool(String),
}

impl SearchError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        SearchError::Configuration(message.into())
    }

    pub(crate) fn capability(reason: impl Into<String>) -> Self {
        SearchError::CapabilityMismatch {
            reason: reason.into(),
        }
    }
}
