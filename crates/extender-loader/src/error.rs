// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the override loader

use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type Result<T> = std::result::Result<T, ExtendError>;

/// Errors surfaced to callers of the module system
///
/// Malformed override payloads degrade to an empty override map and duplicate
/// definitions are ignored, so neither appears here.
#[derive(Debug, Error)]
pub enum ExtendError {
    /// A public entry point was called with an unsupported argument shape
    #[error("{call}() {reason}")]
    InvalidArguments {
        /// Entry point name (`define`, `require`, `extend`)
        call: &'static str,
        /// What was wrong with the arguments
        reason: String,
    },

    /// `extend()` could not infer the id of the calling module
    #[error("Could not determine module context for extend()")]
    UnresolvedContext,

    /// The host loader has not exposed its primitives yet
    #[error("Host loader is not ready")]
    HostNotReady,

    /// Loader configuration file could not be read
    #[error("Failed to read loader configuration '{path}': {source}")]
    Config {
        /// Configuration file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Loader configuration file is not valid JSON
    #[error("Invalid loader configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A frame rule pattern failed to compile
    #[error("Invalid frame pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Regex compilation error
        source: regex::Error,
    },

    /// The module pattern lacks its namespace and path capture groups
    #[error("Module pattern '{0}' needs namespace and path capture groups")]
    MissingCaptureGroups(String),
}

impl ExtendError {
    /// Create an argument-shape error for `call`
    pub fn invalid_arguments(call: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            call,
            reason: reason.into(),
        }
    }
}
