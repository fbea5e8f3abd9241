// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file.

use crate::error::{ExtendError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default capacity of the caller-identity cache
pub const DEFAULT_CALLER_CACHE_SIZE: usize = 100;
/// Default capacity of the dependency cache
pub const DEFAULT_DEPENDENCY_CACHE_SIZE: usize = 150;

/// Location of a module's source: `(namespace, relative path)` captures
pub const DEFAULT_MODULE_PATTERN: &str = r"/client/(?:custom/)?modules/([^/]+)/src/(.+?)\.js";
/// Transpiled copies of module sources
pub const DEFAULT_TRANSPILED_PATTERN: &str = r"/client/lib/transpiled/src/(.+?)\.js";
/// The script hosting the module system itself
pub const DEFAULT_SELF_PATTERN: &str = r"/extender\.js";

/// Top-level loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Capacity of the trail-signature to module-id cache
    pub caller_cache_size: usize,
    /// Capacity of the module-id to dependency-list cache
    pub dependency_cache_size: usize,
    /// Call-trail frame rules
    pub frames: FrameConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            caller_cache_size: DEFAULT_CALLER_CACHE_SIZE,
            dependency_cache_size: DEFAULT_DEPENDENCY_CACHE_SIZE,
            frames: FrameConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ExtendError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Patterns used to find the calling module in a call trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Regex with two capture groups: namespace and relative path
    pub module_pattern: String,
    /// Frames matching any of these are never treated as the caller
    pub skip: Vec<SkipRuleConfig>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            module_pattern: DEFAULT_MODULE_PATTERN.to_string(),
            skip: vec![
                SkipRuleConfig::new("transpiled", DEFAULT_TRANSPILED_PATTERN),
                SkipRuleConfig::new("self", DEFAULT_SELF_PATTERN),
            ],
        }
    }
}

/// A named frame-skipping pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRuleConfig {
    /// Label used in diagnostics
    pub name: String,
    /// Regex matched anywhere in the frame
    pub pattern: String,
}

impl SkipRuleConfig {
    /// Create a skip rule
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}
