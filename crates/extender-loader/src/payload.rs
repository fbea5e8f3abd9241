// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sources of the override payload
//!
//! A payload is read at most once, the first time a `define` or `require`
//! needs the override map. Sources never fail: anything unreadable is an
//! absent payload, which yields an empty map.

use std::path::PathBuf;

/// Metadata keys under which deployments declare their override chains
pub const METADATA_OVERRIDES_PATH: &[&str] = &["app", "client", "viewExtensions"];

/// One-time provider of the serialized override map
pub trait PayloadSource {
    /// Raw payload text, if any
    fn load(&self) -> Option<String>;
}

impl<F: Fn() -> Option<String>> PayloadSource for F {
    fn load(&self) -> Option<String> {
        self()
    }
}

/// Payload known up front
#[derive(Debug, Clone, Default)]
pub struct StaticPayload(pub Option<String>);

impl StaticPayload {
    /// Wrap payload text
    pub fn new(raw: impl Into<String>) -> Self {
        Self(Some(raw.into()))
    }

    /// No overrides at all
    pub fn none() -> Self {
        Self(None)
    }
}

impl PayloadSource for StaticPayload {
    fn load(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Payload stored as a JSON file
#[derive(Debug, Clone)]
pub struct FilePayload {
    path: PathBuf,
}

impl FilePayload {
    /// Read the payload from `path` when first needed
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PayloadSource for FilePayload {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Some(content),
            Err(err) => {
                tracing::warn!("Override payload {} unavailable: {}", self.path.display(), err);
                None
            }
        }
    }
}

/// Override map embedded in a larger application metadata document
///
/// The object found at [`METADATA_OVERRIDES_PATH`] is re-encoded as the
/// payload; a missing key means no overrides.
#[derive(Debug, Clone)]
pub struct MetadataPayload {
    path: PathBuf,
    keys: Vec<String>,
}

impl MetadataPayload {
    /// Read overrides from the default metadata location in `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_keys(path, METADATA_OVERRIDES_PATH)
    }

    /// Read overrides from a custom key path
    pub fn with_keys(path: impl Into<PathBuf>, keys: &[&str]) -> Self {
        Self {
            path: path.into(),
            keys: keys.iter().map(|key| key.to_string()).collect(),
        }
    }
}

impl PayloadSource for MetadataPayload {
    fn load(&self) -> Option<String> {
        let content = FilePayload::new(&self.path).load()?;
        let metadata: serde_json::Value = match serde_json::from_str(&content) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!("Metadata {} is not valid JSON: {}", self.path.display(), err);
                return None;
            }
        };
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        Some(extract_overrides(&metadata, &keys))
    }
}

/// Encode the object at `keys` in `metadata`, `{}` when absent
pub fn extract_overrides(metadata: &serde_json::Value, keys: &[&str]) -> String {
    let mut node = metadata;
    for key in keys {
        match node.get(key) {
            Some(child) => node = child,
            None => return "{}".to_string(),
        }
    }
    node.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_extract_overrides() {
        let metadata = json!({
            "app": {"client": {"viewExtensions": {"views/list": ["acme:views/list"]}}}
        });
        assert_eq!(
            extract_overrides(&metadata, METADATA_OVERRIDES_PATH),
            r#"{"views/list":["acme:views/list"]}"#
        );
        assert_eq!(extract_overrides(&json!({"app": {}}), METADATA_OVERRIDES_PATH), "{}");
    }

    #[test]
    fn test_metadata_payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"app": {{"client": {{"viewExtensions": {{"views/a": ["x:views/a"]}}}}}}}}"#
        )
        .unwrap();

        let payload = MetadataPayload::new(file.path()).load();
        assert_eq!(payload.as_deref(), Some(r#"{"views/a":["x:views/a"]}"#));
    }

    #[test]
    fn test_missing_file_is_absent() {
        assert_eq!(FilePayload::new("/nonexistent/overrides.json").load(), None);
        assert_eq!(MetadataPayload::new("/nonexistent/metadata.json").load(), None);
    }

    #[test]
    fn test_closure_source() {
        let source = || Some("{}".to_string());
        assert_eq!(source.load().as_deref(), Some("{}"));
        assert_eq!(StaticPayload::none().load(), None);
    }
}
