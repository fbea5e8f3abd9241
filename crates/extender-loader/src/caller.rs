// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Caller identification
//!
//! Code that calls `define(factory)` or `extend(factory)` does not say who it
//! is. The module id is recovered from the call trail active at the call: the
//! first frame located under a module source root, skipping transpiled copies
//! and the module system's own frames, names the caller.
//!
//! ```text
//! /client/custom/modules/acme/src/views/list-v2.js:12:5  ->  acme:views/list-v2
//! ```

use crate::cache::BoundedCache;
use crate::config::{FrameConfig, LoaderConfig};
use crate::error::{ExtendError, Result};
use crate::ModuleId;
use regex::Regex;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Frame locations of a call trail, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallTrail {
    frames: Vec<String>,
}

impl CallTrail {
    /// Create a trail from innermost-first frames
    pub fn new(frames: Vec<String>) -> Self {
        Self { frames }
    }

    /// Frame locations, innermost first
    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// Stable key identifying this exact trail
    pub fn signature(&self) -> String {
        self.frames.join("\n")
    }

    /// Check if the trail has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CallTrail {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Something that can capture the current call trail
pub trait TrailSource {
    /// Capture the trail at the point of the call
    fn capture(&self) -> CallTrail;
}

impl<F: Fn() -> CallTrail> TrailSource for F {
    fn capture(&self) -> CallTrail {
        self()
    }
}

/// Script locations currently executing top-level code
///
/// Hosts push a location before evaluating a module file and the returned
/// [`StackEntry`] pops it again when dropped. Clones share the same stack.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStack {
    frames: Rc<RefCell<Vec<String>>>,
}

impl ExecutionStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `location` as executing until the returned entry is dropped
    pub fn enter(&self, location: impl Into<String>) -> StackEntry {
        let mut frames = self.frames.borrow_mut();
        let depth = frames.len();
        frames.push(location.into());
        StackEntry {
            frames: Rc::clone(&self.frames),
            depth,
        }
    }

    /// Number of executing scripts
    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl TrailSource for ExecutionStack {
    fn capture(&self) -> CallTrail {
        self.frames.borrow().iter().rev().cloned().collect()
    }
}

/// Guard for one [`ExecutionStack`] frame
///
/// Dropping it unwinds the stack to the depth it had before the frame was
/// entered, taking any frames entered later with it.
#[derive(Debug)]
#[must_use = "the frame is popped as soon as the entry is dropped"]
pub struct StackEntry {
    frames: Rc<RefCell<Vec<String>>>,
    depth: usize,
}

impl Drop for StackEntry {
    fn drop(&mut self) {
        self.frames.borrow_mut().truncate(self.depth);
    }
}

/// Trail captured from the native backtrace of the current thread
///
/// Frames up to and including the outermost frame inside this crate are
/// dropped, so the first frame is the code that called into the module
/// system. Frame rules must describe native source locations for this
/// source to identify anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBacktrace;

impl TrailSource for NativeBacktrace {
    fn capture(&self) -> CallTrail {
        let trail = parse_backtrace(&Backtrace::force_capture().to_string());
        strip_own_frames(&trail)
    }
}

/// Drop the leading backtrace machinery and module-system frames
pub fn strip_own_frames(trail: &CallTrail) -> CallTrail {
    let frames = trail.frames();
    match frames.iter().position(|frame| is_own_frame(frame)) {
        Some(first) => frames[first..]
            .iter()
            .skip_while(|frame| is_own_frame(frame))
            .cloned()
            .collect(),
        None => trail.clone(),
    }
}

/// Whether `frame` points into this crate's sources
pub fn is_own_frame(frame: &str) -> bool {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    let own = manifest.join("src");
    let path = Path::new(frame_path(frame));
    if path.is_absolute() {
        return path.starts_with(&own);
    }

    // `./` marks a location printed against the working directory. Other
    // relative locations are workspace members compiled from the root.
    if let Ok(path) = path.strip_prefix(".") {
        return std::env::current_dir()
            .map(|cwd| cwd.join(path).starts_with(&own))
            .unwrap_or(false);
    }
    manifest
        .ancestors()
        .skip(1)
        .any(|root| root.join(path).starts_with(&own))
}

/// Location without its trailing `:line:column`
fn frame_path(frame: &str) -> &str {
    let mut path = frame;
    for _ in 0..2 {
        match path.rsplit_once(':') {
            Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
                path = head
            }
            _ => break,
        }
    }
    path
}

/// Extract the `at <location>` lines of a formatted backtrace
pub fn parse_backtrace(text: &str) -> CallTrail {
    text.lines()
        .filter_map(|line| line.trim().strip_prefix("at "))
        .collect()
}

/// A named pattern for frames that never identify the caller
#[derive(Debug, Clone)]
pub struct SkipRule {
    /// Label used in diagnostics
    pub name: String,
    /// Pattern matched anywhere in the frame
    pub pattern: Regex,
}

/// Data-driven frame classification
#[derive(Debug, Clone)]
pub struct FrameRules {
    module: Regex,
    skip: Vec<SkipRule>,
}

impl FrameRules {
    /// Compile the rules from configuration
    pub fn from_config(config: &FrameConfig) -> Result<Self> {
        let module = compile(&config.module_pattern)?;
        if module.captures_len() < 3 {
            return Err(ExtendError::MissingCaptureGroups(
                config.module_pattern.clone(),
            ));
        }

        let skip = config
            .skip
            .iter()
            .map(|rule| {
                Ok(SkipRule {
                    name: rule.name.clone(),
                    pattern: compile(&rule.pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { module, skip })
    }

    /// Name of the skip rule matching `frame`, if any
    pub fn skip_reason(&self, frame: &str) -> Option<&str> {
        self.skip
            .iter()
            .find(|rule| rule.pattern.is_match(frame))
            .map(|rule| rule.name.as_str())
    }

    /// Module id named by `frame`, as `namespace:relative/path`
    pub fn module_id(&self, frame: &str) -> Option<ModuleId> {
        let captures = self.module.captures(frame)?;
        let namespace = captures.get(1)?.as_str();
        let path = captures.get(2)?.as_str();
        if namespace.is_empty() || path.is_empty() {
            return None;
        }
        Some(format!("{}:{}", namespace, path))
    }

    /// First non-skipped frame naming a module
    pub fn scan(&self, trail: &CallTrail) -> Option<ModuleId> {
        trail.frames().iter().find_map(|frame| {
            if let Some(rule) = self.skip_reason(frame) {
                tracing::trace!("Skipping frame {} ({})", frame, rule);
                return None;
            }
            self.module_id(frame)
        })
    }
}

impl Default for FrameRules {
    fn default() -> Self {
        Self::from_config(&FrameConfig::default()).expect("default frame patterns compile")
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ExtendError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Determines the id of the module currently executing
pub trait CallerResolver {
    /// The caller's module id, or `None` if it cannot be determined
    fn resolve(&mut self) -> Option<ModuleId>;
}

impl<F: FnMut() -> Option<ModuleId>> CallerResolver for F {
    fn resolve(&mut self) -> Option<ModuleId> {
        self()
    }
}

/// Caller resolver scanning a [`TrailSource`] with memoized results
pub struct TrailResolver<S> {
    source: S,
    rules: FrameRules,
    cache: BoundedCache<String, Option<ModuleId>>,
    scans: usize,
}

impl<S: TrailSource> TrailResolver<S> {
    /// Create a resolver caching up to `capacity` trail signatures
    pub fn new(source: S, rules: FrameRules, capacity: usize) -> Self {
        Self {
            source,
            rules,
            cache: BoundedCache::new(capacity),
            scans: 0,
        }
    }

    /// Create a resolver from loader configuration
    pub fn with_config(source: S, config: &LoaderConfig) -> Result<Self> {
        let rules = FrameRules::from_config(&config.frames)?;
        Ok(Self::new(source, rules, config.caller_cache_size))
    }

    /// Resolve the caller for an explicit trail
    pub fn resolve_trail(&mut self, trail: &CallTrail) -> Option<ModuleId> {
        let signature = trail.signature();
        if let Some(cached) = self.cache.get(&signature) {
            return cached;
        }

        self.scans += 1;
        let id = self.rules.scan(trail);
        tracing::debug!("Resolved caller {:?} from {} frames", id, trail.frames().len());
        self.cache.insert(signature, id.clone());
        id
    }

    /// Number of trails actually scanned (cache misses)
    pub fn scan_count(&self) -> usize {
        self.scans
    }

    /// Frame rules in use
    pub fn rules(&self) -> &FrameRules {
        &self.rules
    }
}

impl<S: TrailSource> CallerResolver for TrailResolver<S> {
    fn resolve(&mut self) -> Option<ModuleId> {
        let trail = self.source.capture();
        self.resolve_trail(&trail)
    }
}
