// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host module-loader contract
//!
//! The module system wraps exactly two host primitives: defining a named
//! module and requiring modules by id. Everything else about loading,
//! evaluating and caching modules stays with the host.

use crate::ModuleId;
use std::cell::{Cell, RefCell};

/// What a `require` call asks for
#[derive(Debug, Clone, PartialEq)]
pub enum RequireTarget {
    /// A single module id
    One(ModuleId),
    /// A list of module ids
    Many(Vec<ModuleId>),
    /// Loader configuration object, never rewritten
    Config(serde_json::Value),
}

impl RequireTarget {
    /// Module ids requested, empty for configuration objects
    pub fn ids(&self) -> Vec<&str> {
        match self {
            RequireTarget::One(id) => vec![id.as_str()],
            RequireTarget::Many(ids) => ids.iter().map(String::as_str).collect(),
            RequireTarget::Config(_) => Vec::new(),
        }
    }
}

/// The two primitives of a host module loader
pub trait HostLoader {
    /// Module factory
    type Factory;
    /// Continuation receiving the loaded modules
    type OnLoad;
    /// Continuation receiving a load failure
    type OnError;
    /// Whatever the primitives return to their caller
    type Output;

    /// Define a module under `id` with `deps` and `factory`
    fn define(&self, id: Option<ModuleId>, deps: Vec<ModuleId>, factory: Self::Factory) -> Self::Output;

    /// Require modules, continuing with `on_load` or `on_error`
    fn require(
        &self,
        target: RequireTarget,
        on_load: Option<Self::OnLoad>,
        on_error: Option<Self::OnError>,
    ) -> Self::Output;

    /// Whether both primitives are available yet
    fn is_ready(&self) -> bool {
        true
    }
}

/// A primitive call observed by [`RecordingHost`]
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    /// `define` reached the host
    Define {
        /// Module id
        id: Option<ModuleId>,
        /// Dependencies as forwarded
        deps: Vec<ModuleId>,
        /// Factory label
        factory: String,
    },
    /// `require` reached the host
    Require {
        /// Target as forwarded
        target: RequireTarget,
    },
}

/// Continuation invoked with the ids a [`RecordingHost`] "loaded"
pub type LoadCallback = Box<dyn FnOnce(&[ModuleId])>;

/// Continuation invoked with a [`RecordingHost`] failure message
pub type ErrorCallback = Box<dyn FnOnce(&str)>;

/// Host that records every primitive call and loads synchronously
///
/// `require` completes immediately, handing the forwarded ids to the load
/// continuation. Useful for inspecting how calls are rewritten.
#[derive(Debug, Default)]
pub struct RecordingHost {
    calls: RefCell<Vec<HostCall>>,
    pending: Cell<bool>,
}

impl RecordingHost {
    /// Create a ready host
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host that is not ready until [`RecordingHost::mark_ready`]
    pub fn pending() -> Self {
        Self {
            calls: RefCell::default(),
            pending: Cell::new(true),
        }
    }

    /// Expose the primitives
    pub fn mark_ready(&self) {
        self.pending.set(false);
    }

    /// All calls so far
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.borrow().clone()
    }

    /// Only the `define` calls
    pub fn defines(&self) -> Vec<HostCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, HostCall::Define { .. }))
            .cloned()
            .collect()
    }

    /// Only the `require` targets
    pub fn requires(&self) -> Vec<RequireTarget> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                HostCall::Require { target } => Some(target.clone()),
                HostCall::Define { .. } => None,
            })
            .collect()
    }

    /// Forget recorded calls
    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl HostLoader for RecordingHost {
    type Factory = String;
    type OnLoad = LoadCallback;
    type OnError = ErrorCallback;
    type Output = ();

    fn define(&self, id: Option<ModuleId>, deps: Vec<ModuleId>, factory: String) {
        self.calls
            .borrow_mut()
            .push(HostCall::Define { id, deps, factory });
    }

    fn require(&self, target: RequireTarget, on_load: Option<LoadCallback>, _on_error: Option<ErrorCallback>) {
        let ids: Vec<ModuleId> = target.ids().into_iter().map(str::to_string).collect();
        self.calls.borrow_mut().push(HostCall::Require { target });
        if let Some(on_load) = on_load {
            on_load(&ids);
        }
    }

    fn is_ready(&self) -> bool {
        !self.pending.get()
    }
}
