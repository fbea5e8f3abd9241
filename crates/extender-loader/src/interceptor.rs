// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Rewriting wrapper around the host's `define` and `require`
//!
//! ## Rewrite rules
//! - `require` of a base module loads the last override in its chain.
//!   Intermediate overrides are never redirected on this path.
//! - `define` of an override replaces its first dependency with the module
//!   it directly supersedes, so every link receives its predecessor.
//! - `define` of an id seen before is dropped.
//!
//! While an override definition is in flight the state is `Resolving`, and a
//! `require` issued by the host from inside its `define` is forwarded
//! untouched. Both entry points leave the state `Normal` on return.

use crate::cache::BoundedCache;
use crate::host::{HostLoader, RequireTarget};
use crate::overrides::Overrides;
use crate::payload::PayloadSource;
use crate::state::{DependencyCache, RegistrationGuard, ResolutionFlag, ResolutionState};
use crate::ModuleId;
use std::cell::{OnceCell, RefCell};

/// Caches, guard and resolution flag shared by the wrapped primitives
pub struct InterceptorState {
    payload: RefCell<Option<Box<dyn PayloadSource>>>,
    overrides: OnceCell<Overrides>,
    registered: RefCell<RegistrationGuard>,
    resolution: ResolutionFlag,
    dependencies: RefCell<DependencyCache>,
}

impl InterceptorState {
    /// Create state that reads `payload` on first use
    pub fn new(payload: Box<dyn PayloadSource>, dependency_cache_size: usize) -> Self {
        Self {
            payload: RefCell::new(Some(payload)),
            overrides: OnceCell::new(),
            registered: RefCell::default(),
            resolution: ResolutionFlag::default(),
            dependencies: RefCell::new(BoundedCache::new(dependency_cache_size)),
        }
    }

    /// Override map and graph, built on first call
    pub fn overrides(&self) -> &Overrides {
        self.overrides.get_or_init(|| {
            let raw = self
                .payload
                .borrow_mut()
                .take()
                .and_then(|source| source.load());
            Overrides::build(raw.as_deref())
        })
    }

    /// Whether the override map has been built yet
    pub fn is_built(&self) -> bool {
        self.overrides.get().is_some()
    }

    /// Current resolution state
    pub fn resolution(&self) -> ResolutionState {
        self.resolution.get()
    }

    /// Whether `id` has been submitted for definition
    pub fn is_registered(&self, id: &str) -> bool {
        self.registered.borrow().contains(id)
    }

    /// Number of distinct ids defined
    pub fn registered_count(&self) -> usize {
        self.registered.borrow().len()
    }
}

/// The host loader with its primitives wrapped
pub struct Interceptor<H> {
    host: H,
    state: InterceptorState,
}

impl<H: HostLoader> Interceptor<H> {
    /// Wrap `host`
    pub fn new(host: H, state: InterceptorState) -> Self {
        Self { host, state }
    }

    /// The wrapped host
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Shared interception state
    pub fn state(&self) -> &InterceptorState {
        &self.state
    }

    /// Wrapped `define`
    ///
    /// Returns `None` without calling the host when `id` was already defined.
    pub fn define(
        &self,
        id: Option<ModuleId>,
        mut deps: Vec<ModuleId>,
        factory: H::Factory,
    ) -> Option<H::Output> {
        let _reset = self.state.resolution.reset_on_exit();

        if let Some(id) = id.as_deref() {
            if self.state.is_registered(id) {
                tracing::debug!("Ignoring redefinition of '{}'", id);
                return None;
            }
        }

        let overrides = self.state.overrides();
        if let Some(id) = id.as_deref() {
            if let Some(predecessor) = overrides.graph.predecessor(id) {
                if let Some(first) = deps.first_mut() {
                    self.state.resolution.begin();
                    if first.as_str() != predecessor {
                        tracing::debug!(
                            "Override '{}' now depends on '{}' instead of '{}'",
                            id,
                            predecessor,
                            first
                        );
                        *first = predecessor.to_string();
                    }
                }
            }
            self.state.registered.borrow_mut().register(id);
        }

        Some(self.host.define(id, deps, factory))
    }

    /// Define an override: the next `require` is not redirected
    pub fn define_override(
        &self,
        id: ModuleId,
        deps: Vec<ModuleId>,
        factory: H::Factory,
    ) -> Option<H::Output> {
        self.state.resolution.begin();
        self.define(Some(id), deps, factory)
    }

    /// Wrapped `require`
    pub fn require(
        &self,
        target: RequireTarget,
        on_load: Option<H::OnLoad>,
        on_error: Option<H::OnError>,
    ) -> H::Output {
        let overrides = self.state.overrides();
        let target = match self.state.resolution.take() {
            ResolutionState::Normal => redirect(overrides, target),
            ResolutionState::Resolving => target,
        };
        self.host.require(target, on_load, on_error)
    }

    /// Dependencies injected for an override declared without any
    ///
    /// The predecessor for a known override, else the path after the last
    /// `:` of a namespaced id, else nothing.
    pub fn dependencies_for(&self, id: &str) -> Vec<ModuleId> {
        if let Some(cached) = self.state.dependencies.borrow_mut().get(id) {
            return cached;
        }

        let deps = match self.state.overrides().graph.predecessor(id) {
            Some(predecessor) => vec![predecessor.to_string()],
            None => match id.rsplit_once(':') {
                Some((_, path)) => vec![path.to_string()],
                None => Vec::new(),
            },
        };

        self.state
            .dependencies
            .borrow_mut()
            .insert(id.to_string(), deps.clone());
        deps
    }
}

fn redirect(overrides: &Overrides, target: RequireTarget) -> RequireTarget {
    match target {
        RequireTarget::One(id) => RequireTarget::One(redirect_id(overrides, id)),
        RequireTarget::Many(ids) => RequireTarget::Many(
            ids.into_iter()
                .map(|id| redirect_id(overrides, id))
                .collect(),
        ),
        config @ RequireTarget::Config(_) => config,
    }
}

fn redirect_id(overrides: &Overrides, id: ModuleId) -> ModuleId {
    let tip = overrides.redirect(&id);
    if tip == id {
        return id;
    }
    tracing::debug!("Redirecting require of '{}' to '{}'", id, tip);
    tip.to_string()
}
