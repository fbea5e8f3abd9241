// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Installed module system and its public `define` / `require` / `extend`

use crate::args::{DefineArgs, ExtendArgs};
use crate::caller::{CallerResolver, ExecutionStack, TrailResolver, TrailSource};
use crate::config::LoaderConfig;
use crate::error::{ExtendError, Result};
use crate::host::{HostLoader, RequireTarget};
use crate::interceptor::{Interceptor, InterceptorState};
use crate::overrides::Overrides;
use crate::payload::{PayloadSource, StaticPayload};
use crate::ModuleId;
use std::cell::RefCell;

type CallerFactory = Box<dyn FnOnce(&LoaderConfig) -> Result<Box<dyn CallerResolver>>>;

/// A host loader wrapped with override resolution
///
/// Installing takes ownership of the host, so one host value is wrapped at
/// most once.
pub struct ModuleSystem<H> {
    interceptor: Interceptor<H>,
    caller: RefCell<Box<dyn CallerResolver>>,
    stack: ExecutionStack,
}

impl<H: HostLoader> ModuleSystem<H> {
    /// Start configuring a module system
    pub fn builder() -> ModuleSystemBuilder {
        ModuleSystemBuilder::new()
    }

    /// Public `define`
    ///
    /// Without an explicit id the caller's id is inferred; if that fails the
    /// module is defined anonymously. Returns `None` for a redefinition.
    pub fn define(&self, args: DefineArgs<H::Factory>) -> Option<H::Output> {
        let (id, deps, factory) = match args {
            DefineArgs::Factory(factory) => (self.caller_id(), Vec::new(), factory),
            DefineArgs::WithDeps(deps, factory) => (self.caller_id(), deps, factory),
            DefineArgs::Named(id, deps, factory) => (Some(id), deps, factory),
            DefineArgs::NamedFactory(id, factory) => (Some(id), Vec::new(), factory),
        };
        self.interceptor.define(id, deps, factory)
    }

    /// Public `require`
    ///
    /// A single id is forwarded in list form.
    pub fn require(
        &self,
        target: RequireTarget,
        on_load: Option<H::OnLoad>,
        on_error: Option<H::OnError>,
    ) -> H::Output {
        let target = match target {
            RequireTarget::One(id) => RequireTarget::Many(vec![id]),
            other => other,
        };
        self.interceptor.require(target, on_load, on_error)
    }

    /// Declare an override of whatever the calling module supersedes
    ///
    /// # Errors
    /// - [`ExtendError::UnresolvedContext`] when the caller cannot be
    ///   identified.
    pub fn extend(&self, args: ExtendArgs<H::Factory>) -> Result<Option<H::Output>> {
        let (deps, factory) = match args {
            ExtendArgs::Factory(factory) => (None, factory),
            ExtendArgs::WithDeps(deps, factory) => (Some(deps), factory),
        };

        let id = self.caller_id().ok_or(ExtendError::UnresolvedContext)?;
        let deps = match deps {
            Some(deps) => deps,
            None => self.interceptor.dependencies_for(&id),
        };

        tracing::debug!("extend() from '{}' with dependencies {:?}", id, deps);
        Ok(self.interceptor.define_override(id, deps, factory))
    }

    /// Override map and graph, built on first call
    pub fn overrides(&self) -> &Overrides {
        self.interceptor.state().overrides()
    }

    /// Dependencies `extend` would inject for `id`
    pub fn dependencies_for(&self, id: &str) -> Vec<ModuleId> {
        self.interceptor.dependencies_for(id)
    }

    /// Interception state
    pub fn state(&self) -> &InterceptorState {
        self.interceptor.state()
    }

    /// The wrapped host
    pub fn host(&self) -> &H {
        self.interceptor.host()
    }

    /// Script stack the default caller resolver reads
    ///
    /// Hosts enter a location here while evaluating a module file. Unused
    /// when the builder was given another trail source or resolver.
    pub fn stack(&self) -> &ExecutionStack {
        &self.stack
    }

    fn caller_id(&self) -> Option<ModuleId> {
        self.caller.borrow_mut().resolve()
    }
}

/// Collects configuration, payload and caller resolution before install
pub struct ModuleSystemBuilder {
    config: LoaderConfig,
    payload: Box<dyn PayloadSource>,
    caller: CallerFactory,
    stack: ExecutionStack,
}

impl ModuleSystemBuilder {
    /// Defaults: no payload, callers read from [`ModuleSystem::stack`]
    pub fn new() -> Self {
        let stack = ExecutionStack::new();
        Self {
            config: LoaderConfig::default(),
            payload: Box::new(StaticPayload::none()),
            caller: trail_caller(stack.clone()),
            stack,
        }
    }

    /// Use `config` for cache sizes and frame rules
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Read the override payload from `payload` on first use
    pub fn payload(mut self, payload: impl PayloadSource + 'static) -> Self {
        self.payload = Box::new(payload);
        self
    }

    /// Identify callers by scanning trails captured from `source`
    pub fn trail_source(mut self, source: impl TrailSource + 'static) -> Self {
        self.caller = trail_caller(source);
        self
    }

    /// Identify callers with a custom resolver
    pub fn caller_resolver(mut self, resolver: impl CallerResolver + 'static) -> Self {
        self.caller = Box::new(move |_: &LoaderConfig| {
            Ok(Box::new(resolver) as Box<dyn CallerResolver>)
        });
        self
    }

    /// Wrap `host`
    ///
    /// # Errors
    /// - [`ExtendError::HostNotReady`] when the host primitives are missing.
    /// - Frame rule errors from the configuration.
    pub fn install<H: HostLoader>(self, host: H) -> Result<ModuleSystem<H>> {
        if !host.is_ready() {
            return Err(ExtendError::HostNotReady);
        }

        let caller = (self.caller)(&self.config)?;
        let state = InterceptorState::new(self.payload, self.config.dependency_cache_size);
        tracing::debug!("Installed module override interception");

        Ok(ModuleSystem {
            interceptor: Interceptor::new(host, state),
            caller: RefCell::new(caller),
            stack: self.stack,
        })
    }

    /// Wait for `host` to become ready, polling every `poll`, then install
    ///
    /// # Errors
    /// - [`ExtendError::HostNotReady`] if `limit` elapses first.
    #[cfg(feature = "async")]
    pub async fn install_when_ready<H: HostLoader>(
        self,
        host: H,
        poll: std::time::Duration,
        limit: std::time::Duration,
    ) -> Result<ModuleSystem<H>> {
        let mut ticker = tokio::time::interval(poll.max(std::time::Duration::from_millis(1)));
        let ready = async {
            loop {
                ticker.tick().await;
                if host.is_ready() {
                    break;
                }
            }
        };

        if tokio::time::timeout(limit, ready).await.is_err() {
            tracing::warn!("Host loader not ready after {:?}", limit);
            return Err(ExtendError::HostNotReady);
        }
        self.install(host)
    }
}

impl Default for ModuleSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn trail_caller(source: impl TrailSource + 'static) -> CallerFactory {
    Box::new(move |config: &LoaderConfig| {
        let resolver = TrailResolver::with_config(source, config)?;
        Ok(Box::new(resolver) as Box<dyn CallerResolver>)
    })
}
