// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-process interception state

use crate::cache::BoundedCache;
use crate::ModuleId;
use std::cell::Cell;
use std::collections::HashSet;

/// Whether an override is currently being resolved
///
/// `Normal -> Resolving -> Normal`. While `Resolving`, the next `require`
/// is forwarded without redirection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionState {
    /// Requests are redirected to the most derived override
    #[default]
    Normal,
    /// An override definition is in flight
    Resolving,
}

/// Shared cell holding the [`ResolutionState`]
#[derive(Debug, Default)]
pub struct ResolutionFlag {
    state: Cell<ResolutionState>,
}

impl ResolutionFlag {
    /// Current state
    pub fn get(&self) -> ResolutionState {
        self.state.get()
    }

    /// Enter `Resolving`
    pub fn begin(&self) {
        self.state.set(ResolutionState::Resolving);
    }

    /// Return to `Normal`, yielding the previous state
    pub fn take(&self) -> ResolutionState {
        self.state.replace(ResolutionState::Normal)
    }

    /// Reset to `Normal` when the returned guard drops, even on unwind
    pub fn reset_on_exit(&self) -> ResetGuard<'_> {
        ResetGuard { flag: self }
    }
}

/// Resets a [`ResolutionFlag`] when dropped
#[must_use = "the flag is reset as soon as the guard is dropped"]
pub struct ResetGuard<'a> {
    flag: &'a ResolutionFlag,
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        self.flag.take();
    }
}

/// Ids already submitted for definition
#[derive(Debug, Default)]
pub struct RegistrationGuard {
    defined: HashSet<ModuleId>,
}

impl RegistrationGuard {
    /// Record `id`; returns `false` if it was already defined
    pub fn register(&mut self, id: &str) -> bool {
        if self.defined.contains(id) {
            return false;
        }
        self.defined.insert(id.to_string())
    }

    /// Check if `id` was defined
    pub fn contains(&self, id: &str) -> bool {
        self.defined.contains(id)
    }

    /// Number of defined ids
    pub fn len(&self) -> usize {
        self.defined.len()
    }

    /// Check if nothing was defined yet
    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }
}

/// Memoized `extend` dependency lists
pub type DependencyCache = BoundedCache<ModuleId, Vec<ModuleId>>;
