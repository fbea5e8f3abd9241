// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # extender-loader
//!
//! Override-chain resolution layered over an AMD-style module loader.
//!
//! ## Overview
//!
//! Deployments declare, for a base module id, an ordered chain of modules
//! that each extend the previous one. Once installed over a host loader:
//! - `require` of a base module loads the last override in its chain
//! - `define` of an override receives its direct predecessor as its first
//!   dependency
//! - `extend` lets a module declare itself an override without naming ids,
//!   inferring its own id from the call trail
//! - redefinitions of an id are ignored
//!
//! ## Quick Start
//!
//! ```rust
//! use extender_loader::{ModuleSystem, RecordingHost, RequireTarget, StaticPayload};
//!
//! let system = ModuleSystem::<RecordingHost>::builder()
//!     .payload(StaticPayload::new(r#"{"views/list": ["acme:views/list"]}"#))
//!     .install(RecordingHost::new())?;
//!
//! system.require(RequireTarget::One("views/list".into()), None, None);
//! assert_eq!(
//!     system.host().requires(),
//!     vec![RequireTarget::Many(vec!["acme:views/list".into()])]
//! );
//! # Ok::<(), extender_loader::ExtendError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod args;
pub mod cache;
pub mod caller;
pub mod config;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod overrides;
pub mod payload;
pub mod state;
pub mod system;

/// Identifier of a module as understood by the host loader
pub type ModuleId = String;

pub use args::{DefineArgs, ExtendArgs, ScriptArg};
pub use caller::{
    CallTrail, CallerResolver, ExecutionStack, FrameRules, NativeBacktrace, TrailResolver,
    TrailSource,
};
pub use config::LoaderConfig;
pub use error::{ExtendError, Result};
pub use host::{HostCall, HostLoader, RecordingHost, RequireTarget};
pub use overrides::{encode_payload, OverrideMap, Overrides, ResolutionGraph};
pub use payload::{FilePayload, MetadataPayload, PayloadSource, StaticPayload};
pub use state::ResolutionState;
pub use system::{ModuleSystem, ModuleSystemBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
