// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Call shapes accepted by the public entry points

use crate::error::{ExtendError, Result};
use crate::host::RequireTarget;
use crate::ModuleId;

/// Loosely typed argument as received from a scripting host
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg<F> {
    /// Argument not supplied
    Absent,
    /// A module id string
    Id(ModuleId),
    /// A list of module ids
    Ids(Vec<ModuleId>),
    /// A module factory
    Factory(F),
    /// Any other object
    Config(serde_json::Value),
}

impl<F> ScriptArg<F> {
    fn kind(&self) -> &'static str {
        match self {
            ScriptArg::Absent => "nothing",
            ScriptArg::Id(_) => "a string",
            ScriptArg::Ids(_) => "an array",
            ScriptArg::Factory(_) => "a function",
            ScriptArg::Config(_) => "an object",
        }
    }
}

/// Accepted `define` shapes
#[derive(Debug, Clone, PartialEq)]
pub enum DefineArgs<F> {
    /// `define(factory)`, id inferred from the caller
    Factory(F),
    /// `define(deps, factory)`, id inferred from the caller
    WithDeps(Vec<ModuleId>, F),
    /// `define(id, deps, factory)`
    Named(ModuleId, Vec<ModuleId>, F),
    /// `define(id, factory)`
    NamedFactory(ModuleId, F),
}

impl<F> DefineArgs<F> {
    /// Normalize dynamic `define` arguments
    pub fn from_script(first: ScriptArg<F>, second: ScriptArg<F>, third: ScriptArg<F>) -> Result<Self> {
        match (first, second, third) {
            (ScriptArg::Id(id), ScriptArg::Ids(deps), ScriptArg::Factory(factory)) => {
                Ok(DefineArgs::Named(id, deps, factory))
            }
            (ScriptArg::Id(id), ScriptArg::Factory(factory), ScriptArg::Absent) => {
                Ok(DefineArgs::NamedFactory(id, factory))
            }
            (ScriptArg::Ids(deps), ScriptArg::Factory(factory), ScriptArg::Absent) => {
                Ok(DefineArgs::WithDeps(deps, factory))
            }
            (ScriptArg::Factory(factory), ScriptArg::Absent, ScriptArg::Absent) => {
                Ok(DefineArgs::Factory(factory))
            }
            (first, second, _) => Err(ExtendError::invalid_arguments(
                "define",
                format!(
                    "does not accept {} followed by {}",
                    first.kind(),
                    second.kind()
                ),
            )),
        }
    }
}

/// Accepted `extend` shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendArgs<F> {
    /// `extend(factory)`, dependencies resolved from the override graph
    Factory(F),
    /// `extend(deps, factory)`
    WithDeps(Vec<ModuleId>, F),
}

impl<F> ExtendArgs<F> {
    /// Normalize dynamic `extend` arguments
    pub fn from_script(first: ScriptArg<F>, second: ScriptArg<F>) -> Result<Self> {
        match (first, second) {
            (ScriptArg::Factory(factory), _) => Ok(ExtendArgs::Factory(factory)),
            (ScriptArg::Ids(deps), ScriptArg::Factory(factory)) => {
                Ok(ExtendArgs::WithDeps(deps, factory))
            }
            (ScriptArg::Ids(_), _) => Err(ExtendError::invalid_arguments(
                "extend",
                "requires callback function when dependencies array is provided",
            )),
            _ => Err(ExtendError::invalid_arguments(
                "extend",
                "requires either a callback function or [dependencies, callback]",
            )),
        }
    }
}

impl RequireTarget {
    /// Normalize a dynamic `require` target
    ///
    /// A single id becomes a one-element list; objects pass through as
    /// loader configuration. A missing target or a bare function is an
    /// error since [`RequireTarget`] only carries ids or configuration.
    pub fn from_script<F>(arg: ScriptArg<F>) -> Result<Self> {
        match arg {
            ScriptArg::Id(id) => Ok(RequireTarget::Many(vec![id])),
            ScriptArg::Ids(ids) => Ok(RequireTarget::Many(ids)),
            ScriptArg::Config(config) => Ok(RequireTarget::Config(config)),
            other => Err(ExtendError::invalid_arguments(
                "require",
                format!("does not accept {} as its first argument", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Arg = ScriptArg<&'static str>;

    #[test]
    fn test_define_shapes() {
        assert_eq!(
            DefineArgs::from_script(Arg::Factory("f"), Arg::Absent, Arg::Absent).unwrap(),
            DefineArgs::Factory("f")
        );
        assert_eq!(
            DefineArgs::from_script(Arg::Ids(vec!["a".into()]), Arg::Factory("f"), Arg::Absent).unwrap(),
            DefineArgs::WithDeps(vec!["a".into()], "f")
        );
        assert_eq!(
            DefineArgs::from_script(Arg::Id("m".into()), Arg::Ids(vec![]), Arg::Factory("f")).unwrap(),
            DefineArgs::Named("m".into(), vec![], "f")
        );
        assert_eq!(
            DefineArgs::from_script(Arg::Id("m".into()), Arg::Factory("f"), Arg::Absent).unwrap(),
            DefineArgs::NamedFactory("m".into(), "f")
        );
    }

    #[test]
    fn test_define_rejects_unknown_shape() {
        let err = DefineArgs::from_script(Arg::Config(serde_json::json!({})), Arg::Absent, Arg::Absent)
            .unwrap_err();
        assert_eq!(err.to_string(), "define() does not accept an object followed by nothing");
    }

    #[test]
    fn test_extend_shapes() {
        assert_eq!(
            ExtendArgs::from_script(Arg::Factory("f"), Arg::Absent).unwrap(),
            ExtendArgs::Factory("f")
        );
        assert_eq!(
            ExtendArgs::from_script(Arg::Ids(vec!["a".into()]), Arg::Factory("f")).unwrap(),
            ExtendArgs::WithDeps(vec!["a".into()], "f")
        );
    }

    #[test]
    fn test_extend_rejects_missing_callback() {
        let err = ExtendArgs::from_script(Arg::Ids(vec![]), Arg::Absent).unwrap_err();
        assert!(err.to_string().contains("requires callback function"));

        let err = ExtendArgs::from_script(Arg::Id("views/a".into()), Arg::Factory("f")).unwrap_err();
        assert!(matches!(err, ExtendError::InvalidArguments { call: "extend", .. }));
    }

    #[test]
    fn test_require_targets() {
        assert_eq!(
            RequireTarget::from_script(Arg::Id("views/a".into())).unwrap(),
            RequireTarget::Many(vec!["views/a".into()])
        );
        assert!(matches!(
            RequireTarget::from_script(Arg::Config(serde_json::json!({"a": 1}))).unwrap(),
            RequireTarget::Config(_)
        ));
        assert!(RequireTarget::from_script(Arg::Factory("f")).is_err());
    }

    #[test]
    fn test_require_rejects_missing_target() {
        let err = RequireTarget::from_script(Arg::Absent).unwrap_err();
        assert_eq!(err.to_string(), "require() does not accept nothing as its first argument");

        let err = RequireTarget::from_script(Arg::Factory("f")).unwrap_err();
        assert!(matches!(err, ExtendError::InvalidArguments { call: "require", .. }));
    }
}
