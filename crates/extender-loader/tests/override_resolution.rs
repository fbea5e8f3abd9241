// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end override resolution over a host loader

use extender_loader::{
    DefineArgs, ExecutionStack, ExtendArgs, ExtendError, HostCall, HostLoader, MetadataPayload,
    ModuleId, ModuleSystem, RecordingHost, RequireTarget, ResolutionState, StaticPayload,
};
use std::cell::RefCell;
use std::io::Write;
use std::rc::{Rc, Weak};

const PAYLOAD: &str = r#"{"views/list": ["acme:views/list", "acme:views/list-v2"]}"#;
const LIST_V1: &str = "/client/custom/modules/acme/src/views/list.js";
const LIST_V2: &str = "/client/custom/modules/acme/src/views/list-v2.js";

fn system_with(payload: &str, stack: &ExecutionStack) -> ModuleSystem<RecordingHost> {
    ModuleSystem::<RecordingHost>::builder()
        .payload(StaticPayload::new(payload))
        .trail_source(stack.clone())
        .install(RecordingHost::new())
        .unwrap()
}

#[test]
fn test_require_and_extend_follow_the_chain() {
    let stack = ExecutionStack::new();
    let system = system_with(PAYLOAD, &stack);

    let loaded = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&loaded);
    system.require(
        RequireTarget::One("views/list".into()),
        Some(Box::new(move |ids: &[ModuleId]| sink.borrow_mut().extend_from_slice(ids))),
        None,
    );
    assert_eq!(*loaded.borrow(), vec!["acme:views/list-v2".to_string()]);

    {
        let _entry = stack.enter(LIST_V2);
        system.extend(ExtendArgs::Factory("list-v2".into())).unwrap();
    }
    {
        let _entry = stack.enter(LIST_V1);
        system.extend(ExtendArgs::Factory("list-v1".into())).unwrap();
    }

    assert_eq!(
        system.host().defines(),
        vec![
            HostCall::Define {
                id: Some("acme:views/list-v2".into()),
                deps: vec!["acme:views/list".into()],
                factory: "list-v2".into(),
            },
            HostCall::Define {
                id: Some("acme:views/list".into()),
                deps: vec!["views/list".into()],
                factory: "list-v1".into(),
            },
        ]
    );
    assert_eq!(system.state().resolution(), ResolutionState::Normal);
}

#[test]
fn test_second_extend_of_same_module_is_ignored() {
    let stack = ExecutionStack::new();
    let system = system_with(PAYLOAD, &stack);
    let _entry = stack.enter(LIST_V2);

    assert!(system.extend(ExtendArgs::Factory("first".into())).unwrap().is_some());
    assert!(system.extend(ExtendArgs::Factory("second".into())).unwrap().is_none());
    assert_eq!(system.host().defines().len(), 1);
    assert_eq!(system.state().resolution(), ResolutionState::Normal);
}

#[test]
fn test_malformed_payload_behaves_like_no_overrides() {
    let stack = ExecutionStack::new();
    let system = system_with("{not json", &stack);

    system.require(RequireTarget::One("views/list".into()), None, None);
    assert_eq!(
        system.host().requires(),
        vec![RequireTarget::Many(vec!["views/list".into()])]
    );
    assert!(system.overrides().map.is_empty());

    let _entry = stack.enter("/client/custom/modules/crm/src/views/contact/detail.js");
    system.extend(ExtendArgs::Factory("f".into())).unwrap();
    assert_eq!(
        system.host().defines(),
        vec![HostCall::Define {
            id: Some("crm:views/contact/detail".into()),
            deps: vec!["views/contact/detail".into()],
            factory: "f".into(),
        }]
    );
}

#[test]
fn test_extend_outside_a_module_fails() {
    let stack = ExecutionStack::new();
    let system = system_with(PAYLOAD, &stack);
    let _entry = stack.enter("/vendor/lib/helpers.js");

    let err = system.extend(ExtendArgs::Factory("f".into())).unwrap_err();
    assert!(matches!(err, ExtendError::UnresolvedContext));
    assert_eq!(err.to_string(), "Could not determine module context for extend()");
}

#[test]
fn test_module_system_frames_are_skipped() {
    let stack = ExecutionStack::new();
    let system = system_with(PAYLOAD, &stack);
    let _outer = stack.enter(LIST_V2);
    let _inner = stack.enter("/client/custom/modules/core/src/extender.js:40:9");

    system.define(DefineArgs::Factory("f".into()));
    assert!(matches!(
        &system.host().defines()[0],
        HostCall::Define { id: Some(id), .. } if id == "acme:views/list-v2"
    ));
}

#[test]
fn test_overrides_from_application_metadata() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"app": {{"client": {{"viewExtensions": {}}}}}}}"#,
        PAYLOAD
    )
    .unwrap();

    let system = ModuleSystem::<RecordingHost>::builder()
        .payload(MetadataPayload::new(file.path()))
        .install(RecordingHost::new())
        .unwrap();

    system.require(RequireTarget::Many(vec!["views/list".into()]), None, None);
    assert_eq!(
        system.host().requires(),
        vec![RequireTarget::Many(vec!["acme:views/list-v2".into()])]
    );
}

/// Host whose `define` loads the dependencies through the module system
struct ReentrantHost {
    system: Weak<ModuleSystem<ReentrantHost>>,
    inner: RecordingHost,
    observed: RefCell<Vec<ResolutionState>>,
}

impl HostLoader for ReentrantHost {
    type Factory = String;
    type OnLoad = <RecordingHost as HostLoader>::OnLoad;
    type OnError = <RecordingHost as HostLoader>::OnError;
    type Output = ();

    fn define(&self, id: Option<ModuleId>, deps: Vec<ModuleId>, factory: String) {
        self.inner.define(id, deps.clone(), factory);
        if let Some(system) = self.system.upgrade() {
            self.observed.borrow_mut().push(system.state().resolution());
            system.require(RequireTarget::Many(deps), None, None);
        }
    }

    fn require(
        &self,
        target: RequireTarget,
        on_load: Option<Self::OnLoad>,
        on_error: Option<Self::OnError>,
    ) {
        self.inner.require(target, on_load, on_error);
    }
}

#[test]
fn test_dependency_load_inside_override_define_is_not_redirected() {
    let system = Rc::new_cyclic(|weak| {
        ModuleSystem::<ReentrantHost>::builder()
            .payload(StaticPayload::new(PAYLOAD))
            .caller_resolver(|| Some("acme:views/list".to_string()))
            .install(ReentrantHost {
                system: weak.clone(),
                inner: RecordingHost::new(),
                observed: RefCell::default(),
            })
            .unwrap()
    });

    system.extend(ExtendArgs::Factory("list-v1".into())).unwrap();
    assert_eq!(*system.host().observed.borrow(), vec![ResolutionState::Resolving]);
    assert_eq!(system.state().resolution(), ResolutionState::Normal);

    system.require(RequireTarget::One("views/list".into()), None, None);
    assert_eq!(
        system.host().inner.requires(),
        vec![
            RequireTarget::Many(vec!["views/list".into()]),
            RequireTarget::Many(vec!["acme:views/list-v2".into()]),
        ]
    );
}

#[test]
fn test_plain_define_inside_host_keeps_redirecting() {
    let system = Rc::new_cyclic(|weak| {
        ModuleSystem::<ReentrantHost>::builder()
            .payload(StaticPayload::new(PAYLOAD))
            .caller_resolver(|| None::<ModuleId>)
            .install(ReentrantHost {
                system: weak.clone(),
                inner: RecordingHost::new(),
                observed: RefCell::default(),
            })
            .unwrap()
    });

    system.define(DefineArgs::Named(
        "views/dashboard".into(),
        vec!["views/list".into()],
        "dashboard".into(),
    ));

    assert_eq!(*system.host().observed.borrow(), vec![ResolutionState::Normal]);
    assert_eq!(
        system.host().inner.requires(),
        vec![RequireTarget::Many(vec!["acme:views/list-v2".into()])]
    );
}
