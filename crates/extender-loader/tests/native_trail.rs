// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Caller resolution from the native Rust backtrace
//!
//! Test builds carry debug info, so captured frames have file locations.

use extender_loader::config::FrameConfig;
use extender_loader::{
    ExtendArgs, HostCall, LoaderConfig, ModuleSystem, NativeBacktrace, RecordingHost, StaticPayload,
    TrailSource,
};

#[test]
fn test_first_frame_is_the_caller() {
    let trail = NativeBacktrace.capture();
    let first = &trail.frames()[0];
    assert!(first.contains("native_trail.rs"), "first frame was {}", first);
    assert!(trail.frames().iter().all(|frame| !frame.contains("src/caller.rs")));
}

#[test]
fn test_extend_resolves_rust_caller() {
    let config = LoaderConfig {
        frames: FrameConfig {
            module_pattern: r"(tests)/(native_trail)\.rs".to_string(),
            skip: Vec::new(),
        },
        ..LoaderConfig::default()
    };
    let system = ModuleSystem::<RecordingHost>::builder()
        .config(config)
        .payload(StaticPayload::new(
            r#"{"base": ["tests:native_trail"]}"#,
        ))
        .trail_source(NativeBacktrace)
        .install(RecordingHost::new())
        .unwrap();

    system.extend(ExtendArgs::Factory("f".into())).unwrap();

    assert_eq!(
        system.host().defines(),
        vec![HostCall::Define {
            id: Some("tests:native_trail".into()),
            deps: vec!["base".into()],
            factory: "f".into(),
        }]
    );
}
