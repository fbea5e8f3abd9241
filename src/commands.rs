// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! One-shot inspection commands

use crate::cli::Cli;
use anyhow::Context;
use extender_loader::{
    CallTrail, ExecutionStack, FilePayload, FrameRules, LoaderConfig, MetadataPayload, ModuleId,
    ModuleSystem, RecordingHost, RequireTarget,
};
use owo_colors::OwoColorize;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const READY_POLL: Duration = Duration::from_millis(10);
const READY_LIMIT: Duration = Duration::from_secs(2);

/// Loader configuration from `--config`, or the defaults
pub fn load_config(cli: &Cli) -> anyhow::Result<LoaderConfig> {
    match &cli.config {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(LoaderConfig::default()),
    }
}

/// Install a module system over a recording host, callers taken from `stack`
pub async fn load_system(
    cli: &Cli,
    stack: &ExecutionStack,
) -> anyhow::Result<ModuleSystem<RecordingHost>> {
    let builder = ModuleSystem::<RecordingHost>::builder()
        .config(load_config(cli)?)
        .trail_source(stack.clone());

    let builder = match (&cli.overrides, &cli.metadata) {
        (Some(path), _) => {
            tracing::debug!("Reading overrides from {}", path.display());
            builder.payload(FilePayload::new(path))
        }
        (None, Some(path)) => {
            tracing::debug!("Reading module metadata from {}", path.display());
            builder.payload(MetadataPayload::new(path))
        }
        (None, None) => {
            tracing::debug!("No override payload given");
            builder
        }
    };

    let system = builder
        .install_when_ready(RecordingHost::new(), READY_POLL, READY_LIMIT)
        .await?;
    tracing::debug!("Loaded {} override chains", system.overrides().map.len());
    Ok(system)
}

/// Print every chain with its predecessor links
pub fn graph(system: &ModuleSystem<RecordingHost>) {
    let overrides = system.overrides();
    if overrides.map.is_empty() {
        println!("{}", "No overrides declared".dimmed());
        return;
    }

    for (base, chain) in overrides.map.iter() {
        println!("{}", base.white().bold());
        let mut previous = base;
        for link in chain {
            println!("  {} {} {}", link.green(), "extends".dimmed(), previous);
            previous = link.as_str();
        }
    }

    println!();
    println!(
        "{} chains, {} links",
        overrides.map.len().yellow(),
        overrides.graph.len().yellow()
    );
}

/// Print what a `require` of each id forwards to the host
pub fn resolve(system: &ModuleSystem<RecordingHost>, ids: &[String]) {
    for id in ids {
        let loaded: Rc<RefCell<Vec<ModuleId>>> = Rc::default();
        let sink = Rc::clone(&loaded);
        system.require(
            RequireTarget::One(id.clone()),
            Some(Box::new(move |ids: &[ModuleId]| {
                sink.borrow_mut().extend_from_slice(ids)
            })),
            None,
        );

        for target in loaded.borrow().iter() {
            if target == id {
                println!("{} {}", id, "(not overridden)".dimmed());
            } else {
                println!("{} {} {}", id, "->".cyan(), target.green());
            }
        }
    }
}

/// Print the dependencies `extend` injects for `id`
pub fn deps(system: &ModuleSystem<RecordingHost>, id: &str) {
    let deps = system.dependencies_for(id);
    if deps.is_empty() {
        println!("{} {}", id, "(no dependencies)".dimmed());
        return;
    }
    println!("{} {} [{}]", id, "depends on".dimmed(), deps.join(", ").green());
}

/// Print the module id identified from `locations`
pub fn caller(config: &LoaderConfig, locations: &[String]) -> anyhow::Result<()> {
    let rules = FrameRules::from_config(&config.frames)?;
    let trail: CallTrail = locations.iter().cloned().collect();

    for frame in trail.frames() {
        match rules.skip_reason(frame) {
            Some(rule) => println!("  {} {}", frame.dimmed(), format!("(skipped: {})", rule).dimmed()),
            None => match rules.module_id(frame) {
                Some(id) => println!("  {} {} {}", frame, "->".cyan(), id.green()),
                None => println!("  {} {}", frame, "(not a module)".dimmed()),
            },
        }
    }

    match rules.scan(&trail) {
        Some(id) => println!("{} {}", "Caller:".white().bold(), id.green().bold()),
        None => println!("{} {}", "Caller:".white().bold(), "unresolved".red()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_system_from_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"views/list": ["acme:views/list"]}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let cli = Cli::try_parse_from(["extender", "--overrides", path.as_str(), "graph"]).unwrap();
        let system = load_system(&cli, &ExecutionStack::new()).await.unwrap();

        assert_eq!(system.overrides().map.most_derived("views/list"), Some("acme:views/list"));
        assert_eq!(system.dependencies_for("acme:views/list"), vec!["views/list"]);
    }

    #[tokio::test]
    async fn test_load_system_without_payload() {
        let cli = Cli::try_parse_from(["extender", "graph"]).unwrap();
        let system = load_system(&cli, &ExecutionStack::new()).await.unwrap();
        assert!(system.overrides().map.is_empty());
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let cli = Cli::try_parse_from(["extender", "--config", "/nonexistent/extender.json"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/extender.json"));
    }
}
