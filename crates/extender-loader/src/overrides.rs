// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Override map and resolution graph
//!
//! The payload is a JSON object mapping a base module id to its override
//! chain, earliest to most derived:
//!
//! ```json
//! { "views/list": ["acme:views/list", "acme:views/list-v2"] }
//! ```
//!
//! The resolution graph links every override to the module it directly
//! supersedes, so `acme:views/list-v2 -> acme:views/list -> views/list`.

use crate::ModuleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Base module id mapped to its ordered override chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideMap {
    chains: BTreeMap<ModuleId, Vec<ModuleId>>,
}

impl OverrideMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a serialized payload
    ///
    /// Absent, `null` or malformed payloads yield an empty map. Empty chains
    /// are dropped.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };

        let chains = match serde_json::from_str::<Option<BTreeMap<ModuleId, Vec<ModuleId>>>>(raw) {
            Ok(chains) => chains.unwrap_or_default(),
            Err(err) => {
                tracing::warn!("Failed to parse module overrides, continuing without: {}", err);
                return Self::new();
            }
        };

        let mut map = Self::new();
        for (base, chain) in chains {
            if chain.is_empty() {
                tracing::warn!("Ignoring empty override chain for '{}'", base);
                continue;
            }
            map.chains.insert(base, chain);
        }
        map
    }

    /// Add or replace the chain for `base`; empty chains are ignored
    pub fn insert(&mut self, base: impl Into<ModuleId>, chain: Vec<ModuleId>) {
        if !chain.is_empty() {
            self.chains.insert(base.into(), chain);
        }
    }

    /// Override chain for a base module
    pub fn chain(&self, base: &str) -> Option<&[ModuleId]> {
        self.chains.get(base).map(Vec::as_slice)
    }

    /// Last override in the chain for `base`
    pub fn most_derived(&self, base: &str) -> Option<&str> {
        self.chains
            .get(base)
            .and_then(|chain| chain.last())
            .map(String::as_str)
    }

    /// Check if `id` has an override chain
    pub fn is_base(&self, id: &str) -> bool {
        self.chains.contains_key(id)
    }

    /// Iterate chains ordered by base id
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ModuleId])> {
        self.chains
            .iter()
            .map(|(base, chain)| (base.as_str(), chain.as_slice()))
    }

    /// Number of base modules with overrides
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Check if there are no overrides
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Encode an override map in its payload form
pub fn encode_payload(map: &OverrideMap) -> String {
    // A map of strings to string lists always serializes
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

/// Override id mapped to the id it directly supersedes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionGraph {
    predecessors: HashMap<ModuleId, ModuleId>,
}

impl ResolutionGraph {
    /// Link every chain entry to the previous one, the first to its base
    pub fn from_map(map: &OverrideMap) -> Self {
        let mut predecessors = HashMap::new();
        for (base, chain) in map.iter() {
            let mut prev = base;
            for id in chain {
                predecessors.insert(id.clone(), prev.to_string());
                prev = id.as_str();
            }
        }
        Self { predecessors }
    }

    /// Module directly superseded by `id`
    pub fn predecessor(&self, id: &str) -> Option<&str> {
        self.predecessors.get(id).map(String::as_str)
    }

    /// Check if `id` is an override
    pub fn contains(&self, id: &str) -> bool {
        self.predecessors.contains_key(id)
    }

    /// Predecessors of `id`, nearest first, ending at its base
    ///
    /// Bounded by the graph size so overlapping chains cannot loop.
    pub fn lineage(&self, id: &str) -> Vec<&str> {
        let mut lineage = Vec::new();
        let mut current = id;
        while let Some(prev) = self.predecessor(current) {
            if lineage.len() >= self.predecessors.len() {
                tracing::warn!("Override lineage of '{}' does not terminate", id);
                break;
            }
            lineage.push(prev);
            current = prev;
        }
        lineage
    }

    /// Base module at the root of the chain containing `id`
    pub fn base_of(&self, id: &str) -> Option<&str> {
        self.lineage(id).last().copied()
    }

    /// Number of override ids
    pub fn len(&self) -> usize {
        self.predecessors.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.predecessors.is_empty()
    }
}

/// Everything derived from one override payload
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Base id to chain
    pub map: OverrideMap,
    /// Override id to predecessor
    pub graph: ResolutionGraph,
    /// Ids eligible for `require` redirection
    pub bases: HashSet<ModuleId>,
}

impl Overrides {
    /// Build map, graph and base set from a raw payload
    pub fn build(raw: Option<&str>) -> Self {
        Self::from_map(OverrideMap::parse(raw))
    }

    /// Derive graph and base set from an already parsed map
    pub fn from_map(map: OverrideMap) -> Self {
        let graph = ResolutionGraph::from_map(&map);
        let bases = map.iter().map(|(base, _)| base.to_string()).collect();
        tracing::debug!(
            "Built override graph: {} base modules, {} overrides",
            map.len(),
            graph.len()
        );
        Self { map, graph, bases }
    }

    /// Id a `require` for `id` should load
    pub fn redirect<'a>(&'a self, id: &'a str) -> &'a str {
        if self.bases.contains(id) {
            self.map.most_derived(id).unwrap_or(id)
        } else {
            id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "views/list": ["acme:views/list", "acme:views/list-v2", "beta:views/list"],
        "views/detail": ["acme:views/detail"]
    }"#;

    #[test]
    fn test_chain_links_to_previous_entry() {
        let overrides = Overrides::build(Some(PAYLOAD));
        let graph = &overrides.graph;

        assert_eq!(graph.predecessor("acme:views/list"), Some("views/list"));
        assert_eq!(graph.predecessor("acme:views/list-v2"), Some("acme:views/list"));
        assert_eq!(graph.predecessor("beta:views/list"), Some("acme:views/list-v2"));
        assert_eq!(graph.predecessor("acme:views/detail"), Some("views/detail"));
        assert_eq!(graph.predecessor("views/list"), None);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_lineage_length_matches_chain_position() {
        let overrides = Overrides::build(Some(PAYLOAD));
        let chain = overrides.map.chain("views/list").unwrap();

        for (position, id) in chain.iter().enumerate() {
            let lineage = overrides.graph.lineage(id);
            assert_eq!(lineage.len(), position + 1);
            assert_eq!(lineage.last(), Some(&"views/list"));
        }
        assert_eq!(overrides.graph.base_of("beta:views/list"), Some("views/list"));
    }

    #[test]
    fn test_redirect_jumps_to_chain_tip() {
        let overrides = Overrides::build(Some(PAYLOAD));
        assert_eq!(overrides.redirect("views/list"), "beta:views/list");
        assert_eq!(overrides.redirect("views/detail"), "acme:views/detail");
        // Intermediate links are not redirected
        assert_eq!(overrides.redirect("acme:views/list"), "acme:views/list");
        assert_eq!(overrides.redirect("views/other"), "views/other");
    }

    #[test]
    fn test_malformed_payload_degrades_to_empty() {
        for raw in [Some("{not json"), Some("[1, 2]"), Some(r#"{"a": "b"}"#), Some("null"), None] {
            let overrides = Overrides::build(raw);
            assert!(overrides.map.is_empty());
            assert!(overrides.graph.is_empty());
            assert!(overrides.bases.is_empty());
        }
    }

    #[test]
    fn test_empty_chains_are_dropped() {
        let map = OverrideMap::parse(Some(r#"{"views/a": [], "views/b": ["x:views/b"]}"#));
        assert!(!map.is_base("views/a"));
        assert!(map.is_base("views/b"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_lineage_terminates_on_overlapping_chains() {
        let overrides = Overrides::build(Some(r#"{"a": ["b"], "b": ["a"]}"#));
        assert!(overrides.graph.lineage("a").len() <= overrides.graph.len());
    }

    #[test]
    fn test_encode_payload_round_trips() {
        let mut map = OverrideMap::new();
        map.insert("views/list", vec!["acme:views/list".to_string()]);
        let encoded = encode_payload(&map);
        assert_eq!(encoded, r#"{"views/list":["acme:views/list"]}"#);
        assert_eq!(OverrideMap::parse(Some(&encoded)), map);
    }
}
