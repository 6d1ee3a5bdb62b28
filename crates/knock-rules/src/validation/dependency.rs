use std::collections::{BTreeMap, BTreeSet};

use crate::document::RuleDocument;
use crate::validation::{error_codes, ValidationError, Validator};

/// Detects rules that can re-activate themselves through the attributes they write
///
/// Rule `a` depends on rule `b` when `b` watches an attribute `a` writes.
/// Such cycles are legitimate for counters and similar rules, which is what
/// `allow_cycles: true` is for; they are otherwise reported as errors because
/// they can keep a cascade going until it hits its depth limit.
#[derive(Debug, Default)]
pub struct DependencyValidator {}

impl DependencyValidator {
    /// Create a new dependency validator
    pub fn new() -> Self {
        DependencyValidator {}
    }

    /// Build the activation graph: rule id -> ids of the rules it wakes up
    fn activation_graph(document: &RuleDocument) -> BTreeMap<&str, Vec<&str>> {
        let mut graph = BTreeMap::new();

        for writer in &document.rules {
            let writes = writer.writes();
            let woken: BTreeSet<&str> = document
                .rules
                .iter()
                .filter(|watcher| watcher.watch.iter().any(|key| writes.contains(key)))
                .map(|watcher| watcher.id.as_str())
                .collect();

            if !woken.is_empty() {
                graph
                    .entry(writer.id.as_str())
                    .or_insert_with(Vec::new)
                    .extend(woken);
            }
        }

        graph
    }

    /// Depth-first search recording every path that comes back to a rule on the stack
    fn find_cycles<'a>(
        node: &'a str,
        graph: &BTreeMap<&'a str, Vec<&'a str>>,
        visited: &mut BTreeSet<&'a str>,
        path_set: &mut BTreeSet<&'a str>,
        current_path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        if visited.contains(node) {
            return;
        }

        if path_set.contains(node) {
            if let Some(cycle_start) = current_path.iter().position(|&n| n == node) {
                let cycle = current_path[cycle_start..]
                    .iter()
                    .map(|&s| s.to_string())
                    .collect();
                cycles.push(cycle);
            }
            return;
        }

        path_set.insert(node);
        current_path.push(node);

        if let Some(deps) = graph.get(node) {
            for &dep in deps {
                Self::find_cycles(dep, graph, visited, path_set, current_path, cycles);
            }
        }

        path_set.remove(node);
        current_path.pop();
        visited.insert(node);
    }
}

impl Validator for DependencyValidator {
    fn validate(&self, document: &RuleDocument) -> Vec<ValidationError> {
        if document.allow_cycles {
            return Vec::new();
        }

        let graph = Self::activation_graph(document);
        let mut visited = BTreeSet::new();
        let mut path_set = BTreeSet::new();
        let mut cycles = Vec::new();

        for &start in graph.keys() {
            if !visited.contains(start) {
                Self::find_cycles(
                    start,
                    &graph,
                    &mut visited,
                    &mut path_set,
                    &mut Vec::new(),
                    &mut cycles,
                );
            }
        }

        cycles
            .into_iter()
            .map(|cycle| {
                let mut formatted = cycle.join(" → ");
                formatted.push_str(" → ");
                formatted.push_str(&cycle[0]);
                ValidationError {
                    code: error_codes::CIRCULAR_DEPENDENCY,
                    message: format!("Circular dependency detected in rule chain: {}", formatted),
                    path: Some("rules".to_string()),
                }
            })
            .collect()
    }
}
