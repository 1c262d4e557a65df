//! State Evaluation
//!
//! Each pass binds input `i` (1-based) of a node to the `i`-th lowercase letter,
//! set to whether that input is connected, and resolves the node's rule over
//! those letters. The result is a display state only: upstream values are never
//! propagated, and every pass starts from scratch.

pub mod driver;
pub mod expr;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{NodeId, MAX_INPUTS};
use crate::graph::{Graph, Node};

pub use driver::TickDriver;
pub use expr::{ExprResolver, RuleError};

/// Variable values handed to a rule.
pub type Assignment = BTreeMap<char, bool>;

/// Resolves a rule expression over an assignment.
pub trait RuleResolver {
    fn resolve(&self, rule: &str, assignment: &Assignment) -> Result<bool, RuleError>;
}

impl<R: RuleResolver + ?Sized> RuleResolver for &R {
    fn resolve(&self, rule: &str, assignment: &Assignment) -> Result<bool, RuleError> {
        (**self).resolve(rule, assignment)
    }
}

/// The variable letter for the 1-based input `index`, if any is left.
pub fn variable_for(index: usize) -> Option<char> {
    if (1..=MAX_INPUTS).contains(&index) {
        Some((b'a' + (index - 1) as u8) as char)
    } else {
        None
    }
}

/// Result of one full evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub states: BTreeMap<NodeId, bool>,
    pub total_power: f64,
    pub evaluated_at: DateTime<Utc>,
}

impl TickReport {
    pub fn state(&self, node: &str) -> Option<bool> {
        self.states.get(node).copied()
    }

    pub fn active_count(&self) -> usize {
        self.states.values().filter(|&&on| on).count()
    }
}

pub struct StateEvaluator<R> {
    resolver: R,
}

impl Default for StateEvaluator<ExprResolver> {
    fn default() -> Self {
        Self::new(ExprResolver)
    }
}

impl<R: RuleResolver> StateEvaluator<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Connectivity of each input, keyed by its letter.
    pub fn assignment(node_id: &str, node: &Node) -> Assignment {
        let mut vals = Assignment::new();
        for (i, input) in node.inputs().iter().enumerate() {
            match variable_for(i + 1) {
                Some(letter) => {
                    vals.insert(letter, input.is_connected());
                }
                None => {
                    tracing::error!(
                        "Node {}: no variable letter left for input {} ({})",
                        node_id,
                        i + 1,
                        input.name
                    );
                }
            }
        }
        vals
    }

    /// Display state of one node. An empty rule is `false`; a rule that
    /// fails to resolve is logged and shown as `false`.
    pub fn evaluate_node(&self, node_id: &str, node: &Node) -> bool {
        let rule = node.device.rule.trim();
        if rule.is_empty() {
            return false;
        }

        let vals = Self::assignment(node_id, node);
        match self.resolver.resolve(rule, &vals) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Node {} ({}): rule {:?} failed: {}", node_id, node.device.name, rule, e);
                false
            }
        }
    }

    /// One full pass over every node of `graph`.
    pub fn tick(&self, graph: &Graph) -> TickReport {
        let states = graph
            .nodes()
            .iter()
            .map(|(id, node)| (id.clone(), self.evaluate_node(id, node)))
            .collect();

        TickReport {
            states,
            total_power: graph.total_power(),
            evaluated_at: Utc::now(),
        }
    }
}
