//! Device report: one section per distinct template placed in a graph, with
//! the number of nodes made from it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::graph::Graph;

pub fn render_report(graph: &Graph) -> String {
    let mut counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for node in graph.nodes().values() {
        *counts
            .entry((node.category.as_str(), node.device.id.as_str()))
            .or_insert(0) += 1;
    }

    let mut out = String::new();
    let mut printed = BTreeSet::new();
    for node in graph.nodes().values() {
        let key = (node.category.as_str(), node.device.id.as_str());
        if !printed.insert(key) {
            continue;
        }

        out.push_str(&format!("//============ Device #{}\n", printed.len()));
        out.push_str(&format!("Items: {}\n", counts[&key]));
        out.push_str(&node.device.describe());
        out.push('\n');
    }
    out
}

pub fn write_report(path: &Path, graph: &Graph) -> std::io::Result<()> {
    std::fs::write(path, render_report(graph))
}
