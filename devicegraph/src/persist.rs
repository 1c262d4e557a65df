//! Scheme persistence.
//!
//! A scheme stream is the node map followed by the link map, in that order,
//! encoded as one JSON array. Loading decodes the whole stream before a graph
//! is built, then repairs any connection that does not pair up.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::{LinkId, NodeId};
use crate::graph::{Graph, Link, Node};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed scheme stream: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct SchemeCodec;

impl SchemeCodec {
    pub fn save(graph: &Graph) -> Result<Vec<u8>, PersistError> {
        let (nodes, links) = graph.parts();
        Ok(serde_json::to_vec(&(nodes, links))?)
    }

    pub fn load(bytes: &[u8]) -> Result<Graph, PersistError> {
        let (nodes, links): (BTreeMap<NodeId, Node>, BTreeMap<LinkId, Link>) =
            serde_json::from_slice(bytes)?;

        let mut graph = Graph::from_parts(nodes, links);
        let issues = graph.repair();
        if !issues.is_empty() {
            tracing::warn!("Scheme had {} inconsistent connections, reset", issues.len());
        }
        Ok(graph)
    }

    /// Write `graph` to `path`, adding `extension` when the name lacks it.
    pub fn save_to_file(path: &Path, graph: &Graph, extension: &str) -> Result<PathBuf, PersistError> {
        let path = with_extension(path, extension);
        std::fs::write(&path, Self::save(graph)?)?;
        tracing::info!("Saved scheme with {} nodes to {:?}", graph.nodes().len(), path);
        Ok(path)
    }

    pub fn load_from_file(path: &Path, extension: &str) -> Result<Graph, PersistError> {
        let path = with_extension(path, extension);
        let bytes = std::fs::read(&path)?;
        let graph = Self::load(&bytes)?;
        tracing::info!("Loaded scheme with {} nodes from {:?}", graph.nodes().len(), path);
        Ok(graph)
    }
}

/// `path` with `.extension` appended unless it already ends that way.
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(extension))
        .unwrap_or(false);

    if has_extension || extension.is_empty() {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeviceTemplate, Input};
    use crate::graph::{Endpoint, Position};

    fn sample_graph() -> Graph {
        let template = DeviceTemplate {
            id: "g1".to_string(),
            name: "AND".to_string(),
            inputs: vec![Input::new("in1:power"), Input::new("in2:power")],
            rule: "a&b".to_string(),
            power: 0.1,
        };
        let mut graph = Graph::new();
        let a = graph.add_node("gates", &template, Position::new(-5, 7));
        let b = graph.add_node("gates", &template, Position::new(40, 12));
        graph.insert_link(
            "l1".to_string(),
            Link {
                endpoints: [Endpoint::new(a, 1), Endpoint::new(b, 0)],
            },
        );
        graph
    }

    #[test]
    fn test_round_trip() {
        let graph = sample_graph();
        let bytes = SchemeCodec::save(&graph).unwrap();
        assert_eq!(SchemeCodec::load(&bytes).unwrap(), graph);
    }

    #[test]
    fn test_empty_graph_round_trip() {
        let bytes = SchemeCodec::save(&Graph::new()).unwrap();
        assert_eq!(SchemeCodec::load(&bytes).unwrap(), Graph::new());
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let bytes = SchemeCodec::save(&sample_graph()).unwrap();
        for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            let err = SchemeCodec::load(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, PersistError::Malformed(_)), "cut at {}", cut);
        }
    }

    #[test]
    fn test_node_map_must_come_first() {
        let graph = sample_graph();
        let (nodes, links) = graph.parts();
        let swapped = serde_json::to_vec(&(links, nodes)).unwrap();
        assert!(SchemeCodec::load(&swapped).is_err());
    }

    #[test]
    fn test_round_trip_with_infinite_pwr_line() {
        let category = crate::catalog::DeviceCatalog::parse_category("id:x\nname:X\ninput:a:power\npwr:inf\n");
        let mut graph = Graph::new();
        let id = graph.add_node("misc", &category["x"], Position::default());

        let bytes = SchemeCodec::save(&graph).unwrap();
        let loaded = SchemeCodec::load(&bytes).expect("Scheme should load back");
        assert_eq!(loaded, graph);
        assert_eq!(loaded.node(&id).unwrap().device.power, 0.0);
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension(Path::new("board"), "sch"), PathBuf::from("board.sch"));
        assert_eq!(with_extension(Path::new("board.sch"), "sch"), PathBuf::from("board.sch"));
        assert_eq!(with_extension(Path::new("board.v2"), "sch"), PathBuf::from("board.v2.sch"));
    }
}
