//! Graph Store
//!
//! Nodes are copies of device templates placed on the board. Wiring is kept
//! in a single link table: each [`Link`] records both endpoints, and an
//! [`Input`] only remembers the id of the link it belongs to. The peer side of
//! a connection is always looked up through the table, so both sides can never
//! disagree about who they are wired to.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::schema::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {node} has no input {input} (it has {count})")]
    InputOutOfRange {
        node: NodeId,
        input: usize,
        count: usize,
    },

    #[error("Cannot connect node {0} to itself")]
    SelfConnection(NodeId),
}

/// Layout position on the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A device template instance placed in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Category the template was taken from.
    pub category: CategoryName,
    pub device: DeviceTemplate,
    #[serde(default)]
    pub position: Position,
}

impl Node {
    pub fn inputs(&self) -> &[Input] {
        &self.device.inputs
    }

    pub fn is_connected(&self, input: usize) -> bool {
        self.device
            .inputs
            .get(input)
            .map(Input::is_connected)
            .unwrap_or(false)
    }
}

/// One side of a link: a node and the index of one of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub input: usize,
}

impl Endpoint {
    pub fn new(node: impl Into<NodeId>, input: usize) -> Self {
        Self {
            node: node.into(),
            input,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.node, self.input)
    }
}

/// A realized wire between two inputs of two different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub endpoints: [Endpoint; 2],
}

impl Link {
    pub fn touches(&self, node: &str) -> bool {
        self.endpoints.iter().any(|e| e.node == node)
    }

    /// The endpoint opposite to `(node, input)`.
    pub fn peer_of(&self, node: &str, input: usize) -> Option<&Endpoint> {
        let [a, b] = &self.endpoints;
        if a.node == node && a.input == input {
            Some(b)
        } else if b.node == node && b.input == input {
            Some(a)
        } else {
            None
        }
    }
}

/// The peer view of a connected input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub peer_node: NodeId,
    pub peer_input: usize,
    pub link: LinkId,
}

/// A consistency problem found (and fixed) by [`Graph::repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// A link whose endpoints are missing or do not point back at it.
    DanglingLink(LinkId),
    /// An input referring to a link that does not list it as an endpoint.
    DanglingConnection { endpoint: Endpoint, link: LinkId },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::DanglingLink(link) => write!(f, "dangling link {}", link),
            IntegrityIssue::DanglingConnection { endpoint, link } => {
                write!(f, "input {} refers to missing link {}", endpoint, link)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(nodes: BTreeMap<NodeId, Node>, links: BTreeMap<LinkId, Link>) -> Self {
        Self { nodes, links }
    }

    pub(crate) fn parts(&self) -> (&BTreeMap<NodeId, Node>, &BTreeMap<LinkId, Link>) {
        (&self.nodes, &self.links)
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    pub fn links(&self) -> &BTreeMap<LinkId, Link> {
        &self.links
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Place a copy of `template` and return its new id.
    pub fn add_node(&mut self, category: &str, template: &DeviceTemplate, position: Position) -> NodeId {
        let id = Uuid::new_v4().to_string();
        let mut device = template.clone();
        device.inputs.iter_mut().for_each(Input::reset);

        self.nodes.insert(
            id.clone(),
            Node {
                category: category.to_string(),
                device,
                position,
            },
        );
        id
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// The input at `index` on node `id`.
    pub fn input(&self, id: &str, index: usize) -> Result<&Input, GraphError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        node.device.inputs.get(index).ok_or(GraphError::InputOutOfRange {
            node: id.to_string(),
            input: index,
            count: node.device.inputs.len(),
        })
    }

    fn input_mut(&mut self, endpoint: &Endpoint) -> Option<&mut Input> {
        self.nodes
            .get_mut(&endpoint.node)
            .and_then(|n| n.device.inputs.get_mut(endpoint.input))
    }

    pub fn is_connected(&self, id: &str, index: usize) -> bool {
        self.nodes
            .get(id)
            .map(|n| n.is_connected(index))
            .unwrap_or(false)
    }

    /// Who the input `(id, index)` is wired to, if anyone.
    pub fn connection(&self, id: &str, index: usize) -> Option<Connection> {
        let link_id = self.input(id, index).ok()?.link.as_ref()?;
        let peer = self.links.get(link_id)?.peer_of(id, index)?;
        Some(Connection {
            peer_node: peer.node.clone(),
            peer_input: peer.input,
            link: link_id.clone(),
        })
    }

    /// Record a new link and mark both endpoint inputs. Callers check that
    /// both inputs exist and are free.
    pub(crate) fn insert_link(&mut self, id: LinkId, link: Link) {
        for endpoint in &link.endpoints {
            if let Some(input) = self.input_mut(endpoint) {
                input.link = Some(id.clone());
            }
        }
        self.links.insert(id, link);
    }

    /// Remove a link and clear both of its endpoint inputs.
    pub fn remove_link(&mut self, id: &str) -> Option<Link> {
        let link = self.links.remove(id)?;
        for endpoint in &link.endpoints {
            if let Some(input) = self.input_mut(endpoint) {
                if input.link.as_deref() == Some(id) {
                    input.reset();
                }
            }
        }
        Some(link)
    }

    /// Disconnect `(id, index)` and its peer. Returns the removed link id,
    /// or `None` when the input was not connected.
    pub fn unbind(&mut self, id: &str, index: usize) -> Result<Option<LinkId>, GraphError> {
        let input = self.input(id, index)?;
        let Some(link_id) = input.link.clone() else {
            return Ok(None);
        };

        if self.remove_link(&link_id).is_none() {
            tracing::error!("Input {}[{}] referred to missing link {}", id, index, link_id);
            if let Some(input) = self.input_mut(&Endpoint::new(id, index)) {
                input.reset();
            }
        }
        Ok(Some(link_id))
    }

    /// Delete a node after severing every link that touches it.
    pub fn delete_node(&mut self, id: &str) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::UnknownNode(id.to_string()));
        }

        let touching: Vec<LinkId> = self
            .links
            .iter()
            .filter(|(_, link)| link.touches(id))
            .map(|(link_id, _)| link_id.clone())
            .collect();
        for link_id in touching {
            self.remove_link(&link_id);
        }

        let mut node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        // Inputs may still name links that were never in the table.
        node.device.inputs.iter_mut().for_each(Input::reset);
        Ok(node)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
    }

    /// Sum of the power of every placed node.
    pub fn total_power(&self) -> f64 {
        self.nodes.values().map(|n| n.device.power).sum()
    }

    /// Drop links and connections that do not pair up, logging each one.
    pub fn repair(&mut self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();

        let broken: Vec<LinkId> = self
            .links
            .iter()
            .filter(|(link_id, link)| !self.link_is_sound(link_id, link))
            .map(|(link_id, _)| link_id.clone())
            .collect();
        for link_id in broken {
            self.remove_link(&link_id);
            issues.push(IntegrityIssue::DanglingLink(link_id));
        }

        for (node_id, node) in self.nodes.iter_mut() {
            for (index, input) in node.device.inputs.iter_mut().enumerate() {
                let Some(link_id) = input.link.clone() else {
                    continue;
                };
                let paired = self
                    .links
                    .get(&link_id)
                    .and_then(|link| link.peer_of(node_id, index))
                    .is_some();
                if !paired {
                    input.reset();
                    issues.push(IntegrityIssue::DanglingConnection {
                        endpoint: Endpoint::new(node_id.clone(), index),
                        link: link_id,
                    });
                }
            }
        }

        for issue in &issues {
            tracing::error!("Corrupt graph state, reset {}", issue);
        }
        issues
    }

    fn link_is_sound(&self, link_id: &str, link: &Link) -> bool {
        let [a, b] = &link.endpoints;
        a.node != b.node
            && link.endpoints.iter().all(|e| {
                self.nodes
                    .get(&e.node)
                    .and_then(|n| n.device.inputs.get(e.input))
                    .map(|input| input.link.as_deref() == Some(link_id))
                    .unwrap_or(false)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> DeviceTemplate {
        DeviceTemplate {
            id: "g1".to_string(),
            name: "AND".to_string(),
            inputs: vec![Input::new("in1:power"), Input::new("in2:power")],
            rule: "a&b".to_string(),
            power: 1.5,
        }
    }

    fn wired_pair(graph: &mut Graph) -> (NodeId, NodeId, LinkId) {
        let a = graph.add_node("gates", &gate(), Position::default());
        let b = graph.add_node("gates", &gate(), Position::new(10, 0));
        let link = "link-1".to_string();
        graph.insert_link(
            link.clone(),
            Link {
                endpoints: [Endpoint::new(a.clone(), 0), Endpoint::new(b.clone(), 1)],
            },
        );
        (a, b, link)
    }

    #[test]
    fn test_add_node_copies_template() {
        let mut graph = Graph::new();
        let mut template = gate();
        template.inputs[0].link = Some("stale".to_string());

        let id = graph.add_node("gates", &template, Position::new(3, 4));
        let node = graph.node(&id).unwrap();

        assert_eq!(node.device.name, "AND");
        assert_eq!(node.position, Position::new(3, 4));
        assert!(!node.is_connected(0));
    }

    #[test]
    fn test_connection_view() {
        let mut graph = Graph::new();
        let (a, b, link) = wired_pair(&mut graph);

        let conn = graph.connection(&a, 0).unwrap();
        assert_eq!(conn.peer_node, b);
        assert_eq!(conn.peer_input, 1);
        assert_eq!(conn.link, link);
        assert_eq!(graph.connection(&b, 1).unwrap().peer_node, a);
        assert!(graph.connection(&a, 1).is_none());
    }

    #[test]
    fn test_unbind_clears_both_sides() {
        let mut graph = Graph::new();
        let (a, b, link) = wired_pair(&mut graph);

        assert_eq!(graph.unbind(&b, 1).unwrap(), Some(link));
        assert!(!graph.is_connected(&a, 0));
        assert!(!graph.is_connected(&b, 1));
        assert!(graph.links().is_empty());
        assert_eq!(graph.unbind(&b, 1).unwrap(), None);
    }

    #[test]
    fn test_unbind_out_of_range() {
        let mut graph = Graph::new();
        let (a, _, _) = wired_pair(&mut graph);
        assert!(matches!(graph.unbind(&a, 9), Err(GraphError::InputOutOfRange { count: 2, .. })));
    }

    #[test]
    fn test_delete_node_resets_peers() {
        let mut graph = Graph::new();
        let (a, b, _) = wired_pair(&mut graph);

        let removed = graph.delete_node(&a).unwrap();
        assert!(!removed.is_connected(0));
        assert!(graph.links().is_empty());
        assert!(!graph.is_connected(&b, 1));
        assert!(graph.node(&b).is_some());
        assert_eq!(graph.delete_node(&a), Err(GraphError::UnknownNode(a)));
    }

    #[test]
    fn test_total_power() {
        let mut graph = Graph::new();
        wired_pair(&mut graph);
        assert_eq!(graph.total_power(), 3.0);
    }

    #[test]
    fn test_repair_drops_dangling() {
        let mut graph = Graph::new();
        let (a, b, link) = wired_pair(&mut graph);

        // Peer forgot the link: the link no longer pairs up.
        graph.nodes.get_mut(&b).unwrap().device.inputs[1].reset();
        // Input pointing at a link that does not exist.
        graph.nodes.get_mut(&b).unwrap().device.inputs[0].link = Some("ghost".to_string());

        let issues = graph.repair();
        assert!(issues.contains(&IntegrityIssue::DanglingLink(link)));
        assert!(issues.contains(&IntegrityIssue::DanglingConnection {
            endpoint: Endpoint::new(b.clone(), 0),
            link: "ghost".to_string(),
        }));
        assert!(graph.links().is_empty());
        assert!(!graph.is_connected(&a, 0));
        assert!(!graph.is_connected(&b, 0));
        assert!(graph.repair().is_empty());
    }
}
