//! Undirected petgraph view of the wiring, for connectivity questions.

use std::collections::HashMap;

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};

use super::store::Graph;
use crate::catalog::{LinkId, NodeId};

impl Graph {
    /// Nodes as vertices, links as edges.
    pub fn to_petgraph(&self) -> UnGraph<NodeId, LinkId> {
        let mut view = UnGraph::new_undirected();
        let mut indices: HashMap<&str, NodeIndex> = HashMap::new();

        for id in self.nodes().keys() {
            indices.insert(id.as_str(), view.add_node(id.clone()));
        }

        for (link_id, link) in self.links() {
            let [a, b] = &link.endpoints;
            if let (Some(&ia), Some(&ib)) = (indices.get(a.node.as_str()), indices.get(b.node.as_str())) {
                view.add_edge(ia, ib, link_id.clone());
            }
        }

        view
    }

    /// Number of groups of nodes wired to each other (isolated nodes count).
    pub fn islands(&self) -> usize {
        connected_components(&self.to_petgraph())
    }

    /// Nodes directly wired to `id`, sorted and deduplicated.
    pub fn neighbors(&self, id: &str) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = self
            .links()
            .values()
            .filter(|link| link.touches(id))
            .flat_map(|link| link.endpoints.iter())
            .filter(|e| e.node != id)
            .map(|e| e.node.clone())
            .collect();
        found.sort();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::{DeviceCatalog, DeviceTemplate, Input, CONNECTIONS_CATEGORY};
    use crate::graph::{ConnectionBinder, Endpoint, Graph, Position};

    #[test]
    fn test_islands_and_neighbors() {
        let mut catalog = DeviceCatalog::new();
        catalog.insert_category(
            CONNECTIONS_CATEGORY,
            DeviceCatalog::parse_category("id:c1\nname:wire\ninput:L:power\ninput:R:power\n"),
        );
        let template = DeviceTemplate {
            id: "n".to_string(),
            name: "node".to_string(),
            inputs: vec![Input::new("a:power"), Input::new("b:power")],
            ..DeviceTemplate::default()
        };

        let mut graph = Graph::new();
        let a = graph.add_node("misc", &template, Position::default());
        let b = graph.add_node("misc", &template, Position::default());
        let c = graph.add_node("misc", &template, Position::default());
        assert_eq!(graph.islands(), 3);

        let binder = ConnectionBinder::new(&catalog);
        binder
            .bind(&mut graph, Endpoint::new(a.clone(), 0), Endpoint::new(b.clone(), 0))
            .unwrap();
        assert_eq!(graph.islands(), 2);
        assert_eq!(graph.neighbors(&a), vec![b.clone()]);
        assert!(graph.neighbors(&c).is_empty());
    }
}
