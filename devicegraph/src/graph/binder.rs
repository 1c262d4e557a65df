//! Connection Binder
//!
//! Wires two node inputs together when the `connections` category declares a
//! template for their pair of port types. A refused bind leaves the graph
//! untouched and is reported as a [`BindOutcome`], not an error, so repeating
//! a bind is harmless.

use uuid::Uuid;

use super::store::{Endpoint, Graph, GraphError, Link};
use crate::catalog::{DeviceCatalog, LinkId};

/// What a bind request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// A new link was created.
    Bound(LinkId),
    /// One of the inputs is already wired.
    AlreadyConnected,
    /// No connection template covers the two port types.
    NoMatchingConnection,
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound(_))
    }

    pub fn link(&self) -> Option<&LinkId> {
        match self {
            BindOutcome::Bound(link) => Some(link),
            _ => None,
        }
    }
}

pub struct ConnectionBinder<'a> {
    catalog: &'a DeviceCatalog,
}

impl<'a> ConnectionBinder<'a> {
    pub fn new(catalog: &'a DeviceCatalog) -> Self {
        Self { catalog }
    }

    /// Bind input `a` to input `b`.
    ///
    /// Unknown nodes, out-of-range inputs and self-connections are errors.
    pub fn bind(&self, graph: &mut Graph, a: Endpoint, b: Endpoint) -> Result<BindOutcome, GraphError> {
        if a.node == b.node {
            return Err(GraphError::SelfConnection(a.node));
        }

        let input_a = graph.input(&a.node, a.input)?;
        let input_b = graph.input(&b.node, b.input)?;

        let (port_a, port_b) = (input_a.port_type(), input_b.port_type());
        let Some(connection) = self.catalog.find_connection(port_a, port_b) else {
            tracing::debug!("No connection template for ports {:?} and {:?}", port_a, port_b);
            return Ok(BindOutcome::NoMatchingConnection);
        };

        if input_a.is_connected() || input_b.is_connected() {
            tracing::debug!("Bind {} <-> {} refused: input already connected", a, b);
            return Ok(BindOutcome::AlreadyConnected);
        }

        let link_id = Uuid::new_v4().to_string();
        tracing::debug!("Binding {} <-> {} via {} as {}", a, b, connection.name, link_id);
        graph.insert_link(link_id.clone(), Link { endpoints: [a, b] });

        Ok(BindOutcome::Bound(link_id))
    }

    /// Disconnect an input and its peer, removing their link.
    pub fn unbind(&self, graph: &mut Graph, node: &str, input: usize) -> Result<Option<LinkId>, GraphError> {
        graph.unbind(node, input)
    }
}
