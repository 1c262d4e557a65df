//! Graph Module
//!
//! Placed nodes, the link table that wires their inputs, and the binder that
//! decides which inputs may be wired.

pub mod binder;
pub mod store;
pub mod topology;

pub use binder::{BindOutcome, ConnectionBinder};
pub use store::{Connection, Endpoint, Graph, GraphError, IntegrityIssue, Link, Node, Position};
