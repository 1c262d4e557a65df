//! DeviceGraph - device catalogs, port-typed wiring and state evaluation
//!
//! Devices are defined per category in plain `key:value` files. Placed device
//! copies (nodes) are wired input to input, but only where the special
//! `connections` category declares the pair of port types compatible. A
//! periodic pass then resolves every node's boolean rule over the
//! connectivity of its inputs.
//!
//! # Quick Start
//!
//! ```no_run
//! use devicegraph::prelude::*;
//!
//! let mut workspace = Workspace::open(Settings::default().with_data_dir("data"));
//! let a = workspace.add_node("gates", "g1", Position::new(0, 0)).unwrap();
//! let b = workspace.add_node("gates", "g1", Position::new(80, 0)).unwrap();
//!
//! let outcome = workspace
//!     .bind(Endpoint::new(a.clone(), 0), Endpoint::new(b.clone(), 0))
//!     .unwrap();
//! println!("{:?}", outcome);
//!
//! let report = workspace.tick();
//! println!("{} is {:?}", a, report.state(&a));
//! ```
//!
//! # Features
//!
//! - **Catalog**: category files, port registry, device validation
//! - **Graph**: nodes, link table, bind/unbind, deletion integrity
//! - **Evaluation**: connectivity-driven rules, periodic tick driver
//! - **Persistence**: scheme files and device reports

pub mod catalog;
pub mod config;
pub mod core;
pub mod eval;
pub mod graph;
pub mod persist;
pub mod report;

// Re-export main types
pub use catalog::{DeviceCatalog, DeviceTemplate, Input, Library, PortRegistry, Validator};
pub use config::Settings;
pub use core::{DeviceGraphError, Workspace};
pub use eval::{ExprResolver, RuleResolver, StateEvaluator, TickDriver, TickReport};
pub use graph::{BindOutcome, ConnectionBinder, Endpoint, Graph, Node, Position};
pub use persist::SchemeCodec;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BindOutcome, DeviceGraphError, Endpoint, Graph, Position, Settings, TickReport, Workspace,
    };
}
