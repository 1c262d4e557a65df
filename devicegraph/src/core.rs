//! Core editing API shared by the CLI and embedding applications.
//! No UI or scheduler dependencies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{self, CatalogError, DeviceTemplate, Library, LinkId, NodeId};
use crate::config::Settings;
use crate::eval::{ExprResolver, RuleResolver, StateEvaluator, TickReport};
use crate::graph::{BindOutcome, ConnectionBinder, Endpoint, Graph, GraphError, Node, Position};
use crate::persist::{with_extension, PersistError, SchemeCodec};
use crate::report;

#[derive(Debug, thiserror::Error)]
pub enum DeviceGraphError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("Scheme error: {0}")]
    Scheme(#[from] PersistError),
    #[error("Unknown device {device:?} in category {category:?}")]
    UnknownDevice { category: String, device: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A working graph together with the catalog snapshot it is edited against.
pub struct Workspace<R = ExprResolver> {
    settings: Settings,
    library: Arc<Library>,
    graph: Graph,
    evaluator: StateEvaluator<R>,
}

impl Workspace<ExprResolver> {
    /// Load the catalog from `settings.data_dir` and start with an empty graph.
    pub fn open(settings: Settings) -> Self {
        Self::with_resolver(settings, ExprResolver)
    }
}

impl<R: RuleResolver> Workspace<R> {
    pub fn with_resolver(settings: Settings, resolver: R) -> Self {
        let library = Arc::new(Library::load(&settings.data_dir));
        Self {
            settings,
            library,
            graph: Graph::new(),
            evaluator: StateEvaluator::new(resolver),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The current catalog snapshot.
    pub fn library(&self) -> Arc<Library> {
        Arc::clone(&self.library)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn evaluator(&self) -> &StateEvaluator<R> {
        &self.evaluator
    }

    /// Rebuild catalog and port registry from disk and swap them in.
    pub fn reload_library(&mut self) {
        self.library = Arc::new(Library::load(&self.settings.data_dir));
    }

    pub fn add_node(&mut self, category: &str, device: &str, position: Position) -> Result<NodeId, DeviceGraphError> {
        let template = self
            .library
            .catalog
            .template(category, device)
            .ok_or_else(|| DeviceGraphError::UnknownDevice {
                category: category.to_string(),
                device: device.to_string(),
            })?;
        Ok(self.graph.add_node(category, template, position))
    }

    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), DeviceGraphError> {
        Ok(self.graph.move_node(id, position)?)
    }

    pub fn delete_node(&mut self, id: &str) -> Result<Node, DeviceGraphError> {
        Ok(self.graph.delete_node(id)?)
    }

    pub fn bind(&mut self, a: Endpoint, b: Endpoint) -> Result<BindOutcome, DeviceGraphError> {
        let binder = ConnectionBinder::new(&self.library.catalog);
        Ok(binder.bind(&mut self.graph, a, b)?)
    }

    pub fn unbind(&mut self, node: &str, input: usize) -> Result<Option<LinkId>, DeviceGraphError> {
        let binder = ConnectionBinder::new(&self.library.catalog);
        Ok(binder.unbind(&mut self.graph, node, input)?)
    }

    pub fn clear(&mut self) {
        self.graph.clear();
    }

    /// One evaluation pass over the whole graph.
    pub fn tick(&self) -> TickReport {
        self.evaluator.tick(&self.graph)
    }

    pub fn save_scheme(&self, path: &Path) -> Result<PathBuf, DeviceGraphError> {
        Ok(SchemeCodec::save_to_file(path, &self.graph, &self.settings.scheme_extension)?)
    }

    /// Replace the graph with the scheme at `path`. On failure the current
    /// graph is kept as it was.
    pub fn load_scheme(&mut self, path: &Path) -> Result<(), DeviceGraphError> {
        let graph = SchemeCodec::load_from_file(path, &self.settings.scheme_extension)?;
        self.graph = graph;
        Ok(())
    }

    pub fn write_report(&self, path: &Path) -> Result<PathBuf, DeviceGraphError> {
        let path = with_extension(path, &self.settings.report_extension);
        report::write_report(&path, &self.graph)?;
        Ok(path)
    }

    /// Validate and append a new device to `category`, then reload the catalog.
    pub fn author_device(&mut self, category: &str, description: &str) -> Result<DeviceTemplate, DeviceGraphError> {
        let device = self
            .library
            .catalog
            .append_device(category, description, &self.library.ports)?;
        self.reload_library();
        Ok(device)
    }

    pub fn create_category(&mut self, name: &str) -> Result<PathBuf, DeviceGraphError> {
        let path = catalog::create_category(&self.settings.data_dir, name)?;
        self.reload_library();
        Ok(path)
    }
}
