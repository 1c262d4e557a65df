//! Device Catalog Module
//!
//! Category files, the port registry derived from them, and validation of
//! newly authored devices. A [`Library`] bundles a catalog with its registry
//! so both are always rebuilt together.

pub mod loader;
pub mod ports;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use loader::{create_category, CatalogError, Category, DeviceCatalog};
pub use ports::PortRegistry;
pub use schema::*;
pub use validate::{ValidationError, Validator};

/// An immutable catalog snapshot together with its port registry.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub catalog: DeviceCatalog,
    pub ports: PortRegistry,
}

impl Library {
    pub fn from_catalog(catalog: DeviceCatalog) -> Self {
        let ports = PortRegistry::from_catalog(&catalog);
        Self { catalog, ports }
    }

    /// Load all category files in `dir` and derive the port registry.
    pub fn load(dir: &Path) -> Self {
        Self::from_catalog(DeviceCatalog::load_dir(dir))
    }
}
