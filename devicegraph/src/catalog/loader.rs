//! Category File Loader
//!
//! Category files are line-oriented `key:value` text. An `id:<X>` line opens a
//! new template; the `name:`, `input:`, `rule:` and `pwr:` lines after it fill
//! that template until the next `id:` line. One file per category; the category
//! name is the file name up to its first `.`.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use super::ports::PortRegistry;
use super::schema::*;
use super::validate::{ValidationError, Validator};

/// Templates of one category, keyed by device id.
pub type Category = BTreeMap<DeviceId, DeviceTemplate>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category already exists: {0}")]
    CategoryExists(String),

    #[error("Invalid category name: {0:?}")]
    InvalidCategoryName(String),

    #[error("Bad device description: {0}")]
    Invalid(#[from] ValidationError),
}

/// All categories known to the editor.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    categories: BTreeMap<CategoryName, Category>,
    sources: BTreeMap<CategoryName, PathBuf>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the contents of one category file.
    ///
    /// A colliding `id:` keeps the first template and drops every line up to
    /// the next `id:`.
    pub fn parse_category(content: &str) -> Category {
        let mut category = Category::new();
        let mut current: Option<DeviceId> = None;

        for line in content.lines() {
            let line = line.trim_end();

            if let Some(id) = DeviceTemplate::id_param(line) {
                if category.contains_key(id) {
                    tracing::error!("Device id collision: {}", id);
                    current = None;
                } else {
                    category.insert(id.to_string(), DeviceTemplate::default());
                    current = Some(id.to_string());
                }
            }

            if let Some(id) = &current {
                if let Some(device) = category.get_mut(id) {
                    device.parse_param(line);
                }
            }
        }

        category
    }

    /// Load one category file. Missing or unreadable files give an empty category.
    pub fn load_category_file(path: &Path) -> Category {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse_category(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Category file {:?} does not exist", path);
                Category::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read category file {:?}: {}", path, e);
                Category::new()
            }
        }
    }

    /// Load every category file in `dir`.
    pub fn load_dir(dir: &Path) -> Self {
        let mut catalog = Self::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Failed to read data directory {:?}: {}", dir, e);
                return catalog;
            }
        };

        // Sorted so that the winner between two files of one category is stable.
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        for path in paths {
            let Some(name) = category_name(&path) else {
                continue;
            };
            if let Some(kept) = catalog.sources.get(&name) {
                tracing::warn!("Category {} is already loaded from {:?}, ignoring {:?}", name, kept, path);
                continue;
            }

            let category = Self::load_category_file(&path);
            tracing::debug!("Loaded {} devices for category {}", category.len(), name);
            catalog.categories.insert(name.clone(), category);
            catalog.sources.insert(name, path);
        }

        tracing::info!("Loaded {} categories from {:?}", catalog.categories.len(), dir);
        catalog
    }

    /// Register an in-memory category (no backing file).
    pub fn insert_category(&mut self, name: impl Into<CategoryName>, category: Category) {
        self.categories.insert(name.into(), category);
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&CategoryName, &Category)> {
        self.categories.iter()
    }

    pub fn template(&self, category: &str, id: &str) -> Option<&DeviceTemplate> {
        self.categories.get(category).and_then(|c| c.get(id))
    }

    /// The file a category was loaded from.
    pub fn source(&self, category: &str) -> Option<&Path> {
        self.sources.get(category).map(|p| p.as_path())
    }

    pub fn connections(&self) -> Option<&Category> {
        self.category(CONNECTIONS_CATEGORY)
    }

    /// First connection template (in id order) wiring the port types
    /// `a` and `b`, in either order.
    pub fn find_connection(&self, a: &str, b: &str) -> Option<&DeviceTemplate> {
        self.connections()?.values().find(|dev| {
            if dev.inputs.len() != 2 {
                return false;
            }
            let left = dev.inputs[0].port_type();
            let right = dev.inputs[1].port_type();
            (left == a && right == b) || (right == a && left == b)
        })
    }

    /// Build a new template from `description`, validate it and append it
    /// to the category's file. The catalog itself is not modified; reload it
    /// to pick up the new device.
    pub fn append_device(
        &self,
        category: &str,
        description: &str,
        ports: &PortRegistry,
    ) -> Result<DeviceTemplate, CatalogError> {
        let path = self
            .source(category)
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))?;

        let mut device = DeviceTemplate {
            id: Uuid::new_v4().to_string(),
            ..DeviceTemplate::default()
        };
        // The id is always generated here.
        for line in description.lines().map(str::trim_end) {
            if DeviceTemplate::id_param(line).is_none() {
                device.parse_param(line);
            }
        }

        if let Err(e) = Validator::check(&device, ports) {
            tracing::warn!("Bad device description for category {}: {}", category, e);
            return Err(e.into());
        }

        let mut file = OpenOptions::new().append(true).open(path)?;
        write!(file, "\n{}\n", device.storage_description())?;

        tracing::info!("Added device {} ({}) to category {}", device.id, device.name, category);
        Ok(device)
    }
}

/// Create an empty category file named after the lower-cased `name`.
pub fn create_category(dir: &Path, name: &str) -> Result<PathBuf, CatalogError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() || name.contains(&['.', '/', '\\'][..]) {
        return Err(CatalogError::InvalidCategoryName(name));
    }

    let path = dir.join(&name);
    if path.exists() {
        return Err(CatalogError::CategoryExists(name));
    }

    std::fs::write(&path, "\n")?;
    tracing::info!("Created category {} at {:?}", name, path);
    Ok(path)
}

/// Category name of a file: its name up to the first `.`. Hidden files have none.
fn category_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next().unwrap_or("");
    (!name.is_empty()).then(|| name.to_string())
}
