//! Port Registry
//!
//! The set of port-type tokens declared by the `connections` category. It is
//! derived wholesale from a catalog; there is no incremental update.

use std::collections::BTreeSet;

use super::loader::DeviceCatalog;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRegistry {
    ports: BTreeSet<String>,
}

impl PortRegistry {
    /// Collect the port-type suffix of every input of every connection template.
    pub fn from_catalog(catalog: &DeviceCatalog) -> Self {
        let mut ports = BTreeSet::new();

        let Some(connections) = catalog.connections() else {
            tracing::warn!("No connections category; every port type is unknown");
            return Self { ports };
        };

        for (id, device) in connections {
            if device.inputs.len() != 2 {
                tracing::warn!(
                    "Connection {} declares {} inputs instead of 2, ignored",
                    id,
                    device.inputs.len()
                );
                continue;
            }

            for input in &device.inputs {
                let port = input.port_type();
                if port.is_empty() {
                    tracing::warn!("Connection {} input {:?} has no port type", id, input.name);
                    continue;
                }
                ports.insert(port.to_string());
            }
        }

        Self { ports }
    }

    pub fn contains(&self, port: &str) -> bool {
        self.ports.contains(port)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ports.iter().map(|p| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PortRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().map(Into::into).collect(),
        }
    }
}
