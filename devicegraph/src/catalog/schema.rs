//! Device Template Schema
//!
//! Plain data types shared by the catalog, the graph store and the scheme
//! codec. A template is copied verbatim into every node placed from it, so
//! everything here is `Clone` and serde-serializable.

use serde::{Deserialize, Serialize};

/// Identifier of a template inside its category file (`id:` line).
pub type DeviceId = String;

/// Identifier of a placed node.
pub type NodeId = String;

/// Identifier of a realized wiring edge.
pub type LinkId = String;

/// Name of a category (the category file name).
pub type CategoryName = String;

/// The category whose templates declare which port types may be wired together.
pub const CONNECTIONS_CATEGORY: &str = "connections";

/// Inputs are bound to the letters `a..=z` during evaluation.
pub const MAX_INPUTS: usize = 26;

/// Split `value` at the first `:`.
///
/// Returns two empty halves when there is no separator, so a malformed
/// input name never yields a usable port type.
pub fn split_pair(value: &str) -> (&str, &str) {
    match value.find(':') {
        Some(pos) => (&value[..pos], &value[pos + 1..]),
        None => ("", ""),
    }
}

/// A single socket on a device. `name` encodes `label:porttype`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub name: String,

    /// The link this input participates in, if any.
    #[serde(default)]
    pub link: Option<LinkId>,
}

impl Input {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            link: None,
        }
    }

    /// "On" means connected; no signal value is involved.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn label(&self) -> &str {
        split_pair(&self.name).0
    }

    pub fn port_type(&self) -> &str {
        split_pair(&self.name).1
    }

    pub(crate) fn reset(&mut self) {
        self.link = None;
    }
}

/// A reusable device definition from a category file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceTemplate {
    pub id: DeviceId,
    pub name: String,
    pub inputs: Vec<Input>,
    pub rule: String,
    #[serde(default)]
    pub power: f64,
}

impl DeviceTemplate {
    /// Returns the `id:` value if `line` is an id line.
    pub fn id_param(line: &str) -> Option<&str> {
        let (key, value) = split_pair(line);
        (key == "id").then_some(value)
    }

    /// Apply one `key:value` line to this template. Unknown keys are ignored.
    pub fn parse_param(&mut self, line: &str) {
        let (key, value) = split_pair(line);
        match key {
            "id" => self.id = value.to_string(),
            "name" => self.name = value.to_string(),
            "input" => self.inputs.push(Input::new(value.to_lowercase())),
            "rule" => self.rule = value.to_lowercase(),
            "pwr" => match value.trim().parse::<f64>() {
                Ok(power) if power.is_finite() => self.power = power,
                Ok(power) => {
                    tracing::warn!("Device {}: pwr value {} is not finite, using 0", self.id, power);
                }
                Err(e) => {
                    tracing::warn!("Device {}: bad pwr value {:?}: {}", self.id, value, e);
                }
            },
            _ => {}
        }
    }

    /// Human-readable description used by listings and the device report.
    pub fn describe(&self) -> String {
        let mut descr = String::new();
        descr.push_str(&format!("Device name: {}\n", self.name));
        descr.push_str("Device I/O\n");
        descr.push_str("//============\n");
        for input in &self.inputs {
            descr.push_str(&input.name);
            descr.push('\n');
        }
        descr.push_str("//============\n");
        descr
    }

    /// The `key:value` form written back into a category file.
    pub fn storage_description(&self) -> String {
        let mut descr = String::new();
        descr.push_str(&format!("id:{}\n", self.id));
        descr.push_str(&format!("name:{}\n", self.name));
        for input in &self.inputs {
            descr.push_str(&format!("input:{}\n", input.name));
        }
        descr.push_str(&format!("pwr:{}\n", self.power));
        descr.push_str(&format!("rule:{}", self.rule));
        descr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pair() {
        assert_eq!(split_pair("in1:power"), ("in1", "power"));
        assert_eq!(split_pair("a:b:c"), ("a", "b:c"));
        assert_eq!(split_pair("nocolon"), ("", ""));
    }

    #[test]
    fn test_parse_param_folds_case() {
        let mut dev = DeviceTemplate::default();
        dev.parse_param("name:AND Gate");
        dev.parse_param("input:In1:Power");
        dev.parse_param("rule:A&B");
        dev.parse_param("pwr:2.5");
        dev.parse_param("color:red");

        assert_eq!(dev.name, "AND Gate");
        assert_eq!(dev.inputs[0].name, "in1:power");
        assert_eq!(dev.inputs[0].port_type(), "power");
        assert_eq!(dev.rule, "a&b");
        assert_eq!(dev.power, 2.5);
    }

    #[test]
    fn test_non_finite_pwr_is_ignored() {
        for value in ["inf", "-inf", "NaN", "nan"] {
            let mut dev = DeviceTemplate::default();
            dev.parse_param(&format!("pwr:{}", value));
            assert_eq!(dev.power, 0.0, "pwr:{}", value);
        }

        let mut dev = DeviceTemplate::default();
        dev.parse_param("pwr:3");
        dev.parse_param("pwr:inf");
        assert_eq!(dev.power, 3.0);
    }

    #[test]
    fn test_bad_power_keeps_default() {
        let mut dev = DeviceTemplate::default();
        dev.parse_param("pwr:lots");
        assert_eq!(dev.power, 0.0);
    }

    #[test]
    fn test_storage_description_reparses() {
        let mut dev = DeviceTemplate::default();
        for line in ["id:g1", "name:AND", "input:in1:power", "input:in2:power", "pwr:0.5", "rule:a&b"] {
            dev.parse_param(line);
        }

        let mut copy = DeviceTemplate::default();
        for line in dev.storage_description().lines() {
            copy.parse_param(line);
        }
        assert_eq!(copy, dev);
    }

    #[test]
    fn test_describe_lists_inputs() {
        let mut dev = DeviceTemplate::default();
        dev.parse_param("name:AND");
        dev.parse_param("input:in1:power");
        let text = dev.describe();
        assert!(text.starts_with("Device name: AND\n"));
        assert!(text.contains("in1:power\n"));
    }
}
