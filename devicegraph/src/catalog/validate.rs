//! Validation of newly authored device templates.
//!
//! Only applied when a user adds a device; templates already in a category
//! file are trusted as loaded.

use thiserror::Error;

use super::ports::PortRegistry;
use super::schema::{DeviceTemplate, MAX_INPUTS};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("too many inputs: {0} (at most {})", MAX_INPUTS - 1)]
    TooManyInputs(usize),

    #[error("input {input:?} uses unknown port type {port:?}")]
    UnknownPortType { input: String, port: String },
}

pub struct Validator;

impl Validator {
    /// Check a template against the known port types.
    pub fn check(template: &DeviceTemplate, ports: &PortRegistry) -> Result<(), ValidationError> {
        if template.inputs.len() >= MAX_INPUTS {
            return Err(ValidationError::TooManyInputs(template.inputs.len()));
        }

        for input in &template.inputs {
            let port = input.port_type();
            if !ports.contains(port) {
                return Err(ValidationError::UnknownPortType {
                    input: input.name.clone(),
                    port: port.to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn validate(template: &DeviceTemplate, ports: &PortRegistry) -> bool {
        Self::check(template, ports).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::Input;

    fn template_with_inputs(count: usize, port: &str) -> DeviceTemplate {
        DeviceTemplate {
            id: "t".to_string(),
            name: "test".to_string(),
            inputs: (0..count).map(|i| Input::new(format!("in{}:{}", i, port))).collect(),
            ..DeviceTemplate::default()
        }
    }

    #[test]
    fn test_accepts_known_ports() {
        let ports: PortRegistry = ["power"].into_iter().collect();
        assert!(Validator::validate(&template_with_inputs(25, "power"), &ports));
        assert!(Validator::validate(&template_with_inputs(0, "power"), &ports));
    }

    #[test]
    fn test_rejects_26_inputs() {
        let ports: PortRegistry = ["power"].into_iter().collect();
        assert_eq!(
            Validator::check(&template_with_inputs(26, "power"), &ports),
            Err(ValidationError::TooManyInputs(26))
        );
    }

    #[test]
    fn test_rejects_unknown_port() {
        let ports: PortRegistry = ["power"].into_iter().collect();
        let err = Validator::check(&template_with_inputs(1, "hydraulic"), &ports).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownPortType { ref port, .. } if port == "hydraulic"));
    }

    #[test]
    fn test_rejects_input_without_port() {
        let ports: PortRegistry = ["power"].into_iter().collect();
        let mut template = template_with_inputs(0, "power");
        template.inputs.push(Input::new("bare"));
        assert!(!Validator::validate(&template, &ports));
    }
}
