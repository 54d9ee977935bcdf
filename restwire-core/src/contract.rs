//! # Contract Metadata
//!
//! This module holds the static description of the services the client talks to.
//!
//! A contract is described once, as plain data, by implementing [`Contract`]. The resulting
//! [`ContractDescriptor`] answers the two questions the call translator needs:
//!
//! * Which [`ServiceDescriptor`] (base route, version, auth requirement) applies to the contract.
//! * Which [`ActionDescriptor`] (route template, verb, bindings, return shape) applies to an
//!   operation.
//!
//! Lookups are deterministic and have no side effects, so a descriptor is built once and
//! shared behind an `Arc` by every [`crate::RestService`] created for the contract.
mod descriptor;

pub use descriptor::*;

/// Errors raised when a contract lacks the metadata required to translate a call.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("Contract '{0}' has no service descriptor")]
    ServiceMissing(String),
    #[error("Contract '{contract}' has no action descriptor for operation '{action}'")]
    ActionMissing { contract: String, action: String },
}

/// A service contract described as data.
///
/// This replaces runtime attribute discovery: implementors return the full descriptor table
/// of the contract, usually from a generated or hand-written function.
pub trait Contract: Send + Sync + 'static {
    fn descriptor() -> ContractDescriptor;
}

/// The descriptor table of one contract: its service metadata and its operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDescriptor {
    name: String,
    service: Option<ServiceDescriptor>,
    actions: Vec<ActionDescriptor>,
}

impl ContractDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service: None,
            actions: Vec::new(),
        }
    }

    pub fn service(mut self, service: ServiceDescriptor) -> Self {
        self.service = Some(service);
        self
    }

    /// Registers an operation. A later action with the same name replaces the earlier one.
    pub fn action(mut self, action: ActionDescriptor) -> Self {
        self.actions.retain(|a| a.name != action.name);
        self.actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the service descriptor of the contract.
    ///
    /// # Returns
    ///
    /// * `Ok(&ServiceDescriptor)` - The service metadata.
    /// * `Err(MetadataError::ServiceMissing)` - If the contract was described without one.
    pub fn service_descriptor(&self) -> Result<&ServiceDescriptor, MetadataError> {
        self.service
            .as_ref()
            .ok_or_else(|| MetadataError::ServiceMissing(self.name.clone()))
    }

    /// Looks up the descriptor of an operation by name.
    ///
    /// # Returns
    ///
    /// * `Ok(&ActionDescriptor)` - The operation metadata.
    /// * `Err(MetadataError::ActionMissing)` - If the contract has no such operation.
    pub fn action_descriptor(&self, action: &str) -> Result<&ActionDescriptor, MetadataError> {
        self.actions
            .iter()
            .find(|a| a.name == action)
            .ok_or_else(|| MetadataError::ActionMissing {
                contract: self.name.clone(),
                action: action.to_string(),
            })
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionDescriptor> {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> ContractDescriptor {
        ContractDescriptor::new("Orders")
            .service(ServiceDescriptor::new("api/orders").version("2024-06-15"))
            .action(ActionDescriptor::get("List"))
            .action(ActionDescriptor::delete("Cancel").route("{id}").success_only())
    }

    #[test]
    fn resolves_service_and_actions() {
        let contract = orders();

        let service = contract.service_descriptor().unwrap();
        assert_eq!(service.base_route, "api/orders");
        assert_eq!(service.version.as_deref(), Some("2024-06-15"));

        let cancel = contract.action_descriptor("Cancel").unwrap();
        assert_eq!(cancel.method, HttpMethod::Delete);
        assert!(cancel.return_is_success_only);
        assert_eq!(contract.actions().count(), 2);
    }

    #[test]
    fn missing_service_is_reported() {
        let contract = ContractDescriptor::new("Bare").action(ActionDescriptor::get("List"));

        assert_eq!(
            contract.service_descriptor(),
            Err(MetadataError::ServiceMissing("Bare".to_string()))
        );
    }

    #[test]
    fn missing_action_is_reported() {
        let err = orders().action_descriptor("Create").unwrap_err();

        assert_eq!(
            err,
            MetadataError::ActionMissing {
                contract: "Orders".to_string(),
                action: "Create".to_string()
            }
        );
    }

    #[test]
    fn redeclared_action_replaces_previous_one() {
        let contract = orders().action(ActionDescriptor::post("List"));

        assert_eq!(contract.actions().count(), 2);
        assert_eq!(
            contract.action_descriptor("List").unwrap().method,
            HttpMethod::Post
        );
    }
}
