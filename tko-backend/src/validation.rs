//! Package validation
//!
//! The backend decides when to validate and whether validation is partial
//! or complete; the rules themselves come from whoever implements
//! [`Validation`]. [`RegistryValidation`] runs in-process validators keyed by
//! GVK.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tko_core::domain::deployment::deployment_resource_identifier;
use tko_core::resource::annotations::Directive;
use tko_core::{Gvk, Resource, Result, TkoError};
use tracing::debug;

/// Validates packages on their way into a store
#[async_trait]
pub trait Validation: Send + Sync {
    /// `complete` is requested for packages that claim to be fully prepared
    async fn validate_package(&self, package: &[Resource], complete: bool) -> Result<()>;
}

/// Validator for one resource of a registered GVK
pub trait ResourceValidator: Send + Sync {
    fn validate(&self, resource: &Resource, complete: bool) -> std::result::Result<(), String>;
}

impl<F> ResourceValidator for F
where
    F: Fn(&Resource, bool) -> std::result::Result<(), String> + Send + Sync,
{
    fn validate(&self, resource: &Resource, complete: bool) -> std::result::Result<(), String> {
        self(resource, complete)
    }
}

/// Validation backed by an in-process registry
///
/// Every resource is checked by the validators registered for its GVK. A
/// complete validation also requires every resource that must be prepared
/// here to carry the prepared annotation. All failures are reported together.
#[derive(Clone, Default)]
pub struct RegistryValidation {
    validators: HashMap<Gvk, Vec<Arc<dyn ResourceValidator>>>,
}

impl RegistryValidation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gvk: Gvk, validator: impl ResourceValidator + 'static) {
        self.validators
            .entry(gvk)
            .or_default()
            .push(Arc::new(validator));
    }

    pub fn with_validator(mut self, gvk: Gvk, validator: impl ResourceValidator + 'static) -> Self {
        self.register(gvk, validator);
        self
    }

    fn validate_resource(&self, resource: &Resource, complete: bool, errors: &mut Vec<String>) {
        let Some(identifier) = resource.identifier() else {
            errors.push("resource without apiVersion, kind, or metadata.name".to_string());
            return;
        };

        if complete
            && identifier != deployment_resource_identifier()
            && resource.prepare_directive() == Some(Directive::Here)
            && !resource.is_prepared()
        {
            errors.push(format!("not prepared: {}", identifier));
        }

        if let Some(validators) = self.validators.get(&identifier.gvk) {
            for validator in validators {
                if let Err(message) = validator.validate(resource, complete) {
                    errors.push(format!("{}: {}", identifier, message));
                }
            }
        }
    }
}

#[async_trait]
impl Validation for RegistryValidation {
    async fn validate_package(&self, package: &[Resource], complete: bool) -> Result<()> {
        debug!(
            "Validating {} resource(s) ({})",
            package.len(),
            if complete { "complete" } else { "partial" }
        );

        let mut errors = Vec::new();
        for resource in package {
            self.validate_resource(resource, complete, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TkoError::bad_argument(format!(
                "validation: {}",
                errors.join("; ")
            )))
        }
    }
}
