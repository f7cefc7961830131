use std::collections::HashSet;

use crate::api::models::{Credential, DefaultCredential, Id, LaunchConfig};
use crate::error::FieldErrors;
use crate::prompt::{PromptStep, PromptValues, StepId};

pub struct CredentialsStep {
    defaults: Vec<DefaultCredential>,
}

impl CredentialsStep {
    pub fn new(config: &LaunchConfig) -> Self {
        Self {
            defaults: config.defaults.credentials.clone(),
        }
    }
}

impl From<&DefaultCredential> for Credential {
    fn from(d: &DefaultCredential) -> Self {
        Credential {
            id: d.id,
            name: d.name.clone(),
            credential_type: d.credential_type,
            ..Default::default()
        }
    }
}

/// Vault id of a vault credential; `Some("")` for a vault without one.
pub fn vault_id(credential: &Credential) -> Option<String> {
    let inputs = credential.inputs.as_ref();
    let is_vault = credential.kind.as_deref() == Some("vault")
        || inputs.is_some_and(|i| i.contains_key("vault_id") || i.contains_key("vault_password"));
    if !is_vault {
        return None;
    }
    Some(
        inputs
            .and_then(|i| i.get("vault_id"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    )
}

impl PromptStep for CredentialsStep {
    fn id(&self) -> StepId {
        StepId::Credentials
    }

    fn initial_values(&self, values: &mut PromptValues) {
        values.credentials = self.defaults.iter().map(Credential::from).collect();
    }

    /// At most one credential per type. Vault credentials may repeat as long
    /// as their vault ids differ.
    fn validate(&self, values: &PromptValues) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let mut types: HashSet<Id> = HashSet::new();
        let mut vaults: HashSet<String> = HashSet::new();

        for credential in &values.credentials {
            let duplicate = match vault_id(credential) {
                Some(id) => !vaults.insert(id),
                None => credential.credential_type.is_some_and(|t| !types.insert(t)),
            };
            if duplicate {
                errors.insert(
                    "credentials".to_string(),
                    format!("Cannot assign multiple credentials of the same type ({})", credential.name),
                );
                break;
            }
        }
        errors
    }
}
