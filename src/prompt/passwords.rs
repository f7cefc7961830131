use crate::api::models::{Credential, LaunchConfig};
use crate::error::FieldErrors;
use crate::prompt::credentials::vault_id;
use crate::prompt::{PromptStep, PromptValues, StepId};

const ASK: &str = "ASK";

/// Password a credential defers to launch time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PasswordField {
    Ssh,
    Become,
    SshKeyUnlock,
    /// Vault password, optionally bound to a vault id.
    Vault(Option<String>),
}

impl PasswordField {
    /// Parses a `passwords_needed` entry such as `vault_password.prod`.
    pub fn parse(needed: &str) -> Option<Self> {
        match needed {
            "ssh_password" => Some(PasswordField::Ssh),
            "become_password" => Some(PasswordField::Become),
            "ssh_key_unlock" => Some(PasswordField::SshKeyUnlock),
            "vault_password" => Some(PasswordField::Vault(None)),
            other => other
                .strip_prefix("vault_password.")
                .map(|id| PasswordField::Vault(Some(id.to_string()))),
        }
    }

    /// Key under `credential_passwords` in the launch payload.
    pub fn payload_key(&self) -> String {
        match self {
            PasswordField::Ssh => "ssh_password".to_string(),
            PasswordField::Become => "become_password".to_string(),
            PasswordField::SshKeyUnlock => "ssh_key_unlock".to_string(),
            PasswordField::Vault(None) => "vault_password".to_string(),
            PasswordField::Vault(Some(id)) => format!("vault_password.{}", id),
        }
    }

    pub fn field_id(&self) -> String {
        match self {
            PasswordField::Ssh => "launch-ssh-password".to_string(),
            PasswordField::Become => "launch-privilege-escalation-password".to_string(),
            PasswordField::SshKeyUnlock => "launch-private-key-passphrase".to_string(),
            PasswordField::Vault(None) => "launch-vault-password".to_string(),
            PasswordField::Vault(Some(id)) => format!("launch-vault-password-{}", id),
        }
    }

    pub fn label(&self) -> String {
        match self {
            PasswordField::Ssh => "SSH password".to_string(),
            PasswordField::Become => "Privilege escalation password".to_string(),
            PasswordField::SshKeyUnlock => "Private key passphrase".to_string(),
            PasswordField::Vault(None) => "Vault password".to_string(),
            PasswordField::Vault(Some(id)) => format!("Vault password | {}", id),
        }
    }
}

fn asks(credential: &Credential, input: &str) -> bool {
    credential
        .inputs
        .as_ref()
        .and_then(|i| i.get(input))
        .and_then(|v| v.as_str())
        == Some(ASK)
}

/// Password fields to prompt for, in display order, without duplicates.
///
/// When credentials are fixed by the template the server's
/// `passwords_needed_to_start` decides. Otherwise each selected credential
/// contributes: ones carrying `inputs` are checked for `ASK` values, ones that
/// came from the template defaults use their `passwords_needed`.
pub fn required_passwords(config: &LaunchConfig, selected: &[Credential]) -> Vec<PasswordField> {
    let mut fields: Vec<PasswordField> = Vec::new();
    let mut push = |field: PasswordField| {
        if !fields.contains(&field) {
            fields.push(field);
        }
    };

    if !config.ask_credential_on_launch {
        for needed in &config.passwords_needed_to_start {
            if let Some(field) = PasswordField::parse(needed) {
                push(field);
            }
        }
        return fields;
    }

    for credential in selected {
        if credential.inputs.is_none() {
            let defaults = config.defaults.credentials.iter().find(|d| d.id == credential.id);
            for needed in defaults.map(|d| d.passwords_needed.as_slice()).unwrap_or_default() {
                if let Some(field) = PasswordField::parse(needed) {
                    push(field);
                }
            }
            continue;
        }
        if asks(credential, "password") {
            push(PasswordField::Ssh);
        }
        if asks(credential, "become_password") {
            push(PasswordField::Become);
        }
        if asks(credential, "ssh_key_unlock") {
            push(PasswordField::SshKeyUnlock);
        }
        if asks(credential, "vault_password") {
            let id = vault_id(credential).filter(|id| !id.is_empty());
            push(PasswordField::Vault(id));
        }
    }
    fields
}

pub struct CredentialPasswordsStep {
    config: LaunchConfig,
}

impl CredentialPasswordsStep {
    pub fn new(config: &LaunchConfig) -> Self {
        Self { config: config.clone() }
    }

    pub fn fields(&self, values: &PromptValues) -> Vec<PasswordField> {
        required_passwords(&self.config, &values.credentials)
    }
}

impl PromptStep for CredentialPasswordsStep {
    fn id(&self) -> StepId {
        StepId::CredentialPasswords
    }

    fn initial_values(&self, values: &mut PromptValues) {
        for field in self.fields(values) {
            values.credential_passwords.entry(field.payload_key()).or_default();
        }
    }

    fn validate(&self, values: &PromptValues) -> FieldErrors {
        self.fields(values)
            .into_iter()
            .filter(|f| {
                values
                    .credential_passwords
                    .get(&f.payload_key())
                    .is_none_or(|v| v.is_empty())
            })
            .map(|f| (f.payload_key(), "This field must not be blank".to_string()))
            .collect()
    }

    fn is_visible(&self, values: &PromptValues) -> bool {
        !self.fields(values).is_empty()
    }
}
