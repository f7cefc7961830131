//! Launch/schedule prompt wizard.
//!
//! Each step owns its slice of [`PromptValues`]: it seeds initial values,
//! validates them and reports whether it can be shown yet. The wizard
//! composes the steps a launch configuration asks for.

pub mod credentials;
pub mod inventory;
pub mod other;
pub mod passwords;
pub mod payload;
pub mod preview;
pub mod survey;
pub mod wizard;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::api::models::{Credential, NamedRef};
use crate::error::{ErrorMessage, FieldErrors};

pub use payload::{LaunchPayload, PASSWORD_MASK, build_launch_payload, mask_passwords, merge_extra_vars};
pub use wizard::PromptWizard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepId {
    Inventory,
    Credentials,
    CredentialPasswords,
    OtherPrompts,
    Survey,
    Preview,
}

impl StepId {
    pub fn name(&self) -> &'static str {
        match self {
            StepId::Inventory => "Inventory",
            StepId::Credentials => "Credentials",
            StepId::CredentialPasswords => "Credential passwords",
            StepId::OtherPrompts => "Other Prompts",
            StepId::Survey => "Survey",
            StepId::Preview => "Preview",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the user can answer across all steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PromptValues {
    pub inventory: Option<NamedRef>,
    pub credentials: Vec<Credential>,
    /// Keyed like the launch payload: `ssh_password`, `vault_password.<id>`...
    pub credential_passwords: BTreeMap<String, String>,
    pub job_type: Option<String>,
    pub limit: Option<String>,
    pub scm_branch: Option<String>,
    pub job_tags: Option<String>,
    pub skip_tags: Option<String>,
    pub verbosity: Option<i64>,
    pub diff_mode: Option<bool>,
    /// Free-text YAML or JSON.
    pub extra_vars: String,
    /// Survey answers by variable name.
    pub survey: Map<String, Value>,
}

/// One page of the wizard.
pub trait PromptStep: Send + Sync {
    fn id(&self) -> StepId;

    fn name(&self) -> &'static str {
        self.id().name()
    }

    /// Writes this step's defaults into `values`.
    fn initial_values(&self, values: &mut PromptValues);

    fn validate(&self, values: &PromptValues) -> FieldErrors;

    /// False while the step still waits on a fetch.
    fn is_ready(&self) -> bool {
        true
    }

    fn content_error(&self) -> Option<&ErrorMessage> {
        None
    }

    /// Whether the step applies to the current answers.
    fn is_visible(&self, _values: &PromptValues) -> bool {
        true
    }
}
