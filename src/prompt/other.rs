use serde_json::Value;

use crate::api::models::LaunchConfig;
use crate::error::FieldErrors;
use crate::prompt::payload::merge_extra_vars;
use crate::prompt::{PromptStep, PromptValues, StepId};

pub const JOB_TYPES: [&str; 2] = ["run", "check"];
pub const MAX_VERBOSITY: i64 = 5;

/// Job type, limit, branch, tags, verbosity, diff mode and extra variables.
pub struct OtherPromptsStep {
    config: LaunchConfig,
}

impl OtherPromptsStep {
    pub fn new(config: &LaunchConfig) -> Self {
        Self { config: config.clone() }
    }
}

/// Renders template default extra vars (string or mapping) as editable text.
fn extra_vars_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) if map.is_empty() => String::new(),
        Some(other) => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

impl PromptStep for OtherPromptsStep {
    fn id(&self) -> StepId {
        StepId::OtherPrompts
    }

    fn initial_values(&self, values: &mut PromptValues) {
        let c = &self.config;
        let d = &c.defaults;
        if c.ask_job_type_on_launch {
            values.job_type = d.job_type.clone().or_else(|| Some("run".to_string()));
        }
        if c.ask_limit_on_launch {
            values.limit = d.limit.clone();
        }
        if c.ask_scm_branch_on_launch {
            values.scm_branch = d.scm_branch.clone();
        }
        if c.ask_tags_on_launch {
            values.job_tags = d.job_tags.clone();
        }
        if c.ask_skip_tags_on_launch {
            values.skip_tags = d.skip_tags.clone();
        }
        if c.ask_verbosity_on_launch {
            values.verbosity = d.verbosity.or(Some(0));
        }
        if c.ask_diff_mode_on_launch {
            values.diff_mode = d.diff_mode.or(Some(false));
        }
        if c.ask_variables_on_launch {
            values.extra_vars = extra_vars_text(d.extra_vars.as_ref());
        }
    }

    fn validate(&self, values: &PromptValues) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let c = &self.config;

        if c.ask_job_type_on_launch {
            match values.job_type.as_deref() {
                Some(t) if JOB_TYPES.contains(&t) => {}
                _ => {
                    errors.insert("job_type".to_string(), "Select a valid job type".to_string());
                }
            }
        }
        if c.ask_verbosity_on_launch {
            if let Some(v) = values.verbosity {
                if !(0..=MAX_VERBOSITY).contains(&v) {
                    errors.insert("verbosity".to_string(), format!("Verbosity must be between 0 and {}", MAX_VERBOSITY));
                }
            }
        }
        if c.ask_variables_on_launch && merge_extra_vars(&values.extra_vars, None).is_err() {
            errors.insert(
                "extra_vars".to_string(),
                "Extra variables must be a valid YAML or JSON mapping".to_string(),
            );
        }
        errors
    }
}
