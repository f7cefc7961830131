use crate::error::FieldErrors;
use crate::prompt::{PromptStep, PromptValues, StepId};

/// Read-only summary; the rendered body comes from [`crate::prompt::payload::preview`].
pub struct PreviewStep;

impl PromptStep for PreviewStep {
    fn id(&self) -> StepId {
        StepId::Preview
    }

    fn initial_values(&self, _values: &mut PromptValues) {}

    fn validate(&self, _values: &PromptValues) -> FieldErrors {
        FieldErrors::new()
    }
}
