use crate::api::models::LaunchConfig;
use crate::error::FieldErrors;
use crate::prompt::{PromptStep, PromptValues, StepId};

pub struct InventoryStep {
    config: LaunchConfig,
}

impl InventoryStep {
    pub fn new(config: &LaunchConfig) -> Self {
        Self { config: config.clone() }
    }
}

impl PromptStep for InventoryStep {
    fn id(&self) -> StepId {
        StepId::Inventory
    }

    fn initial_values(&self, values: &mut PromptValues) {
        values.inventory = self.config.defaults.inventory.clone();
    }

    fn validate(&self, values: &PromptValues) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if values.inventory.is_none() {
            errors.insert("inventory".to_string(), "An inventory must be selected".to_string());
        }
        errors
    }
}
