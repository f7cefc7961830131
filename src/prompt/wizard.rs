use std::collections::{BTreeMap, HashSet};

use tracing::{debug, info};

use crate::api::client::ApiClient;
use crate::api::endpoints::ResourceKind;
use crate::api::models::{Id, LaunchConfig, Survey};
use crate::error::{ConsoleError, FieldErrors, Result};
use crate::prompt::credentials::CredentialsStep;
use crate::prompt::inventory::InventoryStep;
use crate::prompt::other::OtherPromptsStep;
use crate::prompt::passwords::CredentialPasswordsStep;
use crate::prompt::payload::{LaunchPayload, build_launch_payload};
use crate::prompt::preview::PreviewStep;
use crate::prompt::survey::SurveyStep;
use crate::prompt::{PromptStep, PromptValues, StepId};

/// Multi-step launch prompt.
///
/// Steps are composed once from the launch configuration; the credential
/// password step additionally shows only while the selected credentials need
/// passwords. Moving away from a step marks it visited and validates it.
pub struct PromptWizard {
    config: LaunchConfig,
    steps: Vec<Box<dyn PromptStep>>,
    survey: Option<Survey>,
    pub values: PromptValues,
    current: StepId,
    visited: HashSet<StepId>,
    errors: BTreeMap<StepId, FieldErrors>,
}

impl PromptWizard {
    pub fn new(config: LaunchConfig, survey: Option<SurveyStep>) -> Self {
        let loaded = survey.as_ref().and_then(|s| s.survey().cloned());
        let mut steps: Vec<Box<dyn PromptStep>> = Vec::new();
        if config.ask_inventory_on_launch {
            steps.push(Box::new(InventoryStep::new(&config)));
        }
        if config.ask_credential_on_launch {
            steps.push(Box::new(CredentialsStep::new(&config)));
        }
        // Visibility is decided later from the selected credentials.
        steps.push(Box::new(CredentialPasswordsStep::new(&config)));
        if config.asks_other_prompts() {
            steps.push(Box::new(OtherPromptsStep::new(&config)));
        }
        if config.survey_enabled {
            steps.push(Box::new(survey.unwrap_or_else(SurveyStep::pending)));
        }
        steps.push(Box::new(PreviewStep));

        let mut values = PromptValues::default();
        for step in &steps {
            step.initial_values(&mut values);
        }

        let mut wizard = Self {
            config,
            steps,
            survey: loaded,
            values,
            current: StepId::Preview,
            visited: HashSet::new(),
            errors: BTreeMap::new(),
        };
        if let Some(first) = wizard.step_ids().first() {
            wizard.current = *first;
        }
        wizard
    }

    /// Reads the launch configuration (and survey when enabled) and builds the wizard.
    pub async fn load(client: &ApiClient, template: ResourceKind, id: Id) -> Result<Self> {
        let config = client.read_launch_config(template, id).await?;
        let survey = if config.survey_enabled {
            Some(SurveyStep::load(client, template, id).await)
        } else {
            None
        };
        let wizard = Self::new(config, survey);
        debug!(template_id = id, steps = ?wizard.step_ids(), "Composed prompt wizard");
        Ok(wizard)
    }

    /// Swaps in a freshly loaded survey. Answers from the old survey are dropped.
    pub fn replace_survey(&mut self, survey: SurveyStep) {
        let Some(slot) = self.steps.iter().position(|s| s.id() == StepId::Survey) else {
            return;
        };
        self.values.survey.clear();
        survey.initial_values(&mut self.values);
        self.survey = survey.survey().cloned();
        self.steps[slot] = Box::new(survey);
        self.errors.remove(&StepId::Survey);
    }

    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    pub fn steps(&self) -> Vec<&dyn PromptStep> {
        self.steps
            .iter()
            .filter(|s| s.is_visible(&self.values))
            .map(|s| s.as_ref())
            .collect()
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.steps().iter().map(|s| s.id()).collect()
    }

    fn step(&self, id: StepId) -> Option<&dyn PromptStep> {
        self.steps.iter().find(|s| s.id() == id).map(|s| s.as_ref())
    }

    pub fn current(&self) -> StepId {
        self.current
    }

    pub fn is_visited(&self, id: StepId) -> bool {
        self.visited.contains(&id)
    }

    pub fn errors(&self, id: StepId) -> Option<&FieldErrors> {
        self.errors.get(&id)
    }

    /// Error marker next to a step title: only for visited steps.
    pub fn step_has_error(&self, id: StepId) -> bool {
        self.is_visited(id) && self.errors.get(&id).is_some_and(|e| !e.is_empty())
    }

    pub fn survey(&self) -> Option<&Survey> {
        self.survey.as_ref()
    }

    fn validate_step(&mut self, id: StepId) -> bool {
        let errors = self.step(id).map(|s| s.validate(&self.values)).unwrap_or_default();
        let ok = errors.is_empty();
        self.errors.insert(id, errors);
        ok
    }

    fn leave_current(&mut self) -> bool {
        let current = self.current;
        self.visited.insert(current);
        self.validate_step(current)
    }

    pub fn enable_next(&self) -> bool {
        let Some(step) = self.step(self.current) else {
            return false;
        };
        step.is_ready() && step.content_error().is_none() && step.validate(&self.values).is_empty()
    }

    /// Advances one step. Stays put when the current step is not ready or invalid.
    pub fn next(&mut self) -> bool {
        let ok = self.leave_current();
        let ready = self.step(self.current).is_some_and(|s| s.is_ready() && s.content_error().is_none());
        if !ok || !ready {
            return false;
        }
        // Step ids sort in display order, so this also works when the current
        // step just became hidden.
        match self.step_ids().into_iter().find(|s| *s > self.current) {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    /// Going back is always allowed.
    pub fn back(&mut self) -> bool {
        self.leave_current();
        match self.step_ids().into_iter().rev().find(|s| *s < self.current) {
            Some(prev) => {
                self.current = prev;
                true
            }
            None => false,
        }
    }

    /// Jumps to a step. Backward jumps always succeed; forward jumps need the
    /// current step and every step in between to be valid.
    pub fn go_to(&mut self, target: StepId) -> bool {
        let ids = self.step_ids();
        if !ids.contains(&target) {
            return false;
        }
        let ok = self.leave_current();
        if target <= self.current {
            self.current = target;
            return true;
        }
        if !ok {
            return false;
        }
        let blocked = ids
            .iter()
            .filter(|id| **id > self.current && **id < target)
            .any(|id| {
                self.step(*id)
                    .is_some_and(|s| !s.is_ready() || !s.validate(&self.values).is_empty())
            });
        if blocked {
            return false;
        }
        self.current = target;
        true
    }

    /// Validates every visible step and builds the launch payload.
    pub fn submit(&mut self) -> Result<LaunchPayload> {
        let ids = self.step_ids();
        let mut all = FieldErrors::new();
        for id in &ids {
            self.visited.insert(*id);
            self.validate_step(*id);
            if let Some(errors) = self.errors.get(id) {
                all.extend(errors.clone());
            }
            if let Some(e) = self.step(*id).and_then(|s| s.content_error()) {
                return Err(ConsoleError::Content(e.message.clone()));
            }
        }
        if !all.is_empty() {
            return Err(ConsoleError::Validation(all));
        }
        let payload = build_launch_payload(&self.config, &self.values, self.survey())?;
        info!(steps = ids.len(), "Prompt wizard submitted");
        Ok(payload)
    }
}
