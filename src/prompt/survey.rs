use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::api::client::ApiClient;
use crate::api::endpoints::ResourceKind;
use crate::api::models::{Id, QuestionType, Survey, SurveyQuestion};
use crate::error::{ErrorMessage, FieldErrors};
use crate::prompt::{PromptStep, PromptValues, StepId};

#[derive(Debug, Clone, PartialEq)]
pub enum SurveyLoad {
    Pending,
    Loaded(Survey),
    Failed(ErrorMessage),
}

pub struct SurveyStep {
    load: SurveyLoad,
}

impl SurveyStep {
    pub fn pending() -> Self {
        Self { load: SurveyLoad::Pending }
    }

    pub fn loaded(survey: Survey) -> Self {
        Self {
            load: SurveyLoad::Loaded(survey),
        }
    }

    /// Fetches the survey. Every call produces a fresh step; nothing from an
    /// earlier load survives.
    pub async fn load(client: &ApiClient, template: ResourceKind, id: Id) -> Self {
        match client.read_survey(template, id).await {
            Ok(survey) => {
                debug!(template_id = id, questions = survey.spec.len(), "Loaded survey");
                Self::loaded(survey)
            }
            Err(e) => {
                warn!(template_id = id, error = %e, "Survey fetch failed");
                Self {
                    load: SurveyLoad::Failed(e.to_message("retrieve survey")),
                }
            }
        }
    }

    pub fn survey(&self) -> Option<&Survey> {
        match &self.load {
            SurveyLoad::Loaded(s) => Some(s),
            _ => None,
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        Value::String(s) => s.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

/// Normalizes a raw answer to what the API expects, `None` for an empty one.
pub fn answer_value(question: &SurveyQuestion, raw: &Value) -> Option<Value> {
    if is_blank(raw) {
        return None;
    }
    match question.kind {
        QuestionType::Integer => match as_number(raw) {
            Some(n) if n.fract() == 0.0 => Some(Value::from(n as i64)),
            _ => Some(raw.clone()),
        },
        QuestionType::Float => as_number(raw)
            .and_then(|n| serde_json::Number::from_f64(n).map(Value::Number))
            .or_else(|| Some(raw.clone())),
        QuestionType::Multiselect => Some(Value::Array(as_list(raw).into_iter().map(Value::String).collect())),
        _ => Some(raw.clone()),
    }
}

/// Survey answers ready for `extra_vars`. Unanswered optional questions are left out.
pub fn survey_answers(survey: &Survey, answers: &Map<String, Value>) -> Map<String, Value> {
    survey
        .spec
        .iter()
        .filter_map(|q| {
            let raw = answers.get(&q.variable)?;
            answer_value(q, raw).map(|v| (q.variable.clone(), v))
        })
        .collect()
}

pub fn validate_answer(question: &SurveyQuestion, raw: Option<&Value>) -> Option<String> {
    let value = match raw {
        Some(v) if !is_blank(v) => v,
        _ if question.required => return Some("This field must not be blank".to_string()),
        _ => return None,
    };

    match question.kind {
        QuestionType::Text | QuestionType::Textarea | QuestionType::Password => {
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0) as f64;
            if let Some(min) = question.min.filter(|m| len < *m) {
                return Some(format!("This field must be at least {} characters", min));
            }
            if let Some(max) = question.max.filter(|m| len > *m) {
                return Some(format!("This field must not exceed {} characters", max));
            }
            None
        }
        QuestionType::Integer | QuestionType::Float => {
            let number = as_number(value);
            let in_range = number.is_some_and(|n| {
                (question.kind == QuestionType::Float || n.fract() == 0.0)
                    && question.min.is_none_or(|min| n >= min)
                    && question.max.is_none_or(|max| n <= max)
            });
            if in_range {
                None
            } else {
                Some(format!(
                    "This field must be a number and have a value between {} and {}",
                    question.min.map(|m| m.to_string()).unwrap_or_else(|| "-inf".to_string()),
                    question.max.map(|m| m.to_string()).unwrap_or_else(|| "inf".to_string()),
                ))
            }
        }
        QuestionType::Multiplechoice => {
            let choices = question.choices();
            match value.as_str() {
                Some(v) if choices.iter().any(|c| c == v) => None,
                _ => Some("Select a valid choice".to_string()),
            }
        }
        QuestionType::Multiselect => {
            let choices = question.choices();
            if as_list(value).iter().all(|v| choices.contains(v)) {
                None
            } else {
                Some("Select valid choices".to_string())
            }
        }
    }
}

impl PromptStep for SurveyStep {
    fn id(&self) -> StepId {
        StepId::Survey
    }

    fn initial_values(&self, values: &mut PromptValues) {
        let Some(survey) = self.survey() else {
            return;
        };
        for question in &survey.spec {
            let default = match (&question.default, question.kind) {
                (Some(d), QuestionType::Multiselect) => Value::Array(as_list(d).into_iter().map(Value::String).collect()),
                (Some(d), _) => d.clone(),
                (None, QuestionType::Multiselect) => Value::Array(Vec::new()),
                (None, _) => Value::String(String::new()),
            };
            values.survey.insert(question.variable.clone(), default);
        }
    }

    fn validate(&self, values: &PromptValues) -> FieldErrors {
        let Some(survey) = self.survey() else {
            return FieldErrors::new();
        };
        survey
            .spec
            .iter()
            .filter_map(|q| {
                validate_answer(q, values.survey.get(&q.variable)).map(|msg| (format!("survey_{}", q.variable), msg))
            })
            .collect()
    }

    fn is_ready(&self) -> bool {
        !matches!(self.load, SurveyLoad::Pending)
    }

    fn content_error(&self) -> Option<&ErrorMessage> {
        match &self.load {
            SurveyLoad::Failed(e) => Some(e),
            _ => None,
        }
    }
}
