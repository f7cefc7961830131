use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::api::client::{ApiClient, ApiResult};
use crate::api::endpoints::ResourceKind;
use crate::api::models::{Id, LaunchConfig, QuestionType, Survey};
use crate::error::{ConsoleError, Result};
use crate::prompt::PromptValues;
use crate::prompt::passwords::required_passwords;
use crate::prompt::survey::survey_answers;

/// Shown in place of any secret in a preview.
pub const PASSWORD_MASK: &str = "········";

/// Parses free-text YAML/JSON extra variables and lays survey answers over
/// them. Survey answers win on key collisions. Blank text is an empty mapping.
pub fn merge_extra_vars(text: &str, survey: Option<&Map<String, Value>>) -> Result<Map<String, Value>> {
    let mut vars = if text.trim().is_empty() {
        Map::new()
    } else {
        match serde_yaml::from_str::<Value>(text)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ConsoleError::validation(
                    "extra_vars",
                    format!("expected a mapping, found {}", other),
                ));
            }
        }
    };
    if let Some(answers) = survey {
        for (k, v) in answers {
            vars.insert(k.clone(), v.clone());
        }
    }
    Ok(vars)
}

pub fn mask_passwords(values: &Map<String, Value>, password_keys: &[&str]) -> Map<String, Value> {
    values
        .iter()
        .map(|(k, v)| {
            if password_keys.contains(&k.as_str()) {
                (k.clone(), Value::String(PASSWORD_MASK.to_string()))
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}

/// Body of `POST .../launch/`. Absent values are not sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LaunchPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory_id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Vec<Id>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scm_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_tags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_mode: Option<bool>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extra_vars: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub credential_passwords: BTreeMap<String, String>,
}

fn join_tags(tags: Option<&str>) -> Option<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    })
}

pub fn build_launch_payload(config: &LaunchConfig, values: &PromptValues, survey: Option<&Survey>) -> Result<LaunchPayload> {
    let answers = match survey {
        Some(s) if config.survey_enabled => Some(survey_answers(s, &values.survey)),
        _ => None,
    };
    let text = if config.ask_variables_on_launch { values.extra_vars.as_str() } else { "" };
    let extra_vars = merge_extra_vars(text, answers.as_ref())?;

    let credential_passwords = required_passwords(config, &values.credentials)
        .into_iter()
        .filter_map(|field| {
            let key = field.payload_key();
            values
                .credential_passwords
                .get(&key)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v.clone()))
        })
        .collect();

    let ask = |flag: bool, value: Option<String>| if flag { value } else { None };
    Ok(LaunchPayload {
        inventory_id: if config.ask_inventory_on_launch {
            values.inventory.as_ref().map(|i| i.id)
        } else {
            None
        },
        credentials: config
            .ask_credential_on_launch
            .then(|| values.credentials.iter().map(|c| c.id).collect()),
        job_type: ask(config.ask_job_type_on_launch, values.job_type.clone()),
        limit: ask(config.ask_limit_on_launch, values.limit.clone()),
        scm_branch: ask(config.ask_scm_branch_on_launch, values.scm_branch.clone()),
        job_tags: ask(config.ask_tags_on_launch, join_tags(values.job_tags.as_deref())),
        skip_tags: ask(config.ask_skip_tags_on_launch, join_tags(values.skip_tags.as_deref())),
        verbosity: values.verbosity.filter(|_| config.ask_verbosity_on_launch),
        diff_mode: values.diff_mode.filter(|_| config.ask_diff_mode_on_launch),
        extra_vars,
        credential_passwords,
    })
}

/// Filled-in values the template does not prompt for. The launch payload
/// would silently drop them.
pub fn unprompted_values(config: &LaunchConfig, values: &PromptValues, survey: Option<&Survey>) -> Vec<String> {
    let mut ignored = Vec::new();
    let mut check = |asked: bool, filled: bool, name: &str| {
        if filled && !asked {
            ignored.push(name.to_string());
        }
    };
    check(config.ask_inventory_on_launch, values.inventory.is_some(), "inventory");
    check(config.ask_credential_on_launch, !values.credentials.is_empty(), "credentials");
    check(config.ask_job_type_on_launch, values.job_type.is_some(), "job_type");
    check(config.ask_limit_on_launch, values.limit.is_some(), "limit");
    check(config.ask_scm_branch_on_launch, values.scm_branch.is_some(), "scm_branch");
    check(config.ask_tags_on_launch, values.job_tags.is_some(), "job_tags");
    check(config.ask_skip_tags_on_launch, values.skip_tags.is_some(), "skip_tags");
    check(config.ask_verbosity_on_launch, values.verbosity.is_some(), "verbosity");
    check(config.ask_diff_mode_on_launch, values.diff_mode.is_some(), "diff_mode");
    check(config.ask_variables_on_launch, !values.extra_vars.trim().is_empty(), "extra_vars");

    let questions: Vec<&str> = survey
        .filter(|_| config.survey_enabled)
        .map(|s| s.spec.iter().map(|q| q.variable.as_str()).collect())
        .unwrap_or_default();
    for variable in values.survey.keys() {
        if !questions.contains(&variable.as_str()) {
            ignored.push(format!("survey.{}", variable));
        }
    }
    ignored
}

/// The payload as the preview step shows it: every secret masked.
pub fn preview(payload: &LaunchPayload, survey: Option<&Survey>) -> Result<Value> {
    let password_vars: Vec<&str> = survey
        .map(|s| {
            s.spec
                .iter()
                .filter(|q| q.kind == QuestionType::Password)
                .map(|q| q.variable.as_str())
                .collect()
        })
        .unwrap_or_default();

    let mut masked = payload.clone();
    masked.extra_vars = mask_passwords(&payload.extra_vars, &password_vars);
    for secret in masked.credential_passwords.values_mut() {
        *secret = PASSWORD_MASK.to_string();
    }
    Ok(serde_json::to_value(masked)?)
}

pub async fn launch(client: &ApiClient, template: ResourceKind, id: Id, payload: &LaunchPayload) -> ApiResult<Value> {
    info!(
        template = template.segment(),
        template_id = id,
        credentials = payload.credentials.as_ref().map(Vec::len).unwrap_or(0),
        extra_vars = payload.extra_vars.len(),
        "Launching template"
    );
    client.launch(template, id, payload).await
}
