use std::sync::Arc;

use awx_console::api::models::{
    Credential, DefaultCredential, LaunchConfig, NamedRef, QuestionType, Survey, SurveyQuestion,
};
use awx_console::api::{ApiClient, InMemoryTransport, Method, ResourceKind};
use awx_console::prompt::payload::launch;
use awx_console::prompt::survey::SurveyStep;
use awx_console::prompt::{PromptWizard, StepId};
use awx_console::ConsoleError;
use serde_json::{Map, Value, json};

fn question(variable: &str, kind: QuestionType, required: bool) -> SurveyQuestion {
    SurveyQuestion {
        variable: variable.to_string(),
        kind,
        question_name: variable.to_string(),
        question_description: String::new(),
        required,
        min: None,
        max: None,
        default: None,
        choices: None,
    }
}

fn survey(questions: Vec<SurveyQuestion>) -> Survey {
    Survey {
        name: "Release".to_string(),
        description: String::new(),
        spec: questions,
    }
}

fn setup() -> (Arc<InMemoryTransport>, ApiClient) {
    let transport = Arc::new(InMemoryTransport::new());
    let client = ApiClient::new(transport.clone());
    (transport, client)
}

#[test]
fn test_steps_follow_launch_config() {
    let config = LaunchConfig {
        ask_inventory_on_launch: true,
        ask_credential_on_launch: true,
        ask_job_type_on_launch: true,
        survey_enabled: true,
        ..Default::default()
    };
    let step = SurveyStep::loaded(survey(vec![question("release", QuestionType::Text, false)]));
    let wizard = PromptWizard::new(config, Some(step));

    assert_eq!(
        wizard.step_ids(),
        vec![
            StepId::Inventory,
            StepId::Credentials,
            StepId::OtherPrompts,
            StepId::Survey,
            StepId::Preview,
        ]
    );
    let names: Vec<&str> = wizard.steps().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Inventory", "Credentials", "Other Prompts", "Survey", "Preview"]);
    assert_eq!(wizard.current(), StepId::Inventory);
}

#[test]
fn test_scm_branch_prompt_adds_other_prompts_step() {
    let config = LaunchConfig {
        ask_inventory_on_launch: true,
        ask_credential_on_launch: true,
        ask_scm_branch_on_launch: true,
        survey_enabled: true,
        ..Default::default()
    };
    let step = SurveyStep::loaded(survey(vec![question("release", QuestionType::Text, false)]));
    let wizard = PromptWizard::new(config, Some(step));

    let names: Vec<&str> = wizard.steps().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Inventory", "Credentials", "Other Prompts", "Survey", "Preview"]);
}

#[test]
fn test_nothing_to_prompt_is_preview_only() {
    let wizard = PromptWizard::new(LaunchConfig::default(), None);
    assert_eq!(wizard.step_ids(), vec![StepId::Preview]);
    assert_eq!(wizard.current(), StepId::Preview);
}

#[test]
fn test_next_requires_valid_step() {
    let config = LaunchConfig {
        ask_inventory_on_launch: true,
        ask_limit_on_launch: true,
        ..Default::default()
    };
    let mut wizard = PromptWizard::new(config, None);

    assert!(!wizard.enable_next());
    assert!(!wizard.step_has_error(StepId::Inventory));
    assert!(!wizard.next());
    assert_eq!(wizard.current(), StepId::Inventory);
    assert!(wizard.step_has_error(StepId::Inventory));
    assert_eq!(
        wizard.errors(StepId::Inventory).and_then(|e| e.get("inventory")).map(String::as_str),
        Some("An inventory must be selected")
    );

    wizard.values.inventory = Some(NamedRef {
        id: 3,
        name: "Demo".to_string(),
    });
    assert!(wizard.enable_next());
    assert!(wizard.next());
    assert_eq!(wizard.current(), StepId::OtherPrompts);
    assert!(!wizard.step_has_error(StepId::Inventory));

    assert!(wizard.back());
    assert_eq!(wizard.current(), StepId::Inventory);
    assert!(!wizard.back());

    assert!(wizard.go_to(StepId::Preview));
    assert!(wizard.go_to(StepId::Inventory));
    assert!(!wizard.go_to(StepId::Survey));
}

#[test]
fn test_forward_jump_blocked_by_invalid_step_between() {
    let mut config = LaunchConfig {
        ask_inventory_on_launch: true,
        ask_job_type_on_launch: true,
        ..Default::default()
    };
    config.defaults.inventory = Some(NamedRef {
        id: 1,
        name: "Demo".to_string(),
    });
    let mut wizard = PromptWizard::new(config, None);
    assert_eq!(wizard.values.job_type.as_deref(), Some("run"));
    wizard.values.job_type = Some("bogus".to_string());

    assert!(!wizard.go_to(StepId::Preview));
    assert_eq!(wizard.current(), StepId::Inventory);

    assert!(wizard.go_to(StepId::OtherPrompts));
    assert!(!wizard.next());
    assert!(wizard.step_has_error(StepId::OtherPrompts));

    // Going back never needs a valid step.
    assert!(wizard.go_to(StepId::Inventory));
}

#[test]
fn test_pending_survey_holds_wizard() {
    let config = LaunchConfig {
        survey_enabled: true,
        ..Default::default()
    };
    let mut wizard = PromptWizard::new(config, None);
    assert_eq!(wizard.current(), StepId::Survey);
    assert!(!wizard.enable_next());
    assert!(!wizard.next());

    let mut release = question("release", QuestionType::Text, true);
    release.default = Some(json!("1.0"));
    wizard.replace_survey(SurveyStep::loaded(survey(vec![release])));

    assert_eq!(wizard.values.survey.get("release"), Some(&json!("1.0")));
    assert!(wizard.enable_next());
    assert!(wizard.next());
    assert_eq!(wizard.current(), StepId::Preview);
}

#[test]
fn test_credential_passwords_step_follows_selection() {
    let mut config = LaunchConfig {
        ask_credential_on_launch: true,
        ..Default::default()
    };
    config.defaults.credentials = vec![DefaultCredential {
        id: 4,
        name: "Machine".to_string(),
        credential_type: Some(1),
        passwords_needed: vec!["ssh_password".to_string()],
    }];
    let mut wizard = PromptWizard::new(config, None);

    assert_eq!(
        wizard.step_ids(),
        vec![StepId::Credentials, StepId::CredentialPasswords, StepId::Preview]
    );
    assert_eq!(wizard.values.credential_passwords.get("ssh_password").map(String::as_str), Some(""));
    assert!(matches!(wizard.submit(), Err(ConsoleError::Validation(e)) if e.contains_key("ssh_password")));

    wizard
        .values
        .credential_passwords
        .insert("ssh_password".to_string(), "hunter2".to_string());
    let payload = wizard.submit().expect("Submit failed");
    assert_eq!(payload.credentials, Some(vec![4]));
    assert_eq!(
        payload.credential_passwords.get("ssh_password").map(String::as_str),
        Some("hunter2")
    );

    let mut inputs = Map::new();
    inputs.insert("username".to_string(), json!("admin"));
    wizard.values.credentials = vec![Credential {
        id: 9,
        name: "No prompts".to_string(),
        credential_type: Some(1),
        inputs: Some(inputs),
        ..Default::default()
    }];
    assert_eq!(wizard.step_ids(), vec![StepId::Credentials, StepId::Preview]);
}

#[test]
fn test_submit_reports_every_invalid_step() {
    let config = LaunchConfig {
        ask_inventory_on_launch: true,
        ask_verbosity_on_launch: true,
        ..Default::default()
    };
    let mut wizard = PromptWizard::new(config, None);
    wizard.values.verbosity = Some(9);

    let err = wizard.submit().expect_err("Submit should fail");
    match err {
        ConsoleError::Validation(errors) => {
            assert!(errors.contains_key("inventory"));
            assert_eq!(
                errors.get("verbosity").map(String::as_str),
                Some("Verbosity must be between 0 and 5")
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(wizard.is_visited(StepId::OtherPrompts));
    assert!(wizard.step_has_error(StepId::Inventory));
}

#[tokio::test]
async fn test_load_and_launch() {
    let (transport, client) = setup();
    transport.respond_ok(
        Method::Get,
        "/api/v2/job_templates/5/launch/",
        json!({
            "ask_inventory_on_launch": true,
            "ask_variables_on_launch": true,
            "survey_enabled": true,
            "defaults": {
                "inventory": {"id": 1, "name": "Demo Inventory"},
                "extra_vars": {"region": "eu"}
            }
        }),
    );
    transport.respond_ok(
        Method::Get,
        "/api/v2/job_templates/5/survey_spec/",
        json!({
            "name": "Release",
            "spec": [
                {"variable": "release", "type": "text", "required": true, "default": "1.0"},
                {"variable": "token", "type": "password", "required": false}
            ]
        }),
    );
    transport.respond(Method::Post, "/api/v2/job_templates/5/launch/", 201, json!({"id": 77, "job": 77}));

    let mut wizard = PromptWizard::load(&client, ResourceKind::JobTemplates, 5)
        .await
        .expect("Failed to load wizard");
    assert_eq!(
        wizard.step_ids(),
        vec![StepId::Inventory, StepId::OtherPrompts, StepId::Survey, StepId::Preview]
    );
    assert_eq!(wizard.values.extra_vars, "region: eu\n");

    let payload = wizard.submit().expect("Submit failed");
    assert_eq!(payload.inventory_id, Some(1));
    assert_eq!(payload.extra_vars.get("release"), Some(&json!("1.0")));
    assert!(!payload.extra_vars.contains_key("token"));

    let job = launch(&client, ResourceKind::JobTemplates, 5, &payload)
        .await
        .expect("Launch failed");
    assert_eq!(job.get("id"), Some(&json!(77)));

    let posts = transport.requests_matching(Method::Post).await;
    assert_eq!(
        posts[0].body,
        Some(json!({
            "inventory_id": 1,
            "extra_vars": {"region": "eu", "release": "1.0"}
        }))
    );
}

#[tokio::test]
async fn test_failed_survey_blocks_submit() {
    let (transport, client) = setup();
    transport.respond_ok(
        Method::Get,
        "/api/v2/workflow_job_templates/8/launch/",
        json!({"survey_enabled": true, "ask_limit_on_launch": true}),
    );
    transport.respond(
        Method::Get,
        "/api/v2/workflow_job_templates/8/survey_spec/",
        500,
        Value::Null,
    );

    let mut wizard = PromptWizard::load(&client, ResourceKind::WorkflowJobTemplates, 8)
        .await
        .expect("Failed to load wizard");
    assert!(wizard.survey().is_none());

    let err = wizard.submit().expect_err("Submit should fail");
    assert!(matches!(
        err,
        ConsoleError::Content(ref message) if message == "Failed to retrieve survey. GET returned status: 500"
    ));
}

#[tokio::test]
async fn test_load_fails_without_launch_config() {
    let (_transport, client) = setup();
    let result = PromptWizard::load(&client, ResourceKind::JobTemplates, 404).await;
    assert!(matches!(result, Err(ConsoleError::Api(ref e)) if e.status() == Some(404)));
}
