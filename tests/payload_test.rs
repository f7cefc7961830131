use awx_console::api::models::{Credential, LaunchConfig, NamedRef, QuestionType, Survey, SurveyQuestion};
use awx_console::prompt::payload::{preview, unprompted_values};
use awx_console::prompt::{PASSWORD_MASK, PromptValues, build_launch_payload, mask_passwords, merge_extra_vars};
use awx_console::ConsoleError;
use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn password_survey() -> Survey {
    Survey {
        name: "Deploy".to_string(),
        description: String::new(),
        spec: vec![
            SurveyQuestion {
                variable: "release".to_string(),
                kind: QuestionType::Text,
                question_name: "Release".to_string(),
                question_description: String::new(),
                required: true,
                min: None,
                max: None,
                default: None,
                choices: None,
            },
            SurveyQuestion {
                variable: "api_token".to_string(),
                kind: QuestionType::Password,
                question_name: "Token".to_string(),
                question_description: String::new(),
                required: true,
                min: None,
                max: None,
                default: None,
                choices: None,
            },
        ],
    }
}

#[test]
fn test_survey_answers_win_over_extra_vars() {
    let survey = object(json!({"release": "2.0", "debug": true}));
    let merged = merge_extra_vars("release: '1.0'\nregion: eu\n", Some(&survey)).expect("Failed to merge");

    assert_eq!(Value::Object(merged), json!({"release": "2.0", "region": "eu", "debug": true}));
}

#[test]
fn test_document_marker_yaml_merges_with_survey() {
    let survey = object(json!({"foo": "bar", "bar": "baz"}));
    let merged = merge_extra_vars("---\none: 1\ntwo: 2", Some(&survey)).expect("Failed to merge");

    assert_eq!(
        Value::Object(merged),
        json!({"one": 1, "two": 2, "foo": "bar", "bar": "baz"})
    );
    assert_eq!(
        Value::Object(merge_extra_vars(r#"{"one":1,"two":2}"#, None).expect("Failed to merge")),
        json!({"one": 1, "two": 2})
    );
}

#[test]
fn test_extra_vars_accept_json() {
    let merged = merge_extra_vars(r#"{"count": 3, "tags": ["a", "b"]}"#, None).expect("Failed to merge");
    assert_eq!(Value::Object(merged), json!({"count": 3, "tags": ["a", "b"]}));
}

#[test]
fn test_blank_extra_vars_are_empty() {
    assert!(merge_extra_vars("", None).expect("Failed to merge").is_empty());
    assert!(merge_extra_vars("   \n", None).expect("Failed to merge").is_empty());
}

#[test]
fn test_extra_vars_must_be_a_mapping() {
    let err = merge_extra_vars("- one\n- two\n", None).expect_err("A list is not a mapping");
    assert!(matches!(err, ConsoleError::Validation(ref e) if e.contains_key("extra_vars")));

    let err = merge_extra_vars("foo: [", None).expect_err("Broken YAML");
    assert!(matches!(err, ConsoleError::Yaml(_)));
}

#[test]
fn test_mask_passwords_only_touches_named_keys() {
    let values = object(json!({"api_token": "s3cret", "release": "1.0"}));
    let masked = mask_passwords(&values, &["api_token", "missing"]);

    assert_eq!(masked.get("api_token"), Some(&json!(PASSWORD_MASK)));
    assert_eq!(masked.get("release"), Some(&json!("1.0")));
    assert_eq!(masked.len(), 2);
}

#[test]
fn test_payload_only_carries_prompted_fields() {
    let config = LaunchConfig {
        ask_inventory_on_launch: true,
        ask_limit_on_launch: true,
        ask_tags_on_launch: true,
        ask_verbosity_on_launch: true,
        ..Default::default()
    };
    let values = PromptValues {
        inventory: Some(NamedRef {
            id: 12,
            name: "Prod".to_string(),
        }),
        limit: Some("web*".to_string()),
        job_tags: Some(" deploy, ,restart ".to_string()),
        verbosity: Some(2),
        // Not prompted for, so not sent.
        job_type: Some("check".to_string()),
        diff_mode: Some(true),
        extra_vars: "ignored: true".to_string(),
        ..Default::default()
    };

    let payload = build_launch_payload(&config, &values, None).expect("Failed to build payload");

    assert_eq!(
        serde_json::to_value(&payload).expect("Failed to serialize"),
        json!({
            "inventory_id": 12,
            "limit": "web*",
            "job_tags": "deploy,restart",
            "verbosity": 2
        })
    );
}

#[test]
fn test_payload_sends_selected_credentials() {
    let config = LaunchConfig {
        ask_credential_on_launch: true,
        ..Default::default()
    };
    let values = PromptValues {
        credentials: vec![
            Credential {
                id: 3,
                ..Default::default()
            },
            Credential {
                id: 8,
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let payload = build_launch_payload(&config, &values, None).expect("Failed to build payload");
    assert_eq!(payload.credentials, Some(vec![3, 8]));
    assert!(payload.credential_passwords.is_empty());
}

#[test]
fn test_preview_masks_every_secret() {
    let config = LaunchConfig {
        ask_variables_on_launch: true,
        survey_enabled: true,
        passwords_needed_to_start: vec!["ssh_password".to_string()],
        ..Default::default()
    };
    let survey = password_survey();
    let mut values = PromptValues {
        extra_vars: "region: eu".to_string(),
        survey: object(json!({"release": "1.0", "api_token": "s3cret"})),
        ..Default::default()
    };
    values
        .credential_passwords
        .insert("ssh_password".to_string(), "hunter2".to_string());

    let payload = build_launch_payload(&config, &values, Some(&survey)).expect("Failed to build payload");
    assert_eq!(payload.extra_vars.get("api_token"), Some(&json!("s3cret")));
    assert_eq!(
        payload.credential_passwords.get("ssh_password").map(String::as_str),
        Some("hunter2")
    );

    let shown = preview(&payload, Some(&survey)).expect("Failed to render preview");
    assert_eq!(
        shown,
        json!({
            "extra_vars": {"region": "eu", "release": "1.0", "api_token": PASSWORD_MASK},
            "credential_passwords": {"ssh_password": PASSWORD_MASK}
        })
    );
}

#[test]
fn test_survey_ignored_when_disabled() {
    let config = LaunchConfig::default();
    let survey = password_survey();
    let values = PromptValues {
        survey: object(json!({"release": "1.0"})),
        ..Default::default()
    };

    let payload = build_launch_payload(&config, &values, Some(&survey)).expect("Failed to build payload");
    assert!(payload.extra_vars.is_empty());
    assert_eq!(serde_json::to_value(&payload).expect("Failed to serialize"), json!({}));
}

#[test]
fn test_unprompted_values_are_reported() {
    let config = LaunchConfig {
        ask_limit_on_launch: true,
        survey_enabled: true,
        ..Default::default()
    };
    let survey = password_survey();
    let mut values = PromptValues {
        limit: Some("web".to_string()),
        job_type: Some("check".to_string()),
        extra_vars: "debug: true".to_string(),
        ..Default::default()
    };
    values.survey.insert("release".to_string(), json!("1.2"));
    values.survey.insert("colour".to_string(), json!("blue"));

    assert_eq!(
        unprompted_values(&config, &values, Some(&survey)),
        vec!["job_type", "extra_vars", "survey.colour"]
    );

    let payload = build_launch_payload(&config, &values, Some(&survey)).expect("Failed to build payload");
    assert_eq!(payload.job_type, None);
    assert!(!payload.extra_vars.contains_key("debug"));

    let asked = LaunchConfig {
        ask_limit_on_launch: true,
        ask_job_type_on_launch: true,
        ask_variables_on_launch: true,
        ..config
    };
    values.survey.remove("colour");
    assert!(unprompted_values(&asked, &values, Some(&survey)).is_empty());
}
