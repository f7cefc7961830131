use awx_console::api::models::{LaunchConfig, QuestionType, Survey, SurveyQuestion};
use awx_console::prompt::other::OtherPromptsStep;
use awx_console::prompt::survey::{SurveyStep, answer_value, survey_answers, validate_answer};
use awx_console::prompt::{PromptStep, PromptValues};
use serde_json::{Map, json};

fn question(variable: &str, kind: QuestionType) -> SurveyQuestion {
    SurveyQuestion {
        variable: variable.to_string(),
        kind,
        question_name: variable.to_string(),
        question_description: String::new(),
        required: false,
        min: None,
        max: None,
        default: None,
        choices: None,
    }
}

#[test]
fn test_required_answers() {
    let mut q = question("release", QuestionType::Text);
    q.required = true;
    assert_eq!(
        validate_answer(&q, None).as_deref(),
        Some("This field must not be blank")
    );
    assert_eq!(
        validate_answer(&q, Some(&json!("  "))).as_deref(),
        Some("This field must not be blank")
    );
    assert_eq!(validate_answer(&q, Some(&json!("1.0"))), None);

    q.required = false;
    assert_eq!(validate_answer(&q, None), None);
}

#[test]
fn test_text_length_bounds() {
    let mut q = question("code", QuestionType::Text);
    q.min = Some(2.0);
    q.max = Some(4.0);

    assert_eq!(
        validate_answer(&q, Some(&json!("a"))).as_deref(),
        Some("This field must be at least 2 characters")
    );
    assert_eq!(
        validate_answer(&q, Some(&json!("abcde"))).as_deref(),
        Some("This field must not exceed 4 characters")
    );
    assert_eq!(validate_answer(&q, Some(&json!("abc"))), None);
}

#[test]
fn test_numeric_answers() {
    let mut q = question("replicas", QuestionType::Integer);
    q.min = Some(1.0);
    q.max = Some(10.0);

    assert_eq!(validate_answer(&q, Some(&json!(5))), None);
    assert_eq!(validate_answer(&q, Some(&json!("7"))), None);
    let message = "This field must be a number and have a value between 1 and 10";
    assert_eq!(validate_answer(&q, Some(&json!(11))).as_deref(), Some(message));
    assert_eq!(validate_answer(&q, Some(&json!(2.5))).as_deref(), Some(message));
    assert_eq!(validate_answer(&q, Some(&json!("many"))).as_deref(), Some(message));

    let mut f = question("ratio", QuestionType::Float);
    f.max = Some(1.0);
    assert_eq!(validate_answer(&f, Some(&json!(0.25))), None);
    assert_eq!(
        validate_answer(&f, Some(&json!(1.5))).as_deref(),
        Some("This field must be a number and have a value between -inf and 1")
    );
}

#[test]
fn test_choice_answers() {
    let mut single = question("env", QuestionType::Multiplechoice);
    single.choices = Some(json!("dev\nstaging\nprod"));
    assert_eq!(validate_answer(&single, Some(&json!("prod"))), None);
    assert_eq!(
        validate_answer(&single, Some(&json!("qa"))).as_deref(),
        Some("Select a valid choice")
    );

    let mut multi = question("regions", QuestionType::Multiselect);
    multi.choices = Some(json!(["eu", "us", "ap"]));
    assert_eq!(validate_answer(&multi, Some(&json!(["eu", "ap"]))), None);
    assert_eq!(
        validate_answer(&multi, Some(&json!(["eu", "mars"]))).as_deref(),
        Some("Select valid choices")
    );
}

#[test]
fn test_answers_are_normalized() {
    assert_eq!(answer_value(&question("n", QuestionType::Integer), &json!("42")), Some(json!(42)));
    assert_eq!(answer_value(&question("f", QuestionType::Float), &json!("0.5")), Some(json!(0.5)));
    assert_eq!(
        answer_value(&question("m", QuestionType::Multiselect), &json!("eu\nus\n")),
        Some(json!(["eu", "us"]))
    );
    assert_eq!(answer_value(&question("t", QuestionType::Text), &json!("")), None);
}

#[test]
fn test_unanswered_optional_questions_are_left_out() {
    let survey = Survey {
        name: String::new(),
        description: String::new(),
        spec: vec![
            question("release", QuestionType::Text),
            question("notes", QuestionType::Textarea),
            question("replicas", QuestionType::Integer),
        ],
    };
    let mut answers = Map::new();
    answers.insert("release".to_string(), json!("1.0"));
    answers.insert("notes".to_string(), json!(""));
    answers.insert("replicas".to_string(), json!("3"));
    answers.insert("stray".to_string(), json!("ignored"));

    let vars = survey_answers(&survey, &answers);
    assert_eq!(serde_json::Value::Object(vars), json!({"release": "1.0", "replicas": 3}));
}

#[test]
fn test_survey_step_seeds_defaults_and_prefixes_errors() {
    let mut required = question("release", QuestionType::Text);
    required.required = true;
    let mut regions = question("regions", QuestionType::Multiselect);
    regions.default = Some(json!("eu\nus"));
    let step = SurveyStep::loaded(Survey {
        name: String::new(),
        description: String::new(),
        spec: vec![required, regions],
    });

    let mut values = PromptValues::default();
    step.initial_values(&mut values);
    assert_eq!(values.survey.get("release"), Some(&json!("")));
    assert_eq!(values.survey.get("regions"), Some(&json!(["eu", "us"])));

    let errors = step.validate(&values);
    assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["survey_release"]);
    assert!(step.is_ready());
    assert!(step.content_error().is_none());

    assert!(!SurveyStep::pending().is_ready());
}

#[test]
fn test_other_prompts_defaults_and_validation() {
    let mut config = LaunchConfig {
        ask_job_type_on_launch: true,
        ask_verbosity_on_launch: true,
        ask_diff_mode_on_launch: true,
        ask_variables_on_launch: true,
        ..Default::default()
    };
    config.defaults.extra_vars = Some(json!("region: eu"));
    let step = OtherPromptsStep::new(&config);

    let mut values = PromptValues::default();
    step.initial_values(&mut values);
    assert_eq!(values.job_type.as_deref(), Some("run"));
    assert_eq!(values.verbosity, Some(0));
    assert_eq!(values.diff_mode, Some(false));
    assert_eq!(values.extra_vars, "region: eu");
    assert!(step.validate(&values).is_empty());

    values.job_type = Some("deploy".to_string());
    values.verbosity = Some(-1);
    values.extra_vars = "just a string".to_string();
    let errors = step.validate(&values);
    assert_eq!(errors.get("job_type").map(String::as_str), Some("Select a valid job type"));
    assert!(errors.contains_key("verbosity"));
    assert_eq!(
        errors.get("extra_vars").map(String::as_str),
        Some("Extra variables must be a valid YAML or JSON mapping")
    );
}
