use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier assigned by the REST backend.
pub type Id = i64;

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: Id,
    #[serde(default)]
    pub name: String,
}

/// Rows that list screens can show and delete.
pub trait Listable {
    fn id(&self) -> Id;
    fn display_name(&self) -> &str;
}

// --- Workflow nodes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    JobTemplate,
    WorkflowJobTemplate,
    Project,
    InventorySource,
    WorkflowApprovalTemplate,
    SystemJobTemplate,
    #[serde(other)]
    Unknown,
}

impl TemplateKind {
    /// Letter drawn in the node-type circle.
    pub fn badge(&self) -> Option<&'static str> {
        match self {
            TemplateKind::Project => Some("P"),
            TemplateKind::InventorySource => Some("I"),
            TemplateKind::WorkflowJobTemplate => Some("W"),
            TemplateKind::WorkflowApprovalTemplate => Some("A"),
            TemplateKind::SystemJobTemplate => Some("S"),
            TemplateKind::JobTemplate | TemplateKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnifiedJobTemplate {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<TemplateKind>,
    #[serde(default)]
    pub unified_job_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Approval timeout in seconds.
    #[serde(default)]
    pub timeout: Option<i64>,
}

impl UnifiedJobTemplate {
    pub fn named(id: Id, name: &str, kind: TemplateKind) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn is_approval(&self) -> bool {
        self.kind == Some(TemplateKind::WorkflowApprovalTemplate)
            || self.unified_job_type.as_deref() == Some("workflow_approval")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeSummaryFields {
    #[serde(default)]
    pub unified_job_template: Option<UnifiedJobTemplate>,
    #[serde(default)]
    pub job: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowNodeRecord {
    pub id: Id,
    #[serde(default)]
    pub unified_job_template: Option<Id>,
    #[serde(default)]
    pub success_nodes: Vec<Id>,
    #[serde(default)]
    pub failure_nodes: Vec<Id>,
    #[serde(default)]
    pub always_nodes: Vec<Id>,
    #[serde(default)]
    pub summary_fields: NodeSummaryFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalTemplate {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timeout: i64,
}

impl From<&UnifiedJobTemplate> for ApprovalTemplate {
    fn from(t: &UnifiedJobTemplate) -> Self {
        Self {
            name: t.name.clone(),
            description: t.description.clone().unwrap_or_default(),
            timeout: t.timeout.unwrap_or(0),
        }
    }
}

// --- Launch ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefaultCredential {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub credential_type: Option<Id>,
    #[serde(default)]
    pub passwords_needed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchDefaults {
    pub inventory: Option<NamedRef>,
    pub credentials: Vec<DefaultCredential>,
    pub job_type: Option<String>,
    pub limit: Option<String>,
    pub scm_branch: Option<String>,
    pub job_tags: Option<String>,
    pub skip_tags: Option<String>,
    pub verbosity: Option<i64>,
    pub diff_mode: Option<bool>,
    /// Either a YAML/JSON string or an already-parsed mapping.
    pub extra_vars: Option<Value>,
}

/// Server-provided description of what must be prompted before a launch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub ask_inventory_on_launch: bool,
    pub ask_credential_on_launch: bool,
    pub ask_scm_branch_on_launch: bool,
    pub ask_job_type_on_launch: bool,
    pub ask_limit_on_launch: bool,
    pub ask_tags_on_launch: bool,
    pub ask_skip_tags_on_launch: bool,
    pub ask_variables_on_launch: bool,
    pub ask_verbosity_on_launch: bool,
    pub ask_diff_mode_on_launch: bool,
    pub survey_enabled: bool,
    pub passwords_needed_to_start: Vec<String>,
    pub defaults: LaunchDefaults,
}

impl LaunchConfig {
    pub fn asks_other_prompts(&self) -> bool {
        self.ask_job_type_on_launch
            || self.ask_limit_on_launch
            || self.ask_scm_branch_on_launch
            || self.ask_tags_on_launch
            || self.ask_skip_tags_on_launch
            || self.ask_variables_on_launch
            || self.ask_verbosity_on_launch
            || self.ask_diff_mode_on_launch
    }
}

// --- Surveys ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Textarea,
    Password,
    Multiplechoice,
    Multiselect,
    Integer,
    Float,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub variable: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub question_name: String,
    #[serde(default)]
    pub question_description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub default: Option<Value>,
    /// Newline separated string or an array, depending on API version.
    #[serde(default)]
    pub choices: Option<Value>,
}

impl SurveyQuestion {
    pub fn choices(&self) -> Vec<String> {
        match &self.choices {
            Some(Value::String(s)) => s
                .lines()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Survey {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub spec: Vec<SurveyQuestion>,
}

// --- CRUD resources ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Credential {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub credential_type: Option<Id>,
    #[serde(default)]
    pub organization: Option<Id>,
    /// Absent on credentials that came from launch defaults.
    #[serde(default)]
    pub inputs: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Organization {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub max_hosts: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rrule: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub unified_job_template: Option<Id>,
    #[serde(default)]
    pub extra_data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource_name: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub team_id: Option<Id>,
    #[serde(default)]
    pub team_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleAccess {
    pub role: RoleSummary,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccessSummary {
    #[serde(default)]
    pub direct_access: Vec<RoleAccess>,
    #[serde(default)]
    pub indirect_access: Vec<RoleAccess>,
}

/// Entry of a `/access_list/` sub-resource: a user and how they reach the resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccessRecord {
    pub id: Id,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub summary_fields: AccessSummary,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Team {
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization: Option<Id>,
}

macro_rules! listable {
    ($ty:ty, $field:ident) => {
        impl Listable for $ty {
            fn id(&self) -> Id {
                self.id
            }
            fn display_name(&self) -> &str {
                &self.$field
            }
        }
    };
}

listable!(Credential, name);
listable!(Organization, name);
listable!(Schedule, name);
listable!(AccessRecord, username);
listable!(User, username);
listable!(Team, name);
