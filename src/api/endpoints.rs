use serde_json::{Value, json};

use crate::api::client::{ApiClient, ApiResult, ListQuery};
use crate::api::models::{
    ApprovalTemplate, Id, LaunchConfig, Page, Survey, WorkflowNodeRecord,
};
use crate::workflow::graph::LinkType;

pub const API_ROOT: &str = "/api/v2";

/// Top-level REST collections the console manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Credentials,
    CredentialTypes,
    Organizations,
    Schedules,
    Users,
    Teams,
    JobTemplates,
    WorkflowJobTemplates,
}

impl ResourceKind {
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceKind::Credentials => "credentials",
            ResourceKind::CredentialTypes => "credential_types",
            ResourceKind::Organizations => "organizations",
            ResourceKind::Schedules => "schedules",
            ResourceKind::Users => "users",
            ResourceKind::Teams => "teams",
            ResourceKind::JobTemplates => "job_templates",
            ResourceKind::WorkflowJobTemplates => "workflow_job_templates",
        }
    }

    /// Singular noun used in user-facing messages.
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Credentials => "credential",
            ResourceKind::CredentialTypes => "credential type",
            ResourceKind::Organizations => "organization",
            ResourceKind::Schedules => "schedule",
            ResourceKind::Users => "user",
            ResourceKind::Teams => "team",
            ResourceKind::JobTemplates => "job template",
            ResourceKind::WorkflowJobTemplates => "workflow job template",
        }
    }

    pub fn list_path(&self) -> String {
        format!("{}/{}/", API_ROOT, self.segment())
    }

    pub fn detail_path(&self, id: Id) -> String {
        format!("{}/{}/{}/", API_ROOT, self.segment(), id)
    }

    pub fn related_path(&self, id: Id, related: &str) -> String {
        format!("{}/{}/{}/{}/", API_ROOT, self.segment(), id, related)
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "credentials" => Some(ResourceKind::Credentials),
            "credential_types" => Some(ResourceKind::CredentialTypes),
            "organizations" => Some(ResourceKind::Organizations),
            "schedules" => Some(ResourceKind::Schedules),
            "users" => Some(ResourceKind::Users),
            "teams" => Some(ResourceKind::Teams),
            "job_templates" => Some(ResourceKind::JobTemplates),
            "workflow_job_templates" => Some(ResourceKind::WorkflowJobTemplates),
            _ => None,
        }
    }
}

pub fn workflow_nodes_path(template_id: Id) -> String {
    ResourceKind::WorkflowJobTemplates.related_path(template_id, "workflow_nodes")
}

pub fn workflow_node_path(node_id: Id) -> String {
    format!("{}/workflow_job_template_nodes/{}/", API_ROOT, node_id)
}

pub fn successor_path(node_id: Id, link_type: LinkType) -> String {
    format!("{}{}_nodes/", workflow_node_path(node_id), link_type.as_str())
}

impl ApiClient {
    pub async fn read_workflow_nodes(
        &self,
        template_id: Id,
        page: u32,
        page_size: u32,
    ) -> ApiResult<Page<WorkflowNodeRecord>> {
        let mut query = ListQuery::new(page_size);
        query.page = page;
        self.list(&workflow_nodes_path(template_id), &query).await
    }

    pub async fn create_workflow_node(&self, template_id: Id, unified_job_template: Option<Id>) -> ApiResult<WorkflowNodeRecord> {
        let body = match unified_job_template {
            Some(id) => json!({ "unified_job_template": id }),
            None => json!({}),
        };
        self.post(&workflow_nodes_path(template_id), &body).await
    }

    pub async fn update_workflow_node(&self, node_id: Id, unified_job_template: Id) -> ApiResult<Value> {
        self.patch(&workflow_node_path(node_id), &json!({ "unified_job_template": unified_job_template }))
            .await
    }

    pub async fn destroy_workflow_node(&self, node_id: Id) -> ApiResult<()> {
        self.delete(&workflow_node_path(node_id)).await
    }

    pub async fn associate_node(&self, source: Id, target: Id, link_type: LinkType) -> ApiResult<()> {
        self.post_action(&successor_path(source, link_type), &json!({ "id": target }))
            .await
    }

    pub async fn disassociate_node(&self, source: Id, target: Id, link_type: LinkType) -> ApiResult<()> {
        self.post_action(
            &successor_path(source, link_type),
            &json!({ "id": target, "disassociate": true }),
        )
        .await
    }

    pub async fn create_approval_template(&self, node_id: Id, template: &ApprovalTemplate) -> ApiResult<Value> {
        let path = format!("{}create_approval_template/", workflow_node_path(node_id));
        self.post(&path, template).await
    }

    pub async fn update_approval_template(&self, template_id: Id, template: &ApprovalTemplate) -> ApiResult<Value> {
        let path = format!("{}/workflow_approval_templates/{}/", API_ROOT, template_id);
        self.patch(&path, template).await
    }

    pub async fn read_launch_config(&self, template: ResourceKind, id: Id) -> ApiResult<LaunchConfig> {
        self.get(&template.related_path(id, "launch")).await
    }

    pub async fn read_survey(&self, template: ResourceKind, id: Id) -> ApiResult<Survey> {
        self.get(&template.related_path(id, "survey_spec")).await
    }

    pub async fn launch<B: serde::Serialize>(&self, template: ResourceKind, id: Id, payload: &B) -> ApiResult<Value> {
        self.post(&template.related_path(id, "launch"), payload).await
    }
}
