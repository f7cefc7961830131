use crate::api::models::{Id, NodeSummaryFields, TemplateKind, UnifiedJobTemplate, WorkflowNodeRecord};
use crate::workflow::graph::LinkType;

/// Fluent builder for workflow node records as the API returns them.
#[derive(Debug, Default)]
pub struct WorkflowNodesBuilder {
    pub records: Vec<WorkflowNodeRecord>,
}

impl WorkflowNodesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个作业模板节点
    pub fn job(self, id: Id, name: &str) -> Self {
        // Template ids mirror node ids; tests rarely care about the difference.
        self.node(id, UnifiedJobTemplate::named(id, name, TemplateKind::JobTemplate))
    }

    pub fn approval(self, id: Id, name: &str, timeout: i64) -> Self {
        let mut template = UnifiedJobTemplate::named(id, name, TemplateKind::WorkflowApprovalTemplate);
        template.unified_job_type = Some("workflow_approval".to_string());
        template.timeout = Some(timeout);
        self.node(id, template)
    }

    pub fn node(mut self, id: Id, template: UnifiedJobTemplate) -> Self {
        self.records.push(WorkflowNodeRecord {
            id,
            unified_job_template: template.id,
            summary_fields: NodeSummaryFields {
                unified_job_template: Some(template),
                job: None,
            },
            ..Default::default()
        });
        self
    }

    /// Node whose template was deleted on the server.
    pub fn orphan(mut self, id: Id) -> Self {
        self.records.push(WorkflowNodeRecord {
            id,
            ..Default::default()
        });
        self
    }

    pub fn edge(mut self, source: Id, target: Id, link_type: LinkType) -> Self {
        if let Some(record) = self.records.iter_mut().find(|r| r.id == source) {
            let list = match link_type {
                LinkType::Success => &mut record.success_nodes,
                LinkType::Failure => &mut record.failure_nodes,
                LinkType::Always => &mut record.always_nodes,
            };
            list.push(target);
        }
        self
    }

    pub fn success(self, source: Id, target: Id) -> Self {
        self.edge(source, target, LinkType::Success)
    }

    pub fn failure(self, source: Id, target: Id) -> Self {
        self.edge(source, target, LinkType::Failure)
    }

    pub fn always(self, source: Id, target: Id) -> Self {
        self.edge(source, target, LinkType::Always)
    }

    pub fn build(self) -> Vec<WorkflowNodeRecord> {
        self.records
    }
}
