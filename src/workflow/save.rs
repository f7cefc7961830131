//! Turns the edited chart into the REST calls that persist it.
//!
//! The plan is computed by diffing local nodes and links against the API
//! records they were loaded from. Execution is phase-ordered: node writes,
//! approval templates, disassociations, associations. The first failing call
//! stops everything after it.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::api::client::ApiClient;
use crate::api::models::{ApprovalTemplate, Id};
use crate::error::{ConsoleError, Result};
use crate::workflow::graph::{GraphNode, LinkType, NodeId, START_NODE_ID, successors};
use crate::workflow::state::VisualizerState;

/// A node as the backend will know it once node writes are done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeRef {
    Existing(Id),
    /// Created during this save; resolved after the create call returns.
    New(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeOp {
    Create {
        local: NodeId,
        unified_job_template: Option<Id>,
    },
    Update {
        node: Id,
        unified_job_template: Id,
    },
    Destroy(Id),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOp {
    Create { node: NodeRef, template: ApprovalTemplate },
    Update { template_id: Id, template: ApprovalTemplate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeOp {
    pub source: NodeRef,
    pub target: NodeRef,
    pub link_type: LinkType,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavePlan {
    pub node_ops: Vec<NodeOp>,
    pub approval_ops: Vec<ApprovalOp>,
    pub disassociate: Vec<EdgeOp>,
    pub associate: Vec<EdgeOp>,
}

impl SavePlan {
    pub fn len(&self) -> usize {
        self.node_ops.len() + self.approval_ops.len() + self.disassociate.len() + self.associate.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SaveReport {
    /// Local id -> id assigned by the backend.
    pub created: BTreeMap<NodeId, Id>,
    pub requests: usize,
}

fn node_ref(node: &GraphNode) -> NodeRef {
    match node.api_id() {
        Some(id) => NodeRef::Existing(id),
        None => NodeRef::New(node.id),
    }
}

pub fn plan_save(state: &VisualizerState) -> SavePlan {
    let mut plan = SavePlan::default();
    let mut deleted: HashSet<Id> = HashSet::new();

    for node in state.nodes.iter().filter(|n| !n.is_start()) {
        match (&node.original, node.is_deleted) {
            (Some(original), true) => {
                deleted.insert(original.id);
                plan.node_ops.push(NodeOp::Destroy(original.id));
            }
            (None, true) => {}
            (None, false) => {
                let template = node.unified_job_template.as_ref();
                if let Some(t) = template.filter(|t| t.is_approval()) {
                    plan.node_ops.push(NodeOp::Create {
                        local: node.id,
                        unified_job_template: None,
                    });
                    plan.approval_ops.push(ApprovalOp::Create {
                        node: NodeRef::New(node.id),
                        template: ApprovalTemplate::from(t),
                    });
                } else {
                    plan.node_ops.push(NodeOp::Create {
                        local: node.id,
                        unified_job_template: template.and_then(|t| t.id),
                    });
                }
            }
            (Some(original), false) if node.is_edited => {
                let Some(template) = node.unified_job_template.as_ref() else {
                    continue;
                };
                if template.is_approval() {
                    let existing = original
                        .summary_fields
                        .unified_job_template
                        .as_ref()
                        .filter(|t| t.is_approval())
                        .and_then(|t| t.id);
                    let op = match existing {
                        Some(template_id) => ApprovalOp::Update {
                            template_id,
                            template: ApprovalTemplate::from(template),
                        },
                        None => ApprovalOp::Create {
                            node: NodeRef::Existing(original.id),
                            template: ApprovalTemplate::from(template),
                        },
                    };
                    plan.approval_ops.push(op);
                } else if let Some(ujt) = template.id {
                    plan.node_ops.push(NodeOp::Update {
                        node: original.id,
                        unified_job_template: ujt,
                    });
                }
            }
            (Some(_), false) => {}
        }
    }

    let refs: HashMap<NodeId, NodeRef> = state
        .nodes
        .iter()
        .filter(|n| !n.is_deleted)
        .map(|n| (n.id, node_ref(n)))
        .collect();

    // Desired edges, keyed by (source, target).
    let mut wanted: HashMap<(NodeRef, NodeRef), LinkType> = HashMap::new();
    for link in state.links.iter().filter(|l| l.source != START_NODE_ID) {
        let (Some(&source), Some(&target)) = (refs.get(&link.source), refs.get(&link.target)) else {
            warn!(source = link.source, target = link.target, "Link references a missing node; skipping");
            continue;
        };
        wanted.insert((source, target), link.link_type);

        let already = match (source, state.node(link.source).and_then(|n| n.original.as_ref()), target) {
            (NodeRef::Existing(_), Some(original), NodeRef::Existing(target_id)) => {
                successors(original, link.link_type).contains(&target_id)
            }
            _ => false,
        };
        if !already {
            plan.associate.push(EdgeOp {
                source,
                target,
                link_type: link.link_type,
            });
        }
    }

    for node in state.nodes.iter().filter(|n| !n.is_deleted) {
        let Some(original) = &node.original else {
            continue;
        };
        for link_type in LinkType::ALL {
            for &successor in successors(original, link_type) {
                if deleted.contains(&successor) {
                    continue;
                }
                let key = (NodeRef::Existing(original.id), NodeRef::Existing(successor));
                if wanted.get(&key) != Some(&link_type) {
                    plan.disassociate.push(EdgeOp {
                        source: key.0,
                        target: key.1,
                        link_type,
                    });
                }
            }
        }
    }

    debug!(
        node_ops = plan.node_ops.len(),
        approval_ops = plan.approval_ops.len(),
        disassociate = plan.disassociate.len(),
        associate = plan.associate.len(),
        "Planned workflow save"
    );
    plan
}

fn resolve(created: &BTreeMap<NodeId, Id>, node: NodeRef) -> Result<Id> {
    match node {
        NodeRef::Existing(id) => Ok(id),
        NodeRef::New(local) => created.get(&local).copied().ok_or_else(|| {
            ConsoleError::GraphIntegrity(format!("node {} was never created", local))
        }),
    }
}

pub async fn execute_save(client: &ApiClient, template_id: Id, plan: &SavePlan) -> Result<SaveReport> {
    info!(template_id, requests = plan.len(), "Saving workflow");
    let mut report = SaveReport::default();

    for op in &plan.node_ops {
        match op {
            NodeOp::Create {
                local,
                unified_job_template,
            } => {
                let record = client.create_workflow_node(template_id, *unified_job_template).await?;
                report.created.insert(*local, record.id);
            }
            NodeOp::Update {
                node,
                unified_job_template,
            } => {
                client.update_workflow_node(*node, *unified_job_template).await?;
            }
            NodeOp::Destroy(node) => client.destroy_workflow_node(*node).await?,
        }
        report.requests += 1;
    }

    for op in &plan.approval_ops {
        match op {
            ApprovalOp::Create { node, template } => {
                let node = resolve(&report.created, *node)?;
                client.create_approval_template(node, template).await?;
            }
            ApprovalOp::Update { template_id, template } => {
                client.update_approval_template(*template_id, template).await?;
            }
        }
        report.requests += 1;
    }

    for edge in &plan.disassociate {
        let (source, target) = (resolve(&report.created, edge.source)?, resolve(&report.created, edge.target)?);
        client.disassociate_node(source, target, edge.link_type).await?;
        report.requests += 1;
    }

    for edge in &plan.associate {
        let (source, target) = (resolve(&report.created, edge.source)?, resolve(&report.created, edge.target)?);
        client.associate_node(source, target, edge.link_type).await?;
        report.requests += 1;
    }

    info!(template_id, requests = report.requests, created = report.created.len(), "Workflow saved");
    Ok(report)
}
