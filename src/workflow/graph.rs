use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::client::{ApiClient, ApiResult};
use crate::api::endpoints::workflow_nodes_path;
use crate::api::models::{Id, UnifiedJobTemplate, WorkflowNodeRecord};
use crate::error::{ConsoleError, Result};

/// Local (client-side) node identifier. Stable for the life of an editing session.
pub type NodeId = u32;

/// 合成的起始节点 (synthetic START node)
pub const START_NODE_ID: NodeId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Success,
    Failure,
    Always,
}

impl LinkType {
    pub const ALL: [LinkType; 3] = [LinkType::Success, LinkType::Failure, LinkType::Always];

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Success => "success",
            LinkType::Failure => "failure",
            LinkType::Always => "always",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(LinkType::Success),
            "failure" => Some(LinkType::Failure),
            "always" => Some(LinkType::Always),
            _ => None,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub unified_job_template: Option<UnifiedJobTemplate>,
    /// The API record this node was built from; `None` for nodes added locally.
    pub original: Option<WorkflowNodeRecord>,
    pub job: Option<Value>,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub is_invalid_link_target: bool,
}

impl GraphNode {
    pub fn start() -> Self {
        Self::new(START_NODE_ID, None)
    }

    pub fn new(id: NodeId, unified_job_template: Option<UnifiedJobTemplate>) -> Self {
        Self {
            id,
            unified_job_template,
            original: None,
            job: None,
            is_deleted: false,
            is_edited: false,
            is_invalid_link_target: false,
        }
    }

    pub fn is_start(&self) -> bool {
        self.id == START_NODE_ID
    }

    pub fn api_id(&self) -> Option<Id> {
        self.original.as_ref().map(|o| o.id)
    }

    pub fn label(&self) -> &str {
        if self.is_start() {
            return "START";
        }
        match &self.unified_job_template {
            Some(t) if !t.name.is_empty() => &t.name,
            _ => "DELETED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    pub link_type: LinkType,
    /// Set when a delete is started: true if the target has more than one parent.
    pub is_convergence_link: bool,
}

impl Link {
    pub fn new(source: NodeId, target: NodeId, link_type: LinkType) -> Self {
        Self {
            source,
            target,
            link_type,
            is_convergence_link: false,
        }
    }

    pub fn connects(&self, source: NodeId, target: NodeId) -> bool {
        self.source == source && self.target == target
    }
}

/// What to do with a successor id that is not among the fetched nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphBuildPolicy {
    /// Fail with [`ConsoleError::GraphIntegrity`].
    #[default]
    Strict,
    /// Skip the edge and log a warning.
    DropDangling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowGraph {
    pub nodes: Vec<GraphNode>,
    pub links: Vec<Link>,
    /// Next free local id for nodes added during editing.
    pub next_node_id: NodeId,
}

impl WorkflowGraph {
    /// Nodes hanging directly off START.
    pub fn root_node_ids(&self) -> Vec<NodeId> {
        self.links
            .iter()
            .filter(|l| l.source == START_NODE_ID)
            .map(|l| l.target)
            .collect()
    }
}

/// Builds the chart model from flat API records. Local id 1 is reserved for
/// START; fetched nodes get 2, 3, ... in record order.
pub fn build_graph(records: &[WorkflowNodeRecord], policy: GraphBuildPolicy) -> Result<WorkflowGraph> {
    // 1. Pass 1: Indexing
    let mut nodes = vec![GraphNode::start()];
    let mut id_map: HashMap<Id, NodeId> = HashMap::with_capacity(records.len());
    let mut next_id = START_NODE_ID + 1;

    for record in records {
        if id_map.insert(record.id, next_id).is_some() {
            return Err(ConsoleError::GraphIntegrity(format!(
                "duplicate workflow node id {}",
                record.id
            )));
        }
        let mut node = GraphNode::new(next_id, record.summary_fields.unified_job_template.clone());
        node.job = record.summary_fields.job.clone();
        node.original = Some(record.clone());
        nodes.push(node);
        next_id += 1;
    }

    // 2. Pass 2: Edges
    let mut links = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();

    for record in records {
        let source = id_map[&record.id];
        for link_type in LinkType::ALL {
            for successor in successors(record, link_type) {
                let Some(&target) = id_map.get(successor) else {
                    match policy {
                        GraphBuildPolicy::Strict => {
                            return Err(ConsoleError::GraphIntegrity(format!(
                                "workflow node {} references missing {} successor {}",
                                record.id, link_type, successor
                            )));
                        }
                        GraphBuildPolicy::DropDangling => {
                            warn!(node = record.id, successor, %link_type, "Dropping edge to unknown workflow node");
                            continue;
                        }
                    }
                };
                links.push(Link::new(source, target, link_type));
                seen.insert(target);
            }
        }
    }

    // 3. Roots hang off START
    for node in nodes.iter().skip(1) {
        if !seen.contains(&node.id) {
            links.push(Link::new(START_NODE_ID, node.id, LinkType::Always));
        }
    }

    debug!(nodes = nodes.len(), links = links.len(), "Built workflow graph");
    Ok(WorkflowGraph {
        nodes,
        links,
        next_node_id: next_id,
    })
}

pub fn successors(record: &WorkflowNodeRecord, link_type: LinkType) -> &[Id] {
    match link_type {
        LinkType::Success => &record.success_nodes,
        LinkType::Failure => &record.failure_nodes,
        LinkType::Always => &record.always_nodes,
    }
}

/// target -> sources, over the given links.
pub fn parent_map(links: &[Link]) -> HashMap<NodeId, Vec<NodeId>> {
    let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for link in links {
        parents.entry(link.target).or_default().push(link.source);
    }
    parents
}

/// Pulls every node of a workflow template, following the `next` cursor.
pub async fn fetch_workflow_nodes(client: &ApiClient, template_id: Id, page_size: u32) -> ApiResult<Vec<WorkflowNodeRecord>> {
    debug!(template_id, path = %workflow_nodes_path(template_id), "Fetching workflow nodes");
    let mut records = Vec::new();
    let mut page = 1;
    loop {
        let data = client.read_workflow_nodes(template_id, page, page_size).await?;
        records.extend(data.results);
        if data.next.is_none() {
            return Ok(records);
        }
        page += 1;
    }
}
