use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::api::models::UnifiedJobTemplate;
use crate::error::ErrorMessage;
use crate::workflow::graph::{GraphNode, Link, LinkType, NodeId, START_NODE_ID, WorkflowGraph, parent_map};
use crate::workflow::layout::{LayoutConfig, PositionMap, layout};

/// Everything the visualizer screen renders from. Only [`reduce`] changes it.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizerState {
    pub add_link_source_node: Option<NodeId>,
    pub add_link_target_node: Option<NodeId>,
    pub add_node_source: Option<NodeId>,
    pub add_node_target: Option<NodeId>,
    pub adding_link: bool,
    pub content_error: Option<ErrorMessage>,
    pub is_loading: bool,
    pub link_to_delete: Option<Link>,
    pub link_to_edit: Option<Link>,
    pub links: Vec<Link>,
    pub next_node_id: NodeId,
    pub node_positions: Option<PositionMap>,
    pub nodes: Vec<GraphNode>,
    pub node_to_delete: Option<NodeId>,
    pub node_to_edit: Option<NodeId>,
    pub node_to_view: Option<NodeId>,
    pub show_delete_all_nodes_modal: bool,
    pub show_legend: bool,
    pub show_tools: bool,
    pub show_unsaved_changes_modal: bool,
    pub unsaved_changes: bool,
}

impl Default for VisualizerState {
    fn default() -> Self {
        Self {
            add_link_source_node: None,
            add_link_target_node: None,
            add_node_source: None,
            add_node_target: None,
            adding_link: false,
            content_error: None,
            is_loading: true,
            link_to_delete: None,
            link_to_edit: None,
            links: Vec::new(),
            next_node_id: 0,
            node_positions: None,
            nodes: Vec::new(),
            node_to_delete: None,
            node_to_edit: None,
            node_to_view: None,
            show_delete_all_nodes_modal: false,
            show_legend: false,
            show_tools: false,
            show_unsaved_changes_modal: false,
            unsaved_changes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CancelLink,
    CancelNodeModal,
    CreateLink(LinkType),
    CreateNode {
        link_type: LinkType,
        resource: UnifiedJobTemplate,
    },
    DeleteAllNodes,
    DeleteLink,
    DeleteNode,
    GenerateNodesAndLinks(WorkflowGraph),
    Reset,
    SelectSourceForLinking(NodeId),
    SetAddLinkTargetNode(Option<NodeId>),
    SetContentError(Option<ErrorMessage>),
    SetIsLoading(bool),
    SetLinkToDelete(Option<Link>),
    SetLinkToEdit(Option<Link>),
    SetNodePositions(Option<PositionMap>),
    SetNodeToDelete(Option<NodeId>),
    SetNodeToEdit(Option<NodeId>),
    SetNodeToView(Option<NodeId>),
    StartAddNode {
        source: NodeId,
        target: Option<NodeId>,
    },
    StartDeleteLink(Link),
    ToggleDeleteAllNodesModal,
    ToggleLegend,
    ToggleTools,
    ToggleUnsavedChangesModal,
    UpdateLink(LinkType),
    UpdateNode(UnifiedJobTemplate),
}

impl VisualizerState {
    /// Applies an action and re-runs the layout when the chart structure changed.
    pub fn dispatch(&mut self, action: Action) {
        let before = (self.nodes.len(), self.links.clone(), deleted_ids(&self.nodes));
        let state = std::mem::take(self);
        *self = reduce(state, action);

        let structural = before.0 != self.nodes.len()
            || before.1 != self.links
            || before.2 != deleted_ids(&self.nodes);
        if structural {
            self.node_positions = if self.nodes.is_empty() {
                None
            } else {
                Some(layout(&self.nodes, &self.links, &LayoutConfig::default()))
            };
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Live nodes, START excluded.
    pub fn total_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_start() && !n.is_deleted).count()
    }

    pub fn is_read_only(&self) -> bool {
        self.adding_link
    }
}

fn deleted_ids(nodes: &[GraphNode]) -> Vec<NodeId> {
    nodes.iter().filter(|n| n.is_deleted).map(|n| n.id).collect()
}

pub fn reduce(state: VisualizerState, action: Action) -> VisualizerState {
    match action {
        Action::CancelLink => cancel_link(state),
        Action::CancelNodeModal => VisualizerState {
            add_node_source: None,
            add_node_target: None,
            node_to_edit: None,
            ..state
        },
        Action::CreateLink(link_type) => create_link(state, link_type),
        Action::CreateNode { link_type, resource } => create_node(state, link_type, resource),
        Action::DeleteAllNodes => delete_all_nodes(state),
        Action::DeleteLink => delete_link(state),
        Action::DeleteNode => delete_node(state),
        Action::GenerateNodesAndLinks(graph) => {
            debug!(nodes = graph.nodes.len(), links = graph.links.len(), "Loaded workflow graph into visualizer");
            VisualizerState {
                nodes: graph.nodes,
                links: graph.links,
                next_node_id: graph.next_node_id,
                ..state
            }
        }
        Action::Reset => VisualizerState::default(),
        Action::SelectSourceForLinking(source) => select_source_for_linking(state, source),
        Action::SetAddLinkTargetNode(target) => {
            let invalid = target
                .and_then(|id| state.node(id))
                .is_some_and(|n| n.is_invalid_link_target);
            if invalid {
                return state;
            }
            VisualizerState {
                add_link_target_node: target,
                ..state
            }
        }
        Action::SetContentError(content_error) => VisualizerState { content_error, ..state },
        Action::SetIsLoading(is_loading) => VisualizerState { is_loading, ..state },
        Action::SetLinkToDelete(link_to_delete) => VisualizerState { link_to_delete, ..state },
        Action::SetLinkToEdit(link_to_edit) => VisualizerState { link_to_edit, ..state },
        Action::SetNodePositions(node_positions) => VisualizerState { node_positions, ..state },
        Action::SetNodeToDelete(node_to_delete) => VisualizerState { node_to_delete, ..state },
        Action::SetNodeToEdit(node_to_edit) => VisualizerState { node_to_edit, ..state },
        Action::SetNodeToView(node_to_view) => VisualizerState { node_to_view, ..state },
        Action::StartAddNode { source, target } => VisualizerState {
            add_node_source: Some(source),
            add_node_target: target,
            ..state
        },
        Action::StartDeleteLink(mut link) => {
            let parents = state.links.iter().filter(|l| l.target == link.target).count();
            link.is_convergence_link = parents > 1;
            VisualizerState {
                link_to_delete: Some(link),
                ..state
            }
        }
        Action::ToggleDeleteAllNodesModal => VisualizerState {
            show_delete_all_nodes_modal: !state.show_delete_all_nodes_modal,
            ..state
        },
        Action::ToggleLegend => VisualizerState {
            show_legend: !state.show_legend,
            ..state
        },
        Action::ToggleTools => VisualizerState {
            show_tools: !state.show_tools,
            ..state
        },
        Action::ToggleUnsavedChangesModal => VisualizerState {
            show_unsaved_changes_modal: !state.show_unsaved_changes_modal,
            ..state
        },
        Action::UpdateLink(link_type) => update_link(state, link_type),
        Action::UpdateNode(resource) => update_node(state, resource),
    }
}

fn clear_invalid_targets(nodes: &mut [GraphNode]) {
    for node in nodes {
        node.is_invalid_link_target = false;
    }
}

fn cancel_link(mut state: VisualizerState) -> VisualizerState {
    clear_invalid_targets(&mut state.nodes);
    VisualizerState {
        add_link_source_node: None,
        add_link_target_node: None,
        adding_link: false,
        link_to_edit: None,
        ..state
    }
}

fn create_link(mut state: VisualizerState, link_type: LinkType) -> VisualizerState {
    let (Some(source), Some(target)) = (state.add_link_source_node, state.add_link_target_node) else {
        warn!("CreateLink dispatched without a source and target; ignoring");
        return cancel_link(state);
    };

    // A node that gains a real parent no longer hangs off START.
    state.links.retain(|l| !l.connects(START_NODE_ID, target));
    state.links.push(Link::new(source, target, link_type));
    debug!(source, target, %link_type, "Created link");

    let mut state = cancel_link(state);
    state.unsaved_changes = true;
    state
}

fn create_node(mut state: VisualizerState, link_type: LinkType, resource: UnifiedJobTemplate) -> VisualizerState {
    let Some(source) = state.add_node_source else {
        warn!("CreateNode dispatched without a source node; ignoring");
        return state;
    };
    let new_id = state.next_node_id;

    if let Some(target) = state.add_node_target {
        for link in state.links.iter_mut().filter(|l| l.connects(source, target)) {
            link.source = new_id;
        }
    }
    let link_type = if source == START_NODE_ID { LinkType::Always } else { link_type };
    state.links.push(Link::new(source, new_id, link_type));
    state.nodes.push(GraphNode::new(new_id, Some(resource)));
    debug!(node = new_id, source, target = ?state.add_node_target, "Created node");

    VisualizerState {
        add_node_source: None,
        add_node_target: None,
        next_node_id: new_id + 1,
        unsaved_changes: true,
        ..state
    }
}

fn delete_all_nodes(mut state: VisualizerState) -> VisualizerState {
    for node in state.nodes.iter_mut().filter(|n| !n.is_start()) {
        node.is_deleted = true;
    }
    debug!(nodes = state.nodes.len().saturating_sub(1), "Deleted all nodes");
    VisualizerState {
        add_link_source_node: None,
        add_link_target_node: None,
        adding_link: false,
        links: Vec::new(),
        show_delete_all_nodes_modal: false,
        unsaved_changes: true,
        ..state
    }
}

fn delete_link(mut state: VisualizerState) -> VisualizerState {
    let Some(doomed) = state.link_to_delete.take() else {
        return state;
    };
    state.links.retain(|l| !l.connects(doomed.source, doomed.target));
    if !doomed.is_convergence_link {
        state.links.push(Link::new(START_NODE_ID, doomed.target, LinkType::Always));
    }
    debug!(source = doomed.source, target = doomed.target, "Deleted link");

    VisualizerState {
        unsaved_changes: true,
        ..state
    }
}

fn delete_node(mut state: VisualizerState) -> VisualizerState {
    let Some(doomed) = state.node_to_delete.take() else {
        return state;
    };
    if doomed == START_NODE_ID {
        warn!("START node cannot be deleted");
        return state;
    }
    if let Some(node) = state.nodes.iter_mut().find(|n| n.id == doomed) {
        node.is_deleted = true;
    }

    let parents_of = parent_map(&state.links);
    let parents: Vec<NodeId> = state
        .links
        .iter()
        .filter(|l| l.target == doomed)
        .map(|l| l.source)
        .collect();
    let children: Vec<(NodeId, LinkType)> = state
        .links
        .iter()
        .filter(|l| l.source == doomed)
        .map(|l| (l.target, l.link_type))
        .collect();
    state.links.retain(|l| l.source != doomed && l.target != doomed);

    for &parent in &parents {
        for &(child, link_type) in &children {
            let child_parents = parents_of.get(&child).map(Vec::as_slice).unwrap_or_default();
            if parent == START_NODE_ID {
                // START only adopts children that would otherwise be orphaned.
                if child_parents.len() == 1 {
                    state.links.push(Link::new(START_NODE_ID, child, LinkType::Always));
                }
            } else if !child_parents.contains(&parent) {
                state.links.push(Link::new(parent, child, link_type));
            }
        }
    }
    debug!(node = doomed, parents = parents.len(), children = children.len(), "Deleted node");

    VisualizerState {
        unsaved_changes: true,
        ..state
    }
}

/// Marks every node that cannot be the target of a new link from `source`:
/// the source itself, START, its direct children, and all of its ancestors.
fn select_source_for_linking(mut state: VisualizerState, source: NodeId) -> VisualizerState {
    let mut invalid: HashSet<NodeId> = HashSet::from([source, START_NODE_ID]);
    invalid.extend(state.links.iter().filter(|l| l.source == source).map(|l| l.target));

    let parents: HashMap<NodeId, Vec<NodeId>> = parent_map(&state.links);
    let mut stack = vec![source];
    while let Some(id) = stack.pop() {
        for &parent in parents.get(&id).into_iter().flatten() {
            if parent != START_NODE_ID && invalid.insert(parent) {
                stack.push(parent);
            }
        }
    }

    for node in state.nodes.iter_mut() {
        node.is_invalid_link_target = invalid.contains(&node.id);
    }
    VisualizerState {
        add_link_source_node: Some(source),
        adding_link: true,
        ..state
    }
}

fn update_link(mut state: VisualizerState, link_type: LinkType) -> VisualizerState {
    let Some(edited) = state.link_to_edit.take() else {
        return state;
    };
    for link in state.links.iter_mut().filter(|l| l.connects(edited.source, edited.target)) {
        link.link_type = link_type;
    }
    VisualizerState {
        unsaved_changes: true,
        ..state
    }
}

fn update_node(mut state: VisualizerState, resource: UnifiedJobTemplate) -> VisualizerState {
    let Some(edited) = state.node_to_edit.take() else {
        return state;
    };
    if let Some(node) = state.nodes.iter_mut().find(|n| n.id == edited) {
        node.unified_job_template = Some(resource);
        node.is_edited = true;
    }
    VisualizerState {
        unsaved_changes: true,
        ..state
    }
}
