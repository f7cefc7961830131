//! Hover/tooltip state of the chart and the pan/zoom transform.
//!
//! Renderers feed pointer events in and read back which element is on top,
//! which tooltip actions to draw and what the help panel says. Clicking an
//! action yields the reducer [`Action`] to dispatch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflow::graph::{Link, NodeId, START_NODE_ID};
use crate::workflow::layout::{PositionMap, normalize_y};
use crate::workflow::state::{Action, VisualizerState};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 2.0;
const ZOOM_STEP: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Node(NodeId),
    Link { source: NodeId, target: NodeId },
}

impl Element {
    pub fn link(link: &Link) -> Self {
        Element::Link {
            source: link.source,
            target: link.target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipAction {
    AddNode,
    AddBetween,
    ViewDetails,
    EditNode,
    EditLink,
    LinkNode,
    DeleteNode,
    DeleteLink,
    ConfirmLinkTarget,
}

impl TooltipAction {
    pub fn help_text(&self) -> &'static str {
        match self {
            TooltipAction::AddNode => "Add a new node",
            TooltipAction::AddBetween => "Add a new node between these two nodes",
            TooltipAction::ViewDetails => "View node details",
            TooltipAction::EditNode => "Edit this node",
            TooltipAction::EditLink => "Edit this link",
            TooltipAction::LinkNode => "Link to an available node",
            TooltipAction::DeleteNode => "Remove this node",
            TooltipAction::DeleteLink => "Remove this link",
            TooltipAction::ConfirmLinkTarget => "Click to create a new link to this node.",
        }
    }
}

/// Content of the help side panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpText {
    Action(TooltipAction),
    /// Details of the hovered node or link.
    Element(Element),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Hovering(Element),
    TooltipOpen(Element),
}

/// Actions offered for an element in the current editing state.
pub fn available_actions(state: &VisualizerState, element: Element, read_only: bool) -> Vec<TooltipAction> {
    if state.adding_link {
        return match element {
            Element::Node(id) => match state.node(id) {
                Some(node) if !node.is_invalid_link_target && !node.is_deleted => {
                    vec![TooltipAction::ConfirmLinkTarget]
                }
                _ => Vec::new(),
            },
            Element::Link { .. } => Vec::new(),
        };
    }

    match element {
        Element::Node(START_NODE_ID) => {
            if read_only {
                Vec::new()
            } else {
                vec![TooltipAction::AddNode]
            }
        }
        Element::Node(id) => match state.node(id) {
            Some(node) if node.is_deleted => Vec::new(),
            Some(_) if read_only => vec![TooltipAction::ViewDetails],
            Some(_) => vec![
                TooltipAction::AddNode,
                TooltipAction::ViewDetails,
                TooltipAction::EditNode,
                TooltipAction::LinkNode,
                TooltipAction::DeleteNode,
            ],
            None => Vec::new(),
        },
        Element::Link { .. } if read_only => Vec::new(),
        Element::Link { source: START_NODE_ID, .. } => vec![TooltipAction::AddBetween],
        Element::Link { .. } => vec![
            TooltipAction::AddBetween,
            TooltipAction::EditLink,
            TooltipAction::DeleteLink,
        ],
    }
}

/// Pointer-driven UI state of the chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interaction {
    pub phase: Phase,
    pub help: Option<HelpText>,
    /// Paint order, last drawn on top.
    pub draw_order: Vec<Element>,
    pub read_only: bool,
    pub transform: ZoomTransform,
}

impl Interaction {
    pub fn new(read_only: bool) -> Self {
        Self {
            read_only,
            ..Default::default()
        }
    }

    /// Rebuilds paint order after the chart changed: links first, then nodes.
    pub fn sync(&mut self, state: &VisualizerState) {
        self.draw_order = state
            .links
            .iter()
            .map(Element::link)
            .chain(state.nodes.iter().filter(|n| !n.is_deleted).map(|n| Element::Node(n.id)))
            .collect();
        if let Phase::Hovering(el) | Phase::TooltipOpen(el) = self.phase {
            if !self.draw_order.contains(&el) {
                self.phase = Phase::Idle;
                self.help = None;
            }
        }
    }

    pub fn raise(&mut self, element: Element) {
        self.draw_order.retain(|e| *e != element);
        self.draw_order.push(element);
    }

    fn lower(&mut self, element: Element) {
        self.draw_order.retain(|e| *e != element);
        self.draw_order.insert(0, element);
    }

    pub fn hover_enter(&mut self, state: &VisualizerState, element: Element) {
        self.raise(element);
        self.help = Some(HelpText::Element(element));
        self.phase = if available_actions(state, element, self.read_only).is_empty() {
            Phase::Hovering(element)
        } else {
            Phase::TooltipOpen(element)
        };
    }

    pub fn hover_leave(&mut self) {
        if let Phase::Hovering(el @ Element::Link { .. }) | Phase::TooltipOpen(el @ Element::Link { .. }) = self.phase {
            self.lower(el);
        }
        self.phase = Phase::Idle;
        self.help = None;
    }

    pub fn hover_action(&mut self, action: TooltipAction) {
        if matches!(self.phase, Phase::TooltipOpen(_)) {
            self.help = Some(HelpText::Action(action));
        }
    }

    pub fn leave_action(&mut self) {
        self.help = match self.phase {
            Phase::Hovering(el) | Phase::TooltipOpen(el) => Some(HelpText::Element(el)),
            Phase::Idle => None,
        };
    }

    /// Resolves a click on a tooltip action of the open element. Actions not
    /// offered for that element are ignored.
    pub fn click(&mut self, state: &VisualizerState, action: TooltipAction) -> Option<Action> {
        let Phase::TooltipOpen(element) = self.phase else {
            return None;
        };
        if !available_actions(state, element, self.read_only).contains(&action) {
            return None;
        }
        let dispatched = to_action(state, element, action)?;
        debug!(?element, ?action, "Tooltip action clicked");
        self.phase = Phase::Idle;
        self.help = None;
        Some(dispatched)
    }
}

fn to_action(state: &VisualizerState, element: Element, action: TooltipAction) -> Option<Action> {
    match element {
        Element::Node(id) => match action {
            TooltipAction::AddNode => Some(Action::StartAddNode { source: id, target: None }),
            TooltipAction::ViewDetails => Some(Action::SetNodeToView(Some(id))),
            TooltipAction::EditNode => Some(Action::SetNodeToEdit(Some(id))),
            TooltipAction::LinkNode => Some(Action::SelectSourceForLinking(id)),
            TooltipAction::DeleteNode => Some(Action::SetNodeToDelete(Some(id))),
            TooltipAction::ConfirmLinkTarget => Some(Action::SetAddLinkTargetNode(Some(id))),
            _ => None,
        },
        Element::Link { source, target } => {
            let link = state.links.iter().find(|l| l.connects(source, target))?.clone();
            match action {
                TooltipAction::AddBetween => Some(Action::StartAddNode {
                    source,
                    target: Some(target),
                }),
                TooltipAction::EditLink => Some(Action::SetLinkToEdit(Some(link))),
                TooltipAction::DeleteLink => Some(Action::StartDeleteLink(link)),
                _ => None,
            }
        }
    }
}

/// Pan/zoom transform applied to the chart group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, k: 1.0 }
    }
}

impl ZoomTransform {
    pub fn scale_to(&mut self, k: f64) {
        self.k = k.clamp(MIN_SCALE, MAX_SCALE);
    }

    pub fn zoom_in(&mut self) {
        self.scale_to(self.k * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.scale_to(self.k / ZOOM_STEP);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Scales the chart to fit the viewport and centres the first rank
    /// vertically.
    pub fn fit(&mut self, positions: &PositionMap, viewport_width: f64, viewport_height: f64, node_height: f64) {
        let Some((width, height)) = bounds(positions) else {
            self.reset();
            return;
        };
        let lower = (viewport_height / height).min(viewport_width / width);
        let k = if (0.5..=2.0).contains(&lower) {
            (lower * 1000.0).floor() / 1000.0
        } else {
            lower
        };
        self.scale_to(k);
        self.x = 0.0;
        self.y = viewport_height / 2.0 - node_height * self.k / 2.0;
    }

    /// Screen point to chart coordinates.
    pub fn invert(&self, px: f64, py: f64) -> (f64, f64) {
        ((px - self.x) / self.k, (py - self.y) / self.k)
    }

    pub fn svg_transform(&self) -> String {
        format!("translate({},{}) scale({})", self.x, self.y, self.k)
    }
}

/// Width and height of the drawn chart.
pub fn bounds(positions: &PositionMap) -> Option<(f64, f64)> {
    let mut iter = positions.values();
    let first = iter.next()?;
    let (mut x0, mut y0) = (first.x, first.y);
    let (mut x1, mut y1) = (first.x + first.width, first.y + first.height);
    for p in iter {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x + p.width);
        y1 = y1.max(p.y + p.height);
    }
    Some(((x1 - x0).max(1.0), (y1 - y0).max(1.0)))
}

/// Topmost node under a screen point.
pub fn hit_test(positions: &PositionMap, transform: &ZoomTransform, px: f64, py: f64) -> Option<NodeId> {
    let (gx, gy) = transform.invert(px, py);
    positions
        .iter()
        .rev()
        .find(|(_, p)| {
            let mut drawn = **p;
            drawn.y = normalize_y(positions, p.y);
            drawn.contains(gx, gy)
        })
        .map(|(id, _)| *id)
}
