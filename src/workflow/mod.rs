pub mod builder;
pub mod graph;
pub mod interaction;
pub mod layout;
pub mod save;
pub mod state;

use tracing::{info, warn};

use crate::api::client::ApiClient;
use crate::api::models::Id;
use crate::error::{ConsoleError, ErrorMessage, Result};

pub use graph::{GraphBuildPolicy, GraphNode, Link, LinkType, NodeId, START_NODE_ID, WorkflowGraph, build_graph};
pub use layout::{LayoutConfig, NodePosition, PositionMap, layout};
pub use save::{SavePlan, SaveReport, execute_save, plan_save};
pub use state::{Action, VisualizerState};

/// Loads a workflow template into a fresh visualizer. Failures end up in
/// `content_error`; the returned state is always usable.
pub async fn load_visualizer(
    client: &ApiClient,
    template_id: Id,
    page_size: u32,
    policy: GraphBuildPolicy,
) -> VisualizerState {
    let mut state = VisualizerState::default();

    match graph::fetch_workflow_nodes(client, template_id, page_size).await {
        Ok(records) => match build_graph(&records, policy) {
            Ok(graph) => {
                info!(template_id, nodes = records.len(), "Loaded workflow");
                state.dispatch(Action::GenerateNodesAndLinks(graph));
            }
            Err(e) => {
                warn!(template_id, error = %e, "Workflow graph rejected");
                state.dispatch(Action::SetContentError(Some(ErrorMessage::new("Error!", e.to_string()))));
            }
        },
        Err(e) => {
            state.dispatch(Action::SetContentError(Some(e.to_message("retrieve workflow nodes"))));
        }
    }

    state.dispatch(Action::SetIsLoading(false));
    state
}

/// Persists the edits and reloads the chart from the server.
pub async fn save_visualizer(
    client: &ApiClient,
    template_id: Id,
    state: &mut VisualizerState,
    page_size: u32,
) -> Result<SaveReport> {
    let plan = plan_save(state);
    match execute_save(client, template_id, &plan).await {
        Ok(report) => {
            *state = load_visualizer(client, template_id, page_size, GraphBuildPolicy::Strict).await;
            Ok(report)
        }
        Err(e) => {
            let message = match &e {
                ConsoleError::Api(api) => api.to_message("save workflow"),
                other => ErrorMessage::new("Error!", other.to_string()),
            };
            state.dispatch(Action::SetContentError(Some(message)));
            Err(e)
        }
    }
}
