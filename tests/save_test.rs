use std::sync::Arc;

use awx_console::api::models::{ApprovalTemplate, TemplateKind, UnifiedJobTemplate};
use awx_console::api::{ApiClient, InMemoryTransport, Method};
use awx_console::workflow::builder::WorkflowNodesBuilder;
use awx_console::workflow::save::{ApprovalOp, EdgeOp, NodeOp, NodeRef};
use awx_console::workflow::{
    Action, GraphBuildPolicy, LinkType, VisualizerState, build_graph, execute_save, plan_save, save_visualizer,
};
use awx_console::ConsoleError;
use serde_json::json;

/// Node 10 -success-> 11 -always-> approval 12. Local ids 2, 3, 4.
fn loaded() -> VisualizerState {
    let records = WorkflowNodesBuilder::new()
        .job(10, "A")
        .job(11, "B")
        .approval(12, "Gate", 60)
        .success(10, 11)
        .always(11, 12)
        .build();
    let graph = build_graph(&records, GraphBuildPolicy::Strict).expect("Failed to build graph");
    let mut state = VisualizerState::default();
    state.dispatch(Action::GenerateNodesAndLinks(graph));
    state
}

fn setup() -> (Arc<InMemoryTransport>, ApiClient) {
    let transport = Arc::new(InMemoryTransport::new());
    let client = ApiClient::new(transport.clone());
    (transport, client)
}

fn edge(source: NodeRef, target: NodeRef, link_type: LinkType) -> EdgeOp {
    EdgeOp {
        source,
        target,
        link_type,
    }
}

#[test]
fn test_untouched_chart_needs_no_requests() {
    let state = loaded();
    let plan = plan_save(&state);
    assert!(plan.is_empty());
}

#[test]
fn test_deleted_node_is_destroyed_and_parent_relinked() {
    let mut state = loaded();
    state.dispatch(Action::SetNodeToDelete(Some(3)));
    state.dispatch(Action::DeleteNode);

    let plan = plan_save(&state);

    assert_eq!(plan.node_ops, vec![NodeOp::Destroy(11)]);
    // Links into a destroyed node go away with it.
    assert!(plan.disassociate.is_empty());
    assert_eq!(
        plan.associate,
        vec![edge(NodeRef::Existing(10), NodeRef::Existing(12), LinkType::Always)]
    );
}

#[test]
fn test_new_node_is_created_then_linked() {
    let mut state = loaded();
    state.dispatch(Action::StartAddNode { source: 2, target: None });
    state.dispatch(Action::CreateNode {
        link_type: LinkType::Failure,
        resource: UnifiedJobTemplate::named(99, "Cleanup", TemplateKind::JobTemplate),
    });

    let plan = plan_save(&state);

    assert_eq!(
        plan.node_ops,
        vec![NodeOp::Create {
            local: 5,
            unified_job_template: Some(99),
        }]
    );
    assert_eq!(
        plan.associate,
        vec![edge(NodeRef::Existing(10), NodeRef::New(5), LinkType::Failure)]
    );
    assert_eq!(plan.len(), 2);
}

#[test]
fn test_changed_link_type_is_swapped() {
    let mut state = loaded();
    let link = state.links.iter().find(|l| l.connects(2, 3)).cloned();
    state.dispatch(Action::SetLinkToEdit(link));
    state.dispatch(Action::UpdateLink(LinkType::Failure));

    let plan = plan_save(&state);

    assert!(plan.node_ops.is_empty());
    assert_eq!(
        plan.disassociate,
        vec![edge(NodeRef::Existing(10), NodeRef::Existing(11), LinkType::Success)]
    );
    assert_eq!(
        plan.associate,
        vec![edge(NodeRef::Existing(10), NodeRef::Existing(11), LinkType::Failure)]
    );
}

#[test]
fn test_edited_nodes() {
    let mut state = loaded();
    state.dispatch(Action::SetNodeToEdit(Some(2)));
    state.dispatch(Action::UpdateNode(UnifiedJobTemplate::named(
        42,
        "Other",
        TemplateKind::JobTemplate,
    )));

    let mut gate = UnifiedJobTemplate::named(12, "Gate 2", TemplateKind::WorkflowApprovalTemplate);
    gate.timeout = Some(120);
    state.dispatch(Action::SetNodeToEdit(Some(4)));
    state.dispatch(Action::UpdateNode(gate));

    let plan = plan_save(&state);

    assert_eq!(
        plan.node_ops,
        vec![NodeOp::Update {
            node: 10,
            unified_job_template: 42,
        }]
    );
    assert_eq!(
        plan.approval_ops,
        vec![ApprovalOp::Update {
            template_id: 12,
            template: ApprovalTemplate {
                name: "Gate 2".to_string(),
                description: String::new(),
                timeout: 120,
            },
        }]
    );
}

#[test]
fn test_new_approval_node_creates_template() {
    let mut state = loaded();
    let mut gate = UnifiedJobTemplate::default();
    gate.name = "Sign-off".to_string();
    gate.kind = Some(TemplateKind::WorkflowApprovalTemplate);
    state.dispatch(Action::StartAddNode { source: 4, target: None });
    state.dispatch(Action::CreateNode {
        link_type: LinkType::Success,
        resource: gate,
    });

    let plan = plan_save(&state);

    assert_eq!(
        plan.node_ops,
        vec![NodeOp::Create {
            local: 5,
            unified_job_template: None,
        }]
    );
    assert!(matches!(
        plan.approval_ops.as_slice(),
        [ApprovalOp::Create { node: NodeRef::New(5), template }] if template.name == "Sign-off"
    ));
}

#[tokio::test]
async fn test_execute_save_resolves_created_ids() {
    let (transport, client) = setup();
    transport.respond(
        Method::Post,
        "/api/v2/workflow_job_templates/7/workflow_nodes/",
        201,
        json!({"id": 501}),
    );
    transport.respond(
        Method::Post,
        "/api/v2/workflow_job_template_nodes/10/failure_nodes/",
        204,
        json!(null),
    );

    let mut state = loaded();
    state.dispatch(Action::StartAddNode { source: 2, target: None });
    state.dispatch(Action::CreateNode {
        link_type: LinkType::Failure,
        resource: UnifiedJobTemplate::named(99, "Cleanup", TemplateKind::JobTemplate),
    });
    let plan = plan_save(&state);

    let report = execute_save(&client, 7, &plan).await.expect("Save failed");

    assert_eq!(report.created.get(&5), Some(&501));
    assert_eq!(report.requests, 2);

    let posts = transport.requests_matching(Method::Post).await;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].body, Some(json!({"unified_job_template": 99})));
    assert_eq!(posts[1].body, Some(json!({"id": 501})));
}

#[tokio::test]
async fn test_execute_save_creates_approval_template_on_new_node() {
    let (transport, client) = setup();
    transport.respond(
        Method::Post,
        "/api/v2/workflow_job_templates/7/workflow_nodes/",
        201,
        json!({"id": 600}),
    );
    transport.respond(
        Method::Post,
        "/api/v2/workflow_job_template_nodes/600/create_approval_template/",
        201,
        json!({"id": 33}),
    );
    transport.respond(
        Method::Post,
        "/api/v2/workflow_job_template_nodes/12/success_nodes/",
        204,
        json!(null),
    );

    let mut state = loaded();
    let mut gate = UnifiedJobTemplate::default();
    gate.name = "Sign-off".to_string();
    gate.kind = Some(TemplateKind::WorkflowApprovalTemplate);
    gate.timeout = Some(300);
    state.dispatch(Action::StartAddNode { source: 4, target: None });
    state.dispatch(Action::CreateNode {
        link_type: LinkType::Success,
        resource: gate,
    });

    let report = execute_save(&client, 7, &plan_save(&state)).await.expect("Save failed");
    assert_eq!(report.requests, 3);

    let posts = transport.requests_matching(Method::Post).await;
    assert_eq!(posts[0].body, Some(json!({})));
    assert_eq!(
        posts[1].body,
        Some(json!({"name": "Sign-off", "description": "", "timeout": 300}))
    );
}

#[tokio::test]
async fn test_execute_save_stops_at_first_failure() {
    let (transport, client) = setup();
    transport.respond(
        Method::Delete,
        "/api/v2/workflow_job_template_nodes/11/",
        500,
        json!({"detail": "boom"}),
    );

    let mut state = loaded();
    state.dispatch(Action::SetNodeToDelete(Some(3)));
    state.dispatch(Action::DeleteNode);

    let err = execute_save(&client, 7, &plan_save(&state))
        .await
        .expect_err("Delete should fail");

    assert!(matches!(err, ConsoleError::Api(ref e) if e.status() == Some(500)));
    assert!(transport.requests_matching(Method::Post).await.is_empty());
}

#[tokio::test]
async fn test_save_visualizer_reports_failure() {
    let (transport, client) = setup();
    transport.respond(
        Method::Delete,
        "/api/v2/workflow_job_template_nodes/11/",
        403,
        json!({"detail": "nope"}),
    );

    let mut state = loaded();
    state.dispatch(Action::SetNodeToDelete(Some(3)));
    state.dispatch(Action::DeleteNode);

    let result = save_visualizer(&client, 7, &mut state, 200).await;

    assert!(result.is_err());
    let alert = state.content_error.expect("Alert is set");
    assert_eq!(alert.header, "Error!");
    assert_eq!(alert.message, "Failed to save workflow. DELETE returned status: 403");
}

#[tokio::test]
async fn test_save_visualizer_reloads_chart() {
    let (transport, client) = setup();
    transport.respond(
        Method::Delete,
        "/api/v2/workflow_job_template_nodes/11/",
        204,
        json!(null),
    );
    transport.respond(
        Method::Post,
        "/api/v2/workflow_job_template_nodes/10/always_nodes/",
        204,
        json!(null),
    );
    transport.respond_ok(
        Method::Get,
        "/api/v2/workflow_job_templates/7/workflow_nodes/?page=1&page_size=200",
        json!({
            "count": 2,
            "next": null,
            "results": [
                {"id": 10, "always_nodes": [12], "summary_fields": {"unified_job_template": {"id": 10, "name": "A", "type": "job_template"}}},
                {"id": 12, "summary_fields": {"unified_job_template": {"id": 12, "name": "Gate", "type": "workflow_approval_template"}}}
            ]
        }),
    );

    let mut state = loaded();
    state.dispatch(Action::SetNodeToDelete(Some(3)));
    state.dispatch(Action::DeleteNode);

    let report = save_visualizer(&client, 7, &mut state, 200).await.expect("Save failed");

    assert_eq!(report.requests, 2);
    assert!(!state.unsaved_changes);
    assert!(!state.is_loading);
    assert_eq!(state.total_nodes(), 2);
    assert!(state.content_error.is_none());
}
