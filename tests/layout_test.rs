use awx_console::workflow::builder::WorkflowNodesBuilder;
use awx_console::workflow::graph::GraphNode;
use awx_console::workflow::layout::{link_endpoints, normalize_y};
use awx_console::workflow::{GraphBuildPolicy, LayoutConfig, Link, LinkType, START_NODE_ID, build_graph, layout};

fn diamond() -> (Vec<GraphNode>, Vec<Link>) {
    let records = WorkflowNodesBuilder::new()
        .job(1, "Build")
        .job(2, "Unit")
        .job(3, "Lint")
        .job(4, "Ship")
        .success(1, 2)
        .success(1, 3)
        .success(2, 4)
        .success(3, 4)
        .build();
    let graph = build_graph(&records, GraphBuildPolicy::Strict).expect("Failed to build graph");
    (graph.nodes, graph.links)
}

#[test]
fn test_layout_is_idempotent() {
    let (nodes, links) = diamond();
    let config = LayoutConfig::default();

    let first = layout(&nodes, &links, &config);
    let second = layout(&nodes, &links, &config);

    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn test_ranks_run_left_to_right() {
    let (nodes, links) = diamond();
    let config = LayoutConfig::default();
    let positions = layout(&nodes, &links, &config);

    let x = |id: u32| positions[&id].x;
    assert_eq!(x(START_NODE_ID), 0.0);
    assert!(x(2) > x(START_NODE_ID));
    assert!(x(3) > x(2));
    assert_eq!(x(3), x(4));
    assert!(x(5) > x(4));

    // Every edge points rightwards.
    for link in &links {
        let ((sx, _), (tx, _)) = link_endpoints(&positions, link).expect("Both ends are placed");
        assert!(tx > sx, "link {} -> {} points backwards", link.source, link.target);
    }
}

#[test]
fn test_rank_is_centred_and_separated() {
    let (nodes, links) = diamond();
    let config = LayoutConfig::default();
    let positions = layout(&nodes, &links, &config);

    let (upper, lower) = (positions[&3], positions[&4]);
    assert_eq!(upper.y, -(2.0 * config.node_height + config.node_sep) / 2.0);
    assert_eq!(lower.y - (upper.y + upper.height), config.node_sep);
    assert_eq!(positions[&START_NODE_ID].width, config.root_width);
}

#[test]
fn test_deleted_nodes_are_not_placed() {
    let (mut nodes, links) = diamond();
    nodes[2].is_deleted = true;

    let positions = layout(&nodes, &links, &LayoutConfig::default());

    assert!(!positions.contains_key(&3));
    assert_eq!(positions.len(), 4);
}

#[test]
fn test_cycle_does_not_stall_layout() {
    let nodes = vec![GraphNode::start(), GraphNode::new(2, None), GraphNode::new(3, None)];
    let links = vec![Link::new(2, 3, LinkType::Success), Link::new(3, 2, LinkType::Success)];

    let positions = layout(&nodes, &links, &LayoutConfig::default());

    assert_eq!(positions.len(), 3);
    assert!(positions[&3].x > positions[&2].x);
}

#[test]
fn test_normalize_y_is_relative_to_start() {
    let (nodes, links) = diamond();
    let positions = layout(&nodes, &links, &LayoutConfig::default());
    let root = positions[&START_NODE_ID];

    assert_eq!(normalize_y(&positions, root.y), 0.0);
    assert_eq!(normalize_y(&positions, root.y + 10.0), 10.0);
}

#[test]
fn test_rank_follows_longest_path() {
    let nodes = vec![
        GraphNode::start(),
        GraphNode::new(2, None),
        GraphNode::new(3, None),
        GraphNode::new(4, None),
    ];
    let links = vec![
        Link::new(START_NODE_ID, 2, LinkType::Always),
        Link::new(START_NODE_ID, 4, LinkType::Always),
        Link::new(2, 3, LinkType::Success),
        Link::new(3, 4, LinkType::Failure),
        // Closes a loop back to 2; ignored for ranking.
        Link::new(4, 2, LinkType::Success),
    ];

    let config = LayoutConfig::default();
    let positions = layout(&nodes, &links, &config);

    assert_eq!(positions.len(), 4);
    assert!(positions[&2].x < positions[&3].x);
    assert!(positions[&3].x < positions[&4].x);
    // One node per column: every column is centred on y = 0.
    assert_eq!(positions[&4].y, -config.node_height / 2.0);
}
