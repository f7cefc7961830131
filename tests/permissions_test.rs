use std::sync::Arc;

use awx_console::api::{ApiClient, InMemoryTransport, ListQuery, Method, ResourceKind};
use awx_console::api::models::AccessRecord;
use awx_console::forms::permissions::{
    Grantee, RoleAssignment, access_list, access_list_controller, grant_all, removable_roles, revoke_all,
};
use serde_json::{Value, json};

fn setup() -> (Arc<InMemoryTransport>, ApiClient) {
    let transport = Arc::new(InMemoryTransport::new());
    let client = ApiClient::new(transport.clone());
    (transport, client)
}

fn access_record() -> AccessRecord {
    serde_json::from_value(json!({
        "id": 4,
        "username": "alice",
        "summary_fields": {
            "direct_access": [
                {"role": {"id": 30, "name": "Admin"}},
                {"role": {"id": 31, "name": "Use", "team_id": 9, "team_name": "Ops"}}
            ],
            "indirect_access": [
                {"role": {"id": 1, "name": "System Administrator"}}
            ]
        }
    }))
    .expect("Valid access record")
}

#[test]
fn test_removable_roles_route_team_roles_to_team() {
    let roles = removable_roles(&access_record());

    assert_eq!(
        roles,
        vec![
            RoleAssignment {
                grantee: Grantee::User(4),
                role_id: 30,
                role_name: "Admin".to_string(),
            },
            RoleAssignment {
                grantee: Grantee::Team(9),
                role_id: 31,
                role_name: "Use".to_string(),
            },
        ]
    );
}

#[test]
fn test_roles_paths() {
    assert_eq!(Grantee::User(4).roles_path(), "/api/v2/users/4/roles/");
    assert_eq!(Grantee::Team(9).roles_path(), "/api/v2/teams/9/roles/");
}

#[tokio::test]
async fn test_access_list_controller_orders_by_username() {
    let (transport, client) = setup();
    transport.respond_ok(
        Method::Get,
        "/api/v2/credentials/3/access_list/?page=1&page_size=20&order_by=username",
        json!({"count": 1, "results": [access_record()]}),
    );

    let mut list = access_list_controller(ResourceKind::Credentials, 3, 20);
    list.fetch(&client).await.expect("Fetch failed");

    assert_eq!(list.count, 1);
    assert_eq!(list.rows[0].username, "alice");
    assert_eq!(list.rows[0].summary_fields.direct_access.len(), 2);
}

#[tokio::test]
async fn test_access_list_request() {
    let (transport, client) = setup();
    transport.respond_ok(
        Method::Get,
        "/api/v2/organizations/2/access_list/?page=2&page_size=5",
        json!({"count": 6, "results": [{"id": 8, "username": "bob"}]}),
    );

    let mut query = ListQuery::new(5);
    query.page = 2;
    let page = access_list(&client, ResourceKind::Organizations, 2, &query)
        .await
        .expect("Access list failed");

    assert_eq!(page.count, 6);
    assert!(page.results[0].summary_fields.direct_access.is_empty());
}

#[tokio::test]
async fn test_grant_all_posts_each_role_to_each_grantee() {
    let (transport, client) = setup();
    for path in ["/api/v2/users/1/roles/", "/api/v2/teams/2/roles/"] {
        transport.respond(Method::Post, path, 204, Value::Null);
    }

    let granted = grant_all(&client, &[Grantee::User(1), Grantee::Team(2)], &[10, 11])
        .await
        .expect("Grant failed");

    assert_eq!(granted, 4);
    let posts = transport.requests_matching(Method::Post).await;
    let sent: Vec<(String, Value)> = posts
        .iter()
        .map(|r| (r.path.clone(), r.body.clone().unwrap_or_default()))
        .collect();
    assert_eq!(
        sent,
        vec![
            ("/api/v2/users/1/roles/".to_string(), json!({"id": 10})),
            ("/api/v2/users/1/roles/".to_string(), json!({"id": 11})),
            ("/api/v2/teams/2/roles/".to_string(), json!({"id": 10})),
            ("/api/v2/teams/2/roles/".to_string(), json!({"id": 11})),
        ]
    );
}

#[tokio::test]
async fn test_grant_all_reports_first_failure_but_sends_everything() {
    let (transport, client) = setup();
    transport.respond(Method::Post, "/api/v2/users/1/roles/", 400, json!({"msg": "bad role"}));
    transport.respond(Method::Post, "/api/v2/teams/2/roles/", 204, Value::Null);

    let error = grant_all(&client, &[Grantee::User(1), Grantee::Team(2)], &[10, 11])
        .await
        .expect_err("Grant should fail");

    assert_eq!(error.header, "Error!");
    assert_eq!(error.message, "Failed to add role. POST returned status: 400");
    assert_eq!(transport.requests_matching(Method::Post).await.len(), 4);
}

#[tokio::test]
async fn test_revoke_all_disassociates_each_assignment() {
    let (transport, client) = setup();
    transport.respond(Method::Post, "/api/v2/users/4/roles/", 204, Value::Null);
    transport.respond(Method::Post, "/api/v2/teams/9/roles/", 403, json!({"detail": "denied"}));

    let error = revoke_all(&client, &removable_roles(&access_record()))
        .await
        .expect_err("Team revoke should fail");

    assert_eq!(error.message, "Failed to remove role. POST returned status: 403");
    let posts = transport.requests_matching(Method::Post).await;
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].body, Some(json!({"id": 30, "disassociate": true})));
    assert_eq!(posts[1].path, "/api/v2/teams/9/roles/");
    assert_eq!(posts[1].body, Some(json!({"id": 31, "disassociate": true})));
}
