//! Permissions tab: who can reach a resource, plus role grant and revoke.
//!
//! Roles are granted by POSTing `{id: role}` to the user's or team's
//! `roles/` collection and revoked with the same body plus `disassociate`.

use serde_json::json;
use tracing::{info, warn};

use crate::api::client::{ApiClient, ApiResult, ListQuery};
use crate::api::endpoints::ResourceKind;
use crate::api::models::{AccessRecord, Id, Page};
use crate::error::ErrorMessage;
use crate::forms::list::ListController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grantee {
    User(Id),
    Team(Id),
}

impl Grantee {
    pub fn roles_path(&self) -> String {
        match self {
            Grantee::User(id) => ResourceKind::Users.related_path(*id, "roles"),
            Grantee::Team(id) => ResourceKind::Teams.related_path(*id, "roles"),
        }
    }
}

/// One role held by a user or team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub grantee: Grantee,
    pub role_id: Id,
    pub role_name: String,
}

/// Roles a user holds on the resource that can be removed from this screen.
/// Roles reached through a team are revoked from the team.
pub fn removable_roles(record: &AccessRecord) -> Vec<RoleAssignment> {
    record
        .summary_fields
        .direct_access
        .iter()
        .map(|access| {
            let role = &access.role;
            let grantee = match role.team_id {
                Some(team) => Grantee::Team(team),
                None => Grantee::User(record.id),
            };
            RoleAssignment {
                grantee,
                role_id: role.id,
                role_name: role.name.clone(),
            }
        })
        .collect()
}

pub fn access_list_path(kind: ResourceKind, id: Id) -> String {
    kind.related_path(id, "access_list")
}

/// List controller over `<resource>/access_list/`.
pub fn access_list_controller(kind: ResourceKind, id: Id, page_size: u32) -> ListController<AccessRecord> {
    let mut list = ListController::with_path(kind, access_list_path(kind, id), page_size);
    list.set_order("username");
    list
}

pub async fn access_list(
    client: &ApiClient,
    kind: ResourceKind,
    id: Id,
    query: &ListQuery,
) -> ApiResult<Page<AccessRecord>> {
    client.list(&access_list_path(kind, id), query).await
}

pub async fn grant(client: &ApiClient, grantee: Grantee, role_id: Id) -> ApiResult<()> {
    client.post_action(&grantee.roles_path(), &json!({ "id": role_id })).await
}

pub async fn revoke(client: &ApiClient, grantee: Grantee, role_id: Id) -> ApiResult<()> {
    client
        .post_action(&grantee.roles_path(), &json!({ "id": role_id, "disassociate": true }))
        .await
}

/// Grants every role to every grantee. All requests are issued; the first
/// failure is reported.
pub async fn grant_all(client: &ApiClient, grantees: &[Grantee], role_ids: &[Id]) -> Result<usize, ErrorMessage> {
    let mut granted = 0;
    let mut first_error = None;
    for grantee in grantees {
        for role_id in role_ids {
            match grant(client, *grantee, *role_id).await {
                Ok(()) => granted += 1,
                Err(e) => {
                    warn!(?grantee, role_id, error = %e, "Failed to grant role");
                    first_error.get_or_insert_with(|| e.to_message("add role"));
                }
            }
        }
    }
    info!(granted, "Granted roles");
    match first_error {
        Some(message) => Err(message),
        None => Ok(granted),
    }
}

/// Revokes each selected role with its own disassociate request. All
/// requests are issued; the first failure is reported.
pub async fn revoke_all(client: &ApiClient, assignments: &[RoleAssignment]) -> Result<usize, ErrorMessage> {
    let mut revoked = 0;
    let mut first_error = None;
    for assignment in assignments {
        match revoke(client, assignment.grantee, assignment.role_id).await {
            Ok(()) => revoked += 1,
            Err(e) => {
                warn!(
                    grantee = ?assignment.grantee,
                    role_id = assignment.role_id,
                    error = %e,
                    "Failed to remove role"
                );
                first_error.get_or_insert_with(|| e.to_message("remove role"));
            }
        }
    }
    info!(revoked, "Removed roles");
    match first_error {
        Some(message) => Err(message),
        None => Ok(revoked),
    }
}
