use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::client::{ApiClient, ApiResult, ListQuery};
use crate::api::endpoints::ResourceKind;
use crate::api::models::{Id, Listable, Page};
use crate::error::{ErrorMessage, Result};

/// Page to request after deleting a row: removing the only row of a page
/// other than the first steps back one page.
pub fn corrected_page_after_delete(rows_on_page: usize, page: u32) -> u32 {
    if rows_on_page == 1 && page > 1 { page - 1 } else { page }
}

/// Identifies one issued list request. Only the response to the most recent
/// ticket is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: ListQuery,
}

/// A row awaiting delete confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: Id,
    pub name: String,
}

/// Paginated, searchable list screen.
pub struct ListController<T> {
    kind: ResourceKind,
    path: String,
    pub query: ListQuery,
    pub rows: Vec<T>,
    pub count: u64,
    pub is_loading: bool,
    pub alert: Option<ErrorMessage>,
    pub pending_delete: Option<PendingDelete>,
    generation: u64,
}

impl<T: Listable + DeserializeOwned> ListController<T> {
    pub fn new(kind: ResourceKind, page_size: u32) -> Self {
        Self::with_path(kind, kind.list_path(), page_size)
    }

    /// Lists a sub-collection, e.g. a template's schedules.
    pub fn with_path(kind: ResourceKind, path: String, page_size: u32) -> Self {
        Self {
            kind,
            path,
            query: ListQuery::new(page_size).order_by("name"),
            rows: Vec::new(),
            count: 0,
            is_loading: false,
            alert: None,
            pending_delete: None,
            generation: 0,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn page_count(&self) -> u32 {
        let size = u64::from(self.query.page_size.max(1));
        self.count.div_ceil(size).max(1) as u32
    }

    /// Issues a new request; any earlier one still in flight becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.is_loading = true;
        FetchTicket {
            generation: self.generation,
            query: self.query.clone(),
        }
    }

    /// Applies a response. Returns `false` when the ticket was superseded.
    pub fn complete_fetch(&mut self, ticket: &FetchTicket, response: ApiResult<Page<T>>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                resource = self.kind.segment(),
                stale = ticket.generation,
                latest = self.generation,
                "Discarding stale list response"
            );
            return false;
        }
        self.is_loading = false;
        match response {
            Ok(page) => {
                self.count = page.count;
                self.rows = page.results;
                self.alert = None;
            }
            Err(e) => {
                self.alert = Some(e.to_message(&format!("retrieve {} list", self.kind.noun())));
            }
        }
        true
    }

    pub async fn fetch(&mut self, client: &ApiClient) -> Result<()> {
        let ticket = self.begin_fetch();
        let response = client.list(&self.path, &ticket.query).await;
        let failed = response.as_ref().err().cloned();
        self.complete_fetch(&ticket, response);
        match failed {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// New search text starts over from the first page.
    pub fn search(&mut self, text: &str) {
        let text = text.trim();
        self.query.search = (!text.is_empty()).then(|| text.to_string());
        self.query.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.page = page.clamp(1, self.page_count());
    }

    pub fn set_order(&mut self, field: &str) {
        self.query.order_by = Some(field.to_string());
        self.query.page = 1;
    }

    /// Opens the confirmation prompt. Unknown rows are ignored.
    pub fn request_delete(&mut self, id: Id) -> bool {
        match self.rows.iter().find(|r| r.id() == id) {
            Some(row) => {
                self.pending_delete = Some(PendingDelete {
                    id,
                    name: row.display_name().to_string(),
                });
                true
            }
            None => false,
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Deletes the confirmed row and reloads, stepping back a page when the
    /// deleted row was the last one on it.
    pub async fn confirm_delete(&mut self, client: &ApiClient) -> Result<()> {
        let Some(pending) = self.pending_delete.take() else {
            return Ok(());
        };
        if let Err(e) = client.delete(&self.kind.detail_path(pending.id)).await {
            self.alert = Some(e.to_message(&format!("delete {}", self.kind.noun())));
            return Err(e.into());
        }
        info!(resource = self.kind.segment(), id = pending.id, name = %pending.name, "Deleted resource");

        self.query.page = corrected_page_after_delete(self.rows.len(), self.query.page);
        self.fetch(client).await
    }
}
