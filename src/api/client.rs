use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::api::models::Page;
use crate::api::transport::{HttpTransport, Request, Transport};
use crate::config::Settings;
use crate::error::ApiError;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub page: u32,
    pub page_size: u32,
    pub order_by: Option<String>,
    pub search: Option<String>,
    /// Field-specific filters such as `("name__icontains", "prod")`.
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            order_by: None,
            search: None,
            filters: Vec::new(),
        }
    }

    pub fn order_by(mut self, field: &str) -> Self {
        self.order_by = Some(field.to_string());
        self
    }

    pub fn filter(mut self, key: &str, value: &str) -> Self {
        self.filters.push((key.to_string(), value.to_string()));
        self
    }

    pub fn apply(&self, mut request: Request) -> Request {
        request = request
            .with_query("page", self.page)
            .with_query("page_size", self.page_size);
        if let Some(order) = &self.order_by {
            request = request.with_query("order_by", order);
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            request = request.with_query("search", search);
        }
        for (k, v) in &self.filters {
            request = request.with_query(k.as_str(), v);
        }
        request
    }
}

/// Typed request/response contract over a [`Transport`].
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn from_settings(settings: &Settings) -> ApiResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(settings)?)))
    }

    /// Sends the request and turns any non-2xx status into [`ApiError::Status`].
    pub async fn execute(&self, request: Request) -> ApiResult<Value> {
        let method = request.method;
        let url = request.url();
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            error!(%method, url = %url, status = response.status, "API request failed");
            return Err(ApiError::Status {
                method,
                url,
                status: response.status,
                body: response.body,
            });
        }
        debug!(%method, url = %url, status = response.status, "API request succeeded");
        Ok(response.body)
    }

    pub async fn fetch<T: DeserializeOwned>(&self, request: Request) -> ApiResult<T> {
        let url = request.url();
        let body = self.execute(request).await?;
        serde_json::from_value(body).map_err(|e| ApiError::Decode {
            url,
            message: e.to_string(),
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.fetch(Request::get(path)).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.fetch(Request::post(path, to_body(path, body)?)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.fetch(Request::put(path, to_body(path, body)?)).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ApiResult<T> {
        self.fetch(Request::patch(path, to_body(path, body)?)).await
    }

    /// POST whose response body is not interesting (associate/disassociate).
    pub async fn post_action<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<()> {
        self.execute(Request::post(path, to_body(path, body)?)).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(Request::delete(path)).await?;
        Ok(())
    }

    pub async fn list<T: DeserializeOwned>(&self, path: &str, query: &ListQuery) -> ApiResult<Page<T>> {
        self.fetch(query.apply(Request::get(path))).await
    }

    /// Follows the `next` cursor page by page until the listing is exhausted.
    /// Any failing page aborts the whole fetch.
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str, page_size: u32) -> ApiResult<Vec<T>> {
        let mut query = ListQuery::new(page_size);
        let mut items = Vec::new();
        loop {
            let page: Page<T> = self.list(path, &query).await?;
            items.extend(page.results);
            if page.next.is_none() {
                break;
            }
            query.page += 1;
        }
        Ok(items)
    }
}

fn to_body<B: Serialize>(path: &str, body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode {
        url: path.to_string(),
        message: e.to_string(),
    })
}
