pub mod client;
pub mod endpoints;
pub mod models;
pub mod transport;

pub use client::{ApiClient, ApiResult, ListQuery};
pub use endpoints::ResourceKind;
pub use transport::{InMemoryTransport, Method, Request, Response, Transport};
