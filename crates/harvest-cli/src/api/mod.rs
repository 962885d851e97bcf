//! API client module
//!
//! HTTP access to the paginated JSON API: the transport seam used by the collector,
//! the reqwest-backed client, URL builders and page parsing.

pub mod client;
pub mod endpoints;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use transport::{FetchError, JsonTransport};
pub use types::{Page, PageShapeError};
