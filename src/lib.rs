//! `postgrest-http` is an async fluent query builder for PostgREST-style HTTP APIs.
//!
//! A chain starts at [`PostgrestClient::from`], takes exactly one verb, adds
//! filters and modifiers, and ends with `execute`:
//!
//! ```no_run
//! use postgrest_http::{Filterable, PostgrestClient};
//! use serde_json::Value;
//!
//! # async fn run() -> postgrest_http::Result<()> {
//! let db = PostgrestClient::new("https://example.com/rest/v1")?.with_bearer_auth("token");
//!
//! let rows: Option<Vec<Value>> = db
//!     .from("users")
//!     .select(["id", "name"])
//!     .gte("age", "18")
//!     .not()
//!     .is("deleted_at", "null")
//!     .limit(10)
//!     .execute()
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod client;
mod error;
mod executor;
mod options;
mod params;
mod request;
mod transport;

pub use builder::{FilterBuilder, Filterable, QueryBuilder, RequestBuilder, SelectBuilder};
pub use client::PostgrestClient;
pub use error::{ApiError, PostgrestError};
pub use options::ClientOptions;
pub use params::{encode_filter, sanitize_param, QueryParams};
pub use request::{HeaderSet, RequestState};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub type Result<T> = std::result::Result<T, PostgrestError>;
