//! HTTP surface
//!
//! A thin adapter: it extracts the caller identity and query parameters,
//! builds the per-request context (languages, deadline) and hands off to
//! [`Delivery`](crate::delivery::Delivery).

pub mod health;
pub mod http;
pub mod routes;

pub use http::{run, AppState};
pub use routes::API_VERSION;
