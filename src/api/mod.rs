//! HTTP API: route table and request handlers.

pub mod handlers;
pub mod routes;

pub use routes::router;
