//! API Module
//!
//! HTTP handlers and routing for the cache inspection surface. The service
//! embeds the cache in-process; these endpoints exist for operators and
//! tests, not as the primary access path.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
