//! HTTP API.
//!
//! Serves the goal-setting workflow: patients, assessment submission, the
//! polling query, recommendation ingest, the AI webhook, plan selection and
//! the resulting goals. All routes are nested under `/api/`.
//!
//! The router is composable: `api_router()` returns a `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server_on, ApiServer, ApiServerSession};
pub use types::ApiContext;
