//! HTTP surface.
//!
//! Prediction routes answer synchronously from the shared
//! `PredictionService`. Q&A routes call blocking collaborators and run
//! under `spawn_blocking` with an outer request deadline.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{ApiServer, ApiSession};
pub use types::ApiContext;
