//! shiftopt service - HTTP optimization service
//!
//! Axum application exposing synchronous and background optimization,
//! constraint pre-flight, the algorithm catalog and Prometheus metrics.

pub mod config;
pub mod metrics;
pub mod routes;
pub mod runtime;
pub mod service;

pub use config::ServiceConfig;
pub use routes::build_router;
pub use service::{Service, SharedService};
