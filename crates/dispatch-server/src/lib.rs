//! Request surface (C8) and async consumer (C9) for the secure code
//! dispatch engine.
//!
//! Wires the domain ports and application use cases onto an Axum HTTP
//! server and a NATS JetStream consumer supervisor, following the
//! teacher's layering: this crate owns transport and wiring only, never
//! business logic.

pub mod consumer;
pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use consumer::run_consumer;
pub use routes::build_router;
pub use state::AppState;
