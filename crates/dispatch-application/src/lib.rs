//! Application layer for the secure code dispatch engine.
//!
//! Composes domain ports into the two stateful use cases that sit between
//! the request surface and infrastructure: the retry coordinator (C5) and
//! the orchestration state machine (C7). Neither module depends on a
//! concrete sandbox, LLM, or validator implementation - only on the port
//! traits `dispatch-domain` declares.

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{Classify, OrchestrationState, OrchestrationStatus, Orchestrator, Validate};
pub use retry::RetryCoordinator;
