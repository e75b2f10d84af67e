//! # Domain layer
//!
//! Core entities, value objects, port traits, and error types for the code
//! dispatch engine. Contains no dependency on a concrete process, storage,
//! or transport crate: the application and infrastructure layers depend on
//! this crate, never the reverse.

/// Common macros (`impl_from_str!`, `labels!`).
#[macro_use]
pub mod macros;

/// Core entities and value objects exchanged between components.
pub mod entities;
/// Domain error types.
pub mod error;
/// Plug points the infrastructure layer wires at startup (logging facade).
pub mod infra;
/// External provider port interfaces.
pub mod ports;

pub use entities::*;
pub use error::{Error, Result};
