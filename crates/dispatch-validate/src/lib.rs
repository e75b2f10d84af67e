//! Security validator (C2) and complexity classifier (C3) for the secure
//! code dispatch engine.
//!
//! Both operate over the tagged tree `dispatch-ast` produces rather than
//! walking raw tree-sitter nodes themselves.

pub mod classifier;
pub mod rules;
pub mod validator;

pub use classifier::{classify, classify_source};
pub use dispatch_domain::entities::{ComplexityTag, ValidationVerdict};
pub use validator::CodeValidator;
