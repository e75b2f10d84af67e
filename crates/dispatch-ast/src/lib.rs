//! Syntax analysis for submitted Python programs.
//!
//! Built on tree-sitter so the rest of the workspace never links against a
//! Python interpreter just to inspect source text.
//!
//! ## Example
//!
//! ```
//! use dispatch_ast::ParsedProgram;
//!
//! let program = ParsedProgram::parse("print('hello')").unwrap();
//! assert!(!program.has_syntax_error());
//! ```

pub mod error;
pub mod parser;
pub mod python;
pub mod visitor;
pub mod walker;

pub use error::{AstError, Result};
pub use parser::ParsedProgram;
pub use python::{calls, imports, max_loop_nesting_depth, with_calls, CallSite, ImportedModule, WithCall};
pub use visitor::{KindCollector, KindCounter, NodeMatch, NodeVisitor};
pub use walker::TreeWalker;
