//! The four built-in security rules.
//!
//! Each rule is a pure function over a [`ParsedProgram`]: given a tree, it
//! returns the findings it produces and nothing else. Rules never depend
//! on one another, and the order they run in does not affect the result -
//! the aggregator in [`crate::validator`] is a plain fold over this list.

mod import_validation;
mod no_file_io;
mod no_network;
mod no_os_commands;

pub use import_validation::ImportValidationRule;
pub use no_file_io::NoFileIoRule;
pub use no_network::NoNetworkRule;
pub use no_os_commands::NoOsCommandsRule;

use dispatch_ast::ParsedProgram;
use dispatch_domain::entities::Finding;

/// A single security check over a parsed program.
pub trait Rule: Send + Sync {
    /// Stable, human-readable name used in findings and metrics labels.
    fn name(&self) -> &'static str;

    /// Inspect `program` and return every violation this rule detects.
    /// An empty vector means the rule passed.
    fn check(&self, program: &ParsedProgram) -> Vec<Finding>;
}

/// Returns the leaf segment of a dotted callee (`"os.system"` -> `"system"`,
/// `"open"` -> `"open"`), matching how the original AST walk treated both
/// `ast.Name` and `ast.Attribute` call targets uniformly.
pub(crate) fn callee_leaf(callee: &str) -> &str {
    callee.rsplit('.').next().unwrap_or(callee)
}

/// Returns `(module, leaf)` only when `callee` is a single-level dotted
/// path (`module.attr`), matching the original's `isinstance(func.value,
/// ast.Name)` guard - a deeper chain like `a.b.c` does not qualify.
pub(crate) fn module_and_leaf(callee: &str) -> Option<(&str, &str)> {
    if callee.matches('.').count() != 1 {
        return None;
    }
    callee.split_once('.')
}
