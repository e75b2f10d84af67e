//! Python syntax analysis.
//!
//! Wraps `tree-sitter-python` so the rest of the workspace never touches
//! the `tree_sitter` crate directly. A parse failure here is the first
//! gate a submitted program passes through: unparseable code never reaches
//! the security validator.

use crate::error::{AstError, Result};
use tree_sitter::{Parser, Tree};

/// A successfully parsed Python program: the source and its syntax tree.
pub struct ParsedProgram {
    source: String,
    tree: Tree,
}

impl ParsedProgram {
    /// Parse `source` as Python.
    ///
    /// # Errors
    ///
    /// Returns [`AstError::ParseFailed`] if tree-sitter cannot construct a
    /// tree at all (it otherwise produces a tree containing `ERROR` nodes,
    /// which callers should check for with [`ParsedProgram::has_syntax_error`]).
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| AstError::ParseFailed {
                reason: e.to_string(),
            })?;

        let tree = parser.parse(source, None).ok_or_else(|| AstError::ParseFailed {
            reason: "tree-sitter returned no tree".to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            tree,
        })
    }

    /// The parsed source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The source as UTF-8 bytes, for `Node::utf8_text`.
    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }

    /// The underlying tree-sitter tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// True when the tree contains a node tree-sitter could not make sense
    /// of. Tree-sitter is error-tolerant by design and always returns a
    /// tree; a syntactically broken program surfaces as `ERROR` nodes
    /// rather than a parse failure, so this is the check that corresponds
    /// to "the code does not parse" for Python specifically.
    pub fn has_syntax_error(&self) -> bool {
        self.tree.root_node().has_error()
    }
}
