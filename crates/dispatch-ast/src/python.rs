//! Python-specific node queries used by the security validator and the
//! complexity classifier.
//!
//! These walk the tree-sitter-python grammar directly rather than exposing
//! a generic multi-language abstraction: the rule set this crate serves is
//! fixed to Python, so there is no second caller to generalize for.

use crate::parser::ParsedProgram;
use crate::walker::TreeWalker;
use tree_sitter::Node;

/// A call expression, with its callee resolved to a dotted name when
/// possible (`open`, `os.system`, `requests.get`, ...).
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
    /// The `call` node itself.
    pub node: Node<'a>,
    /// Dotted callee name, e.g. `"os.system"`. `None` when the callee is
    /// itself a call or subscript result rather than a plain name path.
    pub callee: Option<String>,
}

/// Find every call expression in the program.
pub fn calls<'a>(program: &'a ParsedProgram) -> Vec<CallSite<'a>> {
    TreeWalker::find_by_kind(program.tree().root_node(), "call")
        .into_iter()
        .map(|node| {
            let callee = node
                .child_by_field_name("function")
                .and_then(|f| qualified_name(f, program.source_bytes()));
            CallSite { node, callee }
        })
        .collect()
}

/// Resolve a node to a dotted name: `identifier` nodes resolve directly,
/// `attribute` nodes recurse into their object and append `.attribute`.
fn qualified_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    match node.kind() {
        "identifier" => node.utf8_text(source).ok().map(str::to_string),
        "attribute" => {
            let object = node.child_by_field_name("object")?;
            let attribute = node.child_by_field_name("attribute")?;
            let object_name = qualified_name(object, source)?;
            let attribute_name = attribute.utf8_text(source).ok()?;
            Some(format!("{object_name}.{attribute_name}"))
        }
        _ => None,
    }
}

/// A single module named by an `import` or `from ... import` statement.
#[derive(Debug, Clone)]
pub struct ImportedModule<'a> {
    /// The import statement node this module was named in.
    pub node: Node<'a>,
    /// The root module name (`os.path` imports as `"os"`, matching the
    /// original classifier/validator's module-prefix semantics).
    pub root_module: String,
}

/// Find every module imported via `import x[.y]` or `from x[.y] import z`.
pub fn imports<'a>(program: &'a ParsedProgram) -> Vec<ImportedModule<'a>> {
    let source = program.source_bytes();
    let mut out = Vec::new();

    for node in TreeWalker::find_by_kind(program.tree().root_node(), "import_statement") {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if let Some(root) = dotted_root(child, source) {
                out.push(ImportedModule { node, root_module: root });
            }
        }
    }

    for node in TreeWalker::find_by_kind(program.tree().root_node(), "import_from_statement") {
        if let Some(module) = node.child_by_field_name("module_name") {
            if let Some(root) = dotted_root(module, source) {
                out.push(ImportedModule { node, root_module: root });
            }
        }
    }

    out
}

fn dotted_root(node: Node<'_>, source: &[u8]) -> Option<String> {
    let text = match node.kind() {
        "dotted_name" | "identifier" => node.utf8_text(source).ok()?,
        "aliased_import" => {
            let name = node.child_by_field_name("name")?;
            return dotted_root(name, source);
        }
        _ => return None,
    };
    Some(text.split('.').next().unwrap_or(text).to_string())
}

/// A `with` statement whose context expression is itself a call, i.e.
/// `with open(...) as f:` - the rule pipeline treats this separately from
/// an ordinary call expression since it is the idiomatic way Python code
/// opens files.
#[derive(Debug, Clone)]
pub struct WithCall<'a> {
    /// The `with_statement` node.
    pub node: Node<'a>,
    /// The resolved callee of the context expression, if any.
    pub callee: Option<String>,
}

/// Find every `with <call>(...):` statement.
pub fn with_calls<'a>(program: &'a ParsedProgram) -> Vec<WithCall<'a>> {
    let source = program.source_bytes();
    TreeWalker::find_by_kind(program.tree().root_node(), "with_statement")
        .into_iter()
        .flat_map(|node| {
            TreeWalker::find_by_kind(node, "with_item")
                .into_iter()
                .filter_map(move |item| {
                    let value = item.child_by_field_name("value")?;
                    let call = if value.kind() == "call" {
                        Some(value)
                    } else {
                        None
                    };
                    call.map(|call_node| WithCall {
                        node,
                        callee: call_node
                            .child_by_field_name("function")
                            .and_then(|f| qualified_name(f, source)),
                    })
                })
        })
        .collect()
}

/// Maximum nesting depth of `for`/`while` loops anywhere in the program,
/// counting only loop ancestors (not every block).
///
/// Mirrors the original classifier's recursive loop-depth walk: depth is
/// computed per loop node by counting how many `for_statement`/
/// `while_statement` ancestors it has, and the result is the maximum over
/// all loop nodes (so a lone loop has depth 1, not 0).
pub fn max_loop_nesting_depth(program: &ParsedProgram) -> usize {
    let root = program.tree().root_node();
    let mut max_depth = 0;
    let mut loops = TreeWalker::find_by_kind(root, "for_statement");
    loops.extend(TreeWalker::find_by_kind(root, "while_statement"));

    for loop_node in loops {
        let depth = 1 + TreeWalker::ancestors(loop_node)
            .iter()
            .filter(|n| matches!(n.kind(), "for_statement" | "while_statement"))
            .count();
        max_depth = max_depth.max(depth);
    }

    max_depth
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_dotted_callee_names() {
        let program = ParsedProgram::parse("os.system('ls')\nopen('f.txt')\n").unwrap();
        let names: Vec<_> = calls(&program).iter().filter_map(|c| c.callee.clone()).collect();
        assert!(names.contains(&"os.system".to_string()));
        assert!(names.contains(&"open".to_string()));
    }

    #[test]
    fn resolves_import_roots() {
        let program = ParsedProgram::parse("import os.path\nfrom subprocess import run\n").unwrap();
        let roots: Vec<_> = imports(&program).iter().map(|m| m.root_module.clone()).collect();
        assert!(roots.contains(&"os".to_string()));
        assert!(roots.contains(&"subprocess".to_string()));
    }

    #[test]
    fn detects_with_open_as_a_file_operation() {
        let program = ParsedProgram::parse("with open('f.txt') as f:\n    pass\n").unwrap();
        let withs = with_calls(&program);
        assert_eq!(withs.len(), 1);
        assert_eq!(withs[0].callee.as_deref(), Some("open"));
    }

    #[test]
    fn loop_nesting_depth_counts_only_loop_ancestors() {
        let program = ParsedProgram::parse(
            "for i in range(3):\n    for j in range(3):\n        for k in range(3):\n            pass\n",
        )
        .unwrap();
        assert_eq!(max_loop_nesting_depth(&program), 3);
    }

    #[test]
    fn flat_loop_has_depth_one() {
        let program = ParsedProgram::parse("for i in range(3):\n    pass\n").unwrap();
        assert_eq!(max_loop_nesting_depth(&program), 1);
    }
}
