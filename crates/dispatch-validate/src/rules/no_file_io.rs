use super::{callee_leaf, Rule};
use dispatch_ast::{calls, with_calls, ParsedProgram};
use dispatch_domain::entities::Finding;

const FILE_OPERATIONS: &[&str] = &["open", "read", "write", "file"];

/// Rejects direct file I/O: `open(...)`, `f.read()`, `f.write(...)`, and
/// `with open(...) as f:`.
#[derive(Debug, Default)]
pub struct NoFileIoRule;

impl Rule for NoFileIoRule {
    fn name(&self) -> &'static str {
        "no-file-io"
    }

    fn check(&self, program: &ParsedProgram) -> Vec<Finding> {
        let mut findings = Vec::new();

        for call in calls(program) {
            let Some(callee) = &call.callee else { continue };
            let leaf = callee_leaf(callee);
            if FILE_OPERATIONS.contains(&leaf) {
                findings.push(Finding {
                    rule: self.name(),
                    message: format!("File I/O operation not allowed: {leaf}"),
                    line: Some(call.node.start_position().row + 1),
                });
            }
        }

        for with_call in with_calls(program) {
            if with_call.callee.as_deref() == Some("open") {
                findings.push(Finding {
                    rule: self.name(),
                    message: "File I/O operation not allowed: open (in with statement)".to_string(),
                    line: Some(with_call.node.start_position().row + 1),
                });
            }
        }

        findings
    }
}
