use super::{callee_leaf, module_and_leaf, Rule};
use dispatch_ast::{calls, ParsedProgram};
use dispatch_domain::entities::Finding;

const OS_OPERATIONS: &[&str] = &["system", "popen", "exec", "eval", "compile", "__import__"];
const OS_MODULES: &[&str] = &["os", "subprocess", "commands"];

/// Rejects OS command execution: `os.system(...)`, `subprocess.popen(...)`,
/// bare `exec`/`eval`/`compile`/`__import__`.
#[derive(Debug, Default)]
pub struct NoOsCommandsRule;

impl Rule for NoOsCommandsRule {
    fn name(&self) -> &'static str {
        "no-os-commands"
    }

    fn check(&self, program: &ParsedProgram) -> Vec<Finding> {
        let mut findings = Vec::new();

        for call in calls(program) {
            let Some(callee) = &call.callee else { continue };
            let line = Some(call.node.start_position().row + 1);
            let leaf = callee_leaf(callee);

            if OS_OPERATIONS.contains(&leaf) {
                findings.push(Finding {
                    rule: self.name(),
                    message: format!("OS command execution not allowed: {leaf}"),
                    line,
                });
            }

            if let Some((module, attr)) = module_and_leaf(callee) {
                if OS_MODULES.contains(&module) {
                    findings.push(Finding {
                        rule: self.name(),
                        message: format!("OS command execution not allowed: {module}.{attr}"),
                        line,
                    });
                }
            }
        }

        findings
    }
}
