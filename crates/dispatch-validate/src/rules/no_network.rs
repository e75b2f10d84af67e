use super::{callee_leaf, module_and_leaf, Rule};
use dispatch_ast::{calls, ParsedProgram};
use dispatch_domain::entities::Finding;

const NETWORK_OPERATIONS: &[&str] = &[
    "socket", "urlopen", "request", "get", "post", "put", "delete", "patch",
];
const NETWORK_MODULES: &[&str] = &[
    "socket", "urllib", "urllib2", "urllib3", "requests", "http", "httplib", "httplib2", "aiohttp",
];

/// Rejects outbound network access: `socket.socket(...)`, `requests.get(...)`,
/// `urllib.request.urlopen(...)`, and similar calls.
#[derive(Debug, Default)]
pub struct NoNetworkRule;

impl Rule for NoNetworkRule {
    fn name(&self) -> &'static str {
        "no-network"
    }

    fn check(&self, program: &ParsedProgram) -> Vec<Finding> {
        let mut findings = Vec::new();

        for call in calls(program) {
            let Some(callee) = &call.callee else { continue };
            let line = Some(call.node.start_position().row + 1);
            let leaf = callee_leaf(callee);

            if NETWORK_OPERATIONS.contains(&leaf) {
                findings.push(Finding {
                    rule: self.name(),
                    message: format!("Network operation not allowed: {leaf}"),
                    line,
                });
            }

            if let Some((module, attr)) = module_and_leaf(callee) {
                if NETWORK_MODULES.contains(&module) {
                    findings.push(Finding {
                        rule: self.name(),
                        message: format!("Network operation not allowed: {module}.{attr}"),
                        line,
                    });
                }
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings_for(source: &str) -> Vec<Finding> {
        let program = ParsedProgram::parse(source).unwrap();
        NoNetworkRule.check(&program)
    }

    #[test]
    fn flags_requests_get() {
        let findings = findings_for("import requests\nrequests.get('http://example.com')\n");
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn flags_bare_socket_call() {
        let findings = findings_for("socket()\n");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn allows_unrelated_calls() {
        let findings = findings_for("print('hello')\n");
        assert!(findings.is_empty());
    }
}
