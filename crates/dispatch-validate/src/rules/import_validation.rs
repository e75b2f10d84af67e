use super::Rule;
use dispatch_ast::{imports, ParsedProgram};
use dispatch_domain::entities::Finding;
use std::collections::HashSet;

/// Modules considered safe to import with no further review.
pub const DEFAULT_ALLOWLIST: &[&str] = &[
    "math", "random", "datetime", "json", "re", "collections", "itertools", "functools",
    "operator", "string", "decimal", "fractions", "statistics", "typing", "dataclasses", "enum",
    "copy", "pprint", "textwrap", "unicodedata", "hashlib", "hmac", "secrets", "uuid", "time",
    "calendar", "zoneinfo",
];

/// Modules that are never permitted, even if also present in an allowlist.
pub const PROHIBITED_MODULES: &[&str] = &[
    "os", "sys", "subprocess", "socket", "urllib", "urllib2", "urllib3", "requests", "http",
    "httplib", "httplib2", "aiohttp", "io", "pathlib", "shutil", "tempfile", "glob", "pickle",
    "shelve", "dbm", "sqlite3", "ctypes", "multiprocessing", "threading", "asyncio", "concurrent",
    "__builtin__", "builtins", "importlib",
];

/// Rejects any import whose root module is in [`PROHIBITED_MODULES`], or
/// that is not in the allowlist. Prohibition always takes precedence: a
/// module named in both sets is still rejected.
#[derive(Debug)]
pub struct ImportValidationRule {
    allowlist: HashSet<String>,
}

impl Default for ImportValidationRule {
    fn default() -> Self {
        Self {
            allowlist: DEFAULT_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ImportValidationRule {
    /// Build a rule whose allowlist is the built-in defaults plus
    /// `extra_allowed` - configuration only ever widens the allowlist, it
    /// never narrows it or removes a prohibition.
    pub fn with_extra_allowed(extra_allowed: &[String]) -> Self {
        let mut allowlist: HashSet<String> = DEFAULT_ALLOWLIST.iter().map(|s| s.to_string()).collect();
        allowlist.extend(extra_allowed.iter().cloned());
        Self { allowlist }
    }
}

impl Rule for ImportValidationRule {
    fn name(&self) -> &'static str {
        "import-validation"
    }

    fn check(&self, program: &ParsedProgram) -> Vec<Finding> {
        let mut findings = Vec::new();

        for module in imports(program) {
            let line = Some(module.node.start_position().row + 1);
            if PROHIBITED_MODULES.contains(&module.root_module.as_str()) {
                findings.push(Finding {
                    rule: self.name(),
                    message: format!("Unauthorized import detected: {}", module.root_module),
                    line,
                });
            } else if !self.allowlist.contains(&module.root_module) {
                findings.push(Finding {
                    rule: self.name(),
                    message: format!("Unauthorized import detected: {}", module.root_module),
                    line,
                });
            }
        }

        findings
    }
}
