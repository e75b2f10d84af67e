//! Aggregates the built-in rules into one pass over a program.

use crate::rules::{ImportValidationRule, NoFileIoRule, NoNetworkRule, NoOsCommandsRule, Rule};
use dispatch_ast::ParsedProgram;
use dispatch_domain::entities::ValidationRulesConfig;
use dispatch_domain::error::{Error, Result};
use dispatch_domain::{Finding, ValidationVerdict};

/// Runs the configured subset of the built-in rules over a parsed program
/// and folds their findings into one [`ValidationVerdict`].
pub struct CodeValidator {
    rules: Vec<Box<dyn Rule>>,
}

impl CodeValidator {
    /// Build a validator with every rule enabled and the default allowlist.
    pub fn new() -> Self {
        Self::from_config(&ValidationRulesConfig::default())
    }

    /// Build a validator honoring the per-rule enable switches and the
    /// extra allowed imports from configuration.
    pub fn from_config(config: &ValidationRulesConfig) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = Vec::new();
        if config.enable_file_io_check {
            rules.push(Box::new(NoFileIoRule));
        }
        if config.enable_os_commands_check {
            rules.push(Box::new(NoOsCommandsRule));
        }
        if config.enable_network_check {
            rules.push(Box::new(NoNetworkRule));
        }
        if config.enable_import_validation {
            rules.push(Box::new(ImportValidationRule::with_extra_allowed(
                &config.allowed_imports,
            )));
        }
        Self { rules }
    }

    /// Parse `code` and run every enabled rule over it.
    ///
    /// A syntax error never raises: it is reported as a `"parse"` finding
    /// on the returned verdict, the same as any rule rejection, so a
    /// syntactically invalid program can still be fed back into the
    /// correction loop rather than aborting it.
    ///
    /// Returns [`Error::Parse`] only when tree-sitter itself could not be
    /// set up to parse the source at all.
    pub fn validate(&self, code: &str) -> Result<ValidationVerdict> {
        let program = ParsedProgram::parse(code).map_err(|e| Error::parse(e.to_string()))?;
        if program.has_syntax_error() {
            return Ok(ValidationVerdict {
                findings: vec![Finding { rule: "parse", message: "source contains a syntax error".to_string(), line: None }],
            });
        }
        Ok(self.validate_parsed(&program))
    }

    /// Run every enabled rule over an already-parsed program.
    pub fn validate_parsed(&self, program: &ParsedProgram) -> ValidationVerdict {
        let findings = self.rules.iter().flat_map(|rule| rule.check(program)).collect();
        ValidationVerdict { findings }
    }
}

impl Default for CodeValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_code_has_no_findings() {
        let verdict = CodeValidator::new().validate("print('hello')\n").unwrap();
        assert!(verdict.is_allowed());
    }

    #[test]
    fn findings_accumulate_across_rules() {
        let verdict = CodeValidator::new()
            .validate("import os\nos.system('ls')\nopen('x.txt')\n")
            .unwrap();
        assert!(!verdict.is_allowed());
        assert!(verdict.findings.len() >= 3);
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let mut config = ValidationRulesConfig::default();
        config.enable_os_commands_check = false;
        let verdict = CodeValidator::from_config(&config)
            .validate("os.system('ls')\n")
            .unwrap();
        assert!(verdict.findings.iter().all(|f| f.rule != "no-os-commands"));
    }

    #[test]
    fn unparseable_code_reports_a_parse_finding_instead_of_raising() {
        let verdict = CodeValidator::new().validate("def f(:\n").unwrap();
        assert!(!verdict.is_allowed());
        assert!(verdict.findings.iter().any(|f| f.rule == "parse"));
    }
}
