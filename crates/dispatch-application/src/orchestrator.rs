//! Orchestration state machine (C7): the central synthesis loop driving a
//! query through `generate -> validate -> (correct)* -> classify -> route`.
//!
//! Authored directly from the state diagram rather than translated from
//! the original's LangGraph-based `orchestration.py`, per the guidance to
//! replace graph-framework wiring with an explicit state machine: each
//! step below is a pure transition over an [`OrchestrationState`] value.

use dispatch_domain::entities::{ComplexityTag, Finding, ValidationVerdict};
use dispatch_domain::error::Result;
use dispatch_domain::ports::LlmProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Terminal status of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationStatus {
    /// Validation passed and the program has been classified; ready for
    /// C4/C6 dispatch.
    Routed,
    /// The correction loop exhausted `max_retries` without producing a
    /// program that passes validation.
    ValidationFailedMaxRetries,
}

/// C7's working memory, returned once the flow reaches a terminal state.
#[derive(Debug, Clone)]
pub struct OrchestrationState {
    pub query: String,
    pub code: String,
    pub verdict: Option<ValidationVerdict>,
    pub attempts: u32,
    pub max_retries: u32,
    pub tag: Option<ComplexityTag>,
    pub status: OrchestrationStatus,
}

/// Validates a generated program - implemented by `dispatch-validate`'s
/// `CodeValidator`. Declared here as a local trait so this crate depends on
/// no concrete parser or rule engine, only the shape of the operation.
pub trait Validate: Send + Sync {
    fn validate(&self, code: &str) -> Result<ValidationVerdict>;
}

/// Classifies an already-approved program - implemented by
/// `dispatch-validate`'s `classify_source`.
pub trait Classify: Send + Sync {
    fn classify(&self, code: &str) -> ComplexityTag;
}

/// Drives one query through the full generate/validate/correct/classify
/// cycle.
pub struct Orchestrator {
    llm: Arc<dyn LlmProvider>,
    validator: Arc<dyn Validate>,
    classifier: Arc<dyn Classify>,
}

impl Orchestrator {
    pub fn new(llm: Arc<dyn LlmProvider>, validator: Arc<dyn Validate>, classifier: Arc<dyn Classify>) -> Self {
        Self { llm, validator, classifier }
    }

    /// Run the full state machine for `query`, bounded by `max_retries`
    /// correction cycles.
    ///
    /// `validate` runs after `generate` and after every `correct`; nothing
    /// is classified until a verdict passes (invariant 11). `attempts`
    /// never exceeds `max_retries` (invariant 12): the bound is checked
    /// before each correction, not after.
    pub async fn execute(&self, query: &str, max_retries: u32) -> Result<OrchestrationState> {
        let mut code = self.llm.generate(query).await?;
        let mut attempts = 0u32;

        loop {
            let verdict = self.validator.validate(&code)?;

            if verdict.is_allowed() {
                let tag = self.classifier.classify(&code);
                info!(attempts, ?tag, "orchestration routed");
                return Ok(OrchestrationState {
                    query: query.to_string(),
                    code,
                    verdict: Some(verdict),
                    attempts,
                    max_retries,
                    tag: Some(tag),
                    status: OrchestrationStatus::Routed,
                });
            }

            if attempts >= max_retries {
                warn!(attempts, max_retries, "validation failed, retry budget exhausted");
                return Ok(OrchestrationState {
                    query: query.to_string(),
                    code,
                    verdict: Some(verdict),
                    attempts,
                    max_retries,
                    tag: None,
                    status: OrchestrationStatus::ValidationFailedMaxRetries,
                });
            }

            let feedback = format_findings(&verdict.findings);
            code = self.llm.correct(&code, &feedback).await?;
            attempts += 1;
        }
    }
}

fn format_findings(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| match f.line {
            Some(line) => format!("{}: {} (line {line})", f.rule, f.message),
            None => format!("{}: {}", f.rule, f.message),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedLlm {
        generations: Mutex<Vec<String>>,
        corrections: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        fn new(first_generation: &str, corrections: Vec<&str>) -> Self {
            Self {
                generations: Mutex::new(vec![first_generation.to_string()]),
                corrections: Mutex::new(corrections.into_iter().rev().map(str::to_string).collect()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, _task: &str) -> Result<String> {
            Ok(self.generations.lock().unwrap().remove(0))
        }

        async fn correct(&self, _previous_code: &str, _feedback: &str) -> Result<String> {
            Ok(self.corrections.lock().unwrap().pop().expect("no more scripted corrections"))
        }
    }

    struct KeywordValidator {
        forbidden: &'static str,
    }

    impl Validate for KeywordValidator {
        fn validate(&self, code: &str) -> Result<ValidationVerdict> {
            if code.contains(self.forbidden) {
                Ok(ValidationVerdict {
                    findings: vec![Finding {
                        rule: "no-os-commands",
                        message: format!("contains forbidden construct '{}'", self.forbidden),
                        line: Some(1),
                    }],
                })
            } else {
                Ok(ValidationVerdict { findings: vec![] })
            }
        }
    }

    struct CountingClassifier {
        calls: AtomicU32,
        tag: ComplexityTag,
    }

    impl Classify for CountingClassifier {
        fn classify(&self, _code: &str) -> ComplexityTag {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tag
        }
    }

    #[tokio::test]
    async fn scenario_s1_clean_first_attempt_routes_immediately() {
        let llm = Arc::new(ScriptedLlm::new("print('hi')", vec![]));
        let validator = Arc::new(KeywordValidator { forbidden: "os.system" });
        let classifier = Arc::new(CountingClassifier { calls: AtomicU32::new(0), tag: ComplexityTag::Lightweight });
        let orchestrator = Orchestrator::new(llm, validator, classifier.clone());

        let state = orchestrator.execute("print hi", 3).await.unwrap();

        assert_eq!(state.status, OrchestrationStatus::Routed);
        assert_eq!(state.attempts, 0);
        assert_eq!(state.tag, Some(ComplexityTag::Lightweight));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scenario_s3_rejected_then_corrected_routes_with_one_attempt() {
        let llm = Arc::new(ScriptedLlm::new("import os\nos.system('ls')", vec!["result = 42"]));
        let validator = Arc::new(KeywordValidator { forbidden: "os.system" });
        let classifier = Arc::new(CountingClassifier { calls: AtomicU32::new(0), tag: ComplexityTag::Lightweight });
        let orchestrator = Orchestrator::new(llm, validator, classifier);

        let state = orchestrator.execute("list files", 3).await.unwrap();

        assert_eq!(state.status, OrchestrationStatus::Routed);
        assert_eq!(state.attempts, 1);
        assert_eq!(state.code, "result = 42");
    }

    #[tokio::test]
    async fn scenario_s4_max_retries_exceeded_terminates_without_classifying() {
        let llm = Arc::new(ScriptedLlm::new(
            "import os\nos.system('rm -rf /')",
            vec!["import os\nos.system('rm -rf /')", "import os\nos.system('rm -rf /')"],
        ));
        let validator = Arc::new(KeywordValidator { forbidden: "os.system" });
        let classifier = Arc::new(CountingClassifier { calls: AtomicU32::new(0), tag: ComplexityTag::Heavy });
        let orchestrator = Orchestrator::new(llm, validator, classifier.clone());

        let state = orchestrator.execute("delete everything", 2).await.unwrap();

        assert_eq!(state.status, OrchestrationStatus::ValidationFailedMaxRetries);
        assert!(state.attempts <= 2);
        assert_eq!(state.tag, None);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn correction_receives_the_rejecting_findings_as_feedback() {
        struct FeedbackCapturingLlm {
            captured: Mutex<Option<String>>,
        }

        #[async_trait]
        impl LlmProvider for FeedbackCapturingLlm {
            async fn generate(&self, _task: &str) -> Result<String> {
                Ok("import os\nos.system('ls')".to_string())
            }
            async fn correct(&self, _previous_code: &str, feedback: &str) -> Result<String> {
                *self.captured.lock().unwrap() = Some(feedback.to_string());
                Ok("result = 1".to_string())
            }
        }

        let llm = Arc::new(FeedbackCapturingLlm { captured: Mutex::new(None) });
        let validator = Arc::new(KeywordValidator { forbidden: "os.system" });
        let classifier = Arc::new(CountingClassifier { calls: AtomicU32::new(0), tag: ComplexityTag::Lightweight });
        let orchestrator = Orchestrator::new(llm.clone(), validator, classifier);

        orchestrator.execute("list files", 1).await.unwrap();

        let captured = llm.captured.lock().unwrap().clone().unwrap();
        assert!(captured.contains("no-os-commands"));
        assert!(captured.contains("os.system"));
    }
}
