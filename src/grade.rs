#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task, time::timeout};
use typed_builder::TypedBuilder;

use crate::{
    constants::{
        DEFAULT_EXECUTION_BUDGET, DEFAULT_MAX_CONCURRENT, DEFAULT_QUIESCENCE,
        LOOP_ITERATION_LIMIT, MAX_SCRIPT_BYTES, RECURSION_LIMIT, SANDBOX_BASE_URL,
        SUCCESS_MESSAGE,
    },
    page::{ScriptBridge, compose_document},
    rules::{Rule, registry},
    sandbox::{Sandbox, SandboxLimits},
};

/// One learner submission for a lesson step. Untrusted input.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Submission {
    /// the markup fragment or full document
    #[builder(default)]
    pub html: String,
    /// the stylesheet
    #[builder(default)]
    pub css:  String,
    /// the script
    #[builder(default)]
    pub js:   String,
}

/// The outcome of grading one submission: either a success message or the
/// ordered list of failure diagnostics, one per failed rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    /// true when every rule passed
    pub success: bool,
    /// failure diagnostics, in rule order; empty exactly when `success`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors:  Vec<String>,
    /// the success message; present exactly when `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationResult {
    /// The passing result.
    pub fn passed() -> Self {
        Self {
            success: true,
            errors:  Vec::new(),
            message: Some(SUCCESS_MESSAGE.to_string()),
        }
    }

    /// A failing result carrying every collected diagnostic, in rule order.
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            message: None,
        }
    }
}

/// The two failure classes that abort an evaluation outright, as opposed to
/// per-rule diagnostics, which are data in [`ValidationResult`].
#[derive(thiserror::Error, Debug)]
pub enum EvaluateError {
    /// Composing or parsing the document, or starting the script engine,
    /// failed. A system-level error, not a grading outcome.
    #[error("could not construct the grading sandbox")]
    Sandbox(#[source] anyhow::Error),
    /// The submission exceeded the execution budget and the sandbox was
    /// abandoned. No result from it can be trusted.
    #[error("grading exceeded the execution budget of {budget:?}")]
    Timeout {
        /// the budget that was exceeded
        budget: Duration,
    },
}

/// Tunables for the grading pipeline.
#[derive(Debug, Clone, TypedBuilder)]
pub struct GradingConfig {
    /// settle window granted to deferred setup code
    #[builder(default = DEFAULT_QUIESCENCE)]
    pub quiescence:       Duration,
    /// hard wall-clock ceiling per evaluation
    #[builder(default = DEFAULT_EXECUTION_BUDGET)]
    pub execution_budget: Duration,
    /// size of the sandbox worker pool
    #[builder(default = DEFAULT_MAX_CONCURRENT)]
    pub max_concurrent:   usize,
    /// largest script the sandbox will execute
    #[builder(default = MAX_SCRIPT_BYTES)]
    pub max_script_bytes: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The grading service: the one operation the rest of the platform calls.
///
/// Each evaluation owns an independent sandbox on a blocking worker thread;
/// the pool is bounded by a semaphore and each worker runs under a hard
/// execution budget, because submissions can loop forever or allocate
/// without bound.
#[derive(Debug, Clone)]
pub struct GradingService {
    /// the pipeline tunables
    config:  GradingConfig,
    /// bounds concurrent sandboxes
    permits: Arc<Semaphore>,
}

impl GradingService {
    /// Creates a service with the given configuration.
    pub fn new(config: GradingConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self { config, permits }
    }

    /// Grades one submission against one rule set.
    ///
    /// Every top-level rule is always evaluated, in order, with no
    /// short-circuit, so the learner receives the complete diagnostic list
    /// in one pass. Only sandbox construction failure or the execution
    /// budget abort the call.
    pub async fn evaluate(
        &self,
        submission: &Submission,
        rules: &[Rule],
    ) -> Result<ValidationResult, EvaluateError> {
        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EvaluateError::Sandbox(anyhow!("grading worker pool is closed")))?;

        tracing::info!(rules = rules.len(), "grading submission");

        let submission = submission.clone();
        let rules = rules.to_vec();
        let limits = SandboxLimits {
            quiescence:           self.config.quiescence,
            max_script_bytes:     self.config.max_script_bytes,
            loop_iteration_limit: LOOP_ITERATION_LIMIT,
            recursion_limit:      RECURSION_LIMIT,
        };

        let worker = task::spawn_blocking(move || -> Result<ValidationResult, EvaluateError> {
            let wrapped = ScriptBridge::new(submission.js.as_str()).wrapped();
            let document = compose_document(&submission.html, &submission.css, &wrapped);

            let mut sandbox = Sandbox::create(&document, &submission.js, SANDBOX_BASE_URL, &limits)
                .map_err(EvaluateError::Sandbox)?;

            let mut errors = Vec::new();
            for rule in &rules {
                if let Some(message) = registry::evaluate_rule(&mut sandbox, rule) {
                    errors.push(message);
                }
            }
            drop(sandbox);

            if errors.is_empty() {
                Ok(ValidationResult::passed())
            } else {
                Ok(ValidationResult::failed(errors))
            }
        });

        let budget = self.config.execution_budget;
        match timeout(budget, worker).await {
            Ok(Ok(result)) => {
                if let Ok(result) = &result {
                    tracing::debug!(
                        success = result.success,
                        errors = result.errors.len(),
                        "grading finished"
                    );
                }
                result
            }
            Ok(Err(join_error)) => Err(EvaluateError::Sandbox(anyhow!(
                "grading worker failed: {join_error}"
            ))),
            Err(_) => {
                tracing::warn!(?budget, "submission exceeded the execution budget");
                Err(EvaluateError::Timeout { budget })
            }
        }
    }
}

impl Default for GradingService {
    fn default() -> Self {
        Self::new(GradingConfig::default())
    }
}
