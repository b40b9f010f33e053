#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

/// Tree-sitter query that returns top-level function declarations
/// * `name`: name of the declared function
pub const TOP_LEVEL_FUNCTIONS_QUERY: &str = include_str!("queries/top_level_functions.scm");

/// Message returned to the learner when every rule in the step passes.
pub const SUCCESS_MESSAGE: &str = "Great job, this step is complete!";

/// Default settle window granted to a submission's setup code after the
/// document finishes parsing.
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(100);

/// Default hard ceiling on the wall-clock time one evaluation may take.
pub const DEFAULT_EXECUTION_BUDGET: Duration = Duration::from_secs(2);

/// Default number of submissions graded concurrently.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Largest script the sandbox will execute (64 KB). Learner steps are tiny;
/// anything larger is pasted noise that can stall the engine.
pub const MAX_SCRIPT_BYTES: usize = 64 * 1024;

/// Upper bound on loop iterations inside the script engine, so a
/// `while (true) {}` submission terminates inside the engine instead of
/// pinning a grading worker until the budget kills it. Generous for lesson
/// code, small enough that hitting it stays well inside the budget.
pub const LOOP_ITERATION_LIMIT: u64 = 500_000;

/// Upper bound on call-stack depth inside the script engine.
pub const RECURSION_LIMIT: usize = 512;

/// Base URL reported to sandboxed scripts via `location`.
pub const SANDBOX_BASE_URL: &str = "https://sandbox.invalid/";
