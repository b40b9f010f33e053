#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![recursion_limit = "256"]

//! # stepcheck
//!
//! The grading engine behind an interactive coding-lesson platform: learners
//! edit the HTML/CSS/JS for a lesson step and submit it; the engine executes
//! the submission in an isolated DOM+script sandbox and evaluates the step's
//! declarative rule set against it, returning a success message or an
//! ordered list of specific failure diagnostics.
//!
//! The one operation everything else calls:
//!
//! ```no_run
//! # async fn example() -> Result<(), stepcheck::EvaluateError> {
//! use stepcheck::{GradingService, Rule, Submission};
//!
//! let service = GradingService::default();
//! let submission = Submission::builder()
//!     .html("<ul><li>One</li><li>Two</li><li>Three</li></ul>")
//!     .build();
//! let rules: Vec<Rule> = serde_json::from_str(
//!     r#"[{ "type": "elementCount", "selector": "li", "expected": 3 }]"#,
//! ).expect("rule set should parse");
//!
//! let result = service.evaluate(&submission, &rules).await?;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

/// A module defining a bunch of constant values to be used throughout
pub mod constants;
/// Stylesheet parsing and computed-style resolution
pub mod css;
/// The document tree, its parser, and the selector engine
pub mod dom;
/// The grading service and its result types
pub mod grade;
/// Document assembly and submission-script rewriting
pub mod page;
/// The rule model, evaluators, dispatch registry, and authoring schema
pub mod rules;
/// The isolated DOM+script execution environment
pub mod sandbox;

pub use grade::{EvaluateError, GradingConfig, GradingService, Submission, ValidationResult};
pub use rules::{Rule, schema};
