#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # stepcheck
//!
//! Command-line driver for the grading engine: grade a submission held in
//! local files against a rule-set JSON, or print the rule schema that backs
//! the authoring UI's Rule Builder.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use stepcheck::{GradingConfig, GradingService, Rule, Submission, schema};
use tabled::{Table, Tabled, settings::Style};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// One failed rule, as displayed in the CLI table.
#[derive(Tabled)]
struct FailureRow {
    /// position of the failing rule's diagnostic
    #[tabled(rename = "#")]
    index:   usize,
    /// the learner-facing diagnostic
    #[tabled(rename = "Problem")]
    message: String,
}

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade a submission against a rule set
    Check {
        /// path to the submitted markup
        html:          PathBuf,
        /// path to the submitted stylesheet
        css:           Option<PathBuf>,
        /// path to the submitted script
        js:            Option<PathBuf>,
        /// path to the rule-set JSON
        rules:         PathBuf,
        /// execution budget override, milliseconds
        budget_ms:     Option<u64>,
        /// quiescence window override, milliseconds
        quiescence_ms: Option<u64>,
    },
    /// Print the rule schema, or one rule type's entry
    Schema(Option<String>),
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    let html = long("html")
        .help("Path to the submitted HTML file")
        .argument::<PathBuf>("HTML");
    let css = long("css")
        .help("Path to the submitted CSS file")
        .argument::<PathBuf>("CSS")
        .optional();
    let js = long("js")
        .help("Path to the submitted JS file")
        .argument::<PathBuf>("JS")
        .optional();
    let rules = long("rules")
        .help("Path to the rule-set JSON for this step")
        .argument::<PathBuf>("RULES");
    let budget_ms = long("budget-ms")
        .help("Execution budget in milliseconds")
        .argument::<u64>("MS")
        .optional();
    let quiescence_ms = long("quiescence-ms")
        .help("Settle window in milliseconds")
        .argument::<u64>("MS")
        .optional();
    let check = construct!(Cmd::Check {
        html,
        css,
        js,
        rules,
        budget_ms,
        quiescence_ms
    })
    .to_options()
    .descr("Grade a submission against a step's rule set")
    .command("check");

    let schema = positional::<String>("RULE_TYPE")
        .help("Print only this rule type's schema entry")
        .optional()
        .map(Cmd::Schema)
        .to_options()
        .descr("Print the Rule Builder schema")
        .command("schema");

    construct!([check, schema])
        .to_options()
        .descr("stepcheck - grades HTML/CSS/JS lesson submissions and generates feedback")
        .run()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer().without_time().compact())
        .with(LevelFilter::from_level(Level::INFO))
        .init();

    match options() {
        Cmd::Check {
            html,
            css,
            js,
            rules,
            budget_ms,
            quiescence_ms,
        } => {
            let submission = Submission::builder()
                .html(read(&html)?)
                .css(css.map(|p| read(&p)).transpose()?.unwrap_or_default())
                .js(js.map(|p| read(&p)).transpose()?.unwrap_or_default())
                .build();
            let rules: Vec<Rule> = serde_json::from_str(&read(&rules)?)
                .with_context(|| format!("Could not parse rule set {}", rules.display()))?;

            let mut config = GradingConfig::default();
            if let Some(ms) = budget_ms {
                config.execution_budget = Duration::from_millis(ms);
            }
            if let Some(ms) = quiescence_ms {
                config.quiescence = Duration::from_millis(ms);
            }

            let service = GradingService::new(config);
            let result = service.evaluate(&submission, &rules).await?;

            if result.success {
                println!(
                    "{}",
                    result
                        .message
                        .unwrap_or_else(|| "Passed.".to_string())
                        .green()
                        .bold()
                );
            } else {
                let rows: Vec<FailureRow> = result
                    .errors
                    .iter()
                    .enumerate()
                    .map(|(i, message)| FailureRow {
                        index:   i + 1,
                        message: message.clone(),
                    })
                    .collect();
                println!("{}", "The submission did not pass this step:".red().bold());
                let mut table = Table::new(rows);
                table.with(Style::modern());
                println!("{table}");
                std::process::exit(1);
            }
        }
        Cmd::Schema(kind) => {
            let output = match kind {
                Some(kind) => schema::rule_schema(&kind)
                    .with_context(|| format!("No rule type named '{kind}'"))?,
                None => schema::schema(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Reads one submission file.
fn read(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Could not read file: {}", path.display()))
}
