//! Output formatters for result trees
//!
//! Text, JSON and summary renderings of a finished run.

#![allow(dead_code)]

use crate::models::{ResultCounts, TestResult, TestStatus};

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    JsonPretty,
    Summary,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Some(OutputFormat::JsonPretty),
            "summary" => Some(OutputFormat::Summary),
            _ => None,
        }
    }
}

/// Renders a result tree for terminal or file output.
pub struct ResultFormatter {
    format: OutputFormat,
    colorize: bool,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            colorize: true,
        }
    }

    pub fn no_color(mut self) -> Self {
        self.colorize = false;
        self
    }

    /// Format a whole run.
    pub fn format_tree(&self, result: &TestResult) -> String {
        match self.format {
            OutputFormat::Text => {
                let mut out = String::new();
                let mut index = 0usize;
                self.render(result.flattened(), 0, &mut index, &mut out);
                out.push_str(&self.format_summary(result));
                out
            }
            OutputFormat::Json => serde_json::to_string(result).unwrap_or_default(),
            OutputFormat::JsonPretty => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Summary => self.format_summary(result),
        }
    }

    /// Leaves carry a run-global index in depth-first order, so a test can
    /// be referenced across log lines and reruns.
    fn render(&self, result: &TestResult, depth: usize, index: &mut usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match result {
            TestResult::Collection { name, children } => {
                if !name.is_empty() {
                    out.push_str(&format!("{indent}{}\n", name.full_name()));
                }
                for child in children {
                    self.render(child, depth + 1, index, out);
                }
            }
            leaf => {
                *index += 1;
                out.push_str(&format!(
                    "{indent}{:3}. {} {}\n",
                    index,
                    leaf.name().full_name(),
                    self.status_label(leaf.status()),
                ));
                if let Some(message) = leaf.message() {
                    out.push_str(&format!("{indent}     {message}\n"));
                }
                if let TestResult::Error {
                    cause: Some(cause), ..
                } = leaf
                {
                    out.push_str(&format!("{indent}     {cause}\n"));
                }
            }
        }
    }

    fn status_label(&self, status: TestStatus) -> &'static str {
        if self.colorize {
            match status {
                TestStatus::Success => "\x1b[32m✓ PASS\x1b[0m",
                TestStatus::Error => "\x1b[31m✗ FAIL\x1b[0m",
                TestStatus::Warning => "\x1b[33m! WARN\x1b[0m",
                TestStatus::Ignored => "\x1b[33m○ SKIP\x1b[0m",
            }
        } else {
            match status {
                TestStatus::Success => "✓ PASS",
                TestStatus::Error => "✗ FAIL",
                TestStatus::Warning => "! WARN",
                TestStatus::Ignored => "○ SKIP",
            }
        }
    }

    fn format_summary(&self, result: &TestResult) -> String {
        let ResultCounts {
            total,
            success,
            errors,
            warnings,
            ignored,
        } = result.counts();
        let judged = total - ignored;
        let rate = if judged == 0 {
            100.0
        } else {
            (success + warnings) as f64 / judged as f64 * 100.0
        };
        format!(
            "Total: {total}  Passed: {success}  Failed: {errors}  \
             Warnings: {warnings}  Ignored: {ignored}  ({rate:.1}%)\n"
        )
    }
}
