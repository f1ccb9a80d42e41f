//! Output formatting for plan diffs.
//!
//! This module turns a [`Diff`] into something to print: coloured unified
//! diffs for a terminal, the same text without escapes, or a JSON report.
//!
//! # Examples
//!
//! ```
//! use plandiff_rs::output::{format_diff, OutputFormat, OutputOptions};
//! use plandiff_rs::plan::Diff;
//!
//! let output = format_diff(&Diff::default(), &OutputFormat::Plain, &OutputOptions::default()).unwrap();
//! assert_eq!(output, "No changes detected.");
//! ```

use crate::error::OutputError;
use crate::plan::{Diff, DiffFailure, OutputDiff, PlanAction, ResourceDiff, Side, Warning};
use colored::*;
use serde::Serialize;
use std::str::FromStr;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored terminal output with ANSI escape codes
    Terminal,
    /// JSON report of the whole diff
    Json,
    /// Plain text, no colors (suitable for piping)
    Plain,
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "plain" => Ok(OutputFormat::Plain),
            _ => Err(OutputError::UnknownFormat {
                format: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Colour terminal output; ignored by the other formats
    pub color: bool,
    /// Append the `Plan: ...` summary line
    pub show_summary: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            color: true,
            show_summary: true,
        }
    }
}

/// Resource counts by planned action. Drift is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub add: usize,
    pub change: usize,
    pub destroy: usize,
    pub replace: usize,
}

impl Summary {
    pub fn from_diff(diff: &Diff) -> Self {
        let mut summary = Summary::default();
        for resource in diff.resources.iter().filter(|r| !r.drifted) {
            match resource.action {
                PlanAction::Create => summary.add += 1,
                PlanAction::Update => summary.change += 1,
                PlanAction::Delete => summary.destroy += 1,
                PlanAction::CreateThenDestroy | PlanAction::DestroyThenCreate => summary.replace += 1,
                PlanAction::Read | PlanAction::NoOp => {}
            }
        }
        summary
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Plan: {} to add, {} to change, {} to destroy, {} to replace.",
            self.add, self.change, self.destroy, self.replace
        )
    }
}

/// Formats a diff according to the specified format and options.
///
/// # Examples
///
/// ```
/// use plandiff_rs::output::{format_diff, OutputFormat, OutputOptions};
/// use plandiff_rs::plan::Diff;
///
/// let json = format_diff(&Diff::default(), &OutputFormat::Json, &OutputOptions::default()).unwrap();
/// assert!(json.contains("\"summary\""));
/// ```
pub fn format_diff(
    diff: &Diff,
    format: &OutputFormat,
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Terminal if options.color => Ok(format_text(diff, options, &Palette::Color)),
        OutputFormat::Terminal | OutputFormat::Plain => Ok(format_text(diff, options, &Palette::Plain)),
        OutputFormat::Json => format_json(diff),
    }
}

/// The summary line alone.
pub fn format_summary(diff: &Diff) -> String {
    Summary::from_diff(diff).to_string()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    diff: &'a Diff,
    summary: Summary,
}

fn format_json(diff: &Diff) -> Result<String, OutputError> {
    let report = JsonReport {
        diff,
        summary: Summary::from_diff(diff),
    };
    serde_json::to_string_pretty(&report).map_err(|e| OutputError::JsonSerializationError { source: e })
}

enum Palette {
    Color,
    Plain,
}

impl Palette {
    fn heading(&self, text: &str) -> String {
        match self {
            Palette::Color => text.bold().to_string(),
            Palette::Plain => text.to_string(),
        }
    }

    fn diff_line(&self, line: &str) -> String {
        let Palette::Color = self else {
            return line.to_string();
        };
        if line.starts_with("---") || line.starts_with("+++") {
            line.bold().to_string()
        } else if line.starts_with("@@") {
            line.cyan().to_string()
        } else if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else {
            line.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        match self {
            Palette::Color => text.yellow().to_string(),
            Palette::Plain => text.to_string(),
        }
    }

    fn failure(&self, text: &str) -> String {
        match self {
            Palette::Color => text.bright_red().to_string(),
            Palette::Plain => text.to_string(),
        }
    }

    fn dimmed(&self, text: &str) -> String {
        match self {
            Palette::Color => text.dimmed().to_string(),
            Palette::Plain => text.to_string(),
        }
    }
}

fn format_text(diff: &Diff, options: &OutputOptions, palette: &Palette) -> String {
    if diff.resources.is_empty() && diff.outputs.is_empty() && diff.failures.is_empty() {
        return palette.dimmed("No changes detected.");
    }

    let mut sections = Vec::new();
    for resource in &diff.resources {
        sections.push(format_section(
            &describe_resource(resource),
            &resource.diff,
            &resource.warnings,
            palette,
        ));
    }
    for output in &diff.outputs {
        sections.push(format_section(
            &describe_output(output),
            &output.diff,
            &output.warnings,
            palette,
        ));
    }
    for failure in &diff.failures {
        sections.push(format_failure(failure, palette));
    }

    let mut output = sections.join("\n");
    if options.show_summary {
        output.push('\n');
        output.push_str(&palette.heading(&format_summary(diff)));
    }
    output
}

fn format_section(heading: &str, diff: &str, warnings: &[Warning], palette: &Palette) -> String {
    let mut section = palette.heading(heading);
    section.push('\n');
    for line in diff.lines() {
        section.push_str(&palette.diff_line(line));
        section.push('\n');
    }
    for warning in warnings {
        section.push_str(&palette.warning(&format_warning(warning)));
        section.push('\n');
    }
    section
}

fn format_failure(failure: &DiffFailure, palette: &Palette) -> String {
    let line = format!("# {} could not be diffed: {}", failure.address, failure.message);
    format!("{}\n", palette.failure(&line))
}

fn format_warning(warning: &Warning) -> String {
    let side = match warning.side {
        Side::Before => "before",
        Side::After => "after",
    };
    format!("Warning ({side} line {}): {}", warning.line, warning.message)
}

fn describe_resource(resource: &ResourceDiff) -> String {
    let address = &resource.address;
    if resource.drifted {
        return format!("# {address} has changed outside of Terraform");
    }

    let mut heading = match resource.action {
        PlanAction::Create => format!("# {address} will be created"),
        PlanAction::Read => format!("# {address} will be read during apply"),
        PlanAction::Update => format!("# {address} will be updated in-place"),
        PlanAction::Delete => format!("# {address} will be destroyed"),
        PlanAction::CreateThenDestroy | PlanAction::DestroyThenCreate => {
            format!("# {address} must be replaced")
        }
        PlanAction::NoOp if resource.imported => format!("# {address} will be imported"),
        PlanAction::NoOp if resource.moved => {
            let previous = resource.previous_address.as_deref().unwrap_or_default();
            return format!("# {previous} has moved to {address}");
        }
        PlanAction::NoOp => format!("# {address} has no changes"),
    };
    if resource.moved {
        if let Some(previous) = &resource.previous_address {
            heading.push_str(&format!(" (moved from {previous})"));
        }
    }
    if let Some(reason) = &resource.action_reason {
        heading.push_str(&format!(" ({reason})"));
    }
    heading
}

fn describe_output(output: &OutputDiff) -> String {
    let verb = match output.action {
        PlanAction::Create => "will be created",
        PlanAction::Delete => "will be destroyed",
        PlanAction::NoOp => "has no changes",
        _ => "will be updated",
    };
    format!("# output.{} {verb}", output.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(action: PlanAction) -> ResourceDiff {
        ResourceDiff {
            address: "test_thing.a".to_string(),
            previous_address: None,
            action,
            action_reason: None,
            moved: false,
            imported: false,
            drifted: false,
            diff: "--- before\n+++ after\n@@ -1 +1 @@\n-a\n+b\n".to_string(),
            before: "a\n".to_string(),
            after: "b\n".to_string(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("terminal".parse::<OutputFormat>().unwrap(), OutputFormat::Terminal);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(OutputError::UnknownFormat { .. })
        ));
    }

    #[test]
    fn test_summary_counts() {
        let mut drifted = resource(PlanAction::Update);
        drifted.drifted = true;
        let diff = Diff {
            resources: vec![
                resource(PlanAction::Create),
                resource(PlanAction::Create),
                resource(PlanAction::DestroyThenCreate),
                resource(PlanAction::Read),
                drifted,
            ],
            ..Default::default()
        };
        assert_eq!(
            format_summary(&diff),
            "Plan: 2 to add, 0 to change, 0 to destroy, 1 to replace."
        );
    }

    #[test]
    fn test_format_plain() {
        let diff = Diff {
            resources: vec![resource(PlanAction::Update)],
            ..Default::default()
        };
        let output = format_diff(&diff, &OutputFormat::Plain, &OutputOptions::default()).unwrap();
        assert!(output.starts_with("# test_thing.a will be updated in-place\n--- before\n"));
        assert!(output.contains("-a\n+b\n"));
        assert!(output.ends_with("Plan: 0 to add, 1 to change, 0 to destroy, 0 to replace."));
    }

    #[test]
    fn test_format_plain_without_summary() {
        let diff = Diff {
            resources: vec![resource(PlanAction::Delete)],
            ..Default::default()
        };
        let options = OutputOptions {
            show_summary: false,
            ..Default::default()
        };
        let output = format_diff(&diff, &OutputFormat::Plain, &options).unwrap();
        assert!(!output.contains("Plan:"));
    }

    #[test]
    fn test_terminal_without_color_matches_plain() {
        let diff = Diff {
            resources: vec![resource(PlanAction::Update)],
            ..Default::default()
        };
        let options = OutputOptions {
            color: false,
            ..Default::default()
        };
        assert_eq!(
            format_diff(&diff, &OutputFormat::Terminal, &options).unwrap(),
            format_diff(&diff, &OutputFormat::Plain, &options).unwrap()
        );
    }

    #[test]
    fn test_describe_moved_resource() {
        let mut moved = resource(PlanAction::NoOp);
        moved.moved = true;
        moved.previous_address = Some("test_thing.old".to_string());
        assert_eq!(describe_resource(&moved), "# test_thing.old has moved to test_thing.a");

        moved.action = PlanAction::Update;
        assert_eq!(
            describe_resource(&moved),
            "# test_thing.a will be updated in-place (moved from test_thing.old)"
        );
    }

    #[test]
    fn test_warnings_and_failures_listed() {
        let mut updated = resource(PlanAction::Update);
        updated.warnings.push(Warning {
            side: Side::After,
            line: 2,
            message: "careful".to_string(),
        });
        let diff = Diff {
            resources: vec![updated],
            outputs: Vec::new(),
            failures: vec![DiffFailure {
                address: "test_thing.b".to_string(),
                message: "boom".to_string(),
            }],
        };
        let output = format_diff(&diff, &OutputFormat::Plain, &OutputOptions::default()).unwrap();
        assert!(output.contains("Warning (after line 2): careful\n"));
        assert!(output.contains("# test_thing.b could not be diffed: boom\n"));
    }

    #[test]
    fn test_format_json_report() {
        let diff = Diff {
            resources: vec![resource(PlanAction::Create)],
            ..Default::default()
        };
        let output = format_diff(&diff, &OutputFormat::Json, &OutputOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["resources"][0]["action"], "create");
        assert_eq!(value["summary"]["add"], 1);
        assert_eq!(value["failures"], serde_json::json!([]));
    }
}
