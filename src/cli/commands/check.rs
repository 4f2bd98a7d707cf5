//! Check command: convert many exports, report diagnostics only

use clap::Parser;

use super::super::output::{format_diagnostics, format_error, format_summary, log_info};
use super::super::utils::{load_converter, read_export};

/// Convert exports and summarize their diagnostics
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Export JSON files
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<String>,

    /// Schema JSON file (defaults to the built-in vocabulary)
    #[arg(short, long, value_name = "PATH")]
    pub schema: Option<String>,

    /// Print every diagnostic, not only the per-file summary
    #[arg(short, long)]
    pub detailed: bool,

    /// Do not apply text edit spans
    #[arg(long)]
    pub no_text_edits: bool,
}

/// Outcome over all checked files.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckReport {
    /// Files converted.
    pub files: usize,
    /// Files that could not be read or converted.
    pub failed: usize,
    /// Files with at least one schema violation.
    pub with_violations: usize,
}

impl CheckReport {
    /// Whether every file converted without schema violations.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.with_violations == 0
    }
}

/// Run the check command. Per-file failures are reported and counted, not
/// returned.
pub fn cmd_check(args: CheckArgs) -> Result<CheckReport, String> {
    let converter = load_converter(args.schema.as_deref(), !args.no_text_edits)?;
    let mut report = CheckReport::default();

    for input in &args.inputs {
        let doc = read_export(input, false).and_then(|export| {
            converter
                .convert(export)
                .map_err(|e| format!("Conversion of {} failed: {}", input, e))
        });
        match doc {
            Ok(doc) => {
                report.files += 1;
                if doc.has_violations() {
                    report.with_violations += 1;
                }
                println!("{}", format_summary(input, &doc));
                if args.detailed && !doc.diagnostics.is_empty() {
                    print!("{}", format_diagnostics(&doc));
                }
            }
            Err(e) => {
                report.failed += 1;
                log_info(&format_error("check", &e), false);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, json: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, json).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_violations_and_failures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let clean = write(
            &dir,
            "clean.json",
            r#"{"text": "Anna", "spans": [{"id": "a", "begin": 0, "end": 4, "label": "nam.per"}]}"#,
        );
        // attribute at top level has no parent mention
        let violating = write(
            &dir,
            "bad.json",
            r#"{"text": "tall", "spans": [{"id": "t", "begin": 0, "end": 4, "label": "att.height"}]}"#,
        );
        let broken = write(&dir, "broken.json", "{ not json");

        let report = cmd_check(CheckArgs {
            inputs: vec![clean, violating, broken],
            schema: None,
            detailed: false,
            no_text_edits: false,
        })
        .unwrap();
        assert_eq!(
            report,
            CheckReport {
                files: 2,
                failed: 1,
                with_violations: 1
            }
        );
        assert!(!report.is_clean());
    }
}
