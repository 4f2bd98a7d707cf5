//! Convert command: one export in, one document out

use clap::Parser;
use std::time::Instant;

use super::super::output::{format_diagnostics, format_summary, log_info, write_output};
use super::super::utils::{load_converter, read_export};

/// Convert one export to a document
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Export JSON file
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Schema JSON file (defaults to the built-in vocabulary)
    #[arg(short, long, value_name = "PATH")]
    pub schema: Option<String>,

    /// Write the document here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,

    /// Do not apply text edit spans
    #[arg(long)]
    pub no_text_edits: bool,

    /// Fail on offsets outside the text instead of dropping the span
    #[arg(long)]
    pub strict: bool,

    /// Do not print diagnostics
    #[arg(short, long)]
    pub quiet: bool,
}

/// Run the convert command.
pub fn cmd_convert(args: ConvertArgs) -> Result<(), String> {
    let converter = load_converter(args.schema.as_deref(), !args.no_text_edits)?;
    let export = read_export(&args.input, args.strict)?;

    let start = Instant::now();
    let doc = converter
        .convert(export)
        .map_err(|e| format!("Conversion of {} failed: {}", args.input, e))?;
    let elapsed = start.elapsed();

    let mut json = doc
        .to_json(!args.compact)
        .map_err(|e| format!("Failed to serialize document: {}", e))?;
    json.push('\n');
    write_output(&json, args.output.as_deref())?;

    if !doc.diagnostics.is_empty() {
        log_info(format_diagnostics(&doc).trim_end(), args.quiet);
    }
    log_info(
        &format!(
            "{} ({:.2}ms)",
            format_summary(&args.input, &doc),
            elapsed.as_secs_f64() * 1000.0
        ),
        args.quiet,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;
    use std::io::Write;

    #[test]
    fn test_convert_writes_document() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        let mut file = std::fs::File::create(&input).unwrap();
        write!(
            file,
            r#"{{"id": "d1", "text": "Anna left", "spans": [{{"id": "a", "begin": 0, "end": 4, "label": "nam.per"}}]}}"#
        )
        .unwrap();

        cmd_convert(ConvertArgs {
            input: input.to_string_lossy().into_owned(),
            schema: None,
            output: Some(output.to_string_lossy().into_owned()),
            compact: true,
            no_text_edits: false,
            strict: false,
            quiet: true,
        })
        .unwrap();

        let doc = Document::from_json_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(doc.id.as_deref(), Some("d1"));
        assert_eq!(doc.mentions.len(), 1);
    }
}
