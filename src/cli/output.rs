//! Output formatting utilities for CLI commands

use std::io::{self, Write};

use crate::{DiagnosticKind, Document};

/// Format error message for display
pub fn format_error(operation: &str, details: &str) -> String {
    format!("ERROR: {} - {}", operation, details)
}

/// Log info message (respects quiet flag)
pub fn log_info(msg: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", msg);
    }
}

/// Write output to file or stdout
pub fn write_output(content: &str, path: Option<&str>) -> Result<(), String> {
    if let Some(path) = path {
        std::fs::write(path, content).map_err(|e| format!("Failed to write to {}: {}", path, e))?;
    } else {
        print!("{}", content);
        io::stdout()
            .flush()
            .map_err(|e| format!("Failed to flush stdout: {}", e))?;
    }
    Ok(())
}

/// One line per diagnostic.
pub fn format_diagnostics(doc: &Document) -> String {
    let mut out = String::new();
    for diag in &doc.diagnostics {
        out.push_str(&format!("  {}\n", diag));
    }
    out
}

/// `name: N mentions, N events, ... | N malformed, N schema, N notice`
pub fn format_summary(name: &str, doc: &Document) -> String {
    let count = |kind| doc.diagnostics_of(kind).count();
    format!(
        "{}: {} tokens, {} mentions, {} descriptors, {} values, {} events, {} relations | {} malformed, {} schema, {} notice",
        name,
        doc.token_count(),
        doc.mentions.len(),
        doc.descriptors.len(),
        doc.values.len(),
        doc.events.len(),
        doc.relations.len(),
        count(DiagnosticKind::MalformedInput),
        count(DiagnosticKind::SchemaViolation),
        count(DiagnosticKind::Notice),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{convert, AnnotationExport, RawSpan};

    #[test]
    fn test_summary_counts() {
        let doc = convert(
            AnnotationExport::new("Anna Ben")
                .with_span(RawSpan::new("a", 0, 4, "nam.per"))
                .with_span(RawSpan::new("x", 5, 8, "bogus")),
        )
        .unwrap();
        let line = format_summary("doc.json", &doc);
        assert!(line.starts_with("doc.json: 2 tokens, 1 mentions"));
        assert!(line.contains("1 malformed, 0 schema"));
        assert!(format_diagnostics(&doc).contains("[malformed] x:"));
    }
}
