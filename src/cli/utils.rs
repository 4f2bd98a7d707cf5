//! Utility functions for CLI commands

use crate::{AnnotationExport, Converter, Schema};

/// Build a converter from an optional schema file.
pub fn load_converter(schema: Option<&str>, text_edits: bool) -> Result<Converter, String> {
    let converter = match schema {
        Some(path) => {
            let compiled = Schema::from_path(path)
                .and_then(Schema::compile)
                .map_err(|e| format!("Failed to load schema {}: {}", path, e))?;
            Converter::new(compiled)
        }
        None => Converter::default(),
    };
    Ok(converter.with_text_edits(text_edits))
}

/// Read an export; with `strict`, impossible offsets are an error instead
/// of a diagnostic.
pub fn read_export(path: &str, strict: bool) -> Result<AnnotationExport, String> {
    let export =
        AnnotationExport::from_path(path).map_err(|e| format!("Failed to read export {}: {}", path, e))?;
    if strict {
        export.validate().map_err(|e| format!("{}: {}", path, e))?;
    }
    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_strict_rejects_bad_offsets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"text": "ab", "spans": [{{"id": "s", "begin": 0, "end": 9}}]}}"#).unwrap();
        let path = file.path().to_str().unwrap();
        assert!(read_export(path, false).is_ok());
        assert!(read_export(path, true).unwrap_err().contains("beyond text length"));
    }

    #[test]
    fn test_missing_schema_file() {
        let err = load_converter(Some("/nonexistent/schema.json"), true).unwrap_err();
        assert!(err.starts_with("Failed to load schema"));
    }
}
