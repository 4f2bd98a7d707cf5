//! CLI argument parsing and structure definitions

use clap::{Parser, Subcommand};

/// Convert standoff annotation exports into nested documents
#[derive(Parser, Debug)]
#[command(name = "standoff")]
#[command(
    author,
    version,
    about = "Convert standoff annotation exports into nested documents",
    long_about = r#"
standoff - rebuild mention, event and relation trees from flat annotations

INPUT:
  A JSON export: { "id"?, "text", "spans": [...], "relations": [...] }
  with character offsets into "text".

OUTPUT:
  A JSON document with lines/tokens, mentions, descriptors, values,
  events, relations, hierarchy edges and diagnostics.

EXAMPLES:
  standoff convert doc.json -o doc.tree.json
  standoff convert doc.json --schema schema.json --compact
  standoff check exports/*.json
"#
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Print library log lines to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert one export to a document
    #[command(visible_alias = "c")]
    Convert(crate::cli::commands::ConvertArgs),

    /// Convert exports and summarize their diagnostics
    #[command(visible_alias = "k")]
    Check(crate::cli::commands::CheckArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_convert() {
        let cli = Cli::parse_from(["standoff", "convert", "in.json", "-o", "out.json", "--compact", "-v"]);
        assert_eq!(cli.verbose, 1);
        let Commands::Convert(args) = cli.command else {
            panic!("convert");
        };
        assert_eq!(args.input, "in.json");
        assert_eq!(args.output.as_deref(), Some("out.json"));
        assert!(args.compact);
        assert!(!args.no_text_edits);
    }

    #[test]
    fn test_parse_check_many() {
        let cli = Cli::parse_from(["standoff", "check", "a.json", "b.json", "--schema", "s.json"]);
        let Commands::Check(args) = cli.command else {
            panic!("check");
        };
        assert_eq!(args.inputs, vec!["a.json", "b.json"]);
        assert_eq!(args.schema.as_deref(), Some("s.json"));
    }
}
