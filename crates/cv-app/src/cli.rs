use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cv_data::Opco;

/// Command-line arguments for callvault
#[derive(Parser, Debug)]
#[command(name = "callvault", version, about = "Browse call-recording metadata")]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CALLVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true, action)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Continuation-token dataset
    Talkdesk {
        #[command(flatten)]
        search: SearchArgs,

        /// Number of pages to walk forward
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Session dataset
    Vpi {
        #[command(flatten)]
        search: SearchArgs,

        /// Operating company (CMP, RGE, NYSEG)
        #[arg(long)]
        opco: Option<Opco>,

        /// Page to jump to after the search
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Range start, e.g. "2025-01-01 00:00:00" or "2025-01-01"
    #[arg(long)]
    pub from: String,

    /// Range end
    #[arg(long)]
    pub to: String,

    /// Filter as Key=v1,v2 (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUES")]
    pub filters: Vec<String>,

    /// Download the recording of this row (0-based) of the last page
    #[arg(long, requires = "out")]
    pub recording: Option<usize>,

    /// Where to write the recording
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vpi() {
        let cli = Cli::try_parse_from([
            "callvault",
            "--verbose",
            "vpi",
            "--from",
            "2025-01-01",
            "--to",
            "2025-01-02",
            "--opco",
            "nyseg",
            "--filter",
            "ObjectId=1,2",
            "--page",
            "3",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Vpi { search, opco, page } => {
                assert_eq!(opco, Some(Opco::Nyseg));
                assert_eq!(page, 3);
                assert_eq!(search.filters, vec!["ObjectId=1,2"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_recording_needs_out() {
        let result = Cli::try_parse_from([
            "callvault", "talkdesk", "--from", "a", "--to", "b", "--recording", "0",
        ]);
        assert!(result.is_err());
    }
}
