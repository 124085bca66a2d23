// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file; built-in defaults are used without it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the git repository to analyze
    #[arg(short, long, global = true)]
    pub repo: Option<PathBuf>,

    /// Directory holding tool reports and derived tables
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Revision tags, oldest first. Replaces tag enumeration and the saved manifest
    #[arg(long, value_delimiter = ',', global = true)]
    pub revisions: Vec<String>,

    /// Log at debug level unless QUALTRACK_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Hide the per-revision progress bar
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Check out, build and analyze every selected revision, stopping at the first failure
    Run,
    /// Turn raw defect and refactoring reports into per-class CSV tables
    Normalize,
    /// Inner-join metrics, refactorings and defects per revision and per interval
    Merge,
    /// Summarize structural metrics per revision
    Trend,
    /// Tally defect categories and refactoring types
    Stats,
    /// Normalize, merge, trend and stats in one go
    Analyze,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revisions_split_on_commas() {
        let args = Args::parse_from(["qualtrack", "merge", "--revisions", "v5.3,v5.4"]);
        assert_eq!(args.command, Command::Merge);
        assert_eq!(args.revisions, vec!["v5.3", "v5.4"]);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from(["qualtrack", "run", "-r", "traccar", "-o", "out", "-v"]);
        assert_eq!(args.repo, Some(PathBuf::from("traccar")));
        assert!(args.verbose);
    }
}
