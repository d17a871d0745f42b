use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "transcriptor")]
#[command(about = "Transcribes recording-session exports into DOCX reports")]
#[command(version)]
pub struct Args {
    /// JSON configuration file; defaults plus environment overrides when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe one archive and wait for the report
    Run {
        /// Zip export of a recording session
        archive: PathBuf,
    },

    /// Queue archives and follow their status until all are done
    Submit {
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Status poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },

    /// List previously produced reports, newest first
    History {
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the effective configuration
    Config,
}
