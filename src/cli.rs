use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use singscore::analysis::result::ScoringMode;

#[derive(Parser)]
#[command(name = "singscore")]
#[command(about = "Detect sung pitch and score a performance against a reference melody")]
pub struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/singscore/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the detected pitch sequence of a WAV recording
    Detect {
        /// Mono or multi-channel WAV file
        wav: PathBuf,

        /// Reference melody (JSON array of Hz, or a WAV file) used to size
        /// the detection window and fill unpitched frames
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Emit the sequence as a JSON array instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Score a recorded performance against a reference melody
    Score {
        /// Reference melody (JSON array of Hz, or a WAV file)
        #[arg(long)]
        reference: PathBuf,

        /// Recorded performance (WAV)
        #[arg(long)]
        recording: PathBuf,

        /// Score weighting (overrides the config file)
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Write a JSON snapshot of the result to this path
        #[arg(long)]
        export: Option<PathBuf>,

        /// Abort if the analysis takes longer than this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show where the config file is read from
    Paths,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// pitch 0.7, stability 0.2, timing 0.1
    Standard,
    /// pitch 0.6, stability 0.2, timing 0.2
    DtwComparison,
}

impl From<ModeArg> for ScoringMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Standard => ScoringMode::Standard,
            ModeArg::DtwComparison => ScoringMode::DtwComparison,
        }
    }
}
