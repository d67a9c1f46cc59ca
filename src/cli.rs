use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use avmerge_common::config::PairMode;

#[derive(Parser)]
#[command(name = "avmerge")]
#[command(author, version, about = "Merge audio/video pairs and concatenate videos with ffmpeg")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the ffmpeg executable (default: search PATH)
    #[arg(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge audio and video files that share a name, then delete the originals
    Merge {
        /// Directory to scan (default: current directory)
        dir: Option<PathBuf>,

        /// Maximum concurrent ffmpeg processes (default: half the CPU cores)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// How files are paired
        #[arg(long, value_enum)]
        mode: Option<PairModeArg>,

        /// Exit with an error if any pair fails to merge
        #[arg(long)]
        strict: bool,
    },

    /// Concatenate videos, in the given order, into one file
    Concat {
        /// Videos to join (at least two)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file
        #[arg(short, long, required = true)]
        output: PathBuf,
    },

    /// Check that required external tools are available
    CheckTools,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PairModeArg {
    /// The audio file plus any one supported video file
    AudioPlusVideo,
    /// Exactly the audio file and the first configured video extension
    Exact,
}

impl From<PairModeArg> for PairMode {
    fn from(arg: PairModeArg) -> Self {
        match arg {
            PairModeArg::AudioPlusVideo => PairMode::AudioPlusVideo,
            PairModeArg::Exact => PairMode::Exact,
        }
    }
}
