use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use sublingo_core::captions::{OutputFormat, PayloadFormat};

#[derive(Parser)]
#[command(name = "sublingo-cli")]
#[command(author, version, about = "Subtitle conversion, inspection, and playback preview")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a subtitle file to plain text, SRT, or WebVTT
    Convert {
        /// Input file (timed-text XML, SRT, or WebVTT)
        #[arg(required = true)]
        input: PathBuf,

        /// Input format (auto-detected if omitted)
        #[arg(long, value_parser = PayloadFormat::from_str)]
        from: Option<PayloadFormat>,

        /// Output format
        #[arg(short, long, default_value = "srt", value_parser = OutputFormat::from_str)]
        to: OutputFormat,

        /// Prefix plain-text lines with [HH:MM:SS,mmm] timestamps
        #[arg(long)]
        timestamps: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a subtitle file and report cue statistics
    Inspect {
        /// Input file to inspect
        #[arg(required = true)]
        input: PathBuf,

        /// Input format (auto-detected if omitted)
        #[arg(long, value_parser = PayloadFormat::from_str)]
        from: Option<PayloadFormat>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a subtitle file against the wall clock, printing cues as they activate
    Preview {
        /// Input file to play
        #[arg(required = true)]
        input: PathBuf,

        /// Input format (auto-detected if omitted)
        #[arg(long, value_parser = PayloadFormat::from_str)]
        from: Option<PayloadFormat>,

        /// Playback position to start from, in seconds
        #[arg(long, default_value_t = 0.0)]
        start: f64,

        /// Playback speed multiplier
        #[arg(long, default_value_t = 1.0)]
        speed: f64,
    },
}
