mod cli;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use sublingo_core::captions::{
    detect_format, format_timestamp, parse_track, render_cues, CueIndex, CueSkip, OutputFormat,
    ParseOutcome, PayloadFormat, RenderOptions,
};
use sublingo_core::sync::{PlaybackClock, SystemClock};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise derive a filter from --verbose.
    // Logs go to stderr so converted output on stdout stays pipeable.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "sublingo_core=debug,sublingo_cli=debug".to_string()
        } else {
            "sublingo_core=warn,sublingo_cli=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            from,
            to,
            timestamps,
            output,
        } => convert(&input, from, to, timestamps, output.as_deref()),
        Commands::Inspect { input, from, json } => inspect(&input, from, json),
        Commands::Preview {
            input,
            from,
            start,
            speed,
        } => preview(&input, from, start, speed).await,
    }
}

/// Reads and parses a subtitle file, resolving the format up front so it can
/// be reported back to the user.
fn parse_file(input: &Path, from: Option<PayloadFormat>) -> Result<(PayloadFormat, ParseOutcome)> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let format = from
        .or_else(|| detect_format(&raw))
        .with_context(|| format!("could not detect subtitle format of {}", input.display()))?;
    let outcome = parse_track(&raw, Some(format))
        .with_context(|| format!("failed to parse {}", input.display()))?;
    Ok((format, outcome))
}

fn convert(
    input: &Path,
    from: Option<PayloadFormat>,
    to: OutputFormat,
    timestamps: bool,
    output: Option<&Path>,
) -> Result<()> {
    let (_, outcome) = parse_file(input, from)?;
    if !outcome.skipped.is_empty() {
        tracing::warn!("{} cues were skipped during parsing", outcome.skipped.len());
    }

    let rendered = render_cues(
        &outcome.cues,
        to,
        RenderOptions {
            include_timestamps: timestamps,
        },
    );

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", rendered))
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!("wrote {} cues to {}", outcome.cues.len(), path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InspectReport {
    file: String,
    format: PayloadFormat,
    cue_count: usize,
    start_sec: f64,
    end_sec: f64,
    skipped: Vec<CueSkip>,
}

fn inspect(input: &Path, from: Option<PayloadFormat>, json: bool) -> Result<()> {
    let (format, outcome) = parse_file(input, from)?;
    let start_sec = outcome.cues.first().map(|cue| cue.start_sec).unwrap_or(0.0);
    let end_sec = outcome
        .cues
        .iter()
        .map(|cue| cue.end_sec)
        .fold(0.0, f64::max);

    if json {
        let report = InspectReport {
            file: input.display().to_string(),
            format,
            cue_count: outcome.cues.len(),
            start_sec,
            end_sec,
            skipped: outcome.skipped,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("Format: {}", format);
    println!("Cues: {}", outcome.cues.len());
    if !outcome.cues.is_empty() {
        println!(
            "Span: {} -> {}",
            format_timestamp(start_sec, ','),
            format_timestamp(end_sec, ',')
        );
    }
    if !outcome.skipped.is_empty() {
        println!("\nSkipped cues: {}", outcome.skipped.len());
        for skip in &outcome.skipped {
            println!("  [{}] {}", skip.position, skip.reason);
        }
    }
    Ok(())
}

async fn preview(input: &Path, from: Option<PayloadFormat>, start: f64, speed: f64) -> Result<()> {
    let (_, outcome) = parse_file(input, from)?;
    if outcome.cues.is_empty() {
        anyhow::bail!("{} contains no cues", input.display());
    }

    let track_end = outcome
        .cues
        .iter()
        .map(|cue| cue.end_sec)
        .fold(0.0, f64::max);
    let mut index = CueIndex::new(outcome.cues);
    let clock = SystemClock::new().with_start(start).with_speed(speed);

    eprintln!(
        "Previewing {} from {}s at {}x (Ctrl-C to stop)",
        input.display(),
        start,
        clock.speed()
    );

    // Prints each cue once as it becomes active; a gap resets the marker so
    // a repeated cue after silence prints again.
    let mut last: Option<String> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                let now = clock.current_time();
                if now > track_end {
                    break;
                }
                match index.active_cue_at(now) {
                    Some((_, cue)) => {
                        let text = cue.text.replace('\n', " ");
                        if last.as_deref() != Some(text.as_str()) {
                            println!("[{}] {}", format_timestamp(cue.start_sec, ','), text);
                            last = Some(text);
                        }
                    }
                    None => last = None,
                }
            }
        }
    }
    Ok(())
}
