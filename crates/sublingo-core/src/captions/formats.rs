//! Subtitle payload parsing and serialization
//!
//! Supports three input formats and three output formats:
//! - Parsing: timed-text XML / SRT / WebVTT -> ordered cues + skip report
//! - Serialization: cues -> plain text / SRT / WebVTT
//!
//! Parsing is tolerant at the cue level: a cue with an unparseable start
//! time is dropped and recorded in the [`ParseOutcome`] skip list while the
//! rest of the payload parses normally. Payload-level problems (unknown
//! format, missing WEBVTT header, empty input) are [`ParseError`]s.

use super::models::{sort_cues, Cue};
use crate::{CoreError, TimeSec};
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Types
// ============================================================================

/// Payload-level parse failures
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Input is empty or whitespace-only
    EmptyInput,
    /// Payload format could not be detected
    UnknownFormat,
    /// A WebVTT payload is missing its WEBVTT header
    MissingVttHeader,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::EmptyInput => write!(f, "empty subtitle payload"),
            ParseError::UnknownFormat => write!(f, "unrecognized subtitle format"),
            ParseError::MissingVttHeader => write!(f, "missing WEBVTT header"),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for CoreError {
    fn from(err: ParseError) -> Self {
        CoreError::ParseFailed(err.to_string())
    }
}

// ============================================================================
// Formats
// ============================================================================

/// Input payload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Timed-text XML (`<text start=".." dur="..">` elements)
    TimedText,
    Srt,
    Vtt,
}

impl std::fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadFormat::TimedText => write!(f, "timedtext"),
            PayloadFormat::Srt => write!(f, "srt"),
            PayloadFormat::Vtt => write!(f, "vtt"),
        }
    }
}

impl std::str::FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "timedtext" | "xml" => Ok(PayloadFormat::TimedText),
            "srt" => Ok(PayloadFormat::Srt),
            "vtt" | "webvtt" => Ok(PayloadFormat::Vtt),
            _ => Err(format!("Unknown payload format: {}", s)),
        }
    }
}

/// Output subtitle formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Srt,
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(OutputFormat::Plain),
            "srt" => Ok(OutputFormat::Srt),
            "vtt" | "webvtt" => Ok(OutputFormat::Vtt),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

// ============================================================================
// Parse Outcome
// ============================================================================

/// A skipped cue: position in source order plus the reason it was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueSkip {
    pub position: usize,
    pub reason: String,
}

impl CueSkip {
    fn new(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            reason: reason.into(),
        }
    }
}

/// Result of parsing a payload: ordered cues plus the skipped-cue report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOutcome {
    /// Cues sorted by start time
    pub cues: Vec<Cue>,
    /// Cues dropped during parsing, in source order
    pub skipped: Vec<CueSkip>,
}

// ============================================================================
// Format Detection
// ============================================================================

/// Detects the payload format from its leading content.
pub fn detect_format(raw: &str) -> Option<PayloadFormat> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim_start();
    if trimmed.starts_with('<') {
        return Some(PayloadFormat::TimedText);
    }
    if trimmed.starts_with("WEBVTT") {
        return Some(PayloadFormat::Vtt);
    }
    // SRT blocks open with a numeric index line or go straight to a timing line
    let first = trimmed.lines().find(|l| !l.trim().is_empty())?.trim();
    if first.contains("-->") || first.parse::<u64>().is_ok() {
        return Some(PayloadFormat::Srt);
    }
    None
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a subtitle payload into ordered cues.
///
/// With `format` of `None` the payload format is auto-detected. Cues are
/// returned sorted by start time (stable on ties); unparseable cues are
/// skipped, logged, and recorded in the outcome.
pub fn parse_track(raw: &str, format: Option<PayloadFormat>) -> Result<ParseOutcome, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }
    let format = match format {
        Some(f) => f,
        None => detect_format(raw).ok_or(ParseError::UnknownFormat)?,
    };
    let mut outcome = match format {
        PayloadFormat::TimedText => parse_timed_text(raw),
        PayloadFormat::Srt => parse_srt(raw),
        PayloadFormat::Vtt => parse_vtt(raw)?,
    };
    for skip in &outcome.skipped {
        tracing::warn!(position = skip.position, reason = %skip.reason, "skipped unparseable cue");
    }
    sort_cues(&mut outcome.cues);
    Ok(outcome)
}

/// Parses timed-text XML (`<text start=".." dur="..">body</text>`).
///
/// Simple regex-free scanner: walks `<text>` elements, reads the `start`
/// and `dur` attributes, and decodes entities in the element body. Anything
/// outside `<text>` elements is ignored. A missing or malformed `dur`
/// yields a zero-duration cue; a missing or malformed `start` drops it.
fn parse_timed_text(raw: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut position = 0usize;
    let mut rest = raw;

    while let Some(open) = rest.find("<text") {
        let after_open = &rest[open + "<text".len()..];
        let Some(tag_end) = after_open.find('>') else {
            break;
        };
        let attrs = &after_open[..tag_end];
        let after_tag = &after_open[tag_end + 1..];

        // self-closing elements carry no text
        if attrs.trim_end().ends_with('/') {
            outcome.skipped.push(CueSkip::new(position, "empty cue text"));
            rest = after_tag;
            position += 1;
            continue;
        }
        let Some(close) = after_tag.find("</text>") else {
            break;
        };
        let body = &after_tag[..close];
        rest = &after_tag[close + "</text>".len()..];

        match attr_value(attrs, "start").and_then(parse_seconds) {
            Some(start_sec) => {
                let start_sec = start_sec.max(0.0);
                let duration = attr_value(attrs, "dur")
                    .and_then(parse_seconds)
                    .unwrap_or(0.0)
                    .max(0.0);
                let text = decode_entities(body.trim());
                if text.is_empty() {
                    outcome.skipped.push(CueSkip::new(position, "empty cue text"));
                } else {
                    outcome
                        .cues
                        .push(Cue::new(start_sec, start_sec + duration, text));
                }
            }
            None => {
                outcome
                    .skipped
                    .push(CueSkip::new(position, "missing or invalid start attribute"));
            }
        }
        position += 1;
    }
    outcome
}

/// Extracts a quoted attribute value from a tag's attribute region.
fn attr_value<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut search = attrs;
    while let Some(idx) = search.find(name) {
        // require a whitespace boundary so "start" can't match inside "restart"
        let at_boundary = idx == 0 || search.as_bytes()[idx - 1].is_ascii_whitespace();
        let after = search[idx + name.len()..].trim_start();
        if at_boundary {
            if let Some(value) = after.strip_prefix('=') {
                let value = value.trim_start();
                for quote in ['"', '\''] {
                    if let Some(inner) = value.strip_prefix(quote) {
                        return inner.find(quote).map(|end| &inner[..end]);
                    }
                }
                return None;
            }
        }
        search = &search[idx + name.len()..];
    }
    None
}

/// Parses an attribute value as non-negative seconds.
fn parse_seconds(raw: &str) -> Option<TimeSec> {
    raw.trim().parse::<f64>().ok().filter(|s| s.is_finite())
}

/// Parses SRT payloads.
///
/// Block structure: optional numeric index line, a `start --> end` timing
/// line, then text lines until a blank line. Malformed blocks are skipped
/// rather than failing the whole payload.
fn parse_srt(raw: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut lines = raw.lines().peekable();
    let mut position = 0usize;

    loop {
        while lines.peek().map_or(false, |l| l.trim().is_empty()) {
            lines.next();
        }
        let Some(first) = lines.next() else {
            break;
        };
        let first = first.trim();

        // the numeric index line before the timing line is optional
        let timing = if first.contains("-->") {
            first
        } else {
            match lines.next() {
                Some(line) => line.trim(),
                None => {
                    outcome
                        .skipped
                        .push(CueSkip::new(position, "block truncated before timing line"));
                    break;
                }
            }
        };

        let mut text_lines: Vec<String> = Vec::new();
        while lines.peek().map_or(false, |l| !l.trim().is_empty()) {
            if let Some(line) = lines.next() {
                text_lines.push(line.trim().to_string());
            }
        }

        push_cue(&mut outcome, position, timing, text_lines);
        position += 1;
    }
    outcome
}

/// Parses WebVTT payloads.
///
/// Requires the `WEBVTT` header. NOTE/STYLE/REGION blocks are skipped, cue
/// identifier lines are tolerated, and inline tags (`<c>`, `<i>`, inline
/// timestamps) are stripped from cue text.
fn parse_vtt(raw: &str) -> Result<ParseOutcome, ParseError> {
    let raw = raw.trim_start_matches('\u{feff}');
    let mut lines = raw.lines().peekable();

    match lines.next() {
        Some(header) if header.trim_start().starts_with("WEBVTT") => {}
        _ => return Err(ParseError::MissingVttHeader),
    }

    let mut outcome = ParseOutcome::default();
    let mut position = 0usize;

    loop {
        while lines.peek().map_or(false, |l| l.trim().is_empty()) {
            lines.next();
        }
        let Some(first) = lines.next() else {
            break;
        };
        let first = first.trim();

        // NOTE / STYLE / REGION blocks run to the next blank line
        if first.starts_with("NOTE") || first.starts_with("STYLE") || first.starts_with("REGION") {
            while lines.peek().map_or(false, |l| !l.trim().is_empty()) {
                lines.next();
            }
            continue;
        }

        // a cue identifier line may precede the timing line
        let timing = if first.contains("-->") {
            first
        } else {
            match lines.next() {
                Some(line) if line.contains("-->") => line.trim(),
                _ => {
                    outcome.skipped.push(CueSkip::new(
                        position,
                        format!("expected timing line after identifier: {}", first),
                    ));
                    position += 1;
                    while lines.peek().map_or(false, |l| !l.trim().is_empty()) {
                        lines.next();
                    }
                    continue;
                }
            }
        };

        let mut text_lines: Vec<String> = Vec::new();
        while lines.peek().map_or(false, |l| !l.trim().is_empty()) {
            if let Some(line) = lines.next() {
                text_lines.push(strip_vtt_tags(line.trim()));
            }
        }

        push_cue(&mut outcome, position, timing, text_lines);
        position += 1;
    }
    Ok(outcome)
}

/// Finishes one parsed block: validates timing, decodes text, records skips.
fn push_cue(outcome: &mut ParseOutcome, position: usize, timing: &str, text_lines: Vec<String>) {
    match parse_timing_line(timing) {
        Some((start, end)) => {
            let text = decode_entities(text_lines.join("\n").trim());
            if text.is_empty() {
                outcome.skipped.push(CueSkip::new(position, "empty cue text"));
            } else {
                outcome.cues.push(Cue::new(start, end, text));
            }
        }
        None => {
            outcome.skipped.push(CueSkip::new(
                position,
                format!("invalid timing line: {}", timing),
            ));
        }
    }
}

/// Parses `start --> end`, tolerating trailing VTT cue settings.
fn parse_timing_line(line: &str) -> Option<(TimeSec, TimeSec)> {
    let (start_raw, end_raw) = line.split_once("-->")?;
    let end_raw = end_raw.trim().split_whitespace().next()?;
    let start = parse_timestamp(start_raw.trim())?;
    let end = parse_timestamp(end_raw)?;
    Some((start, end.max(start)))
}

/// Parses a single subtitle timestamp.
///
/// Accepts `HH:MM:SS,mmm` (SRT), `HH:MM:SS.mmm`, and the short WebVTT form
/// `MM:SS.mmm`. Negative results clamp to zero.
fn parse_timestamp(raw: &str) -> Option<TimeSec> {
    let normalized = raw.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (
            h.parse::<f64>().ok()?,
            m.parse::<f64>().ok()?,
            s.parse::<f64>().ok()?,
        ),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    let total = hours * 3600.0 + minutes * 60.0 + seconds;
    if total.is_finite() {
        Some(total.max(0.0))
    } else {
        None
    }
}

/// Strips WebVTT inline tags (`<c>`, `<i>`, `<00:00:01.000>`) from cue text.
fn strip_vtt_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}

// ============================================================================
// Entity Decoding
// ============================================================================

/// Longest recognized entity body (`#x10FFFF`)
const MAX_ENTITY_LEN: usize = 8;

/// Decodes HTML/XML entities embedded in cue text.
///
/// Handles the named entities caption payloads actually carry plus numeric
/// character references (`&#39;`, `&#x27;`). Anything unrecognized passes
/// through unchanged.
fn decode_entities(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail[1..].find(';') {
            Some(name_len) if name_len > 0 && name_len <= MAX_ENTITY_LEN => {
                let name = &tail[1..1 + name_len];
                match decode_entity(name) {
                    Some(decoded) => {
                        result.push(decoded);
                        rest = &tail[name_len + 2..];
                    }
                    None => {
                        result.push('&');
                        rest = &tail[1..];
                    }
                }
            }
            _ => {
                result.push('&');
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = if let Some(hex) = num.strip_prefix(['x', 'X']) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                num.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

// ============================================================================
// Serialization
// ============================================================================

/// Options for cue rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Prefix each plain-text line with `[HH:MM:SS,mmm]`
    pub include_timestamps: bool,
}

/// Renders cues in the requested output format. Pure.
pub fn render_cues(cues: &[Cue], format: OutputFormat, options: RenderOptions) -> String {
    match format {
        OutputFormat::Plain => render_plain(cues, options),
        OutputFormat::Srt => render_srt(cues),
        OutputFormat::Vtt => render_vtt(cues),
    }
}

fn render_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start_sec, ','),
            format_timestamp(cue.end_sec, ',')
        ));
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

fn render_vtt(cues: &[Cue]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for cue in cues {
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start_sec, '.'),
            format_timestamp(cue.end_sec, '.')
        ));
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

fn render_plain(cues: &[Cue], options: RenderOptions) -> String {
    let mut out = String::new();
    for cue in cues {
        // plain output is line-oriented, one cue per line
        let text = cue.text.replace('\n', " ");
        if options.include_timestamps {
            out.push_str(&format!(
                "[{}] {}\n",
                format_timestamp(cue.start_sec, ','),
                text
            ));
        } else {
            out.push_str(&format!("{}\n", text));
        }
    }
    out.trim_end().to_string()
}

/// Formats seconds as a zero-padded subtitle timestamp.
///
/// Milliseconds are floor-truncated rather than rounded so a rendered
/// timestamp never points past the cue boundary it came from. Negative and
/// non-finite inputs render as zero.
pub fn format_timestamp(seconds: TimeSec, millis_sep: char) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).floor() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, secs, millis_sep, millis
    )
}
