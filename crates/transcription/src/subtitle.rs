//! SubRip (`.srt`) rendering and block parsing.

use std::path::Path;

use crate::TimedSegment;

/// Renders `seconds` as `HH:MM:SS,mmm`.
///
/// Rounds once on the total millisecond count (half-up) and derives every
/// field from that integer, so a value like `59.9996` becomes
/// `00:01:00,000` rather than `00:00:59,1000`. Negative and non-finite
/// inputs render as zero.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = total_ms % 3_600_000 / 60_000;
    let secs = total_ms % 60_000 / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Formats segments as subtitle text without speaker labels.
pub fn format_srt(segments: &[TimedSegment]) -> String {
    render(segments, None)
}

/// Formats segments, prefixing each block's text with `[label]: `.
pub fn format_srt_with_speakers<F>(segments: &[TimedSegment], speaker_of: F) -> String
where
    F: Fn(&TimedSegment) -> String,
{
    render(segments, Some(&speaker_of))
}

fn render(segments: &[TimedSegment], speaker_of: Option<&dyn Fn(&TimedSegment) -> String>) -> String {
    let blocks: Vec<String> = segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let start = format_timestamp(seg.start);
            let end = format_timestamp(seg.end);
            match speaker_of {
                Some(speaker_of) => format!(
                    "{}\n{start} --> {end}\n[{}]: {}\n",
                    i + 1,
                    speaker_of(seg),
                    seg.text
                ),
                None => format!("{}\n{start} --> {end}\n{}\n", i + 1, seg.text),
            }
        })
        .collect();
    blocks.join("\n")
}

/// One parsed subtitle block. Index and timing lines are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtBlock {
    pub index: String,
    pub timing: String,
    /// Text lines joined with a single space.
    pub text: String,
}

impl SrtBlock {
    pub fn render(&self) -> String {
        format!("{}\n{}\n{}\n", self.index, self.timing, self.text)
    }
}

/// Splits subtitle text into blocks on blank lines.
///
/// A block needs an index line, a timing line and at least one text line;
/// shorter fragments are skipped.
pub fn parse_blocks(content: &str) -> Vec<SrtBlock> {
    let mut blocks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            push_block(&mut blocks, &pending);
            pending.clear();
        } else {
            pending.push(line);
        }
    }
    push_block(&mut blocks, &pending);

    blocks
}

fn push_block(blocks: &mut Vec<SrtBlock>, lines: &[&str]) {
    if lines.len() >= 3 {
        blocks.push(SrtBlock {
            index: lines[0].to_string(),
            timing: lines[1].to_string(),
            text: lines[2..].join(" "),
        });
    }
}

/// Output name for a media file: extension replaced with `.srt`.
pub fn subtitle_filename(media_name: &str) -> String {
    let stem = Path::new(media_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(media_name);
    format!("{stem}.srt")
}
