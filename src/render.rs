//! Subtitle and plain-text rendering. Both renderers are pure functions of
//! a transcript and total over any valid cue sequence.

use crate::Transcript;

/// Render a transcript as SRT subtitle text.
///
/// Each cue becomes a 1-based index line, a timing line with millisecond
/// precision, the cue's text lines verbatim, and a blank separator. The
/// output ends with a single newline and no trailing separator; a zero-cue
/// transcript renders to the empty string.
pub fn render_srt(transcript: &Transcript) -> String {
    let blocks: Vec<String> = transcript
        .cues
        .iter()
        .enumerate()
        .map(|(i, cue)| {
            format!(
                "{}\n{} --> {}\n{}",
                i + 1,
                srt_timestamp(cue.start_ms),
                srt_timestamp(cue.end_ms),
                cue.lines.join("\n")
            )
        })
        .collect();

    if blocks.is_empty() {
        String::new()
    } else {
        blocks.join("\n\n") + "\n"
    }
}

/// Render a transcript as plain text: one cue per line, a cue's lines
/// joined by a single space, consecutive byte-identical cue texts collapsed.
pub fn render_text(transcript: &Transcript) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(transcript.cues.len());
    for cue in &transcript.cues {
        let line = cue.lines.join(" ");
        if lines.last() != Some(&line) {
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// `HH:MM:SS,mmm` with zero padding; hours widen past 99 when needed.
fn srt_timestamp(ms: u64) -> String {
    let millis = ms % 1000;
    let secs = ms / 1000;
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    format!("{hours:02}:{minutes:02}:{:02},{millis:03}", secs % 60)
}
