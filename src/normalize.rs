//! Raw timed-text parsing and cue normalization.
//!
//! Upstream caption payloads arrive in one of two known wire formats
//! (legacy timedtext XML and json3), both frequently malformed for
//! auto-generated tracks: overlapping "rolling" cues that repeat the tail
//! of the previous cue. Everything converges here to an ordered,
//! de-duplicated, non-overlapping `Cue` sequence.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::Cue;
use crate::error::{ExtractError, Result};

/// Minimum shared byte run before an overlap is treated as a rolling cue
/// rather than an ordinary timing collision.
const MIN_ROLLING_OVERLAP: usize = 4;

/// Known upstream payload formats, detected by leading marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    TimedTextXml,
    Json3,
}

impl PayloadFormat {
    pub fn detect(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_start_matches('\u{feff}').trim_start();
        if trimmed.starts_with('<') {
            Some(PayloadFormat::TimedTextXml)
        } else if trimmed.starts_with('{') {
            Some(PayloadFormat::Json3)
        } else {
            None
        }
    }
}

/// Candidate cue as parsed from the wire, before cleanup and merging.
#[derive(Debug, Clone, PartialEq)]
struct RawCue {
    start_ms: u64,
    end_ms: u64,
    text: String,
}

/// Parse and normalize a raw caption payload.
///
/// A structurally unparsable payload, or one that yields no cues at all,
/// fails with `ParseError`.
pub fn normalize(raw: &str) -> Result<Vec<Cue>> {
    let format = PayloadFormat::detect(raw)
        .ok_or_else(|| ExtractError::ParseError("unrecognized caption payload format".into()))?;
    debug!("Normalizing caption payload: format={format:?}, {} bytes", raw.len());

    let raw_cues = match format {
        PayloadFormat::TimedTextXml => parse_timedtext(raw)?,
        PayloadFormat::Json3 => parse_json3(raw)?,
    };
    if raw_cues.is_empty() {
        return Err(ExtractError::ParseError("caption payload contained no cues".into()));
    }

    let cues = raw_cues
        .into_iter()
        .filter(|c| c.end_ms > c.start_ms)
        .map(|c| Cue::new(c.start_ms, c.end_ms, split_lines(&c.text)))
        .collect();

    Ok(normalize_cues(cues))
}

/// Clean, order, and merge a cue sequence. Idempotent: applying it to an
/// already-normalized sequence is the identity.
pub fn normalize_cues(cues: Vec<Cue>) -> Vec<Cue> {
    let mut cues: Vec<Cue> = cues
        .into_iter()
        .map(|c| Cue::new(c.start_ms, c.end_ms, clean_lines(c.lines)))
        .filter(|c| !c.lines.is_empty() && c.end_ms > c.start_ms)
        .collect();

    // Stable: ties keep payload order.
    cues.sort_by_key(|c| c.start_ms);

    merge_pass(cues)
}

/// Merge outcome for one adjacent cue pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No overlap; keep both as-is.
    PassThrough,
    /// Same text, overlapping windows; fold into one cue.
    Duplicate,
    /// Rolling continuation: `shared` bytes of the earlier cue's tail are
    /// repeated at the start of the later cue.
    Rolling { shared: usize },
    /// Plain timing collision; truncate the earlier cue.
    Clamp,
}

/// Classify the relationship between two cues where `b` follows `a` in
/// start order. Pure; the merge pass applies the decision.
pub fn merge_decision(a: &Cue, b: &Cue) -> MergeDecision {
    if b.start_ms >= a.end_ms {
        return MergeDecision::PassThrough;
    }
    let a_text = a.text();
    let b_text = b.text();
    if a_text == b_text {
        return MergeDecision::Duplicate;
    }
    let shared = shared_run(&a_text, &b_text);
    if shared >= MIN_ROLLING_OVERLAP {
        MergeDecision::Rolling { shared }
    } else {
        MergeDecision::Clamp
    }
}

/// Longest suffix of `a` that is a prefix of `b`, in bytes.
fn shared_run(a: &str, b: &str) -> usize {
    let max = a.len().min(b.len());
    for k in (1..=max).rev() {
        if b.is_char_boundary(k) && a.ends_with(&b[..k]) {
            return k;
        }
    }
    0
}

fn merge_pass(cues: Vec<Cue>) -> Vec<Cue> {
    let mut out: Vec<Cue> = Vec::with_capacity(cues.len());

    for b in cues {
        let Some(last) = out.last() else {
            out.push(b);
            continue;
        };

        match merge_decision(last, &b) {
            MergeDecision::PassThrough => out.push(b),
            MergeDecision::Duplicate => {
                let a = out.last_mut().unwrap(); // safe: out is non-empty
                a.end_ms = a.end_ms.max(b.end_ms);
            }
            MergeDecision::Rolling { shared } => {
                let remainder_lines = split_lines(b.text()[shared..].trim_start());
                let a = out.last_mut().unwrap(); // safe: out is non-empty
                if remainder_lines.is_empty() {
                    // b repeats a in full; just widen the window
                    a.end_ms = a.end_ms.max(b.end_ms);
                } else {
                    a.end_ms = b.start_ms;
                    if a.end_ms <= a.start_ms {
                        out.pop();
                    }
                    out.push(Cue::new(b.start_ms, b.end_ms, remainder_lines));
                }
            }
            MergeDecision::Clamp => {
                let a = out.last_mut().unwrap(); // safe: out is non-empty
                a.end_ms = b.start_ms;
                if a.end_ms <= a.start_ms {
                    out.pop();
                }
                out.push(b);
            }
        }
    }

    out.retain(|c| c.end_ms > c.start_ms && !c.lines.is_empty());
    out
}

fn split_lines(text: &str) -> Vec<String> {
    clean_lines(text.split('\n').map(str::to_string).collect())
}

fn clean_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .iter()
        .map(|l| clean_line(l))
        .filter(|l| !l.is_empty())
        .collect()
}

/// Strip residual markup and collapse whitespace runs to single spaces.
fn clean_line(line: &str) -> String {
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]+>").unwrap());
    let stripped = TAG_RE.replace_all(line, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timedtext(xml: &str) -> Result<Vec<RawCue>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut cues = Vec::new();
    let mut current: Option<(u64, u64)> = None;
    let mut buf = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                if let (Some(start), Some(dur)) = (start, dur) {
                    current = Some((secs_to_ms(start), secs_to_ms(start + dur)));
                    buf.clear();
                }
            }
            Ok(Event::Text(ref e)) => {
                if current.is_some() {
                    let raw_text = e.unescape().unwrap_or_default();
                    // Payloads are frequently double-encoded
                    buf.push_str(&html_escape::decode_html_entities(&raw_text));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some((start_ms, end_ms)) = current.take() {
                    if !buf.trim().is_empty() {
                        cues.push(RawCue { start_ms, end_ms, text: buf.clone() });
                    }
                }
            }
            Ok(Event::Empty(_)) => {
                // Self-closing <text .../> with no content — skip
                current = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::ParseError(format!("invalid timedtext XML: {e}"))),
            _ => {}
        }
    }

    Ok(cues)
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

#[derive(Debug, Deserialize)]
struct Json3Payload {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    start_ms: Option<u64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<u64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

fn parse_json3(raw: &str) -> Result<Vec<RawCue>> {
    let payload: Json3Payload = serde_json::from_str(raw)
        .map_err(|e| ExtractError::ParseError(format!("invalid json3 payload: {e}")))?;

    let cues = payload
        .events
        .into_iter()
        .filter_map(|ev| {
            let start_ms = ev.start_ms?;
            let duration_ms = ev.duration_ms?;
            let text: String = ev.segs?.iter().map(|s| s.utf8.as_str()).collect();
            if text.trim().is_empty() {
                return None;
            }
            Some(RawCue { start_ms, end_ms: start_ms + duration_ms, text })
        })
        .collect();

    Ok(cues)
}
