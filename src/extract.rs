//! Request orchestration: resolve, list, select, fetch, normalize, render.

use log::{debug, info};

use crate::cache::{CacheKey, TranscriptCache};
use crate::error::Result;
use crate::youtube::RetryPolicy;
use crate::{ExtractionResult, TrackKind, Transcript, render, resolve_video_id, select, youtube};

/// Shared per-process state; everything here is either immutable or
/// internally synchronized.
pub struct AppState {
    pub client: reqwest::Client,
    pub cache: TranscriptCache,
    pub preferred_langs: Vec<String>,
    pub retry: RetryPolicy,
}

/// Run the full extraction pipeline for one video reference.
///
/// An optional per-request language takes precedence over the configured
/// preference list. The caption fetch and normalization are memoized per
/// (video, language, kind); the catalog fetch and selection always run,
/// since the cache key depends on the selected track.
pub async fn extract(state: &AppState, url: &str, lang: Option<&str>) -> Result<ExtractionResult> {
    let video_id = resolve_video_id(url)?;
    info!("Extracting captions for video {video_id}");

    let catalog = youtube::fetch_catalog(&state.client, &video_id).await?;

    let prefs: Vec<String> = lang
        .map(str::to_string)
        .into_iter()
        .chain(state.preferred_langs.iter().cloned())
        .collect();
    let track = select::select_track(&catalog, &prefs)?.clone();
    debug!(
        "Selected track for {video_id}: {} ({}, {})",
        track.language_name, track.language_code, track.kind
    );

    let cache_key = CacheKey {
        video_id: video_id.clone(),
        language_code: track.language_code.clone(),
        kind: track.kind,
    };
    let transcript = state
        .cache
        .get_or_fetch(cache_key, || {
            let track = track.clone();
            let video_id = video_id.clone();
            async move {
                let payload = youtube::fetch_captions(&state.client, &track, &state.retry).await?;
                let cues = crate::normalize::normalize(&payload)?;
                debug!("Normalized {} cue(s) for {video_id}", cues.len());
                Ok(Transcript { video_id, track, cues })
            }
        })
        .await?;

    Ok(assemble(&transcript))
}

fn assemble(transcript: &Transcript) -> ExtractionResult {
    ExtractionResult {
        video_id: transcript.video_id.as_str().to_string(),
        language: transcript.track.language_name.clone(),
        language_code: transcript.track.language_code.clone(),
        is_generated: transcript.track.kind == TrackKind::Generated,
        srt: render::render_srt(transcript),
        txt: render::render_text(transcript),
    }
}
