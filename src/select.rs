//! Deterministic caption track selection.

use log::debug;

use crate::error::{ExtractError, Result};
use crate::{CaptionTrack, TrackCatalog, TrackKind};

/// Pick one track from the catalog under the documented policy:
///
/// 1. For the first preferred language any track carries, manual beats
///    generated.
/// 2. Otherwise the catalog's default/original-language track, with a
///    manual track in that language winning over a generated one.
/// 3. Otherwise the first manual track in catalog order, else the first
///    generated one.
///
/// Stable for identical inputs: only catalog order and track content feed
/// the decision.
pub fn select_track<'a>(
    catalog: &'a TrackCatalog,
    preferred_langs: &[String],
) -> Result<&'a CaptionTrack> {
    if catalog.tracks.is_empty() {
        return Err(ExtractError::NoCaptionsAvailable(
            "track catalog is empty".to_string(),
        ));
    }

    for lang in preferred_langs {
        let matching: Vec<&CaptionTrack> = catalog
            .tracks
            .iter()
            .filter(|t| lang_matches(&t.language_code, lang))
            .collect();
        if let Some(track) = prefer_manual(&matching) {
            debug!("Selected track by language preference {lang}: {}", track.language_code);
            return Ok(track);
        }
    }

    if let Some(default) = catalog.default_index.and_then(|i| catalog.tracks.get(i)) {
        let same_lang: Vec<&CaptionTrack> = catalog
            .tracks
            .iter()
            .filter(|t| t.language_code == default.language_code)
            .collect();
        // safe: same_lang contains at least `default` itself
        let track = prefer_manual(&same_lang).unwrap();
        debug!("Selected catalog default track: {}", track.language_code);
        return Ok(track);
    }

    let track = catalog
        .tracks
        .iter()
        .find(|t| t.kind == TrackKind::Manual)
        .unwrap_or(&catalog.tracks[0]);
    debug!("Selected fallback track: {} ({})", track.language_code, track.kind);
    Ok(track)
}

/// Case-insensitive match on the full code or its primary subtag, so a
/// preference of "en" also matches an "en-US" manual track.
fn lang_matches(track_code: &str, preferred: &str) -> bool {
    if track_code.eq_ignore_ascii_case(preferred) {
        return true;
    }
    let track_primary = track_code.split('-').next().unwrap_or(track_code);
    let pref_primary = preferred.split('-').next().unwrap_or(preferred);
    track_primary.eq_ignore_ascii_case(pref_primary)
}

fn prefer_manual<'a>(tracks: &[&'a CaptionTrack]) -> Option<&'a CaptionTrack> {
    tracks
        .iter()
        .find(|t| t.kind == TrackKind::Manual)
        .or_else(|| tracks.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(code: &str, kind: TrackKind) -> CaptionTrack {
        CaptionTrack {
            language_code: code.to_string(),
            language_name: code.to_uppercase(),
            kind,
            base_url: format!("https://www.youtube.com/api/timedtext?lang={code}"),
        }
    }

    fn prefs(langs: &[&str]) -> Vec<String> {
        langs.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = TrackCatalog::default();
        assert!(matches!(
            select_track(&catalog, &prefs(&["en"])),
            Err(ExtractError::NoCaptionsAvailable(_))
        ));
    }

    #[test]
    fn test_language_match_beats_manual_preference() {
        // Generated English + manual Spanish, prefs [en, es]: language wins
        let catalog = TrackCatalog {
            tracks: vec![track("en", TrackKind::Generated), track("es", TrackKind::Manual)],
            default_index: None,
        };
        let selected = select_track(&catalog, &prefs(&["en", "es"])).unwrap();
        assert_eq!(selected.language_code, "en");
        assert_eq!(selected.kind, TrackKind::Generated);
    }

    #[test]
    fn test_manual_beats_generated_within_language() {
        let catalog = TrackCatalog {
            tracks: vec![track("en", TrackKind::Generated), track("en-US", TrackKind::Manual)],
            default_index: None,
        };
        let selected = select_track(&catalog, &prefs(&["en"])).unwrap();
        assert_eq!(selected.kind, TrackKind::Manual);
    }

    #[test]
    fn test_second_preference_used_when_first_absent() {
        let catalog = TrackCatalog {
            tracks: vec![track("de", TrackKind::Manual), track("es", TrackKind::Generated)],
            default_index: None,
        };
        let selected = select_track(&catalog, &prefs(&["en", "es"])).unwrap();
        assert_eq!(selected.language_code, "es");
    }

    #[test]
    fn test_default_track_fallback() {
        let catalog = TrackCatalog {
            tracks: vec![
                track("fr", TrackKind::Generated),
                track("ja", TrackKind::Generated),
                track("ja", TrackKind::Manual),
            ],
            default_index: Some(1),
        };
        let selected = select_track(&catalog, &prefs(&["en"])).unwrap();
        // Default language is ja; the manual ja track wins
        assert_eq!(selected.language_code, "ja");
        assert_eq!(selected.kind, TrackKind::Manual);
    }

    #[test]
    fn test_first_manual_fallback() {
        let catalog = TrackCatalog {
            tracks: vec![
                track("fr", TrackKind::Generated),
                track("de", TrackKind::Manual),
                track("pt", TrackKind::Manual),
            ],
            default_index: None,
        };
        let selected = select_track(&catalog, &prefs(&["en"])).unwrap();
        assert_eq!(selected.language_code, "de");
    }

    #[test]
    fn test_first_generated_last_resort() {
        let catalog = TrackCatalog {
            tracks: vec![track("fr", TrackKind::Generated), track("de", TrackKind::Generated)],
            default_index: None,
        };
        let selected = select_track(&catalog, &prefs(&["en"])).unwrap();
        assert_eq!(selected.language_code, "fr");
    }

    #[test]
    fn test_deterministic_under_reordering() {
        let a = TrackCatalog {
            tracks: vec![track("en", TrackKind::Generated), track("es", TrackKind::Manual)],
            default_index: None,
        };
        let b = TrackCatalog {
            tracks: vec![track("es", TrackKind::Manual), track("en", TrackKind::Generated)],
            default_index: None,
        };
        let p = prefs(&["en", "es"]);
        let first = select_track(&a, &p).unwrap();
        let second = select_track(&b, &p).unwrap();
        assert_eq!(first, second);
        for _ in 0..10 {
            assert_eq!(select_track(&a, &p).unwrap(), first);
        }
    }

    #[test]
    fn test_no_preferences_uses_default_then_fallback() {
        let catalog = TrackCatalog {
            tracks: vec![track("ko", TrackKind::Generated)],
            default_index: Some(0),
        };
        let selected = select_track(&catalog, &[]).unwrap();
        assert_eq!(selected.language_code, "ko");
    }
}
