use crate::error::{ClientError, Result};
use crate::models::Track;

/// Normalize a track before it is written to the local library.
///
/// Title, artist and id must be non-empty after trimming. URLs that are not
/// absolute http(s) URLs are dropped rather than failing the whole write.
pub fn normalize_track(track: &Track) -> Result<Track> {
    if track.id.is_empty() {
        return Err(ClientError::Validation("track id is empty".to_string()));
    }
    let title = track.title.trim();
    if title.is_empty() {
        return Err(ClientError::Validation(format!(
            "track {} has an empty title",
            track.id
        )));
    }
    let artist = track.artist.trim();
    if artist.is_empty() {
        return Err(ClientError::Validation(format!(
            "track {} has an empty artist",
            track.id
        )));
    }

    Ok(Track {
        id: track.id.clone(),
        title: title.to_string(),
        artist: artist.to_string(),
        album: non_empty(&track.album),
        genre: non_empty(&track.genre),
        duration_ms: track.duration_ms,
        artwork_url: valid_url(&track.artwork_url, &track.id, "artwork"),
        preview_url: valid_url(&track.preview_url, &track.id, "preview"),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn valid_url(value: &Option<String>, id: &crate::models::TrackId, kind: &str) -> Option<String> {
    let raw = value.as_deref()?.trim();
    match reqwest::Url::parse(raw) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(raw.to_string()),
        _ => {
            log::debug!("[Library] Dropping invalid {} URL for track {}: {:?}", kind, id, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_text_and_drops_bad_urls() {
        let mut track = Track::new("0012", "  Song ", " Band ");
        track.artwork_url = Some("not a url".to_string());
        track.preview_url = Some("https://cdn.example.com/p.mp3".to_string());
        track.genre = Some("   ".to_string());

        let normalized = normalize_track(&track).unwrap();
        assert_eq!(normalized.id.as_str(), "12");
        assert_eq!(normalized.title, "Song");
        assert_eq!(normalized.artist, "Band");
        assert_eq!(normalized.artwork_url, None);
        assert_eq!(normalized.genre, None);
        assert_eq!(
            normalized.preview_url.as_deref(),
            Some("https://cdn.example.com/p.mp3")
        );
    }

    #[test]
    fn non_http_scheme_is_dropped() {
        let track = Track::new(1u64, "a", "b").with_preview_url("javascript:alert(1)");
        assert_eq!(normalize_track(&track).unwrap().preview_url, None);
    }

    #[test]
    fn empty_artist_is_rejected() {
        let track = Track::new(1u64, "Song", "   ");
        assert!(matches!(normalize_track(&track), Err(ClientError::Validation(_))));
    }
}
