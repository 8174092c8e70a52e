use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::captions::{Captions, PlayerCaptionsTracklistRenderer, build_transcript_list};
use crate::error::{ErrorKind, Result, TranscriptError};
use crate::http::HttpClient;
use crate::transcripts::TranscriptList;

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

const CAPTIONS_MARKER: &str = "\"captions\":";
const VIDEO_DETAILS_MARKER: &str = ",\"videoDetails";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const PLAYABILITY_MARKER: &str = "\"playabilityStatus\":";
const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";

const CONSENT_COOKIE_NAME: &str = "CONSENT";
const CONSENT_COOKIE_DOMAIN: &str = ".youtube.com";

static CONSENT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"name="v" value="(.*?)""#).expect("consent token pattern is valid")
});

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_URL}{video_id}")
}

/// Turns a video's watch page into its [`TranscriptList`].
pub struct TranscriptListFetcher<'a> {
    http: &'a dyn HttpClient,
}

impl<'a> TranscriptListFetcher<'a> {
    pub fn new(http: &'a dyn HttpClient) -> Self {
        Self { http }
    }

    pub fn fetch(&self, video_id: &str) -> Result<TranscriptList> {
        let html = self.fetch_video_html(video_id)?;
        let captions = extract_captions_json(&html, video_id)?;
        let list = build_transcript_list(video_id, captions)?;
        debug!(
            video_id,
            manually_created = list.manually_created().len(),
            generated = list.generated().len(),
            "built transcript list"
        );
        Ok(list)
    }

    /// Watch page with the consent interstitial resolved. Consent is attempted once.
    pub fn fetch_video_html(&self, video_id: &str) -> Result<String> {
        let html = self.fetch_html(video_id)?;
        if !html.contains(CONSENT_FORM_MARKER) {
            return Ok(html);
        }

        info!(video_id, "consent page served, creating consent cookie");
        self.create_consent_cookie(&html, video_id)?;

        let html = self.fetch_html(video_id)?;
        if html.contains(CONSENT_FORM_MARKER) {
            warn!(video_id, "consent page persisted after setting the consent cookie");
            return Err(TranscriptError::new(video_id, ErrorKind::FailedToCreateConsentCookie));
        }
        Ok(html)
    }

    pub fn create_consent_cookie(&self, html: &str, video_id: &str) -> Result<()> {
        let token = CONSENT_TOKEN
            .captures(html)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| TranscriptError::new(video_id, ErrorKind::FailedToCreateConsentCookie))?;

        let value = format!("YES+{}", token.as_str());
        self.http
            .cookie_jar()
            .add_cookie(CONSENT_COOKIE_NAME, &value, CONSENT_COOKIE_DOMAIN);
        Ok(())
    }

    fn fetch_html(&self, video_id: &str) -> Result<String> {
        let body = self
            .http
            .get(&watch_url(video_id))
            .map_err(|e| TranscriptError::request_failed(video_id, e))?;
        Ok(unescape_page(&body))
    }
}

/// The page is served JavaScript-escaped: `\u0026` becomes `&` and every
/// backslash is dropped.
pub fn unescape_page(body: &str) -> String {
    body.replace("\\u0026", "&").replace('\\', "")
}

/// Locates the `"captions":` blob in an unescaped watch page and returns its
/// tracklist renderer, classifying pages that have none.
pub fn extract_captions_json(html: &str, video_id: &str) -> Result<PlayerCaptionsTracklistRenderer> {
    let Some((_, after)) = html.split_once(CAPTIONS_MARKER) else {
        let kind = if html.contains(RECAPTCHA_MARKER) {
            ErrorKind::TooManyRequests
        } else if !html.contains(PLAYABILITY_MARKER) {
            ErrorKind::VideoUnavailable
        } else {
            ErrorKind::TranscriptsDisabled
        };
        debug!(video_id, %kind, "watch page has no captions");
        return Err(TranscriptError::new(video_id, kind));
    };

    let json = after
        .split(VIDEO_DETAILS_MARKER)
        .next()
        .unwrap_or_default()
        .replace('\n', "");

    let captions: Captions =
        serde_json::from_str(&json).map_err(|e| TranscriptError::malformed(video_id, "captions json", e))?;

    match captions.player_captions_tracklist_renderer {
        Some(renderer) if renderer.caption_tracks.is_some() => Ok(renderer),
        _ => Err(TranscriptError::new(video_id, ErrorKind::NoTranscriptAvailable)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACKS: &str = r#"{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=x&lang=en","name":{"simpleText":"English"},"languageCode":"en"}]}}"#;

    #[test]
    fn page_is_unescaped() {
        assert_eq!(unescape_page(r#"a\u0026b \"c\" d\\e"#), r#"a&b "c" de"#);
    }

    #[test]
    fn captcha_takes_priority() {
        let html = r#"<div class="g-recaptcha"></div> "playabilityStatus": {}"#;
        let err = extract_captions_json(html, "abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TooManyRequests);
    }

    #[test]
    fn missing_playability_means_unavailable() {
        let err = extract_captions_json("<html></html>", "abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::VideoUnavailable);
    }

    #[test]
    fn playability_without_captions_means_disabled() {
        let html = r#"{"playabilityStatus":{"status":"OK"},"videoDetails":{}}"#;
        let err = extract_captions_json(html, "abc").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TranscriptsDisabled);
    }

    #[test]
    fn captions_blob_is_cut_at_video_details() {
        let html = format!(r#"{{"playabilityStatus":{{}},"captions":{TRACKS},"videoDetails":{{"videoId":"x"}}}}"#);
        let renderer = extract_captions_json(&html, "x").unwrap();
        let tracks = renderer.caption_tracks.unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "en");
    }

    #[test]
    fn renderer_without_tracks_has_no_transcript() {
        let html = r#""captions":{"playerCaptionsTracklistRenderer":{"translationLanguages":[]}},"videoDetails":{}"#;
        let err = extract_captions_json(html, "x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoTranscriptAvailable);
    }

    #[test]
    fn broken_captions_json_is_malformed() {
        let html = r#""captions":{"playerCaptionsTracklistRenderer":,"videoDetails":{}"#;
        let err = extract_captions_json(html, "x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
    }
}
