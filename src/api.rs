use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cookies::load_cookie_file;
use crate::error::Result;
use crate::fetcher::TranscriptListFetcher;
use crate::http::{Cookie, HttpClient};
use crate::parser::Cue;
use crate::transcripts::{CaptionTrack, Transcript, TranscriptList};

pub const DEFAULT_LANGUAGES: &[&str] = &["en"];

/// Entry point: lists and downloads transcripts through one HTTP client.
///
/// The client's cookie jar is written during consent handling, so a single
/// `TranscriptApi` should not fetch lists from several threads at once.
#[derive(Clone)]
pub struct TranscriptApi {
    http: Arc<dyn HttpClient>,
}

/// Result of [`TranscriptApi::get_transcripts`].
#[derive(Debug, Default)]
pub struct BatchTranscripts {
    pub transcripts: HashMap<String, Vec<Cue>>,
    pub unretrievable: Vec<String>,
}

impl TranscriptApi {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    pub fn with_cookies<I: IntoIterator<Item = Cookie>>(self, cookies: I) -> Self {
        self.http.cookie_jar().extend(cookies);
        self
    }

    /// Merges a cookies.txt file into the jar. `video_id` labels the error.
    pub fn with_cookie_file(self, path: impl AsRef<Path>, video_id: &str) -> Result<Self> {
        let cookies = load_cookie_file(path, video_id)?;
        Ok(self.with_cookies(cookies))
    }

    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    pub fn list_transcripts(&self, video_id: &str) -> Result<TranscriptList> {
        TranscriptListFetcher::new(self.http.as_ref()).fetch(video_id)
    }

    pub fn transcript(&self, track: &CaptionTrack) -> Transcript {
        Transcript::new(track.clone(), Arc::clone(&self.http))
    }

    /// Cues of the first track matching `languages`, in priority order.
    pub fn get_transcript<S: AsRef<str>>(&self, video_id: &str, languages: &[S]) -> Result<Vec<Cue>> {
        let list = self.list_transcripts(video_id)?;
        let track = list.find_transcript(languages)?;
        info!(video_id, language_code = %track.language_code, is_generated = track.is_generated, "fetching transcript");
        self.transcript(track).fetch()
    }

    /// Fetches several videos. Without `continue_after_error` the first failure
    /// is returned; otherwise failed ids are collected in `unretrievable`.
    pub fn get_transcripts<V, S>(
        &self,
        video_ids: &[V],
        languages: &[S],
        continue_after_error: bool,
    ) -> Result<BatchTranscripts>
    where
        V: AsRef<str>,
        S: AsRef<str>,
    {
        let mut batch = BatchTranscripts::default();
        for video_id in video_ids.iter().map(|v| v.as_ref()) {
            match self.get_transcript(video_id, languages) {
                Ok(cues) => {
                    batch.transcripts.insert(video_id.to_string(), cues);
                }
                Err(err) if continue_after_error => {
                    warn!(video_id, kind = %err.kind, "skipping video");
                    batch.unretrievable.push(video_id.to_string());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(batch)
    }
}
