use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{ErrorKind, Result, TranscriptError};
use crate::http::HttpClient;
use crate::parser::{Cue, parse_cues};

/// A language a track can be machine translated into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationLanguage {
    pub language: String,
    pub language_code: String,
}

/// One selectable caption source of a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptionTrack {
    pub video_id: String,
    pub url: String,
    /// Display name, e.g. `English (auto-generated)`.
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub translation_languages: Vec<TranslationLanguage>,
}

impl CaptionTrack {
    pub fn is_translatable(&self) -> bool {
        !self.translation_languages.is_empty()
    }

    /// Derives the track translated into `language_code`. The result is a new
    /// generated track that cannot be translated again.
    pub fn translate(&self, language_code: &str) -> Result<CaptionTrack> {
        if !self.is_translatable() {
            return Err(TranscriptError::new(&self.video_id, ErrorKind::NotTranslatable));
        }
        let target = self
            .translation_languages
            .iter()
            .find(|t| t.language_code == language_code)
            .ok_or_else(|| TranscriptError::new(&self.video_id, ErrorKind::TranslationLanguageNotAvailable))?;

        Ok(CaptionTrack {
            video_id: self.video_id.clone(),
            url: format!("{}&tlang={}", self.url, language_code),
            language: target.language.clone(),
            language_code: language_code.to_string(),
            is_generated: true,
            translation_languages: Vec::new(),
        })
    }
}

impl fmt::Display for CaptionTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (\"{}\")", self.language_code, self.language)?;
        if self.is_translatable() {
            write!(f, "[TRANSLATABLE]")?;
        }
        Ok(())
    }
}

/// Every caption track of one video, split into manually created and generated.
#[derive(Debug, Clone)]
pub struct TranscriptList {
    video_id: String,
    manually_created: Vec<CaptionTrack>,
    generated: Vec<CaptionTrack>,
    translation_languages: Vec<TranslationLanguage>,
}

impl TranscriptList {
    pub(crate) fn new(video_id: &str, translation_languages: Vec<TranslationLanguage>) -> Self {
        Self {
            video_id: video_id.to_string(),
            manually_created: Vec::new(),
            generated: Vec::new(),
            translation_languages,
        }
    }

    /// Adds a track to its collection. Returns the language code back when
    /// that collection already holds it.
    pub(crate) fn insert(&mut self, track: CaptionTrack) -> std::result::Result<(), String> {
        let collection = if track.is_generated { &mut self.generated } else { &mut self.manually_created };
        if collection.iter().any(|t| t.language_code == track.language_code) {
            return Err(track.language_code);
        }
        collection.push(track);
        Ok(())
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn translation_languages(&self) -> &[TranslationLanguage] {
        &self.translation_languages
    }

    pub fn manually_created(&self) -> &[CaptionTrack] {
        &self.manually_created
    }

    pub fn generated(&self) -> &[CaptionTrack] {
        &self.generated
    }

    /// Manually created tracks first, then generated ones.
    pub fn iter(&self) -> impl Iterator<Item = &CaptionTrack> {
        self.manually_created.iter().chain(self.generated.iter())
    }

    /// Looks up `language_codes` in priority order. For each code a manually
    /// created track wins over a generated one before the next code is tried.
    pub fn find_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&CaptionTrack> {
        self.find(language_codes, &[&self.manually_created, &self.generated])
    }

    pub fn find_manually_created_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&CaptionTrack> {
        self.find(language_codes, &[&self.manually_created])
    }

    pub fn find_generated_transcript<S: AsRef<str>>(&self, language_codes: &[S]) -> Result<&CaptionTrack> {
        self.find(language_codes, &[&self.generated])
    }

    fn find<'a, S: AsRef<str>>(
        &'a self,
        language_codes: &[S],
        collections: &[&'a Vec<CaptionTrack>],
    ) -> Result<&'a CaptionTrack> {
        for code in language_codes.iter().map(|c| c.as_ref()) {
            for collection in collections {
                if let Some(track) = collection.iter().find(|t| t.language_code == code) {
                    return Ok(track);
                }
            }
        }

        let requested: Vec<String> = language_codes.iter().map(|c| c.as_ref().to_string()).collect();
        debug!(video_id = %self.video_id, ?requested, "no matching transcript");
        Err(TranscriptError::no_transcript_found(&self.video_id, &requested, &self.to_string()))
    }
}

impl<'a> IntoIterator for &'a TranscriptList {
    type Item = &'a CaptionTrack;
    type IntoIter = std::iter::Chain<std::slice::Iter<'a, CaptionTrack>, std::slice::Iter<'a, CaptionTrack>>;

    fn into_iter(self) -> Self::IntoIter {
        self.manually_created.iter().chain(self.generated.iter())
    }
}

impl fmt::Display for TranscriptList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "For this video ({}) transcripts are available in the following languages:\n",
            self.video_id
        )?;
        writeln!(f, "(MANUALLY CREATED)")?;
        write_section(f, self.manually_created.iter().map(ToString::to_string))?;
        writeln!(f, "\n\n(GENERATED)")?;
        write_section(f, self.generated.iter().map(ToString::to_string))?;
        writeln!(f, "\n\n(TRANSLATION LANGUAGES)")?;
        write_section(
            f,
            self.translation_languages
                .iter()
                .map(|t| format!("{} (\"{}\")", t.language_code, t.language)),
        )
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, lines: impl Iterator<Item = String>) -> fmt::Result {
    let lines: Vec<String> = lines.map(|line| format!(" - {line}")).collect();
    if lines.is_empty() {
        write!(f, "None")
    } else {
        write!(f, "{}", lines.join("\n"))
    }
}

/// A [`CaptionTrack`] together with the client that can download it.
#[derive(Clone)]
pub struct Transcript {
    track: CaptionTrack,
    http: Arc<dyn HttpClient>,
}

impl Transcript {
    pub fn new(track: CaptionTrack, http: Arc<dyn HttpClient>) -> Self {
        Self { track, http }
    }

    pub fn track(&self) -> &CaptionTrack {
        &self.track
    }

    pub fn into_track(self) -> CaptionTrack {
        self.track
    }

    /// Downloads and parses the caption payload.
    pub fn fetch(&self) -> Result<Vec<Cue>> {
        let video_id = &self.track.video_id;
        let xml = self
            .http
            .get(&self.track.url)
            .map_err(|e| TranscriptError::request_failed(video_id, e))?;
        let cues = parse_cues(&xml).map_err(|e| TranscriptError::malformed(video_id, "caption payload", e))?;
        debug!(%video_id, language_code = %self.track.language_code, cues = cues.len(), "fetched transcript");
        Ok(cues)
    }

    pub fn translate(&self, language_code: &str) -> Result<Transcript> {
        Ok(Transcript {
            track: self.track.translate(language_code)?,
            http: Arc::clone(&self.http),
        })
    }
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript").field("track", &self.track).finish_non_exhaustive()
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.track, f)
    }
}
