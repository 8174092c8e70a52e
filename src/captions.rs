//! Serde model of the `"captions"` blob embedded in the watch page, and the
//! transformation of that blob into a [`TranscriptList`].

use serde::Deserialize;

use crate::error::{Result, TranscriptError};
use crate::transcripts::{CaptionTrack, TranscriptList, TranslationLanguage};

const GENERATED_KIND: &str = "asr";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Captions {
    pub player_captions_tracklist_renderer: Option<PlayerCaptionsTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCaptionsTracklistRenderer {
    pub caption_tracks: Option<Vec<CaptionTrackEntry>>,
    #[serde(default)]
    pub translation_languages: Vec<TranslationLanguageEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrackEntry {
    pub base_url: String,
    pub name: SimpleText,
    pub language_code: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub is_translatable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationLanguageEntry {
    pub language_code: String,
    pub language_name: SimpleText,
}

/// YouTube's `{"simpleText": "..."}` wrapper. Newer pages send `{"runs": [{"text": ...}]}` instead.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleText {
    pub simple_text: Option<String>,
    #[serde(default)]
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
pub struct TextRun {
    pub text: String,
}

impl SimpleText {
    pub fn text(&self) -> String {
        match &self.simple_text {
            Some(text) => text.clone(),
            None => self.runs.iter().map(|r| r.text.as_str()).collect(),
        }
    }
}

/// Builds the catalog for `video_id` from the tracklist renderer.
///
/// `caption_tracks` must be present; the fetcher rejects renderers without it.
/// Translation targets are attached only to tracks flagged `isTranslatable`.
pub fn build_transcript_list(
    video_id: &str,
    renderer: PlayerCaptionsTracklistRenderer,
) -> Result<TranscriptList> {
    let translation_languages: Vec<TranslationLanguage> = renderer
        .translation_languages
        .iter()
        .map(|entry| TranslationLanguage {
            language: entry.language_name.text(),
            language_code: entry.language_code.clone(),
        })
        .collect();

    let mut list = TranscriptList::new(video_id, translation_languages.clone());

    for entry in renderer.caption_tracks.unwrap_or_default() {
        let is_generated = entry.kind == GENERATED_KIND;
        let track = CaptionTrack {
            video_id: video_id.to_string(),
            url: entry.base_url,
            language: entry.name.text(),
            language_code: entry.language_code,
            is_generated,
            translation_languages: if entry.is_translatable {
                translation_languages.clone()
            } else {
                Vec::new()
            },
        };
        list.insert(track).map_err(|code| {
            TranscriptError::malformed(
                video_id,
                "caption tracks",
                DuplicateTrack {
                    language_code: code,
                    collection: if is_generated { "generated" } else { "manually created" },
                },
            )
        })?;
    }

    Ok(list)
}

#[derive(Debug, thiserror::Error)]
#[error("two {collection} tracks share language code {language_code:?}")]
struct DuplicateTrack {
    language_code: String,
    collection: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn renderer(json: &str) -> PlayerCaptionsTracklistRenderer {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn tracks_are_split_by_kind_and_translatability() {
        let list = build_transcript_list(
            "vid",
            renderer(
                r#"{
                "captionTracks": [
                    {"baseUrl": "https://u/en", "name": {"simpleText": "English"}, "languageCode": "en"},
                    {"baseUrl": "https://u/en-asr", "name": {"simpleText": "English (auto-generated)"},
                     "languageCode": "en", "kind": "asr", "isTranslatable": true},
                    {"baseUrl": "https://u/de", "name": {"runs": [{"text": "Deutsch"}]}, "languageCode": "de", "kind": "asr"}
                ],
                "translationLanguages": [
                    {"languageCode": "af", "languageName": {"simpleText": "Afrikaans"}},
                    {"languageCode": "de", "languageName": {"simpleText": "German"}}
                ]
            }"#,
            ),
        )
        .unwrap();

        let manual = list.find_manually_created_transcript(&["en"]).unwrap();
        assert!(!manual.is_generated);
        assert!(manual.translation_languages.is_empty());

        let generated = list.find_generated_transcript(&["en"]).unwrap();
        assert!(generated.is_generated);
        assert_eq!(generated.translation_languages.len(), 2);
        assert_eq!(generated.translation_languages[0].language, "Afrikaans");

        let de = list.find_generated_transcript(&["de"]).unwrap();
        assert_eq!(de.language, "Deutsch");
        assert_eq!(list.translation_languages().len(), 2);
    }

    #[test]
    fn translatable_flag_with_no_targets_is_kept() {
        let list = build_transcript_list(
            "vid",
            renderer(
                r#"{"captionTracks": [{"baseUrl": "https://u", "name": {"simpleText": "English"},
                    "languageCode": "en", "isTranslatable": true}]}"#,
            ),
        )
        .unwrap();
        let track = list.find_transcript(&["en"]).unwrap();
        assert!(track.translation_languages.is_empty());
    }

    #[test]
    fn duplicate_language_in_one_collection_is_malformed() {
        let err = build_transcript_list(
            "vid",
            renderer(
                r#"{"captionTracks": [
                    {"baseUrl": "https://u/1", "name": {"simpleText": "English"}, "languageCode": "en"},
                    {"baseUrl": "https://u/2", "name": {"simpleText": "English (UK)"}, "languageCode": "en"}
                ]}"#,
            ),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedResponse);
        assert!(err.cause.contains("manually created"));
    }
}
