//! Caption retrieval for YouTube videos without an API key.
//!
//! The watch page is scraped for its embedded caption tracklist, which becomes a
//! [`TranscriptList`]. A chosen [`CaptionTrack`] is downloaded as timedtext XML
//! and parsed into ordered [`Cue`]s.

pub mod api;
pub mod captions;
pub mod config;
pub mod cookies;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod parser;
pub mod transcripts;

pub use api::{BatchTranscripts, DEFAULT_LANGUAGES, TranscriptApi};
pub use config::Config;
pub use error::{ErrorKind, HttpError, Result, TranscriptError};
pub use http::{Cookie, CookieJar, HttpClient, MinreqClient};
pub use parser::{Cue, parse_cues};
pub use transcripts::{CaptionTrack, Transcript, TranscriptList, TranslationLanguage};
