use std::fmt;

use thiserror::Error;

use crate::fetcher::watch_url;

pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Why a transcript could not be retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    VideoUnavailable,
    TooManyRequests,
    TranscriptsDisabled,
    NoTranscriptAvailable,
    NoTranscriptFound,
    NotTranslatable,
    TranslationLanguageNotAvailable,
    FailedToCreateConsentCookie,
    CookiePathInvalid,
    CookiesInvalid,
    /// The HTTP capability failed or was cancelled.
    RequestFailed,
    /// A page or payload did not have the shape the extractor relies on.
    MalformedResponse,
}

impl ErrorKind {
    pub fn cause_message(self) -> &'static str {
        match self {
            ErrorKind::VideoUnavailable => "The video is no longer available",
            ErrorKind::TooManyRequests => {
                "YouTube is receiving too many requests from this IP and now requires solving a captcha to continue. \
                 One of the following things can be done to work around this:\n\
                 - Manually solve the captcha in a browser and export the cookie file\n\
                 - Use a different IP address\n\
                 - Wait until the ban on your IP has been lifted"
            }
            ErrorKind::TranscriptsDisabled => "Subtitles are disabled for this video",
            ErrorKind::NoTranscriptAvailable => "No transcripts are available for this video",
            ErrorKind::NoTranscriptFound => "No transcripts were found for any of the requested language codes",
            ErrorKind::NotTranslatable => "The requested language is not translatable",
            ErrorKind::TranslationLanguageNotAvailable => "The requested translation language is not available",
            ErrorKind::FailedToCreateConsentCookie => "Failed to automatically give consent to saving cookies",
            ErrorKind::CookiePathInvalid => "The provided cookie file was unable to be loaded",
            ErrorKind::CookiesInvalid => "The cookies provided are not valid (may have expired)",
            ErrorKind::RequestFailed => "The request to YouTube failed",
            ErrorKind::MalformedResponse => "YouTube returned data in an unexpected format",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Failure of the HTTP capability itself.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Request(#[from] minreq::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: i32 },
}

/// The single error type of the crate: every failure names the video and a cause.
#[derive(Debug, Error)]
#[error(
    "Could not retrieve a transcript for the video {}! This is most likely caused by:\n\n{}",
    watch_url(.video_id),
    .cause
)]
pub struct TranscriptError {
    pub video_id: String,
    pub kind: ErrorKind,
    pub cause: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TranscriptError {
    pub fn new(video_id: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            video_id: video_id.into(),
            kind,
            cause: kind.cause_message().to_string(),
            source: None,
        }
    }

    pub fn with_cause(video_id: impl Into<String>, kind: ErrorKind, cause: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            kind,
            cause: cause.into(),
            source: None,
        }
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn request_failed(video_id: impl Into<String>, err: HttpError) -> Self {
        let cause = format!("{}: {err}", ErrorKind::RequestFailed.cause_message());
        Self::with_cause(video_id, ErrorKind::RequestFailed, cause).with_source(err)
    }

    pub fn malformed<E>(video_id: impl Into<String>, what: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let cause = format!("{} ({what}: {err})", ErrorKind::MalformedResponse.cause_message());
        Self::with_cause(video_id, ErrorKind::MalformedResponse, cause).with_source(err)
    }

    /// `summary` is the catalog's human readable listing.
    pub fn no_transcript_found(video_id: impl Into<String>, requested: &[String], summary: &str) -> Self {
        let cause = format!(
            "{}: {:?}\n\n{summary}",
            ErrorKind::NoTranscriptFound.cause_message(),
            requested
        );
        Self::with_cause(video_id, ErrorKind::NoTranscriptFound, cause)
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
