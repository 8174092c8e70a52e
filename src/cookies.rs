//! Netscape-format cookies.txt loading.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{info, warn};

use crate::error::{ErrorKind, Result, TranscriptError};
use crate::http::Cookie;

/// Loads the unexpired cookies of a cookies.txt file exported from a browser.
///
/// `video_id` only labels the error.
pub fn load_cookie_file(path: impl AsRef<Path>, video_id: &str) -> Result<Vec<Cookie>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "cookie file unreadable");
        TranscriptError::new(video_id, ErrorKind::CookiePathInvalid).with_source(e)
    })?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let cookies = parse_cookie_lines(&content, now);

    if cookies.is_empty() {
        warn!(path = %path.display(), "cookie file has no usable cookies");
        return Err(TranscriptError::new(video_id, ErrorKind::CookiesInvalid));
    }
    info!(path = %path.display(), count = cookies.len(), "loaded cookies");
    Ok(cookies)
}

/// Parses cookies.txt content, dropping cookies that expired before `now`
/// (unix seconds). An expiry of 0 marks a session cookie.
pub fn parse_cookie_lines(content: &str, now: u64) -> Vec<Cookie> {
    let mut cookies = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        let line = line.strip_prefix("#HttpOnly_").unwrap_or(line);

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 7 {
            continue;
        }

        let expires: u64 = parts[4].trim().parse().unwrap_or(0);
        if expires != 0 && expires < now {
            continue;
        }

        cookies.push(Cookie::new(parts[5], parts[6], parts[0]));
    }

    cookies
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn parses_netscape_lines() {
        let content = "# Netscape HTTP Cookie File\n\
            \n\
            .youtube.com\tTRUE\t/\tFALSE\t1900000000\tTEST_FIELD\tTEST_VALUE\n\
            #HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t0\tSID\tsecret\n\
            broken line\n";
        let cookies = parse_cookie_lines(content, NOW);
        assert_eq!(
            cookies,
            vec![
                Cookie::new("TEST_FIELD", "TEST_VALUE", ".youtube.com"),
                Cookie::new("SID", "secret", ".youtube.com"),
            ]
        );
    }

    #[test]
    fn expired_cookies_are_dropped() {
        let content = ".youtube.com\tTRUE\t/\tFALSE\t1000\tOLD\tgone\n";
        assert!(parse_cookie_lines(content, NOW).is_empty());
    }

    #[test]
    fn missing_file_is_invalid_path() {
        let err = load_cookie_file("does/not/exist/cookies.txt", "GJLlxj_dtq8").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CookiePathInvalid);
        assert_eq!(err.video_id, "GJLlxj_dtq8");
    }

    #[test]
    fn file_with_only_expired_cookies_is_invalid() {
        let path = std::env::temp_dir().join(format!("yt-transcript-expired-{}.txt", std::process::id()));
        std::fs::write(&path, ".youtube.com\tTRUE\t/\tFALSE\t1000\tOLD\tgone\n").unwrap();
        let err = load_cookie_file(&path, "GJLlxj_dtq8").unwrap_err();
        std::fs::remove_file(&path).ok();
        assert_eq!(err.kind, ErrorKind::CookiesInvalid);
    }
}
