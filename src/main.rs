use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use yt_transcript::{
    CaptionTrack, Config, Cue, DEFAULT_LANGUAGES, ErrorKind, MinreqClient, TranscriptApi, TranscriptError,
};

#[derive(Deserialize)]
struct TracksRequest {
    video_id: String,
}

#[derive(Deserialize)]
struct TranscriptRequest {
    video_id: String,
    languages: Option<Vec<String>>,
    translate_to: Option<String>,
}

#[derive(Serialize)]
struct TracksResponse {
    video_id: String,
    tracks: Vec<CaptionTrack>,
    summary: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    video_id: String,
    language_code: String,
    is_generated: bool,
    cues: Vec<Cue>,
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
    kind: String,
}

struct WorkItem {
    stream: TcpStream,
}

const USAGE: &str = "POST /api/transcripts {\"video_id\"}\n\
POST /api/transcript {\"video_id\", \"languages\"?, \"translate_to\"?}\n";

const READ_WRITE_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_HEADER_SIZE: usize = 8 * 1024; // 8 KB
const MAX_BODY_SIZE: usize = 1024 * 1024; // 1 MB
const QUEUE_CAPACITY: usize = 100;

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env());
    let addr = config.bind_addr();

    let listener = TcpListener::bind(&addr)?;
    info!("transcript server at http://{}", addr);
    info!("spawning {} worker threads", config.workers);

    let (sender, receiver) = bounded(QUEUE_CAPACITY);

    for id in 0..config.workers {
        let receiver = receiver.clone();
        let config = Arc::clone(&config);
        thread::spawn(move || worker(id, receiver, config));
    }

    info!("ready to accept requests");

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(e) = handle_connection(stream, &sender) {
                    error!("connection error: {}", e);
                }
            }
            Err(e) => error!("accept failed: {}", e),
        }
    }
    Ok(())
}

fn handle_connection(stream: TcpStream, sender: &Sender<WorkItem>) -> io::Result<()> {
    stream.set_read_timeout(Some(READ_WRITE_TIMEOUT))?;
    stream.set_write_timeout(Some(READ_WRITE_TIMEOUT))?;

    let mut stream_clone = stream.try_clone()?;
    let work_item = WorkItem { stream };

    match sender.try_send(work_item) {
        Ok(()) => Ok(()),
        Err(crossbeam_channel::TrySendError::Full(_)) => {
            warn!("queue full, rejecting connection");
            write_error_response(
                &mut stream_clone,
                "503 Service Unavailable",
                "Server is busy, please try again later.",
            )
        }
        Err(crossbeam_channel::TrySendError::Disconnected(_)) => {
            write_error_response(&mut stream_clone, "500 Internal Server Error", "Worker pool has been disconnected.")
        }
    }
}

fn worker(id: usize, receiver: Receiver<WorkItem>, config: Arc<Config>) {
    info!("worker {} started", id);
    loop {
        match receiver.recv() {
            Ok(mut work_item) => {
                if let Err(e) = handle_request(&mut work_item.stream, &config) {
                    error!("worker {} error: {}", id, e);
                    let _ = write_error_response(&mut work_item.stream, "500 Internal Server Error", &e.to_string());
                }
            }
            Err(_) => {
                info!("worker {} shutting down", id);
                break;
            }
        }
    }
}

fn handle_request(stream: &mut TcpStream, config: &Config) -> io::Result<()> {
    let (headers, body_start_index) = read_headers_from_stream(stream)?;
    let request_data = &headers[..body_start_index];
    let initial_body = &headers[body_start_index..];

    let mut lines = request_data.split(|&b| b == b'\n').filter(|l| !l.is_empty());
    let request_line = lines.next().ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "Empty request"))?;

    if request_line.starts_with(b"GET / ") {
        return write_response(stream, "200 OK", "text/plain; charset=utf-8", USAGE.as_bytes());
    }

    let route = if request_line.starts_with(b"POST /api/transcripts ") {
        Route::Tracks
    } else if request_line.starts_with(b"POST /api/transcript ") {
        Route::Transcript
    } else {
        return write_error_response(stream, "404 Not Found", "Not Found");
    };

    let content_length = get_content_length(request_data)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Content-Length header is required for POST"))?;

    if content_length > MAX_BODY_SIZE {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "Request body too large"));
    }

    let body = read_body(initial_body, content_length, stream)?;
    let api = TranscriptApi::new(Arc::new(MinreqClient::new(config)));

    let result = match route {
        Route::Tracks => {
            let req: TracksRequest = parse_json(&body)?;
            with_cookie_file(api, config, &req.video_id)
                .and_then(|api| list_tracks(&api, &req.video_id))
                .map(|resp| serde_json::to_vec(&resp))
        }
        Route::Transcript => {
            let req: TranscriptRequest = parse_json(&body)?;
            with_cookie_file(api, config, &req.video_id)
                .and_then(|api| fetch_transcript(&api, &req))
                .map(|resp| serde_json::to_vec(&resp))
        }
    };

    match result {
        Ok(json) => {
            let json = json.map_err(|e| io::Error::other(format!("JSON serialization error: {}", e)))?;
            write_response(stream, "200 OK", "application/json", &json)
        }
        Err(e) => {
            warn!(video_id = %e.video_id, kind = %e.kind, "transcript request failed");
            write_transcript_error(stream, &e)
        }
    }
}

enum Route {
    Tracks,
    Transcript,
}

fn parse_json<'a, T: Deserialize<'a>>(body: &'a [u8]) -> io::Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON deserialization error: {}", e)))
}

fn with_cookie_file(api: TranscriptApi, config: &Config, video_id: &str) -> Result<TranscriptApi, TranscriptError> {
    match &config.cookie_file {
        Some(path) => api.with_cookie_file(path, video_id),
        None => Ok(api),
    }
}

fn list_tracks(api: &TranscriptApi, video_id: &str) -> Result<TracksResponse, TranscriptError> {
    let list = api.list_transcripts(video_id)?;
    Ok(TracksResponse {
        video_id: video_id.to_string(),
        tracks: list.iter().cloned().collect(),
        summary: list.to_string(),
    })
}

fn fetch_transcript(api: &TranscriptApi, req: &TranscriptRequest) -> Result<TranscriptResponse, TranscriptError> {
    let list = api.list_transcripts(&req.video_id)?;
    let track = match req.languages.as_deref().filter(|l| !l.is_empty()) {
        Some(languages) => list.find_transcript(languages)?,
        None => list.find_transcript(DEFAULT_LANGUAGES)?,
    };

    let mut transcript = api.transcript(track);
    if let Some(code) = req.translate_to.as_deref().filter(|c| !c.trim().is_empty()) {
        transcript = transcript.translate(code)?;
    }

    let cues = transcript.fetch()?;
    let track = transcript.into_track();
    Ok(TranscriptResponse {
        video_id: req.video_id.clone(),
        language_code: track.language_code,
        is_generated: track.is_generated,
        cues,
    })
}

fn status_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NoTranscriptFound
        | ErrorKind::NoTranscriptAvailable
        | ErrorKind::TranscriptsDisabled
        | ErrorKind::VideoUnavailable
        | ErrorKind::NotTranslatable
        | ErrorKind::TranslationLanguageNotAvailable => "404 Not Found",
        ErrorKind::TooManyRequests => "429 Too Many Requests",
        _ => "502 Bad Gateway",
    }
}

fn write_transcript_error(stream: &mut TcpStream, err: &TranscriptError) -> io::Result<()> {
    let message = err.to_string();
    let body = serde_json::to_vec(&ErrorResponse { error: &message, kind: err.kind.to_string() })
        .map_err(|e| io::Error::other(format!("JSON serialization error: {}", e)))?;
    write_response(stream, status_for(err.kind), "application/json", &body)
}

fn read_headers_from_stream(stream: &mut TcpStream) -> io::Result<(Vec<u8>, usize)> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0; 256];
    loop {
        let bytes_read = stream.read(&mut chunk)?;
        if bytes_read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "Connection closed while reading headers"));
        }
        buffer.extend_from_slice(&chunk[..bytes_read]);

        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            let body_start_index = pos + 4;
            return Ok((buffer, body_start_index));
        }

        if buffer.len() > MAX_HEADER_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Headers too large"));
        }
    }
}

fn write_response(stream: &mut TcpStream, status: &str, content_type: &str, content: &[u8]) -> io::Result<()> {
    let headers = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        content.len()
    );
    stream.write_all(headers.as_bytes())?;
    stream.write_all(content)?;
    stream.flush()
}

fn write_error_response(stream: &mut TcpStream, status: &str, msg: &str) -> io::Result<()> {
    write_response(stream, status, "text/plain; charset=utf-8", msg.as_bytes())
}

fn get_content_length(headers: &[u8]) -> Option<usize> {
    let headers_str = std::str::from_utf8(headers).ok()?;
    for line in headers_str.lines() {
        if line.to_ascii_lowercase().starts_with("content-length:") {
            return line.split(':').nth(1)?.trim().parse().ok();
        }
    }
    None
}

fn read_body(
    initial_data: &[u8],
    content_length: usize,
    stream: &mut TcpStream,
) -> io::Result<Vec<u8>> {
    let mut body = Vec::with_capacity(content_length);
    body.extend_from_slice(initial_data);

    let remaining_bytes = content_length.saturating_sub(initial_data.len());

    if remaining_bytes > 0 {
        let mut remaining_body_reader = stream.take(remaining_bytes as u64);
        remaining_body_reader.read_to_end(&mut body)?;
    }

    Ok(body)
}
