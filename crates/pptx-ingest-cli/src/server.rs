//! HTTP server mode for pptx-ingest.
//!
//! Provides a small REST API via `pptx-ingest serve`.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::time::Instant;

use anyhow::Result;
use pptx_ingest::ErrorKind;
use pptx_ingest::config::{MAX_ARTIFACT_SIZE, ProcessOptions};
use pptx_ingest::ingest::Ingestor;
use pptx_ingest::ir::ProcessingResult;

use crate::metrics::MetricsStore;

/// Slack on top of the artifact limit for multipart framing.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// A request body longer than the upload limit.
#[derive(Debug)]
struct BodyTooLarge(u64);

impl fmt::Display for BodyTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request body exceeds {} bytes", self.0)
    }
}

impl std::error::Error for BodyTooLarge {}

/// Shared state handed to every request.
pub struct ServerState {
    pub ingestor: Ingestor,
    pub metrics: MetricsStore,
}

impl ServerState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor,
            metrics: MetricsStore::new(),
        }
    }
}

/// Start the HTTP server on the given host and port.
pub fn start_server(host: &str, port: u16, state: ServerState) -> Result<()> {
    let addr = format!("{host}:{port}");
    let server = tiny_http::Server::http(&addr)
        .map_err(|e| anyhow::anyhow!("failed to bind to {addr}: {e}"))?;

    tracing::info!(%addr, "pptx-ingest server listening");
    eprintln!("pptx-ingest server listening on http://{addr}");
    eprintln!("Endpoints:");
    eprintln!("  POST /process  - Ingest a presentation (multipart or raw body)");
    eprintln!("  GET  /health   - Health check");
    eprintln!("  GET  /metrics  - Prometheus metrics");

    for mut request in server.incoming_requests() {
        let response = dispatch(&mut request, &state);
        if let Err(e) = request.respond(response) {
            tracing::warn!(error = %e, "failed to send response");
        }
    }

    Ok(())
}

type Response = tiny_http::Response<std::io::Cursor<Vec<u8>>>;

fn respond(status: i32, content_type: &str, body: impl Into<Vec<u8>>) -> Response {
    let response = tiny_http::Response::from_data(body.into()).with_status_code(status);
    match tiny_http::Header::from_bytes("Content-Type", content_type) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

fn json_response(status: i32, body: impl Into<Vec<u8>>) -> Response {
    respond(status, "application/json", body)
}

fn json_error(status: i32, message: &str) -> Response {
    let body = serde_json::json!({ "error": message }).to_string();
    json_response(status, body)
}

fn dispatch(request: &mut tiny_http::Request, state: &ServerState) -> Response {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or(&url).to_string();
    let is_get = *request.method() == tiny_http::Method::Get;
    let is_post = *request.method() == tiny_http::Method::Post;

    if is_get && path == "/health" {
        handle_health()
    } else if is_get && path == "/metrics" {
        respond(200, "text/plain; version=0.0.4", state.metrics.render())
    } else if is_post && path == "/process" {
        handle_process(request, &url, state)
    } else {
        json_error(404, "not found")
    }
}

fn handle_health() -> Response {
    let version = env!("CARGO_PKG_VERSION");
    json_response(200, format!(r#"{{"status":"ok","version":"{version}"}}"#))
}

fn handle_process(request: &mut tiny_http::Request, url: &str, state: &ServerState) -> Response {
    let (data, project_id, options) = match read_process_request(request, url) {
        Ok(parts) => parts,
        Err(e) if e.is::<BodyTooLarge>() => {
            state.metrics.record_failure(ErrorKind::TooLarge);
            return json_error(413, &e.to_string());
        }
        Err(e) => return json_error(400, &e.to_string()),
    };

    state.metrics.start_ingest();
    let started = Instant::now();
    let result = state.ingestor.process(&data, &project_id, &options);
    state.metrics.end_ingest();

    match result.error_kind {
        None => state.metrics.record_success(
            started.elapsed().as_secs_f64(),
            data.len() as u64,
            result.metadata.as_ref().map_or(0, |m| m.slide_count),
        ),
        Some(kind) => state.metrics.record_failure(kind),
    }

    match result.to_json(false) {
        Ok(body) => json_response(status_for(&result), body),
        Err(e) => json_error(500, &format!("failed to serialize result: {e}")),
    }
}

fn status_for(result: &ProcessingResult) -> i32 {
    match result.error_kind {
        None => 200,
        Some(ErrorKind::TooLarge) => 413,
        Some(ErrorKind::NotFound | ErrorKind::BadSignature) => 400,
        Some(_) => 422,
    }
}

fn read_process_request(
    request: &mut tiny_http::Request,
    url: &str,
) -> Result<(Vec<u8>, String, ProcessOptions)> {
    let body = read_body(request.as_reader(), MAX_ARTIFACT_SIZE + MULTIPART_OVERHEAD)?;

    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_string())
        .unwrap_or_default();

    let data = if content_type.starts_with("multipart/") {
        let boundary = extract_boundary(&content_type)
            .ok_or_else(|| anyhow::anyhow!("missing or invalid Content-Type boundary"))?;
        let file = extract_file_from_multipart(&body, &boundary)
            .ok_or_else(|| anyhow::anyhow!("no file found in multipart body"))?;
        tracing::debug!(filename = %file.filename, bytes = file.data.len(), "multipart upload");
        file.data
    } else {
        body
    };

    let query = parse_query_string(url);
    let project_id = query
        .get("projectId")
        .cloned()
        .unwrap_or_else(|| "default".to_string());

    let mut options = ProcessOptions::default();
    if let Some(duration) = query.get("duration") {
        let secs: f64 = duration
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid duration: {duration}"))?;
        options.default_duration = Some(secs);
    }

    Ok((data, project_id, options))
}

/// Read at most `limit` bytes; one byte more fails with [`BodyTooLarge`].
fn read_body(reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Err(BodyTooLarge(limit).into());
    }
    Ok(body)
}

// --- Multipart parsing helpers ---

struct MultipartFile {
    filename: String,
    data: Vec<u8>,
}

fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let part = part.trim();
        part.strip_prefix("boundary=")
            .map(|b| b.trim_matches('"').to_string())
    })
}

fn extract_file_from_multipart(body: &[u8], boundary: &str) -> Option<MultipartFile> {
    let delim = format!("--{boundary}");
    let delim_bytes = delim.as_bytes();

    let first_pos = find_bytes(body, delim_bytes)?;
    let after_delim = first_pos + delim_bytes.len();

    let start = if body.get(after_delim..after_delim + 2) == Some(b"\r\n") {
        after_delim + 2
    } else {
        after_delim
    };

    // Part headers end at the first blank line.
    let header_end = find_bytes(&body[start..], b"\r\n\r\n")?;
    let headers = std::str::from_utf8(&body[start..start + header_end]).ok()?;
    let data_start = start + header_end + 4;

    // The CRLF before the closing delimiter belongs to the framing.
    let next_delim_pos = find_bytes(&body[data_start..], delim_bytes)?;
    let data_end = if next_delim_pos >= 2
        && body[data_start + next_delim_pos - 2..data_start + next_delim_pos] == *b"\r\n"
    {
        data_start + next_delim_pos - 2
    } else {
        data_start + next_delim_pos
    };

    let filename = extract_filename_from_headers(headers)?;

    Some(MultipartFile {
        filename,
        data: body[data_start..data_end].to_vec(),
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn extract_filename_from_headers(headers: &str) -> Option<String> {
    let lower = headers.to_ascii_lowercase();
    let idx = lower.find("filename=\"")?;
    let start = idx + "filename=\"".len();
    let rest = &headers[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

fn parse_query_string(url: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(query) = url.split('?').nth(1) {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            }
        }
    }
    params
}
