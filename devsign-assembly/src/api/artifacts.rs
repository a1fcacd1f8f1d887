//! Artifact download endpoint

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    pub path: String,
}

/// GET /api/artifacts?path=
///
/// Streams the blob back under its original filename.
pub async fn download_artifact(
    State(state): State<AppState>,
    Query(query): Query<ArtifactQuery>,
) -> ApiResult<Response> {
    let (artifact, file) = state.artifacts.open(&query.path).await?;

    let body = Body::from_stream(ReaderStream::new(file));
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (
            header::CONTENT_LENGTH,
            HeaderValue::from(artifact.size_bytes.max(0) as u64),
        ),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(&artifact.original_filename),
        ),
    ];

    Ok((headers, body).into_response())
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 `filename*`
pub fn content_disposition(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let value = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        percent_encode(filename)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Build artifact routes
pub fn artifact_routes() -> Router<AppState> {
    Router::new().route("/api/artifacts", get(download_artifact))
}
