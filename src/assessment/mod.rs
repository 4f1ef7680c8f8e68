//! External qualitative assessment client
//!
//! The session orchestrator can enrich local metrics with a remote
//! assessment service that judges style and produces natural-language
//! feedback. The service is strictly optional: every failure mode maps to
//! [`AssessmentError`] and the orchestrator falls back to local-only
//! analysis, so nothing here may panic or block unboundedly.
//!
//! The wire format is JSON over HTTP POST. Request and response types use
//! camelCase field names to match the service contract.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::analysis::NoteEvent;
use crate::error::AssessmentError;
use crate::scoring::ScoreMetrics;
use crate::theory::{MusicalKey, MusicalStyle};

/// The per-note payload sent to the assessment service. A reduced view of
/// [`NoteEvent`]: frequency and confidence are capture-side detail the
/// service does not need.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentNote {
    pub note: crate::theory::Note,
    pub timestamp: u64,
    pub cents: i32,
    pub velocity: f32,
}

impl From<&NoteEvent> for AssessmentNote {
    fn from(event: &NoteEvent) -> Self {
        Self {
            note: event.note,
            timestamp: event.timestamp_ms,
            cents: event.cents,
            velocity: event.velocity,
        }
    }
}

/// Request body for the assessment call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    pub note_events: Vec<AssessmentNote>,
    pub style: MusicalStyle,
    pub key: MusicalKey,
    pub tempo: u32,
}

/// Successful assessment payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub overall_score: u8,
    pub feedback: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub metrics: ScoreMetrics,
}

/// Service envelope: either a data payload or an application-level error.
#[derive(Debug, Deserialize)]
struct AssessmentEnvelope {
    data: Option<AssessmentResponse>,
    error: Option<String>,
}

/// Anything that can produce an assessment for a finished session.
///
/// The orchestrator holds this as a trait object so tests can substitute
/// scripted backends without a network.
pub trait AssessmentBackend: Send + Sync {
    fn assess(
        &self,
        request: AssessmentRequest,
    ) -> BoxFuture<'static, Result<AssessmentResponse, AssessmentError>>;
}

/// HTTP client for the assessment service.
///
/// Speaks minimal HTTP/1.1 over a plain TCP connection: one POST, one
/// response, connection closed. The orchestrator wraps the call in a
/// timeout, so no read here needs its own deadline.
pub struct HttpAssessmentClient {
    endpoint: Endpoint,
}

impl HttpAssessmentClient {
    pub fn new(endpoint: &str) -> Result<Self, AssessmentError> {
        Ok(Self {
            endpoint: Endpoint::parse(endpoint)?,
        })
    }
}

impl AssessmentBackend for HttpAssessmentClient {
    fn assess(
        &self,
        request: AssessmentRequest,
    ) -> BoxFuture<'static, Result<AssessmentResponse, AssessmentError>> {
        let endpoint = self.endpoint.clone();
        async move {
            let body = serde_json::to_vec(&request)?;
            debug!(
                "[Assessment] POST {} ({} notes, {} bytes)",
                endpoint.path,
                request.note_events.len(),
                body.len()
            );

            let mut stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
                .await
                .map_err(|err| AssessmentError::ConnectFailed {
                    reason: err.to_string(),
                })?;

            let head = format!(
                "POST {} HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                endpoint.path,
                endpoint.host,
                body.len()
            );
            stream.write_all(head.as_bytes()).await?;
            stream.write_all(&body).await?;

            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).await?;

            let (status, response_body) = parse_http_response(&raw)?;
            if !(200..300).contains(&status) {
                return Err(AssessmentError::BadStatus { status });
            }

            let envelope: AssessmentEnvelope = serde_json::from_slice(response_body)?;
            if let Some(message) = envelope.error {
                return Err(AssessmentError::ServiceError { message });
            }
            envelope.data.ok_or(AssessmentError::MalformedResponse {
                reason: "envelope carried neither data nor error".to_string(),
            })
        }
        .boxed()
    }
}

/// Parsed `http://host[:port]/path` endpoint.
#[derive(Debug, Clone)]
struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    fn parse(url: &str) -> Result<Self, AssessmentError> {
        let rest = url
            .strip_prefix("http://")
            .ok_or_else(|| AssessmentError::ConnectFailed {
                reason: format!("unsupported endpoint URL: {}", url),
            })?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| AssessmentError::ConnectFailed {
                        reason: format!("invalid port in endpoint URL: {}", url),
                    })?;
                (host, port)
            }
            None => (authority, 80),
        };

        if host.is_empty() {
            return Err(AssessmentError::ConnectFailed {
                reason: format!("missing host in endpoint URL: {}", url),
            });
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }
}

/// Split a raw HTTP/1.1 response into status code and body.
fn parse_http_response(raw: &[u8]) -> Result<(u16, &[u8]), AssessmentError> {
    let header_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(AssessmentError::MalformedResponse {
            reason: "no header terminator in response".to_string(),
        })?;

    let head = std::str::from_utf8(&raw[..header_end]).map_err(|_| {
        AssessmentError::MalformedResponse {
            reason: "response headers not valid UTF-8".to_string(),
        }
    })?;

    // Status line: "HTTP/1.1 200 OK"
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(AssessmentError::MalformedResponse {
            reason: "unparseable status line".to_string(),
        })?;

    let mut body = &raw[header_end + 4..];

    // Connection: close responses may still be chunked
    let chunked = head
        .lines()
        .any(|line| {
            let lower = line.to_ascii_lowercase();
            lower.starts_with("transfer-encoding") && lower.contains("chunked")
        });
    if chunked {
        return Err(AssessmentError::MalformedResponse {
            reason: "chunked responses not supported".to_string(),
        });
    }

    // Trim to Content-Length when present; some servers pad the tail
    if let Some(length) = head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse::<usize>().ok())?
    }) {
        if length <= body.len() {
            body = &body[..length];
        }
    }

    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_parse() {
        let ep = Endpoint::parse("http://localhost:8700/analyze-improv").unwrap();
        assert_eq!(ep.host, "localhost");
        assert_eq!(ep.port, 8700);
        assert_eq!(ep.path, "/analyze-improv");

        let ep = Endpoint::parse("http://service.internal/assess").unwrap();
        assert_eq!(ep.port, 80);

        let ep = Endpoint::parse("http://10.0.0.5:9000").unwrap();
        assert_eq!(ep.path, "/");

        assert!(Endpoint::parse("https://secure.example/assess").is_err());
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AssessmentRequest {
            note_events: vec![AssessmentNote {
                note: "A3".parse().unwrap(),
                timestamp: 1250,
                cents: -12,
                velocity: 0.6,
            }],
            style: MusicalStyle::Blues,
            key: MusicalKey::A,
            tempo: 120,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["noteEvents"][0]["note"], "A3");
        assert_eq!(json["noteEvents"][0]["timestamp"], 1250);
        assert_eq!(json["style"], "blues");
        assert_eq!(json["key"], "A");
        assert_eq!(json["tempo"], 120);
    }

    #[test]
    fn test_parse_response_with_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let (status, body) = parse_http_response(raw).unwrap();
        assert_eq!(status, 200);
        assert_eq!(body, b"{}");
    }

    #[test]
    fn test_parse_response_error_status() {
        let raw = b"HTTP/1.1 503 Service Unavailable\r\n\r\n";
        let (status, body) = parse_http_response(raw).unwrap();
        assert_eq!(status, 503);
        assert!(body.is_empty());
    }

    #[test]
    fn test_parse_response_garbage_rejected() {
        assert!(parse_http_response(b"not http at all").is_err());
    }

    #[test]
    fn test_envelope_error_maps_to_service_error() {
        let envelope: AssessmentEnvelope =
            serde_json::from_str(r#"{"error": "model overloaded"}"#).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.as_deref(), Some("model overloaded"));
    }

    #[test]
    fn test_response_deserializes_camel_case() {
        let json = r#"{
            "data": {
                "overallScore": 82,
                "feedback": ["Nice phrasing in the middle section"],
                "strengths": ["Good bends"],
                "weaknesses": [],
                "suggestions": ["Try mixing in triplets"],
                "metrics": {
                    "scaleAdherence": 88,
                    "timingAccuracy": 75,
                    "pitchControl": 90,
                    "phraseConsistency": 80,
                    "styleMatch": 85
                }
            }
        }"#;
        let envelope: AssessmentEnvelope = serde_json::from_str(json).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.overall_score, 82);
        assert_eq!(data.metrics.style_match, 85);
    }
}
