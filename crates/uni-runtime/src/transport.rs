//! Transport boundary.
//!
//! The synchronizer builds an [`HttpRequest`] and hands it to a
//! [`Transport`]. Production uses the blocking reqwest client; tests
//! substitute a recording fake. Like the morpher, this is an adapter
//! seam - nothing above it knows which implementation is active.

use uni_dom::FileHandle;

/// Body encoding for one message request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Plain JSON body (`Content-Type: application/json`).
    Json(String),
    /// Multipart form: a `body` field with the JSON (minus binary
    /// values) plus one part per file field. No explicit content-type
    /// header; the transport sets the multipart boundary itself.
    Multipart { body: String, files: Vec<FilePart> },
}

/// One file part of a multipart request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    /// Form field name (the bound model/payload name).
    pub field: String,
    pub file: FileHandle,
}

/// A fully prepared request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: String,
    /// Accept/X-Requested-With/CSRF headers, in order.
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

/// A transport-level reply. Protocol interpretation (304 handling,
/// JSON parsing, epoch checks) happens above this boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failures (connection refused, timeouts, TLS).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
}

/// Sends prepared requests. One call per queue flush.
pub trait Transport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpReply, TransportError>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpReply, TransportError> {
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        builder = match &request.body {
            RequestBody::Json(json) => builder
                .header("Content-Type", "application/json")
                .body(json.clone()),
            RequestBody::Multipart { body, files } => {
                let mut form = reqwest::blocking::multipart::Form::new()
                    .text("body", body.clone());
                for part in files {
                    let file_part = reqwest::blocking::multipart::Part::bytes(
                        part.file.bytes.clone(),
                    )
                    .file_name(part.file.name.clone())
                    .mime_str(&part.file.content_type)
                    .map_err(|e| TransportError::Network(e.to_string()))?;
                    form = form.part(part.field.clone(), file_part);
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        tracing::debug!(status, "message endpoint replied");
        Ok(HttpReply { status, body })
    }
}
