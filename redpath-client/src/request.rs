//! HTTP/1.1 wire types: request serialization, incremental response
//! parsing, and the pending-request unit handed through a pool channel.

use bytes::Bytes;
use http::Method;
use thiserror::Error;

/// Receive chunk size for response reads.
pub const READ_BUFFER_SIZE: usize = 4096;
/// Response bodies beyond this fail the read and close the connection.
pub const BODY_LIMIT: usize = 128 * 1024;

/// An HTTP/1.1 request prepared by the client façade.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Serialize into wire bytes. `content-length` is emitted for
    /// non-empty bodies; the caller supplies `host` and `connection`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256 + self.body.len());
        buf.extend_from_slice(self.method.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.uri.as_bytes());
        buf.extend_from_slice(b" HTTP/1.1\r\n");
        for (name, value) in &self.headers {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        if !self.body.is_empty() {
            buf.extend_from_slice(b"content-length: ");
            let mut itoa_buf = itoa::Buffer::new();
            buf.extend_from_slice(itoa_buf.format(self.body.len()).as_bytes());
            buf.extend_from_slice(b"\r\n");
        }
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(self.body.as_bytes());
        buf
    }
}

/// One-shot response callback. Moving it into the call site is what
/// enforces the fire-exactly-once contract.
pub type ResponseCallback = Box<dyn FnOnce(Response)>;

/// A request waiting on a pool channel, paired with its callback.
/// Moved, never copied: a connection takes ownership when it receives.
pub struct PendingRequest {
    pub req: HttpRequest,
    pub callback: ResponseCallback,
}

/// A parsed HTTP response. `Default` is the empty response delivered to
/// callbacks when transport fails.
#[derive(Debug, Default)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    keep_alive: bool,
}

impl Response {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("malformed response: {0}")]
    Malformed(#[from] httparse::Error),
    #[error("invalid content-length")]
    InvalidLength,
    #[error("response body exceeds {BODY_LIMIT} bytes")]
    BodyTooLarge,
    #[error("connection closed before response headers")]
    Truncated,
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
struct Head {
    status: u16,
    headers: Vec<(String, String)>,
    body_start: usize,
    content_length: Option<usize>,
    keep_alive: bool,
}

/// Incremental HTTP/1.1 response reader.
///
/// Bytes accumulate and the header block is re-parsed until complete
/// (header prefixes are small, so the re-parse is cheap). The body is
/// framed by `content-length` when present and by EOF otherwise.
#[derive(Debug, Default)]
pub struct ResponseParser {
    raw: Vec<u8>,
    head: Option<Head>,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one read's worth of bytes. Returns true once the response
    /// is complete.
    pub fn advance(&mut self, chunk: &[u8]) -> Result<bool, ResponseError> {
        self.raw.extend_from_slice(chunk);
        if self.head.is_none() {
            let mut headers = [httparse::EMPTY_HEADER; 64];
            let mut resp = httparse::Response::new(&mut headers);
            match resp.parse(&self.raw)? {
                httparse::Status::Complete(body_start) => {
                    let mut content_length = None;
                    let mut keep_alive = true;
                    let mut parsed = Vec::with_capacity(resp.headers.len());
                    for h in resp.headers.iter() {
                        if h.name.is_empty() {
                            break;
                        }
                        let value = std::str::from_utf8(h.value).unwrap_or("");
                        if h.name.eq_ignore_ascii_case("content-length") {
                            content_length = Some(
                                value
                                    .trim()
                                    .parse()
                                    .map_err(|_| ResponseError::InvalidLength)?,
                            );
                        } else if h.name.eq_ignore_ascii_case("connection") {
                            keep_alive = !value.eq_ignore_ascii_case("close");
                        }
                        parsed.push((h.name.to_string(), value.to_string()));
                    }
                    self.head = Some(Head {
                        status: resp.code.unwrap_or(0),
                        headers: parsed,
                        body_start,
                        content_length,
                        keep_alive,
                    });
                }
                httparse::Status::Partial => return Ok(false),
            }
        }
        self.body_complete()
    }

    fn body_complete(&self) -> Result<bool, ResponseError> {
        let Some(head) = &self.head else {
            return Ok(false);
        };
        let body_len = self.raw.len() - head.body_start;
        if body_len > BODY_LIMIT {
            return Err(ResponseError::BodyTooLarge);
        }
        match head.content_length {
            Some(len) => Ok(body_len >= len),
            // No length: framed by EOF, never complete from bytes alone.
            None => Ok(false),
        }
    }

    /// Whether the status line and header block have been parsed.
    pub fn have_headers(&self) -> bool {
        self.head.is_some()
    }

    /// EOF from the peer: fine once headers are in hand (EOF framing,
    /// or a truncated TLS stream treated as success), an error before.
    pub fn finish_on_eof(&self) -> Result<(), ResponseError> {
        if self.head.is_some() {
            Ok(())
        } else {
            Err(ResponseError::Truncated)
        }
    }

    /// Consume into a `Response`. Keep-alive holds only when the server
    /// asked for it and the body arrived complete under content-length
    /// framing; EOF-framed and truncated bodies force a close.
    pub fn into_response(self) -> Response {
        let Some(head) = self.head else {
            return Response::default();
        };
        let body_end = match head.content_length {
            Some(len) => (head.body_start + len).min(self.raw.len()),
            None => self.raw.len(),
        };
        let complete = head
            .content_length
            .is_some_and(|len| self.raw.len() - head.body_start >= len);
        Response {
            status: head.status,
            headers: head.headers,
            body: Bytes::copy_from_slice(&self.raw[head.body_start..body_end]),
            keep_alive: head.keep_alive && complete,
        }
    }
}
