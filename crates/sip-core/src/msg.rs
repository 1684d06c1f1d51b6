// siphon-rs - The Siphon SIP Stack
// Copyright (C) 2025 James Ferris <ferrous.communications@gmail.com>
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytes::Bytes;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use smol_str::SmolStr;

use crate::{headers::Headers, request::RegisterRequest};

const MAX_REASON_LENGTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    InvalidStatusCode { code: u16 },
    ReasonTooLong { max: usize, actual: usize },
    InvalidReason(String),
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidStatusCode { code } => {
                write!(f, "invalid SIP status code: {} (must be 100-699)", code)
            }
            Self::ReasonTooLong { max, actual } => {
                write!(f, "reason phrase too long (max {}, got {})", max, actual)
            }
            Self::InvalidReason(msg) => write!(f, "invalid reason phrase: {}", msg),
        }
    }
}

impl std::error::Error for MessageError {}

/// Status code and reason phrase of a response.
///
/// # Examples
///
/// ```
/// use sip_core::StatusLine;
///
/// let status = StatusLine::new(423, "Interval Too Brief").unwrap();
/// assert_eq!(status.code(), 423);
/// assert!(StatusLine::new(200, "OK\r\nInjected").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    code: u16,
    reason: SmolStr,
}

impl StatusLine {
    /// Creates a status line, rejecting out-of-range codes and reason phrases
    /// with control characters.
    pub fn new(code: u16, reason: impl AsRef<str>) -> Result<Self, MessageError> {
        if !(100..=699).contains(&code) {
            return Err(MessageError::InvalidStatusCode { code });
        }

        let reason = reason.as_ref();
        validate_reason_phrase(reason)?;

        Ok(Self {
            code,
            reason: SmolStr::new(reason),
        })
    }

    /// Status line with the RFC 3261 reason phrase for `code`.
    pub fn canonical(code: u16) -> Result<Self, MessageError> {
        Self::new(code, canonical_reason(code))
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

/// Reason phrases for the codes a registrar emits or expects back.
pub fn canonical_reason(code: u16) -> &'static str {
    match code {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        423 => "Interval Too Brief",
        480 => "Temporarily Unavailable",
        500 => "Server Internal Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// In-memory SIP response handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusLine,
    headers: Headers,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusLine, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Builds a response to `req` with the dialog-identifying headers copied
    /// over (RFC 3261 §8.2.6.2): every Via, From, To with a tag added when
    /// missing, Call-ID and CSeq.
    pub fn for_request<R>(code: u16, req: &R) -> Result<Self, MessageError>
    where
        R: RegisterRequest + ?Sized,
    {
        let mut headers = Headers::new();
        for via in req.headers("Via") {
            headers.push("Via", via);
        }
        if let Some(from) = req.header("From") {
            headers.push("From", from);
        }
        if let Some(to) = req.header("To") {
            headers.push("To", ensure_to_tag(to));
        }
        if let Some(call_id) = req.header("Call-ID") {
            headers.push("Call-ID", call_id);
        }
        if let Some(cseq) = req.header("CSeq") {
            headers.push("CSeq", cseq);
        }
        Ok(Self::new(StatusLine::canonical(code)?, headers, Bytes::new()))
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    pub fn code(&self) -> u16 {
        self.status.code()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Appends a header, builder style.
    pub fn with_header(mut self, name: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.headers.push(name, value);
        self
    }
}

/// Outbound half of the transport: hands a finished response back to the
/// wire.
pub trait ResponseSender: Send + Sync {
    fn send(&self, response: Response) -> anyhow::Result<()>;
}

/// Ensures the To header has a tag parameter (RFC 3261 §8.2.6.2).
fn ensure_to_tag(to_header: &str) -> SmolStr {
    if to_header.contains(";tag=") {
        return SmolStr::new(to_header);
    }

    let tag: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    SmolStr::new(format!("{};tag={}", to_header, tag))
}

fn validate_reason_phrase(reason: &str) -> Result<(), MessageError> {
    if reason.len() > MAX_REASON_LENGTH {
        return Err(MessageError::ReasonTooLong {
            max: MAX_REASON_LENGTH,
            actual: reason.len(),
        });
    }

    if reason.chars().any(|c| c.is_ascii_control()) {
        return Err(MessageError::InvalidReason(
            "contains control characters".to_string(),
        ));
    }

    Ok(())
}
