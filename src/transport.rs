//! Network seam for the controllers.
//!
//! Controllers talk to the backend through the [`Transport`] trait so tests
//! can route every request to [`MockTransport`]: URL-keyed canned responses,
//! injected failures, and a drained call log.

use std::collections::HashMap;

use serde_json::Value as Json;

use crate::{Error, Result};

/// File selected by the user, as handed to a controller event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePayload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FilePayload {
    pub fn new(file_name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.to_string(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartField {
    Text { name: String, value: String },
    File { name: String, payload: FilePayload },
}

impl MultipartField {
    pub fn text(name: &str, value: &str) -> Self {
        Self::Text {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn file(name: &str, payload: FilePayload) -> Self {
        Self::File {
            name: name.to_string(),
            payload,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn with_status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport {
    fn post_multipart(&mut self, url: &str, fields: &[MultipartField]) -> Result<HttpResponse>;
    fn post_json(&mut self, url: &str, body: &Json) -> Result<HttpResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Multipart,
    Json,
}

/// One recorded request. Multipart fields are logged as `(name, value)`
/// pairs, with file fields contributing the file name as the value; JSON
/// requests carry the full body.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCall {
    pub kind: CallKind,
    pub url: String,
    pub fields: Vec<(String, String)>,
    pub json_body: Option<Json>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    responses: HashMap<String, HttpResponse>,
    failures: HashMap<String, String>,
    calls: Vec<TransportCall>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `url` to a 200 response with the given body.
    pub fn set_response(&mut self, url: &str, body: &str) {
        self.responses
            .insert(url.to_string(), HttpResponse::ok(body));
    }

    pub fn set_status_response(&mut self, url: &str, status: u16, body: &str) {
        self.responses
            .insert(url.to_string(), HttpResponse::with_status(status, body));
    }

    pub fn set_json_response(&mut self, url: &str, body: &Json) {
        self.responses
            .insert(url.to_string(), HttpResponse::ok(&body.to_string()));
    }

    /// Makes requests to `url` fail at the transport level, before any HTTP
    /// status exists.
    pub fn fail_with(&mut self, url: &str, message: &str) {
        self.failures.insert(url.to_string(), message.to_string());
    }

    pub fn clear_routes(&mut self) {
        self.responses.clear();
        self.failures.clear();
    }

    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<TransportCall> {
        std::mem::take(&mut self.calls)
    }

    fn respond(&mut self, call: TransportCall) -> Result<HttpResponse> {
        let url = call.url.clone();
        self.calls.push(call);
        if let Some(message) = self.failures.get(&url) {
            return Err(Error::Transport(message.clone()));
        }
        self.responses
            .get(&url)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no mock response for {url}")))
    }
}

impl Transport for MockTransport {
    fn post_multipart(&mut self, url: &str, fields: &[MultipartField]) -> Result<HttpResponse> {
        let logged_fields = fields
            .iter()
            .map(|field| match field {
                MultipartField::Text { name, value } => (name.clone(), value.clone()),
                MultipartField::File { name, payload } => {
                    (name.clone(), payload.file_name.clone())
                }
            })
            .collect();
        self.respond(TransportCall {
            kind: CallKind::Multipart,
            url: url.to_string(),
            fields: logged_fields,
            json_body: None,
        })
    }

    fn post_json(&mut self, url: &str, body: &Json) -> Result<HttpResponse> {
        self.respond(TransportCall {
            kind: CallKind::Json,
            url: url.to_string(),
            fields: Vec::new(),
            json_body: Some(body.clone()),
        })
    }
}
