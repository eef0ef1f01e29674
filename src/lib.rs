//! Headless page controllers for the Karhuno analysis web client.
//!
//! The crate reimplements the client-side glue of the analysis application
//! without a browser: server responses are parsed into an in-memory DOM,
//! network traffic goes through a mock-friendly [`Transport`] seam, and
//! user-visible side effects (alerts, navigations, diagnostics) are captured
//! on the [`Page`] so tests can assert on them deterministically.
//!
//! Two independent controllers are provided:
//!
//! - [`UploadForm`] wires an "analyze" button to a hidden file input, submits
//!   the selected file as a multipart request and interprets the HTML
//!   response as a redirect, a task-status page, a flash message, or an
//!   undecodable body.
//! - [`AnalyzerWidget`] manages the analyzer page session: uploaded table
//!   data, the prompt textarea and the column list, round-tripped through the
//!   generation endpoint as JSON.

use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    Scrape(String),
    Transport(String),
    Http { status: u16, url: String },
    Json(String),
    MissingElement(String),
    Binding(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::Scrape(msg) => write!(f, "response scrape error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Http { status, url } => write!(f, "http error: status {status} from {url}"),
            Self::Json(msg) => write!(f, "json error: {msg}"),
            Self::MissingElement(selector) => write!(f, "missing element: {selector}"),
            Self::Binding(msg) => write!(f, "binding error: {msg}"),
        }
    }
}

impl StdError for Error {}

mod analyzer;
mod dom;
mod html;
mod page;
mod scrape;
mod transport;
mod upload;

pub use analyzer::{
    AnalyzeCollaborator, AnalyzerSnapshot, AnalyzerWidget, GENERATE_PROMPT_ENDPOINT,
    UPLOAD_ENDPOINT, split_columns,
};
pub use dom::NodeId;
pub use page::Page;
pub use scrape::{TASK_STATUS_TITLE, UploadOutcome, interpret_upload_response};
pub use transport::{
    CallKind, FilePayload, HttpResponse, MockTransport, MultipartField, Transport, TransportCall,
};
pub use upload::{DECODE_FAILURE_MESSAGE, UPLOADING_LABEL, UploadForm, install_page_styles};
