//! Interpretation protocol for upload responses.
//!
//! The backend answers an asynchronous form upload with HTML: either a
//! meta-refresh stub, a rendered task-status page, or the original page with
//! flash messages baked in. The client has to infer the server's intent from
//! the body text, in a fixed priority order.

use fancy_regex::Regex;

use crate::html::parse_html;
use crate::{Error, Result};

/// Literal `<title>` text of the rendered task-status page.
pub const TASK_STATUS_TITLE: &str = "Task Status - Karhuno Analysis System";

const META_REFRESH_PATTERN: &str = r#"<meta http-equiv="refresh" content="0; url=([^"]+)">"#;
const BACK_TO_CLIENT_PATTERN: &str = r#"href="([^"]+)"\s+class="btn btn-secondary">Back to Client"#;
const TASK_ID_PATTERN: &str = r"const taskId = (\d+);";

/// Decision derived from an upload response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Meta-refresh target; navigate there verbatim.
    Redirect(String),
    /// Task-status page; navigate to [`UploadOutcome::task_status_path`].
    TaskStatus(u64),
    /// First flash message found in the body; surface it to the user.
    Flash(String),
    /// No recognizable marker; surface a generic decode failure.
    Opaque,
}

impl UploadOutcome {
    pub fn task_status_path(task_id: u64) -> String {
        format!("/task/{task_id}")
    }
}

/// Classifies a raw upload response body.
///
/// Priority order: meta-refresh short-circuits everything, then the
/// task-status page markers, then flash messages, then [`UploadOutcome::Opaque`].
/// A body that fails to parse as HTML is treated as opaque rather than an
/// error; browsers' `DOMParser` never throws on text/html either.
pub fn interpret_upload_response(body: &str) -> Result<UploadOutcome> {
    if let Some(url) = capture_first(META_REFRESH_PATTERN, body)? {
        return Ok(UploadOutcome::Redirect(url));
    }

    if body.contains(&format!("<title>{TASK_STATUS_TITLE}</title>")) {
        // The back-link confirms the page shape; the numeric id lives in an
        // inline script. Either one missing falls through to flash handling.
        if capture_first(BACK_TO_CLIENT_PATTERN, body)?.is_some() {
            if let Some(raw_id) = capture_first(TASK_ID_PATTERN, body)? {
                if let Ok(task_id) = raw_id.parse::<u64>() {
                    return Ok(UploadOutcome::TaskStatus(task_id));
                }
            }
        }
    }

    let Ok(dom) = parse_html(body) else {
        return Ok(UploadOutcome::Opaque);
    };
    if let Some(first_alert) = dom.elements_with_class("alert").into_iter().next() {
        let message = dom.text_content(first_alert).trim().to_string();
        return Ok(UploadOutcome::Flash(message));
    }

    Ok(UploadOutcome::Opaque)
}

fn capture_first(pattern: &str, body: &str) -> Result<Option<String>> {
    let regex = Regex::new(pattern).map_err(|err| Error::Scrape(err.to_string()))?;
    let captures = regex
        .captures(body)
        .map_err(|err| Error::Scrape(err.to_string()))?;
    Ok(captures
        .and_then(|captures| captures.get(1).map(|group| group.as_str().to_string())))
}
