//! Upload-and-Redirect controller.
//!
//! Each upload form on a search-results page carries a visible analyze
//! button (`.analyze-btn`), a hidden file input (`.cleaned-file-input`), and
//! two hidden correlation fields. Selecting a file submits the form as a
//! multipart request; the response body is interpreted by
//! [`interpret_upload_response`] to decide between navigation and error
//! display.

use crate::dom::NodeId;
use crate::page::Page;
use crate::scrape::{UploadOutcome, interpret_upload_response};
use crate::transport::{FilePayload, MultipartField, Transport};
use crate::{Error, Result};

pub const UPLOADING_LABEL: &str = "Uploading...";
pub const DECODE_FAILURE_MESSAGE: &str =
    "Could not process the file. Check the diagnostic log for details.";

/// Styling for the upload dropdown and the busy button state, injected at
/// page setup because the shared layout does not ship it.
const PAGE_STYLE: &str = "
.dropdown-menu {
    z-index: 1050;
}

.btn-group {
    position: static;
}

.dropdown-item-form {
    padding: 0;
    margin: 0;
}

.dropdown-item-form button {
    width: 100%;
    text-align: left;
    border: none;
    background: none;
    padding: .5rem 1rem;
    color: #666;
    font-size: 0.875rem;
}

.dropdown-item-form button:hover {
    background-color: #f8f9fa;
    color: #333;
}

.dropdown-item-form button i {
    color: #999;
}

.dropdown-item-form button:hover i {
    color: #666;
}

.dropdown-toggle-split {
    padding-left: 0.5rem;
    padding-right: 0.5rem;
}

.dropdown-toggle-split::after {
    margin-left: 0;
}

.analyze-btn:disabled {
    opacity: 0.7;
    cursor: not-allowed;
}

.analyze-btn .fa-spin {
    display: inline-block;
    animation: fa-spin 2s infinite linear;
}

@keyframes fa-spin {
    0% { transform: rotate(0deg); }
    100% { transform: rotate(360deg); }
}
";

/// Injects the dropdown/busy-state CSS into the page head.
pub fn install_page_styles(page: &mut Page) -> NodeId {
    page.inject_style(PAGE_STYLE)
}

/// One bound upload form. Created by [`UploadForm::bind_all`]; holds the
/// nodes and correlation fields resolved at bind time plus the in-flight
/// guard for the form's single-request discipline.
#[derive(Debug)]
pub struct UploadForm {
    form: NodeId,
    button: NodeId,
    file_input: NodeId,
    action: String,
    search_query_id: String,
    mode: String,
    original_label: String,
    in_flight: bool,
}

impl UploadForm {
    /// Binds every `.analyze-btn` on the page to its enclosing form, the way
    /// the page script walks `closest('form')` on load.
    pub fn bind_all(page: &Page) -> Result<Vec<UploadForm>> {
        let mut forms = Vec::new();
        for button in page.elements_with_class("analyze-btn") {
            forms.push(Self::bind_button(page, button)?);
        }
        Ok(forms)
    }

    fn bind_button(page: &Page, button: NodeId) -> Result<UploadForm> {
        let form = page
            .dom
            .find_ancestor_by_tag(button, "form")
            .ok_or_else(|| Error::Binding("analyze button outside any form".into()))?;
        let file_input = page
            .dom
            .descendant_with_class(form, "cleaned-file-input")
            .ok_or_else(|| Error::Binding("form has no cleaned-file-input".into()))?;
        let action = page
            .attr(form, "action")
            .ok_or_else(|| Error::Binding("upload form has no action".into()))?;
        let search_query_id = page
            .dom
            .named_control_value(form, "search_query_id")
            .ok_or_else(|| Error::Binding("form has no search_query_id field".into()))?;
        let mode = page
            .dom
            .named_control_value(form, "mode")
            .ok_or_else(|| Error::Binding("form has no mode field".into()))?;
        let original_label = page.text(button);

        Ok(UploadForm {
            form,
            button,
            file_input,
            action,
            search_query_id,
            mode,
            original_label,
            in_flight: false,
        })
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn button(&self) -> NodeId {
        self.button
    }

    /// The hidden input the analyze button forwards its click to.
    pub fn file_input(&self) -> NodeId {
        self.file_input
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn search_query_id(&self) -> &str {
        &self.search_query_id
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Forwards an analyze button click to the hidden file input, opening
    /// the file dialog. Returns the input to open the dialog on, or `None`
    /// while the control is busy.
    pub fn trigger_file_dialog(&self, page: &mut Page) -> Option<NodeId> {
        if self.in_flight || page.disabled(self.button) {
            page.log_line(format!(
                "[upload] click ignored, control busy action={}",
                self.action
            ));
            return None;
        }
        page.log_line(format!(
            "[upload] forward click to file input action={}",
            self.action
        ));
        Some(self.file_input)
    }

    /// Handles a file selection on the hidden input.
    ///
    /// At most one request per form is ever in flight; a selection arriving
    /// while the previous request is unresolved (or after the page has begun
    /// navigating away) is dropped. All failure paths restore the button;
    /// the navigation outcomes leave it busy since the page is leaving.
    pub fn on_file_selected(
        &mut self,
        page: &mut Page,
        transport: &mut dyn Transport,
        file: FilePayload,
    ) {
        if self.in_flight {
            page.log_line(format!(
                "[upload] dropped file selection, request in flight action={}",
                self.action
            ));
            return;
        }
        self.in_flight = true;
        page.set_text(self.button, UPLOADING_LABEL);
        page.set_disabled(self.button, true);

        let fields = [
            MultipartField::file("cleaned_file", file),
            MultipartField::text("search_query_id", &self.search_query_id),
            MultipartField::text("mode", &self.mode),
        ];

        match transport.post_multipart(&self.action, &fields) {
            Err(err) => {
                page.log_line(format!("[upload] transport failure action={}: {err}", self.action));
                self.restore_button(page);
                page.alert(&format!("File upload failed: {err}"));
            }
            Ok(response) if !response.is_success() => {
                let err = Error::Http {
                    status: response.status,
                    url: self.action.clone(),
                };
                page.log_line(format!("[upload] {err}"));
                self.restore_button(page);
                page.alert(&format!("File upload failed: HTTP {}", response.status));
            }
            Ok(response) => self.handle_body(page, &response.body),
        }
    }

    fn handle_body(&mut self, page: &mut Page, body: &str) {
        match interpret_upload_response(body) {
            Ok(UploadOutcome::Redirect(url)) => {
                page.log_line(format!("[upload] meta refresh url={url}"));
                page.navigate(&url);
            }
            Ok(UploadOutcome::TaskStatus(task_id)) => {
                let url = UploadOutcome::task_status_path(task_id);
                page.log_line(format!("[upload] task status page task_id={task_id}"));
                page.navigate(&url);
            }
            Ok(UploadOutcome::Flash(message)) => {
                page.log_line(format!("[upload] flash message: {message}"));
                self.restore_button(page);
                page.alert(&message);
            }
            Ok(UploadOutcome::Opaque) => {
                page.log_line("[upload] no redirect or flash markers in response".into());
                page.log_line(format!("[upload] response body: {body}"));
                self.restore_button(page);
                page.alert(DECODE_FAILURE_MESSAGE);
            }
            Err(err) => {
                page.log_line(format!("[upload] scrape failure: {err}"));
                self.restore_button(page);
                page.alert(DECODE_FAILURE_MESSAGE);
            }
        }
    }

    fn restore_button(&mut self, page: &mut Page) {
        self.in_flight = false;
        page.set_text(self.button, &self.original_label);
        page.set_disabled(self.button, false);
    }
}
