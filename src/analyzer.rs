//! Analyzer widget controller.
//!
//! Per-page session: a file upload populates opaque table data and unlocks
//! the generate/analyze buttons; "generate" round-trips the prompt and the
//! column list through the generation endpoint; "analyze" hands the session
//! to an external collaborator whose wire contract is not defined here.

use serde_json::{Map, Value as Json};

use crate::dom::NodeId;
use crate::page::Page;
use crate::transport::{FilePayload, MultipartField, Transport};
use crate::Result;

pub const UPLOAD_ENDPOINT: &str = "/analyzer/upload";
pub const GENERATE_PROMPT_ENDPOINT: &str = "/analyzer/generate_prompt";

const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload file";
const GENERATE_FAILED_MESSAGE: &str = "Failed to generate prompt";
const ANALYZE_FAILED_MESSAGE: &str = "Failed to run analysis";
const NO_DATA_MESSAGE: &str = "Please upload data first";

/// Splits the columns textarea into the ordered column list: line breaks
/// separate entries, empty lines are discarded.
pub fn split_columns(raw: &str) -> Vec<String> {
    raw.split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Session state handed to the analyze collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSnapshot {
    pub prompt: String,
    pub columns: Vec<String>,
    pub table_data: Json,
}

/// External endpoint behind the analyze button. Its request/response shape
/// is owned by the collaborator, not this crate.
pub trait AnalyzeCollaborator {
    fn invoke(&mut self, snapshot: &AnalyzerSnapshot) -> Result<()>;
}

#[derive(Debug)]
pub struct AnalyzerWidget {
    prompt_input: NodeId,
    columns_input: NodeId,
    generate_button: NodeId,
    analyze_button: NodeId,
    file_input: NodeId,
    table_data: Option<Json>,
}

impl AnalyzerWidget {
    /// Resolves the widget's elements and disables both action buttons until
    /// data has been uploaded.
    pub fn bind(page: &mut Page) -> Result<Self> {
        let prompt_input = page.by_id("promptInput")?;
        let columns_input = page.by_id("columnsInput")?;
        let generate_button = page.by_id("generatePrompt")?;
        let analyze_button = page.by_id("analyzeData")?;
        let file_input = page.by_id("fileUpload")?;

        page.set_disabled(generate_button, true);
        page.set_disabled(analyze_button, true);

        Ok(Self {
            prompt_input,
            columns_input,
            generate_button,
            analyze_button,
            file_input,
            table_data: None,
        })
    }

    pub fn file_input(&self) -> NodeId {
        self.file_input
    }

    pub fn generate_button(&self) -> NodeId {
        self.generate_button
    }

    pub fn analyze_button(&self) -> NodeId {
        self.analyze_button
    }

    pub fn table_data(&self) -> Option<&Json> {
        self.table_data.as_ref()
    }

    /// Uploads the selected file; on success the response JSON becomes the
    /// session's table data and the action buttons are enabled. Failures
    /// leave the session untouched.
    pub fn on_file_selected(
        &mut self,
        page: &mut Page,
        transport: &mut dyn Transport,
        file: FilePayload,
    ) {
        let fields = [MultipartField::file("file", file)];
        let response = match transport.post_multipart(UPLOAD_ENDPOINT, &fields) {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                page.log_line(format!(
                    "[analyzer] upload failed: HTTP {} from {UPLOAD_ENDPOINT}",
                    response.status
                ));
                page.alert(UPLOAD_FAILED_MESSAGE);
                return;
            }
            Err(err) => {
                page.log_line(format!("[analyzer] upload error: {err}"));
                page.alert(UPLOAD_FAILED_MESSAGE);
                return;
            }
        };

        match serde_json::from_str::<Json>(&response.body) {
            Ok(data) => {
                self.table_data = Some(data);
                page.set_disabled(self.generate_button, false);
                page.set_disabled(self.analyze_button, false);
            }
            Err(err) => {
                page.log_line(format!("[analyzer] upload returned invalid json: {err}"));
                page.alert(UPLOAD_FAILED_MESSAGE);
            }
        }
    }

    /// Sends the current prompt, column list, and table data to the
    /// generation endpoint and overwrites both inputs from the response.
    pub fn on_generate(&mut self, page: &mut Page, transport: &mut dyn Transport) {
        let Some(table_data) = &self.table_data else {
            page.alert(NO_DATA_MESSAGE);
            return;
        };

        let mut request = Map::new();
        request.insert(
            "current_prompt".to_string(),
            Json::String(page.value(self.prompt_input)),
        );
        request.insert(
            "current_columns".to_string(),
            Json::Array(
                split_columns(&page.value(self.columns_input))
                    .into_iter()
                    .map(Json::String)
                    .collect(),
            ),
        );
        request.insert("table_data".to_string(), table_data.clone());

        let response = match transport.post_json(GENERATE_PROMPT_ENDPOINT, &Json::Object(request)) {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                page.log_line(format!(
                    "[analyzer] generate failed: HTTP {} from {GENERATE_PROMPT_ENDPOINT}",
                    response.status
                ));
                page.alert(GENERATE_FAILED_MESSAGE);
                return;
            }
            Err(err) => {
                page.log_line(format!("[analyzer] generate error: {err}"));
                page.alert(GENERATE_FAILED_MESSAGE);
                return;
            }
        };

        let Some((prompt, columns)) = parse_generate_response(&response.body) else {
            page.log_line(format!(
                "[analyzer] generate returned unexpected shape: {}",
                response.body
            ));
            page.alert(GENERATE_FAILED_MESSAGE);
            return;
        };

        page.set_value(self.prompt_input, &prompt);
        page.set_value(self.columns_input, &columns.join("\n"));
    }

    /// Invokes the external analyze collaborator with the current session.
    pub fn on_analyze(&mut self, page: &mut Page, collaborator: &mut dyn AnalyzeCollaborator) {
        let Some(table_data) = &self.table_data else {
            page.alert(NO_DATA_MESSAGE);
            return;
        };

        let snapshot = AnalyzerSnapshot {
            prompt: page.value(self.prompt_input),
            columns: split_columns(&page.value(self.columns_input)),
            table_data: table_data.clone(),
        };
        if let Err(err) = collaborator.invoke(&snapshot) {
            page.log_line(format!("[analyzer] analyze error: {err}"));
            page.alert(ANALYZE_FAILED_MESSAGE);
        }
    }
}

fn parse_generate_response(body: &str) -> Option<(String, Vec<String>)> {
    let parsed: Json = serde_json::from_str(body).ok()?;
    let prompt = parsed.get("prompt")?.as_str()?.to_string();
    let raw_columns = parsed.get("columns")?.as_array()?;
    let mut columns = Vec::with_capacity(raw_columns.len());
    for column in raw_columns {
        columns.push(column.as_str()?.to_string());
    }
    Some((prompt, columns))
}
