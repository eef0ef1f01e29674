use karhuno_ui::{
    AnalyzeCollaborator, AnalyzerSnapshot, AnalyzerWidget, CallKind, FilePayload,
    GENERATE_PROMPT_ENDPOINT, MockTransport, Page, Result, UPLOAD_ENDPOINT,
};
use serde_json::json;

const ANALYZER_PAGE: &str = r#"
<html>
<body>
  <input id="fileUpload" type="file">
  <textarea id="promptInput"></textarea>
  <textarea id="columnsInput"></textarea>
  <button id="generatePrompt">Generate Prompt</button>
  <button id="analyzeData">Analyze</button>
</body>
</html>
"#;

struct RecordingCollaborator {
    snapshots: Vec<AnalyzerSnapshot>,
    failure: Option<String>,
}

impl RecordingCollaborator {
    fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            failure: None,
        }
    }
}

impl AnalyzeCollaborator for RecordingCollaborator {
    fn invoke(&mut self, snapshot: &AnalyzerSnapshot) -> Result<()> {
        self.snapshots.push(snapshot.clone());
        match &self.failure {
            Some(message) => Err(karhuno_ui::Error::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

fn table_file() -> FilePayload {
    FilePayload::new("leads.xlsx", vec![0x50, 0x4B, 0x03, 0x04])
}

#[test]
fn bind_disables_action_buttons_until_upload() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let widget = AnalyzerWidget::bind(&mut page)?;
    assert!(page.disabled(widget.generate_button()));
    assert!(page.disabled(widget.analyze_button()));
    assert!(widget.table_data().is_none());
    Ok(())
}

#[test]
fn bind_fails_when_an_element_is_missing() -> Result<()> {
    let mut page = Page::from_html("<input id=\"fileUpload\" type=\"file\">")?;
    let err = AnalyzerWidget::bind(&mut page).unwrap_err();
    assert_eq!(err, karhuno_ui::Error::MissingElement("#promptInput".to_string()));
    Ok(())
}

#[test]
fn upload_stores_table_data_and_enables_buttons() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(
        UPLOAD_ENDPOINT,
        &json!({"columns": ["name", "email"], "rows": [["acme", "a@b.c"]]}),
    );

    widget.on_file_selected(&mut page, &mut transport, table_file());

    assert_eq!(
        widget.table_data(),
        Some(&json!({"columns": ["name", "email"], "rows": [["acme", "a@b.c"]]}))
    );
    assert!(!page.disabled(widget.generate_button()));
    assert!(!page.disabled(widget.analyze_button()));
    assert!(page.take_alert_messages().is_empty());

    let calls = transport.take_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, UPLOAD_ENDPOINT);
    assert_eq!(
        calls[0].fields,
        vec![("file".to_string(), "leads.xlsx".to_string())]
    );
    Ok(())
}

#[test]
fn upload_failure_leaves_session_untouched() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_status_response(UPLOAD_ENDPOINT, 500, "boom");

    widget.on_file_selected(&mut page, &mut transport, table_file());

    assert!(widget.table_data().is_none());
    assert!(page.disabled(widget.generate_button()));
    assert!(page.disabled(widget.analyze_button()));
    assert_eq!(
        page.take_alert_messages(),
        vec!["Failed to upload file".to_string()]
    );
    Ok(())
}

#[test]
fn upload_with_non_json_body_is_an_error() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_response(UPLOAD_ENDPOINT, "<html>not json</html>");

    widget.on_file_selected(&mut page, &mut transport, table_file());

    assert!(widget.table_data().is_none());
    assert_eq!(
        page.take_alert_messages(),
        vec!["Failed to upload file".to_string()]
    );
    assert!(page.take_logs().iter().any(|line| line.contains("invalid json")));
    Ok(())
}

#[test]
fn generate_without_upload_issues_no_request() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();

    widget.on_generate(&mut page, &mut transport);

    assert!(transport.calls().is_empty());
    assert_eq!(
        page.take_alert_messages(),
        vec!["Please upload data first".to_string()]
    );
    Ok(())
}

#[test]
fn generate_round_trips_prompt_and_columns() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(UPLOAD_ENDPOINT, &json!({"rows": []}));
    transport.set_json_response(
        GENERATE_PROMPT_ENDPOINT,
        &json!({"prompt": "Rank each company", "columns": ["fit", "reason"]}),
    );

    widget.on_file_selected(&mut page, &mut transport, table_file());
    page.set_value(page.by_id("promptInput")?, "old prompt");
    page.set_value(page.by_id("columnsInput")?, "a\n\nb\n");

    widget.on_generate(&mut page, &mut transport);

    let calls = transport.take_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].kind, CallKind::Json);
    assert_eq!(calls[1].url, GENERATE_PROMPT_ENDPOINT);
    assert_eq!(
        calls[1].json_body,
        Some(json!({
            "current_prompt": "old prompt",
            "current_columns": ["a", "b"],
            "table_data": {"rows": []},
        }))
    );

    assert_eq!(page.value(page.by_id("promptInput")?), "Rank each company");
    assert_eq!(page.value(page.by_id("columnsInput")?), "fit\nreason");
    assert!(page.take_alert_messages().is_empty());
    Ok(())
}

#[test]
fn generate_failure_leaves_inputs_unchanged() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(UPLOAD_ENDPOINT, &json!([]));
    transport.fail_with(GENERATE_PROMPT_ENDPOINT, "gateway timeout");

    widget.on_file_selected(&mut page, &mut transport, table_file());
    page.set_value(page.by_id("promptInput")?, "keep me");

    widget.on_generate(&mut page, &mut transport);

    assert_eq!(page.value(page.by_id("promptInput")?), "keep me");
    assert_eq!(
        page.take_alert_messages(),
        vec!["Failed to generate prompt".to_string()]
    );
    Ok(())
}

#[test]
fn generate_with_unexpected_shape_is_an_error() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(UPLOAD_ENDPOINT, &json!([]));
    transport.set_json_response(GENERATE_PROMPT_ENDPOINT, &json!({"prompt": 7}));

    widget.on_file_selected(&mut page, &mut transport, table_file());
    widget.on_generate(&mut page, &mut transport);

    assert_eq!(
        page.take_alert_messages(),
        vec!["Failed to generate prompt".to_string()]
    );
    assert!(
        page.take_logs()
            .iter()
            .any(|line| line.contains("unexpected shape"))
    );
    Ok(())
}

#[test]
fn analyze_without_upload_shows_blocking_message() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut collaborator = RecordingCollaborator::new();

    widget.on_analyze(&mut page, &mut collaborator);

    assert!(collaborator.snapshots.is_empty());
    assert_eq!(
        page.take_alert_messages(),
        vec!["Please upload data first".to_string()]
    );
    Ok(())
}

#[test]
fn analyze_hands_current_session_to_collaborator() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(UPLOAD_ENDPOINT, &json!({"rows": [1, 2]}));
    widget.on_file_selected(&mut page, &mut transport, table_file());

    page.set_value(page.by_id("promptInput")?, "score these");
    page.set_value(page.by_id("columnsInput")?, "fit\n\nreason");

    let mut collaborator = RecordingCollaborator::new();
    widget.on_analyze(&mut page, &mut collaborator);

    assert_eq!(collaborator.snapshots.len(), 1);
    let snapshot = &collaborator.snapshots[0];
    assert_eq!(snapshot.prompt, "score these");
    assert_eq!(snapshot.columns, vec!["fit", "reason"]);
    assert_eq!(snapshot.table_data, json!({"rows": [1, 2]}));
    assert!(page.take_alert_messages().is_empty());
    Ok(())
}

#[test]
fn server_rendered_textarea_content_is_the_initial_session_state() -> Result<()> {
    let html = r#"
    <body>
      <input id="fileUpload" type="file">
      <textarea id="promptInput">Saved prompt from the last run</textarea>
      <textarea id="columnsInput">fit
reason</textarea>
      <button id="generatePrompt">Generate Prompt</button>
      <button id="analyzeData">Analyze</button>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(UPLOAD_ENDPOINT, &json!({"rows": []}));
    widget.on_file_selected(&mut page, &mut transport, table_file());

    let mut collaborator = RecordingCollaborator::new();
    widget.on_analyze(&mut page, &mut collaborator);

    let snapshot = &collaborator.snapshots[0];
    assert_eq!(snapshot.prompt, "Saved prompt from the last run");
    assert_eq!(snapshot.columns, vec!["fit", "reason"]);
    Ok(())
}

#[test]
fn analyze_collaborator_failure_is_surfaced() -> Result<()> {
    let mut page = Page::from_html(ANALYZER_PAGE)?;
    let mut widget = AnalyzerWidget::bind(&mut page)?;
    let mut transport = MockTransport::new();
    transport.set_json_response(UPLOAD_ENDPOINT, &json!([]));
    widget.on_file_selected(&mut page, &mut transport, table_file());

    let mut collaborator = RecordingCollaborator::new();
    collaborator.failure = Some("analysis backend offline".to_string());
    widget.on_analyze(&mut page, &mut collaborator);

    assert_eq!(
        page.take_alert_messages(),
        vec!["Failed to run analysis".to_string()]
    );
    assert!(
        page.take_logs()
            .iter()
            .any(|line| line.contains("analysis backend offline"))
    );
    Ok(())
}
