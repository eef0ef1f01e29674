//! Page environment: the DOM plus captured browser side effects.
//!
//! Controllers never touch a real browser. Alerts, navigations, and
//! diagnostic lines are recorded here and drained by tests, the same way the
//! transport seam records requests.

use std::collections::{HashMap, VecDeque};

use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::{Error, Result};

const DEFAULT_LOG_LIMIT: usize = 10_000;

#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    document_url: String,
    alert_messages: Vec<String>,
    navigations: Vec<String>,
    logs: VecDeque<String>,
    log_limit: usize,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_url("about:blank", html)
    }

    pub fn from_html_with_url(url: &str, html: &str) -> Result<Self> {
        Ok(Self {
            dom: parse_html(html)?,
            document_url: url.to_string(),
            alert_messages: Vec::new(),
            navigations: Vec::new(),
            logs: VecDeque::new(),
            log_limit: DEFAULT_LOG_LIMIT,
        })
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    /// Records a `window.location` assignment. The url becomes the current
    /// document url; the DOM is left as-is since the page is leaving anyway.
    pub fn navigate(&mut self, url: &str) {
        self.log_line(format!("[page] navigate url={url}"));
        self.document_url = url.to_string();
        self.navigations.push(url.to_string());
    }

    pub fn take_navigations(&mut self) -> Vec<String> {
        std::mem::take(&mut self.navigations)
    }

    /// Records a blocking `alert()` notification.
    pub fn alert(&mut self, message: &str) {
        self.alert_messages.push(message.to_string());
    }

    pub fn take_alert_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alert_messages)
    }

    pub fn log_line(&mut self, line: String) {
        if self.logs.len() >= self.log_limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs).into()
    }

    pub fn set_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Binding(
                "set_log_limit requires at least 1 entry".into(),
            ));
        }
        self.log_limit = max_entries;
        while self.logs.len() > self.log_limit {
            self.logs.pop_front();
        }
        Ok(())
    }

    /// Appends a `<style>` element with the given CSS to `<head>`, creating
    /// the head element for fragment documents that lack one.
    pub fn inject_style(&mut self, css: &str) -> NodeId {
        let head = self.dom.first_element_by_tag("head").unwrap_or_else(|| {
            let root = self.dom.root;
            self.dom.create_element(root, "head".to_string(), HashMap::new())
        });
        let style = self
            .dom
            .create_element(head, "style".to_string(), HashMap::new());
        self.dom.create_text(style, css.to_string());
        style
    }

    pub fn by_id(&self, id: &str) -> Result<NodeId> {
        self.dom
            .by_id(id)
            .ok_or_else(|| Error::MissingElement(format!("#{id}")))
    }

    pub fn elements_with_class(&self, class_name: &str) -> Vec<NodeId> {
        self.dom.elements_with_class(class_name)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.dom.tag_name(node).map(str::to_string)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn text(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.dom.set_text(node, text);
    }

    pub fn value(&self, node: NodeId) -> String {
        self.dom.value(node)
    }

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        self.dom.set_value(node, value);
    }

    pub fn disabled(&self, node: NodeId) -> bool {
        self.dom.disabled(node)
    }

    pub fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        self.dom.set_disabled(node, disabled);
    }

    /// Text of the first `<style>` under `<head>`, for asserting injected CSS.
    pub fn head_style_text(&self) -> Option<String> {
        let head = self.dom.first_element_by_tag("head")?;
        let mut elements = Vec::new();
        self.dom.collect_elements(head, &mut elements);
        elements
            .into_iter()
            .find(|node| {
                self.dom
                    .tag_name(*node)
                    .is_some_and(|tag| tag.eq_ignore_ascii_case("style"))
            })
            .map(|node| self.dom.text_content(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_updates_document_url_and_is_recorded() {
        let mut page = Page::from_html_with_url("/start", "<div></div>").unwrap();
        page.navigate("/task/42");
        assert_eq!(page.document_url(), "/task/42");
        assert_eq!(page.take_navigations(), vec!["/task/42".to_string()]);
        assert!(page.take_navigations().is_empty());
    }

    #[test]
    fn log_limit_drops_oldest_lines() {
        let mut page = Page::from_html("<div></div>").unwrap();
        page.set_log_limit(2).unwrap();
        page.log_line("one".into());
        page.log_line("two".into());
        page.log_line("three".into());
        assert_eq!(page.take_logs(), vec!["two".to_string(), "three".to_string()]);
        assert!(page.set_log_limit(0).is_err());
    }

    #[test]
    fn inject_style_creates_head_for_fragments() {
        let mut page = Page::from_html("<div>fragment</div>").unwrap();
        page.inject_style(".x { color: red; }");
        assert!(page.head_style_text().unwrap().contains("color: red"));
    }

    #[test]
    fn by_id_reports_missing_elements() {
        let page = Page::from_html("<div id=\"known\"></div>").unwrap();
        assert!(page.by_id("known").is_ok());
        assert_eq!(
            page.by_id("unknown").unwrap_err(),
            Error::MissingElement("#unknown".to_string())
        );
    }
}
