use std::collections::HashMap;

/// Handle into the arena. Stable for the lifetime of the [`Dom`]; nodes are
/// never removed, only appended or rewritten in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    /// `None` until the control's value is first assigned; reads then fall
    /// back to the markup default.
    pub(crate) value: Option<String>,
    pub(crate) disabled: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let disabled = attrs.contains_key("disabled");
        let element_id = attrs.get("id").cloned();
        let node = self.create_node(
            Some(parent),
            NodeType::Element(Element {
                tag_name,
                attrs,
                value: None,
                disabled,
            }),
        );
        if let Some(element_id) = element_id {
            // First occurrence wins, matching getElementById.
            self.id_index.entry(element_id).or_insert(node);
        }
        node
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes[node.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[node.0].node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag_name.as_str())
    }

    pub(crate) fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)
            .and_then(|element| element.attrs.get(name).cloned())
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    /// Current control value. Unassigned controls report their markup
    /// default: the `value` attribute, or the rendered text content for a
    /// `<textarea>`.
    pub(crate) fn value(&self, node: NodeId) -> String {
        let Some(element) = self.element(node) else {
            return String::new();
        };
        if let Some(value) = &element.value {
            return value.clone();
        }
        if element.tag_name == "textarea" {
            return self.text_content(node);
        }
        element.attrs.get("value").cloned().unwrap_or_default()
    }

    pub(crate) fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(element) = self.element_mut(node) {
            element.value = Some(value.to_string());
        }
    }

    pub(crate) fn disabled(&self, node: NodeId) -> bool {
        self.element(node)
            .map(|element| element.disabled)
            .unwrap_or(false)
    }

    pub(crate) fn set_disabled(&mut self, node: NodeId, disabled: bool) {
        if let Some(element) = self.element_mut(node) {
            element.disabled = disabled;
        }
    }

    pub(crate) fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.element(node)
            .and_then(|element| element.attrs.get("class"))
            .map(|classes| classes.split_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }

    /// Concatenated text of all descendant text nodes, document order.
    pub(crate) fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        if let NodeType::Text(text) = &self.nodes[node.0].node_type {
            out.push_str(text);
        }
        for child in &self.nodes[node.0].children {
            self.collect_text(*child, out);
        }
    }

    /// Replaces the node's children with a single text node.
    pub(crate) fn set_text(&mut self, node: NodeId, text: &str) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.create_text(node, text.to_string());
    }

    /// Document-order DFS over element nodes under `from` (exclusive).
    pub(crate) fn collect_elements(&self, from: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[from.0].children {
            if self.element(*child).is_some() {
                out.push(*child);
            }
            self.collect_elements(*child, out);
        }
    }

    pub(crate) fn elements_with_class(&self, class_name: &str) -> Vec<NodeId> {
        let mut elements = Vec::new();
        self.collect_elements(self.root, &mut elements);
        elements
            .into_iter()
            .filter(|node| self.has_class(*node, class_name))
            .collect()
    }

    pub(crate) fn descendant_with_class(&self, from: NodeId, class_name: &str) -> Option<NodeId> {
        let mut elements = Vec::new();
        self.collect_elements(from, &mut elements);
        elements
            .into_iter()
            .find(|node| self.has_class(*node, class_name))
    }

    pub(crate) fn find_ancestor_by_tag(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if self
                .tag_name(current)
                .is_some_and(|current_tag| current_tag.eq_ignore_ascii_case(tag))
            {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        let mut elements = Vec::new();
        self.collect_elements(self.root, &mut elements);
        elements.into_iter().find(|node| {
            self.tag_name(*node)
                .is_some_and(|current_tag| current_tag.eq_ignore_ascii_case(tag))
        })
    }

    /// Value of the named descendant control, mirroring
    /// `form.querySelector('input[name=...]').value`.
    pub(crate) fn named_control_value(&self, form: NodeId, name: &str) -> Option<String> {
        let mut elements = Vec::new();
        self.collect_elements(form, &mut elements);
        elements
            .into_iter()
            .find(|node| self.attr(*node, "name").as_deref() == Some(name))
            .map(|node| self.value(node))
    }
}

#[cfg(test)]
mod tests {
    use crate::html::parse_html;

    #[test]
    fn id_index_prefers_first_occurrence() {
        let dom = parse_html(r#"<div id="x">first</div><div id="x">second</div>"#).unwrap();
        let node = dom.by_id("x").unwrap();
        assert_eq!(dom.text_content(node), "first");
    }

    #[test]
    fn class_matching_splits_on_whitespace() {
        let dom = parse_html(r#"<div class="alert alert-danger">boom</div>"#).unwrap();
        assert_eq!(dom.elements_with_class("alert").len(), 1);
        assert_eq!(dom.elements_with_class("alert-danger").len(), 1);
        assert!(dom.elements_with_class("alert-dange").is_empty());
    }

    #[test]
    fn named_control_value_scans_form_subtree() {
        let dom = parse_html(
            r#"<form><div><input type="hidden" name="mode" value="fast"></div></form>"#,
        )
        .unwrap();
        let form = dom.first_element_by_tag("form").unwrap();
        assert_eq!(dom.named_control_value(form, "mode").as_deref(), Some("fast"));
        assert_eq!(dom.named_control_value(form, "missing"), None);
    }

    #[test]
    fn textarea_value_defaults_to_rendered_text() {
        let mut dom =
            parse_html(r#"<textarea id="t">server text</textarea><input id="i" value="v">"#)
                .unwrap();
        let textarea = dom.by_id("t").unwrap();
        let input = dom.by_id("i").unwrap();
        assert_eq!(dom.value(textarea), "server text");
        assert_eq!(dom.value(input), "v");
        dom.set_value(textarea, "");
        assert_eq!(dom.value(textarea), "");
    }

    #[test]
    fn set_text_replaces_children() {
        let mut dom = parse_html(r#"<button id="b"><i class="icon"></i>Analyze</button>"#).unwrap();
        let button = dom.by_id("b").unwrap();
        assert_eq!(dom.text_content(button), "Analyze");
        dom.set_text(button, "Uploading...");
        assert_eq!(dom.text_content(button), "Uploading...");
    }
}
