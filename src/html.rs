//! Forgiving HTML parser for server responses.
//!
//! Server replies are full documents or fragments produced by templates, so
//! the parser recovers from malformed attributes and unbalanced tags instead
//! of rejecting them. `<script>`, `<style>`, `<title>` and `<noscript>`
//! bodies are kept as raw text; scripts are never executed, their text is
//! only scraped for markers like `const taskId = 42;`.

use std::collections::HashMap;

use crate::dom::{Dom, NodeId};
use crate::{Error, Result};

pub(crate) fn parse_html(html: &str) -> Result<Dom> {
    let mut dom = Dom::new();
    let mut open = vec![dom.root];
    let mut cur = Cursor::new(html);

    while !cur.done() {
        if cur.eat(b"<!--") {
            if !cur.skip_past(b"-->") {
                return Err(Error::HtmlParse("unclosed HTML comment".into()));
            }
            continue;
        }

        if cur.at(b"</") {
            let tag = cur.end_tag()?;
            close_open_element(&dom, &mut open, &tag);
            continue;
        }

        if cur.eat(b"<!") {
            if !cur.skip_past(b">") {
                return Err(Error::HtmlParse("unclosed declaration tag".into()));
            }
            continue;
        }

        if cur.at(b"<") {
            let start = cur.start_tag()?;
            let parent = top_of(&open)?;
            let node = dom.create_element(parent, start.name.clone(), start.attrs);

            if is_raw_text_tag(&start.name) && !start.self_closing {
                let body = cur.raw_text_until(&start.name)?;
                let text = if start.name == "title" {
                    decode_html_character_references(body)
                } else {
                    body.to_string()
                };
                if !text.is_empty() {
                    dom.create_text(node, text);
                }
                cur.end_tag()?;
                continue;
            }

            if !start.self_closing && !is_void_tag(&start.name) {
                open.push(node);
            }
            continue;
        }

        let text = cur.text_run();
        if !text.is_empty() {
            let parent = top_of(&open)?;
            let decoded = decode_html_character_references(text);
            if !decoded.is_empty() {
                dom.create_text(parent, decoded);
            }
        }
    }

    Ok(dom)
}

fn top_of(open: &[NodeId]) -> Result<NodeId> {
    open.last()
        .copied()
        .ok_or_else(|| Error::HtmlParse("missing parent element".into()))
}

/// Pops open elements until the one matching `tag` has been closed. An end
/// tag with no matching open element unwinds to the document root, which is
/// never popped.
fn close_open_element(dom: &Dom, open: &mut Vec<NodeId>, tag: &str) {
    while open.len() > 1 {
        match open.pop() {
            Some(top)
                if dom
                    .tag_name(top)
                    .is_some_and(|top_tag| top_tag.eq_ignore_ascii_case(tag)) =>
            {
                break;
            }
            Some(_) => {}
            None => break,
        }
    }
}

struct StartTag {
    name: String,
    attrs: HashMap<String, String>,
    self_closing: bool,
}

/// Byte-position scanner over the source text. Tag and attribute grammar is
/// ASCII; text runs and attribute values are sliced back out of the source
/// `str`, so multibyte content passes through untouched.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.src.as_bytes()[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.rest().first().copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at(&self, prefix: &[u8]) -> bool {
        self.rest().starts_with(prefix)
    }

    fn eat(&mut self, prefix: &[u8]) -> bool {
        if self.at(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Advances past the next occurrence of `marker`; false if there is none.
    fn skip_past(&mut self, marker: &[u8]) -> bool {
        let rest = self.rest();
        match rest
            .windows(marker.len())
            .position(|window| window == marker)
        {
            Some(offset) => {
                self.pos += offset + marker.len();
                true
            }
            None => false,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_whitespace()) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// Everything up to the next `<`.
    fn text_run(&mut self) -> &'a str {
        self.take_while(|byte| byte != b'<')
    }

    fn start_tag(&mut self) -> Result<StartTag> {
        if !self.eat(b"<") {
            return Err(Error::HtmlParse("expected '<'".into()));
        }
        self.skip_whitespace();
        let name = self.take_while(is_name_byte).to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::HtmlParse("empty tag name".into()));
        }

        let mut attrs = HashMap::new();
        loop {
            self.skip_whitespace();
            if self.eat(b">") {
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: false,
                });
            }
            if self.eat(b"/>") {
                return Ok(StartTag {
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            if self.done() {
                return Err(Error::HtmlParse("unclosed start tag".into()));
            }

            let attr_name = self.take_while(is_attr_name_byte).to_ascii_lowercase();
            if attr_name.is_empty() {
                // Recover from malformed attribute fragments by skipping the
                // whole junk token.
                self.skip_junk_token();
                continue;
            }

            self.skip_whitespace();
            let value = if self.eat(b"=") {
                self.skip_whitespace();
                self.attr_value()?
            } else {
                "true".to_string()
            };
            attrs.insert(attr_name, value);
        }
    }

    fn skip_junk_token(&mut self) {
        while let Some(byte) = self.peek() {
            if byte.is_ascii_whitespace() || byte == b'>' || self.at(b"/>") {
                break;
            }
            self.bump();
        }
    }

    fn attr_value(&mut self) -> Result<String> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                self.bump();
                let raw = self.take_while(|byte| byte != quote);
                if !self.eat(&[quote]) {
                    return Err(Error::HtmlParse("unclosed quoted attribute value".into()));
                }
                Ok(decode_html_character_references(raw))
            }
            Some(_) => {
                let start = self.pos;
                self.skip_junk_token();
                Ok(decode_html_character_references(&self.src[start..self.pos]))
            }
            None => Err(Error::HtmlParse("missing attribute value".into())),
        }
    }

    fn end_tag(&mut self) -> Result<String> {
        if !self.eat(b"</") {
            return Err(Error::HtmlParse("expected end tag".into()));
        }
        self.skip_whitespace();
        let name = self.take_while(is_name_byte).to_ascii_lowercase();
        if !self.skip_past(b">") {
            return Err(Error::HtmlParse("unclosed end tag".into()));
        }
        Ok(name)
    }

    /// Consumes raw text up to (not including) the matching case-insensitive
    /// end tag, leaving the cursor on its `<`.
    fn raw_text_until(&mut self, tag: &str) -> Result<&'a str> {
        let bytes = self.src.as_bytes();
        let start = self.pos;
        let mut i = self.pos;

        while i < bytes.len() {
            if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
                let mut j = i + 2;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                let name_end = j + tag.len();
                let name_matches = name_end <= bytes.len()
                    && bytes[j..name_end].eq_ignore_ascii_case(tag.as_bytes())
                    && bytes
                        .get(name_end)
                        .is_none_or(|byte| !byte.is_ascii_alphanumeric());
                if name_matches {
                    self.pos = i;
                    return Ok(&self.src[start..i]);
                }
            }
            i += 1;
        }

        Err(Error::HtmlParse(format!("unclosed <{tag}>")))
    }
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_'
}

fn is_attr_name_byte(byte: u8) -> bool {
    is_name_byte(byte) || byte == b':'
}

// Tag names arrive lowercased from the cursor.
fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "title" | "noscript")
}

const VOID_TAGS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

fn decode_html_character_references(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }

    fn decode_numeric(value: &str) -> Option<char> {
        let codepoint =
            if let Some(hex) = value.strip_prefix('x').or_else(|| value.strip_prefix('X')) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                value.parse::<u32>().ok()?
            };
        char::from_u32(codepoint)
    }

    fn decode_named(value: &str) -> Option<char> {
        match value {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            "copy" => Some('©'),
            "reg" => Some('®'),
            "laquo" => Some('«'),
            "raquo" => Some('»'),
            "hellip" => Some('…'),
            "mdash" => Some('—'),
            "ndash" => Some('–'),
            _ => None,
        }
    }

    let mut out = String::with_capacity(src.len());
    let mut i = 0usize;

    while i < src.len() {
        let ch = src[i..].chars().next().unwrap_or_default();
        if ch != '&' {
            out.push(ch);
            i += ch.len_utf8();
            continue;
        }

        let tail = &src[i + 1..];
        let entity_end = tail
            .char_indices()
            .find_map(|(idx, ch)| {
                if ch.is_ascii_alphanumeric() || ch == '#' {
                    None
                } else {
                    Some(idx)
                }
            })
            .unwrap_or(tail.len());
        let terminated = tail[entity_end..].starts_with(';');

        let raw = &tail[..entity_end];
        let decoded = if raw.is_empty() {
            None
        } else if let Some(rest) = raw.strip_prefix('#') {
            decode_numeric(rest)
        } else {
            decode_named(raw)
        };

        match decoded {
            Some(value) => {
                out.push(value);
                i += entity_end + 1 + usize::from(terminated);
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }

    out
}
