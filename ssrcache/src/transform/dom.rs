//! Lenient HTML tree: parser and serializer.
//!
//! Rendered pages come from a real browser, so the markup is well formed in
//! practice. The parser only needs to be lossless on that input and tolerant
//! of stray end tags; it does not implement the full HTML5 tree builder.
//! Text and attribute values are kept exactly as written (entities are not
//! decoded) so a parse/serialize cycle does not alter content.
//!
//! Nesting depth is bounded only by memory: parsing, serializing, text
//! collection and drop all walk the tree with an explicit stack.

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements whose whitespace is significant.
const PREFORMATTED_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Containers where whitespace-only text between children carries no meaning.
const BLOCK_CONTAINERS: &[&str] = &[
    "html", "head", "body", "div", "section", "article", "aside", "nav", "header", "footer",
    "main", "ul", "ol", "dl", "table", "thead", "tbody", "tfoot", "tr", "select", "form",
    "fieldset", "figure",
];

/// Attributes that are meaningful by presence alone.
const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "controls", "default",
    "defer", "disabled", "formnovalidate", "hidden", "ismap", "loop", "multiple", "muted",
    "nomodule", "novalidate", "open", "readonly", "required", "reversed", "selected",
];

/// Attributes dropped by the minifier when their value is empty.
const DROPPABLE_WHEN_EMPTY: &[&str] = &["class", "id", "style", "title", "lang", "dir"];

/// Elements the minifier keeps even when empty.
const KEEP_WHEN_EMPTY: &[&str] = &[
    "html", "head", "body", "script", "style", "textarea", "td", "th", "iframe", "canvas",
    "video", "audio", "object", "option",
];

/// One attribute. `value` is `None` for bare attributes like `disabled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// An element and its subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    /// Value of `name`; bare attributes read as the empty string.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    /// Sets `name`, replacing an existing value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = Some(value),
            None => self.attrs.push(Attribute::new(name, value)),
        }
    }

    /// Sets `name` as the first attribute, replacing an existing value.
    pub fn prepend_attr(&mut self, name: &str, value: impl Into<String>) {
        self.remove_attr(name);
        self.attrs.insert(0, Attribute::new(name, value));
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|a| a.name != name);
    }

    /// Concatenated text of all descendants, without markup or comments.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    let mut pending = vec![nodes.iter()];
    while let Some(level) = pending.last_mut() {
        match level.next() {
            Some(Node::Text(text)) => out.push_str(text),
            Some(Node::Element(el)) => pending.push(el.children.iter()),
            Some(Node::Comment(_) | Node::Doctype(_)) => {}
            None => {
                pending.pop();
            }
        }
    }
}

impl Drop for Element {
    fn drop(&mut self) {
        // Flatten the subtree so dropping a deep chain does not recurse.
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Element(mut el) = node {
                pending.append(&mut el.children);
            }
        }
    }
}

/// A node in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    /// Declaration body, e.g. `DOCTYPE html`.
    Doctype(String),
}

/// Parses `html` into a list of top-level nodes.
pub fn parse(html: &str) -> Vec<Node> {
    Parser::new(html).run()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Open elements; index 0 is the synthetic document root.
    stack: Vec<Element>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            stack: vec![Element::new("#document")],
        }
    }

    fn run(mut self) -> Vec<Node> {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if rest.starts_with("<!--") {
                self.comment();
            } else if rest.starts_with("</") && starts_tag_name(&rest[2..]) {
                self.end_tag();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.declaration();
            } else if rest.starts_with('<') && starts_tag_name(&rest[1..]) {
                self.start_tag();
            } else {
                self.text();
            }
        }

        while self.stack.len() > 1 {
            self.close_top();
        }
        self.stack
            .pop()
            .map(|mut root| std::mem::take(&mut root.children))
            .unwrap_or_default()
    }

    fn push_node(&mut self, node: Node) {
        if let Some(top) = self.stack.last_mut() {
            top.children.push(node);
        }
    }

    fn close_top(&mut self) {
        if let Some(el) = self.stack.pop() {
            self.push_node(Node::Element(el));
        }
    }

    fn text(&mut self) {
        let rest = &self.src[self.pos..];
        // Skip the first char so a lone '<' is consumed as text.
        let first = rest.chars().next().map_or(1, char::len_utf8);
        let end = rest[first..]
            .find('<')
            .map(|i| i + first)
            .unwrap_or(rest.len());
        self.push_node(Node::Text(rest[..end].to_string()));
        self.pos += end;
    }

    fn comment(&mut self) {
        let body_start = self.pos + 4;
        let (body, next) = match self.src[body_start..].find("-->") {
            Some(i) => (&self.src[body_start..body_start + i], body_start + i + 3),
            None => (&self.src[body_start..], self.src.len()),
        };
        self.push_node(Node::Comment(body.to_string()));
        self.pos = next;
    }

    fn declaration(&mut self) {
        let body_start = self.pos + 2;
        let (body, next) = match self.src[body_start..].find('>') {
            Some(i) => (&self.src[body_start..body_start + i], body_start + i + 1),
            None => (&self.src[body_start..], self.src.len()),
        };
        self.push_node(Node::Doctype(body.trim().to_string()));
        self.pos = next;
    }

    fn end_tag(&mut self) {
        let name_start = self.pos + 2;
        let close = self.src[name_start..]
            .find('>')
            .map(|i| name_start + i)
            .unwrap_or(self.src.len());
        let name = self.src[name_start..close]
            .trim()
            .to_ascii_lowercase();
        self.pos = (close + 1).min(self.src.len());

        // Stray end tags with no open match are dropped.
        if let Some(depth) = self.stack.iter().rposition(|el| el.name == name) {
            if depth == 0 {
                return;
            }
            while self.stack.len() > depth {
                self.close_top();
            }
        }
    }

    fn start_tag(&mut self) {
        let bytes = self.src.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let mut el = Element::new(self.src[self.pos + 1..i].to_ascii_lowercase());

        let mut self_closing = false;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            match bytes[i] {
                b'>' => {
                    i += 1;
                    break;
                }
                b'/' => {
                    i += 1;
                    if bytes.get(i) == Some(&b'>') {
                        self_closing = true;
                        i += 1;
                        break;
                    }
                }
                _ => {
                    let (attr, next) = parse_attribute(self.src, i);
                    i = next;
                    if let Some(attr) = attr {
                        if !el.has_attr(&attr.name) {
                            el.attrs.push(attr);
                        }
                    }
                }
            }
        }
        self.pos = i;

        if el.is_void() || self_closing {
            self.push_node(Node::Element(el));
        } else if RAW_TEXT_ELEMENTS.contains(&el.name.as_str()) {
            self.raw_text(el);
        } else {
            self.stack.push(el);
        }
    }

    fn raw_text(&mut self, mut el: Element) {
        let rest = &self.src[self.pos..];
        let needle = format!("</{}", el.name);
        let end = find_ascii_case_insensitive(rest, &needle).unwrap_or(rest.len());
        if end > 0 {
            el.children.push(Node::Text(rest[..end].to_string()));
        }
        self.pos += end;
        if self.pos < self.src.len() {
            let close = self.src[self.pos..]
                .find('>')
                .map(|i| self.pos + i + 1)
                .unwrap_or(self.src.len());
            self.pos = close;
        }
        self.push_node(Node::Element(el));
    }
}

fn starts_tag_name(s: &str) -> bool {
    s.as_bytes().first().is_some_and(|b| b.is_ascii_alphabetic())
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

/// Parses one attribute starting at `i`. Returns the attribute (if any) and
/// the position after it.
fn parse_attribute(src: &str, mut i: usize) -> (Option<Attribute>, usize) {
    let bytes = src.as_bytes();
    let name_start = i;
    while i < bytes.len()
        && !bytes[i].is_ascii_whitespace()
        && !matches!(bytes[i], b'=' | b'>' | b'/')
    {
        i += 1;
    }
    if i == name_start {
        // Unparseable byte; skip it.
        return (None, i + 1);
    }
    let name = src[name_start..i].to_ascii_lowercase();

    let mut j = i;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    if bytes.get(j) != Some(&b'=') {
        return (Some(Attribute { name, value: None }), i);
    }
    j += 1;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }

    let (value, next) = match bytes.get(j) {
        Some(&q @ (b'"' | b'\'')) => {
            let start = j + 1;
            match src[start..].find(q as char) {
                Some(len) => (&src[start..start + len], start + len + 1),
                None => (&src[start..], src.len()),
            }
        }
        _ => {
            let start = j;
            let mut k = j;
            while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                k += 1;
            }
            (&src[start..k], k)
        }
    };

    (
        Some(Attribute {
            name,
            value: Some(value.to_string()),
        }),
        next,
    )
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}

/// Serializer settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Collapse whitespace, drop comments, collapse boolean attributes,
    /// drop empty attributes and empty elements, unquote safe values, and
    /// shorten the doctype.
    pub minify: bool,
}

/// Serializes nodes back to markup.
pub fn serialize(nodes: &[Node], options: SerializeOptions) -> String {
    let mut out = String::new();
    let mut stack = vec![Level {
        nodes: nodes.iter(),
        block_parent: true,
        preformatted: false,
        close: None,
    }];

    while let Some(level) = stack.last_mut() {
        let Some(node) = level.nodes.next() else {
            let close = level.close;
            stack.pop();
            if let Some(name) = close {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            continue;
        };
        let (block_parent, preformatted) = (level.block_parent, level.preformatted);

        match node {
            Node::Element(el) => {
                if options.minify && is_removable_empty(el) {
                    continue;
                }
                write_start_tag(el, options, &mut out);
                if !el.is_void() {
                    let name = el.name.as_str();
                    stack.push(Level {
                        nodes: el.children.iter(),
                        block_parent: BLOCK_CONTAINERS.contains(&name),
                        preformatted: preformatted || PREFORMATTED_ELEMENTS.contains(&name),
                        close: Some(name),
                    });
                }
            }
            leaf => write_leaf(leaf, block_parent, preformatted, options, &mut out),
        }
    }
    out
}

/// Children of one open element during serialization.
struct Level<'a> {
    nodes: std::slice::Iter<'a, Node>,
    block_parent: bool,
    preformatted: bool,
    /// End tag written once `nodes` is exhausted.
    close: Option<&'a str>,
}

fn write_leaf(
    node: &Node,
    block_parent: bool,
    preformatted: bool,
    options: SerializeOptions,
    out: &mut String,
) {
    match node {
        Node::Text(text) if options.minify && !preformatted => {
            if text.trim().is_empty() {
                if !block_parent {
                    out.push(' ');
                }
            } else {
                push_collapsed(text, out);
            }
        }
        Node::Text(text) => out.push_str(text),
        Node::Comment(_) if options.minify => {}
        Node::Comment(body) => {
            out.push_str("<!--");
            out.push_str(body);
            out.push_str("-->");
        }
        Node::Doctype(body) => {
            if options.minify && body.to_ascii_lowercase().starts_with("doctype") {
                out.push_str("<!doctype html>");
            } else {
                out.push_str("<!");
                out.push_str(body);
                out.push('>');
            }
        }
        Node::Element(_) => {}
    }
}

fn write_start_tag(el: &Element, options: SerializeOptions, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attrs {
        write_attribute(attr, options, out);
    }
    out.push('>');
}

fn write_attribute(attr: &Attribute, options: SerializeOptions, out: &mut String) {
    let is_boolean = BOOLEAN_ATTRIBUTES.contains(&attr.name.as_str());
    match attr.value.as_deref() {
        Some("") if options.minify && DROPPABLE_WHEN_EMPTY.contains(&attr.name.as_str()) => {}
        Some(_) if options.minify && is_boolean => {
            out.push(' ');
            out.push_str(&attr.name);
        }
        None => {
            out.push(' ');
            out.push_str(&attr.name);
        }
        Some(value) => {
            out.push(' ');
            out.push_str(&attr.name);
            out.push('=');
            if options.minify && can_unquote(value) {
                out.push_str(value);
            } else if value.contains('"') {
                out.push('\'');
                out.push_str(value);
                out.push('\'');
            } else {
                out.push('"');
                out.push_str(value);
                out.push('"');
            }
        }
    }
}

fn can_unquote(value: &str) -> bool {
    !value.is_empty()
        && !value
            .bytes()
            .any(|b| b.is_ascii_whitespace() || matches!(b, b'"' | b'\'' | b'=' | b'<' | b'>' | b'`'))
}

fn is_removable_empty(el: &Element) -> bool {
    !el.is_void()
        && el.attrs.is_empty()
        && !KEEP_WHEN_EMPTY.contains(&el.name.as_str())
        && el.children.iter().all(|child| match child {
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment(_) => true,
            Node::Element(_) | Node::Doctype(_) => false,
        })
}

fn push_collapsed(text: &str, out: &mut String) {
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
                in_space = true;
            }
        } else {
            out.push(ch);
            in_space = false;
        }
    }
}
