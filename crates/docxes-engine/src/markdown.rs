//! Default Markdown collaborators built on `pulldown-cmark`.
//!
//! - [`MarkdownParser`]: YAML frontmatter between `---` lines, block outline AST
//! - [`MarkdownCompiler`]: HTML output with heading anchors
//! - [`MarkdownToc`]: heading list with the same anchor ids
//!
//! [`plain_text`] derives the markup-free text used for search and for
//! deciding whether a document is clickable.

use std::sync::LazyLock;

use async_trait::async_trait;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser as CmarkParser, Tag, TagEnd};
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::pipeline::{
    CollaboratorError, CompileOptions, Compiler, Frontmatter, Heading, ParsedDocument, Parser,
    TocExtractor,
};

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ID_STRIP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn cmark_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM
}

/// Anchor id for a heading: lowercase, punctuation dropped, whitespace runs
/// replaced by `-`.
#[must_use]
pub fn heading_id(title: &str) -> String {
    let lowered = title.to_lowercase();
    let stripped = ID_STRIP.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, "-").into_owned()
}

/// Markup-free text of `content` with whitespace collapsed to single spaces.
///
/// HTML and JSX tags are removed but the text between them is kept.
#[must_use]
pub fn plain_text(content: &str) -> String {
    let mut out = String::new();
    for event in CmarkParser::new_ext(content, cmark_options()) {
        match event {
            Event::Text(text) | Event::Code(text) => out.push_str(&text),
            Event::Html(html) | Event::InlineHtml(html) => {
                out.push_str(&HTML_TAG.replace_all(&html, " "));
            }
            Event::SoftBreak | Event::HardBreak => out.push(' '),
            Event::End(tag) if is_block_end(tag) => out.push(' '),
            _ => {}
        }
    }
    WHITESPACE.replace_all(out.trim(), " ").into_owned()
}

fn is_block_end(tag: TagEnd) -> bool {
    matches!(
        tag,
        TagEnd::Paragraph
            | TagEnd::Heading(_)
            | TagEnd::BlockQuote(_)
            | TagEnd::CodeBlock
            | TagEnd::HtmlBlock
            | TagEnd::List(_)
            | TagEnd::Item
            | TagEnd::TableHead
            | TagEnd::TableRow
            | TagEnd::TableCell
            | TagEnd::FootnoteDefinition
    )
}

/// Split `---`-delimited frontmatter from the body.
///
/// Returns `(yaml, body)`; `None` when the source has no complete block.
fn split_frontmatter(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let (first, rest) = source.split_once('\n')?;
    if first.trim_end() != "---" {
        return None;
    }

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Frontmatter + Markdown parser.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    fn frontmatter(yaml: &str) -> Result<Frontmatter, CollaboratorError> {
        if yaml.trim().is_empty() {
            return Ok(Frontmatter::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| {
            let err = CollaboratorError::new(format!("invalid frontmatter: {e}"));
            match e.location() {
                // The block starts on line 2, after the opening `---`.
                Some(loc) => err.at(loc.line() + 1, loc.column()),
                None => err,
            }
        })
    }
}

#[async_trait]
impl Parser for MarkdownParser {
    async fn parse(&self, source: &str) -> Result<ParsedDocument, CollaboratorError> {
        let (frontmatter, content) = match split_frontmatter(source) {
            Some((yaml, body)) => (Self::frontmatter(yaml)?, body),
            None => (Frontmatter::default(), source),
        };

        Ok(ParsedDocument {
            content: content.to_owned(),
            frontmatter,
            ast: outline(content),
        })
    }
}

struct Node {
    attrs: Map<String, Value>,
    children: Vec<Value>,
}

impl Node {
    fn new(attrs: Value) -> Self {
        let attrs = match attrs {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            attrs,
            children: Vec::new(),
        }
    }

    fn into_value(self) -> Value {
        let mut attrs = self.attrs;
        if !self.children.is_empty() {
            attrs.insert("children".to_owned(), Value::Array(self.children));
        }
        Value::Object(attrs)
    }
}

fn tag_node(tag: &Tag<'_>) -> Value {
    match tag {
        Tag::Paragraph => json!({"type": "paragraph"}),
        Tag::Heading { level, .. } => json!({"type": "heading", "depth": *level as u8}),
        Tag::BlockQuote(_) => json!({"type": "blockquote"}),
        Tag::CodeBlock(CodeBlockKind::Fenced(lang)) if !lang.is_empty() => {
            json!({"type": "code", "lang": lang.as_ref()})
        }
        Tag::CodeBlock(_) => json!({"type": "code"}),
        Tag::HtmlBlock => json!({"type": "html"}),
        Tag::List(start) => json!({"type": "list", "ordered": start.is_some()}),
        Tag::Item => json!({"type": "listItem"}),
        Tag::Table(_) => json!({"type": "table"}),
        Tag::TableHead | Tag::TableRow => json!({"type": "tableRow"}),
        Tag::TableCell => json!({"type": "tableCell"}),
        Tag::Emphasis => json!({"type": "emphasis"}),
        Tag::Strong => json!({"type": "strong"}),
        Tag::Strikethrough => json!({"type": "delete"}),
        Tag::Link { dest_url, .. } => json!({"type": "link", "url": dest_url.as_ref()}),
        Tag::Image { dest_url, .. } => json!({"type": "image", "url": dest_url.as_ref()}),
        Tag::FootnoteDefinition(label) => {
            json!({"type": "footnoteDefinition", "label": label.as_ref()})
        }
        _ => json!({"type": "node"}),
    }
}

/// Nested JSON outline of the Markdown event stream.
fn outline(content: &str) -> Value {
    let mut stack = vec![Node::new(json!({"type": "root"}))];

    for event in CmarkParser::new_ext(content, cmark_options()) {
        let leaf = match event {
            Event::Start(tag) => {
                stack.push(Node::new(tag_node(&tag)));
                continue;
            }
            Event::End(_) => {
                if stack.len() > 1
                    && let Some(node) = stack.pop()
                {
                    node.into_value()
                } else {
                    continue;
                }
            }
            Event::Text(text) => json!({"type": "text", "value": text.as_ref()}),
            Event::Code(code) => json!({"type": "inlineCode", "value": code.as_ref()}),
            Event::Html(html) | Event::InlineHtml(html) => {
                json!({"type": "html", "value": html.as_ref()})
            }
            Event::SoftBreak | Event::HardBreak => json!({"type": "break"}),
            Event::Rule => json!({"type": "thematicBreak"}),
            _ => continue,
        };
        if let Some(parent) = stack.last_mut() {
            parent.children.push(leaf);
        }
    }

    // Unbalanced streams fold back into the root.
    while stack.len() > 1 {
        if let Some(node) = stack.pop()
            && let Some(parent) = stack.last_mut()
        {
            parent.children.push(node.into_value());
        }
    }
    stack.pop().map_or(Value::Null, Node::into_value)
}

/// Concatenated text of a heading, starting right after its `Start` event.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut title = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(text) | Event::Code(text) => title.push_str(text),
            _ => {}
        }
    }
    title
}

/// HTML compiler.
///
/// Headings without an explicit id get one from [`heading_id`], matching the
/// ids reported by [`MarkdownToc`]. Highlighting options are accepted but the
/// output is plain `<pre><code>` blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownCompiler;

#[async_trait]
impl Compiler for MarkdownCompiler {
    async fn compile(
        &self,
        content: &str,
        _options: &CompileOptions,
    ) -> Result<String, CollaboratorError> {
        let mut events: Vec<Event<'_>> = CmarkParser::new_ext(content, cmark_options()).collect();

        for i in 0..events.len() {
            if !matches!(events[i], Event::Start(Tag::Heading { id: None, .. })) {
                continue;
            }
            let anchor = heading_id(&heading_text(&events[i + 1..]));
            if !anchor.is_empty()
                && let Event::Start(Tag::Heading { id, .. }) = &mut events[i]
            {
                *id = Some(CowStr::from(anchor));
            }
        }

        let mut html = String::with_capacity(content.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        Ok(html)
    }
}

/// Heading extractor.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownToc;

impl TocExtractor for MarkdownToc {
    fn extract_headings(&self, content: &str) -> Vec<Heading> {
        let mut headings = Vec::new();
        let mut current: Option<(u8, String)> = None;

        for event in CmarkParser::new_ext(content, cmark_options()) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => {
                    current = Some((level as u8, String::new()));
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some((_, title)) = current.as_mut() {
                        title.push_str(&text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some((depth, title)) = current.take() {
                        headings.push(Heading {
                            id: heading_id(&title),
                            title,
                            depth,
                        });
                    }
                }
                _ => {}
            }
        }
        headings
    }
}
