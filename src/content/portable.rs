//! Rich-content body rendering
//!
//! Post bodies are stored as a list of typed blocks (Portable Text). Each
//! block carries a style, optional list membership, and a list of spans
//! whose marks point either at a decorator (`strong`, `em`, ...) or at an
//! annotation in the block's `markDefs` (links).

use serde::Deserialize;

use super::post::null_default;
use super::ImageRef;
use crate::helpers::{html_escape, ImageUrls};

/// One node of the rich-content body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Block {
    #[serde(rename = "_type", default, deserialize_with = "null_default")]
    pub kind: String,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(rename = "listItem", default)]
    pub list_item: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub children: Vec<Span>,
    #[serde(rename = "markDefs", default, deserialize_with = "null_default")]
    pub mark_defs: Vec<MarkDef>,
    /// Set on image blocks
    #[serde(default)]
    pub asset: Option<super::Reference>,
    #[serde(default)]
    pub alt: Option<String>,
}

/// Inline run of text with marks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Span {
    #[serde(default, deserialize_with = "null_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_default")]
    pub marks: Vec<String>,
}

/// Annotation referenced by a span mark
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key", default, deserialize_with = "null_default")]
    pub key: String,
    #[serde(rename = "_type", default, deserialize_with = "null_default")]
    pub kind: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    fn from_item(item: &str) -> Self {
        match item {
            "number" => Self::Number,
            _ => Self::Bullet,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Bullet => "ul",
            Self::Number => "ol",
        }
    }
}

/// Render a body to HTML. Never fails: unknown nodes degrade to paragraphs
/// of their text, or are skipped when they have none.
pub fn to_html(blocks: &[Block], images: &ImageUrls) -> String {
    let mut html = String::new();
    let mut open_list: Option<ListKind> = None;

    for block in blocks {
        let list = block.list_item.as_deref().map(ListKind::from_item);

        if open_list.is_some() && open_list != list {
            if let Some(kind) = open_list.take() {
                html.push_str(&format!("</{}>\n", kind.tag()));
            }
        }

        if let Some(kind) = list {
            if open_list.is_none() {
                html.push_str(&format!("<{}>\n", kind.tag()));
                open_list = Some(kind);
            }
            html.push_str(&format!(
                "<li class=\"ml-4 list-disc\">{}</li>\n",
                render_spans(block)
            ));
            continue;
        }

        match block.kind.as_str() {
            "image" => {
                let image = ImageRef {
                    asset: block.asset.clone(),
                };
                if let Some(src) = images.url_for(&image) {
                    html.push_str(&format!(
                        "<img src=\"{}\" alt=\"{}\">\n",
                        html_escape(&src),
                        html_escape(block.alt.as_deref().unwrap_or(""))
                    ));
                }
            }
            _ if block.children.is_empty() => {}
            _ => html.push_str(&render_block(block)),
        }
    }

    if let Some(kind) = open_list {
        html.push_str(&format!("</{}>\n", kind.tag()));
    }

    html
}

fn render_block(block: &Block) -> String {
    let inner = render_spans(block);
    match block.style.as_deref().unwrap_or("normal") {
        "h1" => format!("<h1 class=\"my-5 text-2xl font-bold\">{}</h1>\n", inner),
        "h2" => format!("<h2 class=\"my-5 text-xl font-bold\">{}</h2>\n", inner),
        "h3" => format!("<h3>{}</h3>\n", inner),
        "h4" => format!("<h4>{}</h4>\n", inner),
        "blockquote" => format!("<blockquote>{}</blockquote>\n", inner),
        _ => format!("<p>{}</p>\n", inner),
    }
}

fn render_spans(block: &Block) -> String {
    let mut out = String::new();
    for span in &block.children {
        let mut open = String::new();
        let mut close: Vec<String> = Vec::new();

        for mark in &span.marks {
            let tags = match mark.as_str() {
                "strong" => Some(("<strong>".to_string(), "</strong>".to_string())),
                "em" => Some(("<em>".to_string(), "</em>".to_string())),
                "code" => Some(("<code>".to_string(), "</code>".to_string())),
                "underline" => Some(("<u>".to_string(), "</u>".to_string())),
                "strike-through" => Some(("<s>".to_string(), "</s>".to_string())),
                key => link_for(block, key).map(|href| {
                    (
                        format!(
                            "<a href=\"{}\" class=\"text-blue-500 hover:underline\">",
                            html_escape(href)
                        ),
                        "</a>".to_string(),
                    )
                }),
            };
            if let Some((start, end)) = tags {
                open.push_str(&start);
                close.push(end);
            }
        }

        out.push_str(&open);
        out.push_str(&html_escape(&span.text).replace('\n', "<br>"));
        for end in close.iter().rev() {
            out.push_str(end);
        }
    }
    out
}

fn link_for<'a>(block: &'a Block, key: &str) -> Option<&'a str> {
    block
        .mark_defs
        .iter()
        .find(|def| def.key == key && def.kind == "link")
        .and_then(|def| def.href.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn images() -> ImageUrls {
        ImageUrls::new("proj", "production")
    }

    fn blocks(value: serde_json::Value) -> Vec<Block> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let body = blocks(json!([
            { "_type": "block", "style": "h1", "children": [{ "text": "Title" }] },
            { "_type": "block", "style": "h2", "children": [{ "text": "Sub" }] },
            { "_type": "block", "style": "normal", "children": [{ "text": "Body" }] }
        ]));
        let html = to_html(&body, &images());
        assert!(html.contains("<h1 class=\"my-5 text-2xl font-bold\">Title</h1>"));
        assert!(html.contains("<h2 class=\"my-5 text-xl font-bold\">Sub</h2>"));
        assert!(html.contains("<p>Body</p>"));
    }

    #[test]
    fn test_list_items_are_grouped() {
        let body = blocks(json!([
            { "_type": "block", "listItem": "bullet", "children": [{ "text": "a" }] },
            { "_type": "block", "listItem": "bullet", "children": [{ "text": "b" }] },
            { "_type": "block", "listItem": "number", "children": [{ "text": "one" }] },
            { "_type": "block", "children": [{ "text": "after" }] }
        ]));
        let html = to_html(&body, &images());
        assert_eq!(html.matches("<ul>").count(), 1);
        assert_eq!(html.matches("<ol>").count(), 1);
        assert!(html.contains("<li class=\"ml-4 list-disc\">a</li>"));
        assert!(html.find("</ol>").unwrap() < html.find("<p>after</p>").unwrap());
    }

    #[test]
    fn test_marks_and_links() {
        let body = blocks(json!([{
            "_type": "block",
            "markDefs": [{ "_key": "k1", "_type": "link", "href": "https://example.com" }],
            "children": [
                { "text": "bold", "marks": ["strong"] },
                { "text": " " },
                { "text": "site", "marks": ["k1", "em"] }
            ]
        }]));
        let html = to_html(&body, &images());
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains(
            "<a href=\"https://example.com\" class=\"text-blue-500 hover:underline\"><em>site</em></a>"
        ));
    }

    #[test]
    fn test_text_is_escaped() {
        let body = blocks(json!([
            { "_type": "block", "children": [{ "text": "<script>alert(1)</script>" }] }
        ]));
        let html = to_html(&body, &images());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unknown_nodes_do_not_fail() {
        let body = blocks(json!([
            { "_type": "youtube", "url": "https://youtu.be/x" },
            { "_type": "callout", "style": "fancy", "children": [{ "text": "note" }] },
            { "_type": "image", "asset": { "_ref": "image-abc-10x20-png" }, "alt": "pic" }
        ]));
        let html = to_html(&body, &images());
        assert!(html.contains("<p>note</p>"));
        assert!(html.contains("https://cdn.sanity.io/images/proj/production/abc-10x20.png"));
        assert!(!html.contains("youtu"));
    }
}
