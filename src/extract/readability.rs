//! Main-content extraction built on `scraper`

use crate::extract::{ContentExtractor, ExtractOptions, Extraction};
use crate::CrawlResult;
use scraper::{ElementRef, Html, Node, Selector};

/// Containers tried in order when looking for the main content
const CONTENT_ROOTS: &[&str] = &["main", "article", "[role='main']", "body"];

/// Elements whose text never belongs to the main content
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "svg",
    "iframe", "form", "button",
];

/// Elements that start a new text block
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "main", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul",
    "ol", "pre", "blockquote", "table", "tr", "td", "th", "dl", "dt", "dd", "figure",
    "figcaption", "br", "hr",
];

/// Extracts a page's title and main text
///
/// The title comes from `<title>`, falling back to the first `<h1>`. The text
/// comes from the first of `main`, `article`, `[role=main]` or `body`, with
/// navigation and page chrome removed, whitespace collapsed and blocks joined
/// by blank lines.
#[derive(Debug, Clone, Default)]
pub struct ReadabilityExtractor;

impl ReadabilityExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract(&self, html: &str, _url: &str, options: &ExtractOptions) -> CrawlResult<Extraction> {
        let document = Html::parse_document(html);

        let title = extract_title(&document);
        let text = find_content_root(&document)
            .map(collect_text)
            .unwrap_or_default();

        Ok(Extraction {
            success: text.chars().count() >= options.min_text_length,
            text,
            title,
        })
    }
}

/// Extracts the page title, falling back to the first `<h1>`
fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    })
}

fn find_content_root(document: &Html) -> Option<ElementRef<'_>> {
    CONTENT_ROOTS.iter().find_map(|css| {
        let selector = Selector::parse(css).ok()?;
        document.select(&selector).next()
    })
}

/// Collects the visible text under `root` as blank-line separated blocks
fn collect_text(root: ElementRef<'_>) -> String {
    let mut blocks = Vec::new();
    let mut current = String::new();
    walk(root, &mut blocks, &mut current);
    flush(&mut blocks, &mut current);
    blocks.join("\n\n")
}

fn walk(element: ElementRef<'_>, blocks: &mut Vec<String>, current: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                current.push_str(text);
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };

                if BLOCK_ELEMENTS.contains(&name) {
                    flush(blocks, current);
                    walk(child_element, blocks, current);
                    flush(blocks, current);
                } else {
                    current.push(' ');
                    walk(child_element, blocks, current);
                    current.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn flush(blocks: &mut Vec<String>, current: &mut String) {
    let block = collapse_whitespace(current);
    if !block.is_empty() {
        blocks.push(block);
    }
    current.clear();
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
