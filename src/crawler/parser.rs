//! HTML parsing and selector rule evaluation
//!
//! The crawl engine never touches an HTML tree directly. It hands a page body
//! to a [`DocumentParser`], runs the selector rules against the resulting
//! [`Document`], and gets back a flat list of classified links.

use crate::config::{LinkMode, SelectorRule};
use scraper::{Html, Selector};
use std::collections::HashMap;

/// A matched element, detached from the tree it came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    text: String,
    attributes: HashMap<String, String>,
}

impl Element {
    pub fn new(text: impl Into<String>, attributes: HashMap<String, String>) -> Self {
        Self {
            text: text.into(),
            attributes,
        }
    }

    /// Concatenated text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Value of the named attribute, if present
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// A parsed page that can be queried with selector patterns
pub trait Document {
    /// Returns every element matching `pattern`, in document order
    fn query_all(&self, pattern: &str) -> Result<Vec<Element>, String>;
}

/// Turns page bodies into queryable documents
pub trait DocumentParser: Send + Sync {
    /// Parses a page body
    fn parse(&self, body: &str) -> Box<dyn Document>;

    /// Checks that `pattern` is a selector this parser understands
    fn check_pattern(&self, pattern: &str) -> Result<(), String>;
}

/// [`DocumentParser`] backed by the `scraper` crate
///
/// Parsing is lenient: malformed markup is repaired the way browsers do, so
/// only invalid selector patterns produce errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl DocumentParser for HtmlParser {
    fn parse(&self, body: &str) -> Box<dyn Document> {
        Box::new(HtmlDocument(Html::parse_document(body)))
    }

    fn check_pattern(&self, pattern: &str) -> Result<(), String> {
        compile_selector(pattern).map(|_| ())
    }
}

struct HtmlDocument(Html);

impl Document for HtmlDocument {
    fn query_all(&self, pattern: &str) -> Result<Vec<Element>, String> {
        let selector = compile_selector(pattern)?;

        let elements = self
            .0
            .select(&selector)
            .map(|element| {
                let attributes = element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                Element::new(element.text().collect::<String>(), attributes)
            })
            .collect();

        Ok(elements)
    }
}

/// Compiles a CSS selector pattern
pub fn compile_selector(pattern: &str) -> Result<Selector, String> {
    Selector::parse(pattern).map_err(|e| format!("{:?}", e))
}

/// A link picked out by a selector rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLink {
    /// Mode of the rule that matched
    pub mode: LinkMode,

    /// Raw attribute value, unmodified
    pub href: String,
}

/// Runs the selector rules against a document
///
/// # Evaluation Rules
///
/// - Rules run in declared order and their matches are concatenated; a link
///   matched by two rules appears twice
/// - Elements come back in document order within each rule
/// - With a text filter, only elements whose text equals the filter are used.
///   Leading and trailing whitespace of the element text is dropped before
///   comparing; everything else must match exactly, including case and inner
///   whitespace
/// - Elements without the link attribute are skipped
/// - A rule that matches nothing contributes nothing
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `rules` - The selector rules, in order
///
/// # Returns
///
/// * `Ok(Vec<MatchedLink>)` - Matched links in rule order
/// * `Err(String)` - A pattern could not be evaluated
pub fn evaluate_rules(
    document: &dyn Document,
    rules: &[SelectorRule],
) -> Result<Vec<MatchedLink>, String> {
    let mut links = Vec::new();

    for rule in rules {
        for element in document.query_all(&rule.pattern)? {
            if let Some(text) = &rule.text {
                if element.text().trim() != text {
                    continue;
                }
            }

            match element.attribute(&rule.attribute) {
                Some(href) => links.push(MatchedLink {
                    mode: rule.mode,
                    href: href.to_string(),
                }),
                None => {
                    tracing::debug!(
                        "Element matched by '{}' has no {} attribute",
                        rule.pattern,
                        rule.attribute
                    );
                }
            }
        }
    }

    Ok(links)
}

/// Parses a page body and runs the selector rules against it
///
/// # Example
///
/// ```
/// use sumi_harvest::config::{LinkMode, SelectorRule};
/// use sumi_harvest::crawler::{extract_links, HtmlParser};
///
/// let html = r#"<div class="fullImageLink"><a href="/img/a.png">a.png</a></div>"#;
/// let rules = vec![SelectorRule::download(".fullImageLink a")];
/// let links = extract_links(&HtmlParser, html, &rules).unwrap();
/// assert_eq!(links[0].mode, LinkMode::Download);
/// assert_eq!(links[0].href, "/img/a.png");
/// ```
pub fn extract_links(
    parser: &dyn DocumentParser,
    body: &str,
    rules: &[SelectorRule],
) -> Result<Vec<MatchedLink>, String> {
    let document = parser.parse(body);
    evaluate_rules(document.as_ref(), rules)
}
