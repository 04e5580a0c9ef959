use std::fmt::Write;
use std::sync::LazyLock;

use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use scraper::node::Node;
use scraper::Html;

use crate::policy::{TagPolicy, TagTable, STANDARD_TAGS};

/// Flattening can leave markup the HTML parser repairs on the next parse
/// (a `<p>` inside a `<p>`, a heading inside a heading, table text outside
/// a cell), so passes repeat until the output is stable.
const MAX_PASSES: usize = 8;

static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("newline pattern"));

/// Reduces a document to a flat string of meaningful markup.
///
/// Passes, in order, over the parsed tree:
/// - drop comments
/// - drop elements hidden by an inline `display:none` / `visibility:hidden`
/// - drop elements in the policy's removal set
/// - drop elements with no text (unless they hold a self-contained element)
///
/// then rewrite what is left of `<body>`: non-meaningful elements are
/// flattened into their parent, meaningful ones keep only allowed attributes.
/// The output is a fixed point: sanitizing it again returns it unchanged.
#[derive(Debug, Clone)]
pub struct HtmlSanitizer<P = TagTable> {
    policy: P,
}

impl HtmlSanitizer {
    pub fn new() -> Self {
        Self::with_policy(STANDARD_TAGS)
    }
}

impl Default for HtmlSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: TagPolicy> HtmlSanitizer<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    pub fn sanitize(&self, html: &str) -> String {
        let mut out = self.sanitize_once(html);
        for _ in 1..MAX_PASSES {
            let next = self.sanitize_once(&out);
            if next == out {
                break;
            }
            out = next;
        }
        out
    }

    fn sanitize_once(&self, html: &str) -> String {
        let mut doc = Html::parse_document(html);
        self.prune(&mut doc);

        let Some(body) = find_body(&doc) else {
            return String::new();
        };
        let mut fragments = Vec::new();
        for child in body.children() {
            self.rewrite(child, &mut fragments);
        }

        let joined = fragments.join(" ");
        NEWLINE_RUNS.replace_all(&joined, "\n\n").trim().to_string()
    }

    fn prune(&self, doc: &mut Html) {
        let comments = collect(doc, |node| node.value().is_comment());
        detach_all(doc, comments);

        let hidden = collect(doc, |node| {
            node.value()
                .as_element()
                .and_then(|el| el.attr("style"))
                .is_some_and(is_hidden_style)
        });
        detach_all(doc, hidden);

        let removed = collect(doc, |node| {
            node.value()
                .as_element()
                .is_some_and(|el| self.policy.is_removed(el.name()))
        });
        detach_all(doc, removed);

        let empty = collect(doc, |node| {
            node.value().is_element() && !self.has_content(node)
        });
        detach_all(doc, empty);
    }

    fn has_content(&self, node: NodeRef<'_, Node>) -> bool {
        node.descendants().any(|d| match d.value() {
            Node::Text(text) => !text.trim().is_empty(),
            Node::Element(el) => self.policy.is_self_contained(el.name()),
            _ => false,
        })
    }

    fn rewrite(&self, node: NodeRef<'_, Node>, out: &mut Vec<String>) {
        match node.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.push(escape_text(trimmed));
                }
            }
            Node::Element(el) => {
                let tag = el.name();
                if !self.policy.is_meaningful(tag) {
                    for child in node.children() {
                        self.rewrite(child, out);
                    }
                    return;
                }

                let mut open = format!("<{tag}");
                for &attr in self.policy.allowed_attributes(tag) {
                    if let Some(value) = el.attr(attr) {
                        let _ = write!(open, " {attr}=\"{}\"", escape_attr(value));
                    }
                }
                open.push('>');
                if self.policy.is_void(tag) {
                    out.push(open);
                    return;
                }

                let mut inner = Vec::new();
                for child in node.children() {
                    self.rewrite(child, &mut inner);
                }
                out.push(format!("{open}{}</{tag}>", inner.join(" ")));
            }
            _ => {}
        }
    }
}

fn collect(doc: &Html, predicate: impl Fn(NodeRef<'_, Node>) -> bool) -> Vec<NodeId> {
    doc.tree
        .root()
        .descendants()
        .filter(|node| predicate(*node))
        .map(|node| node.id())
        .collect()
}

fn detach_all(doc: &mut Html, ids: Vec<NodeId>) {
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn find_body(doc: &Html) -> Option<NodeRef<'_, Node>> {
    doc.tree.root().descendants().find(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| el.name() == "body")
    })
}

fn is_hidden_style(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}
