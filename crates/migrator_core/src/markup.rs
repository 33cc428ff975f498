//! Legacy wiki markup to HTML.
//!
//! Conversion is a fixed sequence of independent rewrite passes, each working on the
//! output of the previous one: bold, italic, headers, lists, links. Bold has to run
//! before italic so that `'''` is consumed before the two-quote pattern can see it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'''(.*?)'''").expect("bold pattern is valid"));
// A leading quote inside the span would mean a longer quote run; leave it to bold.
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"''([^'\n].*?)''").expect("italic pattern is valid"));
static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*\s*(.*)$").expect("list pattern is valid"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(.*?)(?:\|(.*?))?\]\]").expect("link pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupConverter {
    internal_link_prefix: String,
}

impl Default for MarkupConverter {
    fn default() -> Self {
        Self {
            internal_link_prefix: "/".to_string(),
        }
    }
}

impl MarkupConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix put in front of the slug of internal page links (default `/`).
    pub fn with_internal_link_prefix(prefix: impl Into<String>) -> Self {
        Self {
            internal_link_prefix: prefix.into(),
        }
    }

    pub fn convert(&self, markup: &str) -> String {
        let html = convert_bold(markup);
        let html = convert_italic(&html);
        let html = convert_headers(&html);
        let html = convert_lists(&html);
        self.convert_links(&html)
    }

    fn convert_links(&self, text: &str) -> String {
        LINK.replace_all(text, |caps: &Captures| {
            let target = caps.get(1).map_or("", |m| m.as_str());
            let label = caps.get(2).map_or(target, |m| m.as_str());
            let href = if target.starts_with("http") {
                target.to_string()
            } else {
                format!("{}{}", self.internal_link_prefix, slugify(target))
            };
            format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&href),
                escape_html(label)
            )
        })
        .into_owned()
    }
}

fn convert_bold(text: &str) -> String {
    BOLD.replace_all(text, "<strong>$1</strong>").into_owned()
}

fn convert_italic(text: &str) -> String {
    ITALIC.replace_all(text, "<em>$1</em>").into_owned()
}

fn convert_headers(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if let Some(rest) = line.strip_prefix("!!!") {
                format!("<h1>{rest}</h1>")
            } else if let Some(rest) = line.strip_prefix("!!") {
                format!("<h2>{rest}</h2>")
            } else if let Some(rest) = line.strip_prefix('!') {
                format!("<h3>{rest}</h3>")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn convert_lists(text: &str) -> String {
    let mut result = Vec::new();
    let mut in_list = false;

    for line in text.split('\n') {
        if let Some(caps) = LIST_ITEM.captures(line) {
            if !in_list {
                result.push("<ul>".to_string());
                in_list = true;
            }
            let item = caps.get(1).map_or("", |m| m.as_str());
            result.push(format!("<li>{item}</li>"));
        } else {
            if in_list {
                result.push("</ul>".to_string());
                in_list = false;
            }
            result.push(line.to_string());
        }
    }

    if in_list {
        result.push("</ul>".to_string());
    }

    result.join("\n")
}

/// URL-safe page slug: lowercase alphanumerics joined by single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Escapes text for use in HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
