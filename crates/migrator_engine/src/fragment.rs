//! Tolerant HTML parsing helpers around a content container identified by element ID.
//!
//! `scraper::Html` is not `Send`, so every helper parses, works and returns owned data
//! without keeping the document alive across an await point.

use std::collections::HashMap;

use ego_tree::NodeRef;
use migrator_core::escape_html;
use scraper::node::Node;
use scraper::{ElementRef, Html};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are emitted unescaped, as the parser (scripting
/// enabled) read them.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Attribute overrides applied while re-serializing a container.
#[derive(Debug, Clone, Default)]
pub(crate) struct RenderRules {
    pub table_class: Option<String>,
    pub table_style: Option<String>,
    pub cell_style: Option<String>,
    pub header_style: Option<String>,
    /// Original `src` value to replacement URL.
    pub image_sources: HashMap<String, String>,
}

fn find_by_id<'a>(document: &'a Html, id: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|element| element.value().id() == Some(id))
}

/// Every `href` of the anchors inside the container, in document order.
///
/// `None` when the container is missing.
pub(crate) fn container_links(html: &str, container_id: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let container = find_by_id(&document, container_id)?;
    let links = container
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|element| element.value().name().eq_ignore_ascii_case("a"))
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect();
    Some(links)
}

/// Distinct non-empty image sources inside the container, in document order.
pub(crate) fn image_sources(html: &str, container_id: &str) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let container = find_by_id(&document, container_id)?;
    let mut sources: Vec<String> = Vec::new();
    for element in container.descendants().filter_map(ElementRef::wrap) {
        if !element.value().name().eq_ignore_ascii_case("img") {
            continue;
        }
        let Some(src) = element.value().attr("src").map(str::trim) else {
            continue;
        };
        if !src.is_empty() && !sources.iter().any(|s| s == src) {
            sources.push(src.to_string());
        }
    }
    Some(sources)
}

/// Serialized inner HTML of the container with `rules` applied.
pub(crate) fn render_container(html: &str, container_id: &str, rules: &RenderRules) -> Option<String> {
    let document = Html::parse_document(html);
    let container = find_by_id(&document, container_id)?;
    let mut writer = FragmentWriter {
        out: String::new(),
        rules,
    };
    for child in container.children() {
        writer.visit_node(child, false);
    }
    Some(writer.out)
}

struct FragmentWriter<'r> {
    out: String,
    rules: &'r RenderRules,
}

impl FragmentWriter<'_> {
    fn visit_node(&mut self, node: NodeRef<'_, Node>, raw_text: bool) {
        match node.value() {
            Node::Text(text) => {
                if raw_text {
                    self.out.push_str(text);
                } else {
                    self.out.push_str(&escape_html(text));
                }
            }
            Node::Comment(comment) => {
                self.out.push_str("<!--");
                self.out.push_str(comment);
                self.out.push_str("-->");
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element);
                }
            }
            _ => {
                for child in node.children() {
                    self.visit_node(child, raw_text);
                }
            }
        }
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        // Parsed names are already lowercase for HTML; foreign ones keep their case.
        let name = element.value().name().to_string();
        let is_html = &*element.value().name.ns == HTML_NAMESPACE;
        let attrs = self.attributes_for(&name, element);

        self.out.push('<');
        self.out.push_str(&name);
        for (key, value) in &attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_html(value));
            self.out.push('"');
        }
        self.out.push('>');

        if is_html && VOID_ELEMENTS.contains(&name.as_str()) {
            return;
        }

        let raw_text = is_html && RAW_TEXT_ELEMENTS.contains(&name.as_str());
        for child in element.children() {
            self.visit_node(child, raw_text);
        }
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');
    }

    /// Attributes sorted by name so output does not depend on parser storage order.
    fn attributes_for(&self, name: &str, element: ElementRef<'_>) -> Vec<(String, String)> {
        let mut attrs: Vec<(String, String)> = element
            .value()
            .attrs
            .iter()
            .map(|(key, value)| {
                let key = match &key.prefix {
                    Some(prefix) => format!("{}:{}", &**prefix, &*key.local),
                    None => key.local.to_string(),
                };
                (key, value.to_string())
            })
            .collect();

        match name {
            "table" => {
                set_attr(&mut attrs, "class", self.rules.table_class.as_deref());
                set_attr(&mut attrs, "style", self.rules.table_style.as_deref());
            }
            "td" => set_attr(&mut attrs, "style", self.rules.cell_style.as_deref()),
            "th" => set_attr(&mut attrs, "style", self.rules.header_style.as_deref()),
            "img" => {
                let replacement = element
                    .value()
                    .attr("src")
                    .map(str::trim)
                    .and_then(|src| self.rules.image_sources.get(src));
                set_attr(&mut attrs, "src", replacement.map(String::as_str));
            }
            _ => {}
        }

        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        attrs
    }
}

fn set_attr(attrs: &mut Vec<(String, String)>, key: &str, value: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    match attrs.iter_mut().find(|(existing, _)| existing == key) {
        Some(slot) => slot.1 = value.to_string(),
        None => attrs.push((key.to_string(), value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::{container_links, image_sources, render_container, RenderRules};

    const PAGE: &str = r##"<html><body>
        <div id="menu"><a href="/elsewhere">x</a></div>
        <div id="wikitext"><p>Hello &amp; <b>welcome</b></p><a href="#top">top</a><a href=" Main.Ovens ">Ovens</a><img src="a.png"><img src="a.png"></div>
    </body></html>"##;

    #[test]
    fn links_only_come_from_container() {
        let links = container_links(PAGE, "wikitext").unwrap();
        assert_eq!(links, vec!["#top".to_string(), "Main.Ovens".to_string()]);
    }

    #[test]
    fn missing_container_is_none() {
        assert!(container_links(PAGE, "nope").is_none());
        assert!(render_container(PAGE, "nope", &RenderRules::default()).is_none());
    }

    #[test]
    fn image_sources_are_distinct() {
        assert_eq!(image_sources(PAGE, "wikitext").unwrap(), vec!["a.png".to_string()]);
    }

    #[test]
    fn render_reescapes_text_and_closes_void_elements() {
        let html = render_container(
            r#"<div id="c">1 &lt; 2<br>ok</div>"#,
            "c",
            &RenderRules::default(),
        )
        .unwrap();
        assert_eq!(html, "1 &lt; 2<br>ok");
    }

    #[test]
    fn raw_text_elements_are_not_escaped_twice() {
        let html = render_container(
            r#"<div id="c"><xmp>1 &lt; 2</xmp><noframes>a & b</noframes></div>"#,
            "c",
            &RenderRules::default(),
        )
        .unwrap();
        assert_eq!(html, "<xmp>1 &lt; 2</xmp><noframes>a & b</noframes>");
    }

    #[test]
    fn svg_names_and_prefixed_attributes_survive() {
        let html = render_container(
            r##"<div id="c"><svg><foreignObject></foreignObject><use xlink:href="#oven"></use></svg></div>"##,
            "c",
            &RenderRules::default(),
        )
        .unwrap();
        assert_eq!(
            html,
            r##"<svg><foreignObject></foreignObject><use xlink:href="#oven"></use></svg>"##
        );
    }

    #[test]
    fn malformed_markup_does_not_fail() {
        let html = render_container(
            r#"<div id="c"><p>open <i>never closed</div>"#,
            "c",
            &RenderRules::default(),
        )
        .unwrap();
        assert!(html.starts_with("<p>open <i>never closed"));
    }
}
