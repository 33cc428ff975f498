use url::Url;

/// Resolves an image `src` found on `page_url` to an absolute URL.
///
/// Root-relative paths resolve against the page's origin; other relative paths
/// against the directory of the page path. Absolute `http(s)` references pass through.
pub fn absolute_url(page_url: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    if reference.starts_with("http") {
        return Some(reference.to_string());
    }

    let base = Url::parse(page_url).ok()?;
    let host = base.host_str()?;
    if let Some(rest) = reference.strip_prefix("//") {
        return Some(format!("{}://{}", base.scheme(), rest));
    }

    let mut origin = format!("{}://{}", base.scheme(), host);
    if let Some(port) = base.port() {
        origin.push_str(&format!(":{port}"));
    }

    if reference.starts_with('/') {
        return Some(format!("{origin}{reference}"));
    }

    let path = base.path();
    let directory = match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    };
    let prefix = format!("{origin}{directory}");
    Some(format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        reference.trim_start_matches("./")
    ))
}

/// Canonical page URL for a sitemap link.
///
/// A link already addressing a page through `?n=` keeps its query string on the
/// configured base URL; anything else is taken as the page name itself.
pub fn build_page_url(base_url: &str, href: &str) -> String {
    let href = href.trim();
    if let Some(idx) = href.find("?n=") {
        let query = &href[idx + 1..];
        let query = query.split('#').next().unwrap_or(query);
        return format!("{base_url}?{query}");
    }
    let name = href.split('#').next().unwrap_or(href);
    format!("{base_url}?n={name}")
}

#[cfg(test)]
mod tests {
    use super::{absolute_url, build_page_url};

    #[test]
    fn root_relative_uses_origin_only() {
        assert_eq!(
            absolute_url("https://wiki.example.org/wiki/wiki.php?n=Main.Ovens", "/pub/oven.jpg"),
            Some("https://wiki.example.org/pub/oven.jpg".to_string())
        );
    }

    #[test]
    fn path_relative_uses_page_directory() {
        assert_eq!(
            absolute_url("https://wiki.example.org/wiki/wiki.php?n=Main.Ovens", "uploads/Main/oven.jpg"),
            Some("https://wiki.example.org/wiki/uploads/Main/oven.jpg".to_string())
        );
        assert_eq!(
            absolute_url("https://wiki.example.org", "oven.jpg"),
            Some("https://wiki.example.org/oven.jpg".to_string())
        );
        assert_eq!(
            absolute_url("https://wiki.example.org/wiki/", "./oven.jpg"),
            Some("https://wiki.example.org/wiki/oven.jpg".to_string())
        );
    }

    #[test]
    fn explicit_port_is_kept() {
        assert_eq!(
            absolute_url("http://127.0.0.1:8080/wiki.php", "img/a.png"),
            Some("http://127.0.0.1:8080/img/a.png".to_string())
        );
    }

    #[test]
    fn absolute_and_protocol_relative() {
        assert_eq!(
            absolute_url("https://wiki.example.org/x", "http://cdn.example.org/a.png"),
            Some("http://cdn.example.org/a.png".to_string())
        );
        assert_eq!(
            absolute_url("https://wiki.example.org/x", "//cdn.example.org/a.png"),
            Some("https://cdn.example.org/a.png".to_string())
        );
        assert_eq!(absolute_url("not a url", "a.png"), None);
    }

    #[test]
    fn page_url_keeps_query_convention() {
        let base = "https://wiki.example.org/wiki.php";
        assert_eq!(
            build_page_url(base, "https://wiki.example.org/wiki.php?n=Main.Ovens"),
            "https://wiki.example.org/wiki.php?n=Main.Ovens"
        );
        assert_eq!(
            build_page_url(base, "wiki.php?n=Main.Ovens#top"),
            "https://wiki.example.org/wiki.php?n=Main.Ovens"
        );
    }

    #[test]
    fn bare_href_becomes_page_name() {
        assert_eq!(
            build_page_url("https://wiki.example.org/wiki.php", "Main.Ovens"),
            "https://wiki.example.org/wiki.php?n=Main.Ovens"
        );
    }
}
