pub const UNTITLED_PAGE: &str = "Untitled Page";

/// Value of the wiki's `n` query parameter (`Group.Page`) carried by an identifier.
pub fn page_name(identifier: &str) -> Option<String> {
    let (_, query) = identifier.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "n")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Human-readable page title for an identifier.
///
/// `Group.Page` becomes `Group: Page`, a group's `FrontPage` is titled after
/// the group alone.
pub fn page_title(identifier: &str) -> String {
    let Some(name) = page_name(identifier) else {
        return UNTITLED_PAGE.to_string();
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() >= 2 {
        let group = capitalize_words(&humanize(parts[0]));
        if parts[1] == "FrontPage" {
            return group;
        }
        let page = capitalize_words(&humanize(parts[1]));
        return format!("{group}: {page}");
    }

    capitalize_words(&humanize(&name))
}

fn humanize(part: &str) -> String {
    part.replace(['_', '-'], " ")
}

fn capitalize_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if at_word_start && !ch.is_whitespace() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        at_word_start = ch.is_whitespace();
    }
    out
}
