use sha2::{Digest, Sha256};

/// Windows-safe, deterministic filename: `{sanitized_title}--{short_hash(key)}.{extension}`
pub fn deterministic_filename(title: Option<&str>, key: &str, extension: &str) -> String {
    let sanitized = sanitize_component(title.unwrap_or("untitled"), "untitled");
    let hash = short_hash(key);
    format!("{sanitized}--{hash}.{extension}")
}

const MAX_COMPONENT_BYTES: usize = 80;

const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Makes a single path component safe on every platform, falling back to `fallback`.
///
/// Forbidden characters become `_`, runs of `_` collapse, and the result is capped
/// at 80 bytes on a char boundary.
pub(crate) fn sanitize_component(input: &str, fallback: &str) -> String {
    let mut name = String::with_capacity(input.len());
    for c in input.chars().map(|c| if forbidden(c) { '_' } else { c }) {
        if !(c == '_' && name.ends_with('_')) {
            name.push(c);
        }
    }
    let trimmed = name.trim_matches(['_', ' ', '.']);
    let mut name = if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    };
    if name.len() > MAX_COMPONENT_BYTES {
        let cut = (0..=MAX_COMPONENT_BYTES)
            .rev()
            .find(|&i| name.is_char_boundary(i))
            .unwrap_or(0);
        name.truncate(cut);
    }
    if WINDOWS_RESERVED.iter().any(|r| r.eq_ignore_ascii_case(&name)) {
        name.push('_');
    }
    name
}

fn forbidden(c: char) -> bool {
    c.is_control() || matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|')
}

/// First 8 hex digits of the SHA-256 of `input`.
pub(crate) fn short_hash(input: &str) -> String {
    Sha256::digest(input.as_bytes())
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
