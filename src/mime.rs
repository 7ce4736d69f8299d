use std::collections::HashMap;

use lazy_static::lazy_static;

lazy_static! {
    static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("txt", "text/plain");
        m.insert("html", "text/html");
        m.insert("htm", "text/html");
        m.insert("jpeg", "image/jpeg");
        m.insert("jpg", "image/jpeg");
        m.insert("png", "image/png");
        m.insert("gif", "image/gif");
        m.insert("webp", "image/webp");
        m.insert("json", "application/json");
        m.insert("xml", "text/xml");
        m.insert("svg", "image/svg+xml");
        m.insert("js", "text/javascript");
        m.insert("css", "text/css");
        m.insert("ico", "image/x-icon");
        m.insert("woff2", "font/woff2");
        m
    };
}

/// Content type for a URL path, from its extension. Unknown or missing
/// extensions are served as a generic binary type.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext,
        _ => return "application/octet-stream",
    };

    MIME_TYPES.get(ext).copied().unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(content_type_for("/style.css"), "text/css");
        assert_eq!(content_type_for("/img/logo.png"), "image/png");
        assert_eq!(content_type_for("/index.html"), "text/html");
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(content_type_for("/archive.bin2"), "application/octet-stream");
        assert_eq!(content_type_for("/noext"), "application/octet-stream");
        // A dot in a directory name is not an extension.
        assert_eq!(content_type_for("/v1.2/readme"), "application/octet-stream");
    }
}
