//! Image rewriting: absolute URL replacements are emitted verbatim, bare
//! filenames replace the last path segment of the matched reference.

use regex::Regex;

use super::substitute::{rule_spans, substitute_each, Rule, Span, Substitution};
use crate::mapping::ImageMapping;

impl Rule for ImageMapping {
    fn regex(&self) -> &Regex {
        ImageMapping::regex(self)
    }

    fn render(&self, matched: &str) -> String {
        resolve_image_reference(matched, self.replacement())
    }

    /// A URL replacement swaps the whole reference, so the span reaches back
    /// over the directory prefix in front of the match.
    fn span_start(&self, content: &str, start: usize) -> usize {
        if is_absolute_url(self.replacement()) {
            reference_start(content, start)
        } else {
            start
        }
    }
}

impl Substitution for ImageMapping {
    fn find_spans(&self, content: &str) -> Vec<Span> {
        rule_spans(self, content)
    }

    fn replace(&self, content: &str, span: &Span) -> String {
        self.render(&content[span.start..span.end])
    }
}

/// Applies image mappings in order, each to the previous one's output.
pub fn rewrite_images(content: &str, mappings: &[ImageMapping]) -> String {
    substitute_each(content, mappings)
}

/// Start of the path-like token that ends at `pos`. Only URL path characters
/// are swallowed; a `:` counts only as part of `scheme://`.
fn reference_start(content: &str, pos: usize) -> usize {
    let mut start = pos;
    for (i, c) in content[..pos].char_indices().rev() {
        let in_path = c.is_alphanumeric()
            || matches!(c, '/' | '.' | '-' | '_' | '~' | '%' | '+' | '@')
            || (c == ':' && content[i + c.len_utf8()..].starts_with("//"));
        if !in_path {
            break;
        }
        start = i;
    }
    start
}

/// True for replacements that parse as an absolute http(s) URL.
pub fn is_absolute_url(s: &str) -> bool {
    url::Url::parse(s)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Computes the new reference for one matched image reference.
pub fn resolve_image_reference(matched: &str, replacement: &str) -> String {
    if is_absolute_url(replacement) {
        return replacement.to_string();
    }
    join_reference(dirname(matched), replacement)
}

/// POSIX dirname of a path-like string; `"."` when there is no directory.
fn dirname(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return if path.is_empty() { "." } else { "/" };
    }
    match trimmed.rfind('/') {
        None => ".",
        Some(i) => {
            let dir = trimmed[..i].trim_end_matches('/');
            if dir.is_empty() {
                "/"
            } else {
                dir
            }
        }
    }
}

/// Joins `file` onto `dir` and normalizes the result. A `scheme://host`
/// prefix in `dir` (and anything before it) is kept untouched.
fn join_reference(dir: &str, file: &str) -> String {
    match split_origin(dir) {
        Some((origin, path)) => format!("{origin}{}", normalize(&format!("/{path}/{file}"))),
        None => normalize(&format!("{dir}/{file}")),
    }
}

/// Splits `..scheme://authority` from the path that follows it.
fn split_origin(s: &str) -> Option<(&str, &str)> {
    let sep = s.find("://")?;
    let scheme_start = s[..sep]
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')))
        .map(|i| i + 1)
        .unwrap_or(0);
    let scheme = &s[scheme_start..sep];
    if !scheme.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let authority_end = s[sep + 3..]
        .find('/')
        .map(|i| sep + 3 + i)
        .unwrap_or(s.len());
    Some((&s[..authority_end], s[authority_end..].trim_start_matches('/')))
}

/// Collapses repeated separators and resolves `.` and `..` segments.
fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.len() > 1 && path.ends_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            s => parts.push(s),
        }
    }
    let mut out = parts.join("/");
    if absolute {
        out.insert(0, '/');
    }
    if out.is_empty() {
        return ".".to_string();
    }
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn image(p: &str, r: &str) -> ImageMapping {
        ImageMapping::new(p, r, BTreeMap::new()).unwrap()
    }

    #[test]
    fn relative_replacement_keeps_directory() {
        let out = rewrite_images(
            r#"<img src="/path/to/image.jpg" alt="Image">"#,
            &[image("image.jpg", "image-fr.jpg")],
        );
        assert_eq!(out, r#"<img src="/path/to/image-fr.jpg" alt="Image">"#);
    }

    #[test]
    fn relative_replacement_when_match_includes_directory() {
        let out = rewrite_images(
            r#"<img src="/path/to/image.jpg">"#,
            &[image("/path/to/image\\.jpg", "image-fr.jpg")],
        );
        assert_eq!(out, r#"<img src="/path/to/image-fr.jpg">"#);
    }

    #[test]
    fn absolute_url_replacement_is_verbatim() {
        let out = rewrite_images(
            r#"<img src="/path/to/image.jpg" alt="Image">"#,
            &[image("/path/to/image.jpg", "https://cdn.example.com/image-fr.jpg")],
        );
        assert_eq!(out, r#"<img src="https://cdn.example.com/image-fr.jpg" alt="Image">"#);
        let out = rewrite_images(
            r#"<img src="/path/to/image.jpg">"#,
            &[image("image.jpg", "https://cdn.example.com/image-fr.jpg")],
        );
        assert_eq!(out, r#"<img src="https://cdn.example.com/image-fr.jpg">"#);
    }

    #[test]
    fn url_replacement_only_swallows_its_own_reference() {
        let out = rewrite_images(
            r#"<img srcset="/a/image.jpg 1x, /b/image.jpg 2x">"#,
            &[image("image\\.jpg", "https://cdn.example.com/fr.jpg")],
        );
        assert_eq!(
            out,
            r#"<img srcset="https://cdn.example.com/fr.jpg 1x, https://cdn.example.com/fr.jpg 2x">"#
        );
        assert_eq!(reference_start("see image.jpg", 4), 4);
        assert_eq!(reference_start("/x/image.jpg", 3), 0);
        assert_eq!(reference_start("https://old.example.com/image.jpg", 24), 0);
    }

    #[test]
    fn url_replacement_stops_at_multibyte_whitespace() {
        let m = [image("image\\.jpg", "https://cdn.example.com/fr.jpg")];
        assert_eq!(
            rewrite_images("<p>Photo\u{a0}/path/image.jpg</p>", &m),
            "<p>Photo\u{a0}https://cdn.example.com/fr.jpg</p>"
        );
        assert_eq!(
            rewrite_images("<p>写真\u{3000}/path/image.jpg</p>", &m),
            "<p>写真\u{3000}https://cdn.example.com/fr.jpg</p>"
        );
    }

    #[test]
    fn url_replacement_keeps_surrounding_text() {
        let m = [image("image\\.jpg", "https://cdn.example.com/fr.jpg")];
        assert_eq!(
            rewrite_images("<p>see:image.jpg</p>", &m),
            "<p>see:https://cdn.example.com/fr.jpg</p>"
        );
        assert_eq!(
            rewrite_images("a;/img/image.jpg", &m),
            "a;https://cdn.example.com/fr.jpg"
        );
        assert_eq!(
            rewrite_images(r#"<img src="https://old.example.com/img/image.jpg">"#, &m),
            r#"<img src="https://cdn.example.com/fr.jpg">"#
        );
    }

    #[test]
    fn resolve_reference_cases() {
        assert_eq!(
            resolve_image_reference("/path/to/image.jpg", "https://cdn.example.com/image-fr.jpg"),
            "https://cdn.example.com/image-fr.jpg"
        );
        assert_eq!(resolve_image_reference("/path/to/image.jpg", "image-fr.jpg"), "/path/to/image-fr.jpg");
        assert_eq!(resolve_image_reference("image.jpg", "image-fr.jpg"), "image-fr.jpg");
        assert_eq!(resolve_image_reference("../img/a.png", "b.png"), "../img/b.png");
        assert_eq!(resolve_image_reference("/a.png", "b.png"), "/b.png");
        assert_eq!(
            resolve_image_reference("https://cdn.example.com/img/a.png", "b.png"),
            "https://cdn.example.com/img/b.png"
        );
        assert_eq!(
            resolve_image_reference(r#"src="https://cdn.example.com/a.png"#, "b.png"),
            r#"src="https://cdn.example.com/b.png"#
        );
    }

    #[test]
    fn url_detection() {
        assert!(is_absolute_url("https://cdn.example.com/x.jpg"));
        assert!(is_absolute_url("HTTP://cdn.example.com/x.jpg"));
        assert!(!is_absolute_url("image-fr.jpg"));
        assert!(!is_absolute_url("ftp://files.example.com/x.jpg"));
        assert!(!is_absolute_url("//cdn.example.com/x.jpg"));
    }

    #[test]
    fn dirname_and_normalize() {
        assert_eq!(dirname(""), ".");
        assert_eq!(dirname("a.jpg"), ".");
        assert_eq!(dirname("/a.jpg"), "/");
        assert_eq!(dirname("a//b/"), "a");
        assert_eq!(normalize("./x/../y//z"), "y/z");
        assert_eq!(normalize("/../x"), "/x");
        assert_eq!(normalize("../../x"), "../../x");
    }
}
