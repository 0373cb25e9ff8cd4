use crate::error::AppError;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

/// Entry documents larger than this are not scanned.
pub const MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;

// An unterminated comment swallows the rest of the document
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?(?:-->|\z)").expect("comment regex"));

// Raw-text elements whose bodies are never markup. Each one only closes on
// its own end tag, and runs to end of input when that tag is missing.
static RAW_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?is)<script\b.*?(?:</script\s*>|\z)",
        r"|<style\b.*?(?:</style\s*>|\z)",
        r"|<template\b.*?(?:</template\s*>|\z)",
        r"|<textarea\b.*?(?:</textarea\s*>|\z)",
    ))
    .expect("raw text regex")
});

static META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("meta regex")
});

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute regex")
});

static HEAD_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("head close regex"));

static HEAD_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<head\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("head open regex"));

/// A `<meta>` element found in markup, with its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaTag {
    pub name: Option<String>,
    pub content: Option<String>,
    pub span: Range<usize>,
}

/// Scan markup for `<meta>` elements without evaluating anything.
///
/// Tags inside comments and raw-text elements (`<script>`, `<style>`, ...)
/// are ignored so inline code mentioning a meta tag is never picked up.
pub fn parse_meta_tags(html: &str) -> Result<Vec<MetaTag>, AppError> {
    if html.len() > MAX_DOCUMENT_BYTES {
        return Err(AppError::Parse(format!(
            "document is {} bytes, limit is {MAX_DOCUMENT_BYTES}",
            html.len()
        )));
    }

    let masked = masked_ranges(html);
    let tags = META_RE
        .find_iter(html)
        .filter(|m| !is_masked(&masked, m.start()))
        .map(|m| {
            // skip the "<meta" prefix so the element name is not read as an attribute
            let attrs = &m.as_str()[5..];
            let mut name = None;
            let mut content = None;
            for cap in ATTR_RE.captures_iter(attrs) {
                let key = cap.get(1).map(|k| k.as_str()).unwrap_or("");
                let value = cap
                    .get(2)
                    .or_else(|| cap.get(3))
                    .or_else(|| cap.get(4))
                    .map(|v| decode_entities(v.as_str()));
                if key.eq_ignore_ascii_case("name") && name.is_none() {
                    name = Some(value.unwrap_or_default());
                } else if key.eq_ignore_ascii_case("content") && content.is_none() {
                    content = Some(value.unwrap_or_default());
                }
            }
            MetaTag {
                name,
                content,
                span: m.range(),
            }
        })
        .collect();

    Ok(tags)
}

/// First `<meta name="{name}">` element, matched case-insensitively.
pub fn find_meta(html: &str, name: &str) -> Result<Option<MetaTag>, AppError> {
    Ok(parse_meta_tags(html)?.into_iter().find(|tag| {
        tag.name
            .as_deref()
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
    }))
}

/// Return `html` with the named meta tag carrying `content`.
///
/// An existing tag is rewritten in place. Otherwise a new tag is inserted
/// before `</head>`, after `<head>`, or at the very start, in that order.
pub fn upsert_meta_content(html: &str, name: &str, content: &str) -> Result<String, AppError> {
    let tag = format!(
        r#"<meta name="{}" content="{}" />"#,
        escape_attr(name),
        escape_attr(content)
    );

    if let Some(existing) = find_meta(html, name)? {
        let mut out = String::with_capacity(html.len() + tag.len());
        out.push_str(&html[..existing.span.start]);
        out.push_str(&tag);
        out.push_str(&html[existing.span.end..]);
        return Ok(out);
    }

    let masked = masked_ranges(html);
    let insert_at = HEAD_CLOSE_RE
        .find_iter(html)
        .find(|m| !is_masked(&masked, m.start()))
        .map(|m| m.start())
        .or_else(|| {
            HEAD_OPEN_RE
                .find_iter(html)
                .find(|m| !is_masked(&masked, m.start()))
                .map(|m| m.end())
        })
        .unwrap_or(0);

    let mut out = String::with_capacity(html.len() + tag.len());
    out.push_str(&html[..insert_at]);
    out.push_str(&tag);
    out.push_str(&html[insert_at..]);
    Ok(out)
}

fn masked_ranges(html: &str) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = COMMENT_RE
        .find_iter(html)
        .chain(RAW_TEXT_RE.find_iter(html))
        .map(|m| m.range())
        .collect();
    ranges.sort_by_key(|r| r.start);
    ranges
}

fn is_masked(ranges: &[Range<usize>], pos: usize) -> bool {
    ranges.iter().any(|r| r.contains(&pos))
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width">
    <meta name="app-version" content="1700000000000-abc1234" />
    <title>Challenge</title>
  </head>
  <body><div id="root"></div></body>
</html>"#;

    #[test]
    fn finds_named_meta_content() {
        let tag = find_meta(PAGE, "app-version").unwrap().unwrap();
        assert_eq!(tag.content.as_deref(), Some("1700000000000-abc1234"));
        assert_eq!(&PAGE[tag.span.clone()], r#"<meta name="app-version" content="1700000000000-abc1234" />"#);
    }

    #[test]
    fn attribute_order_quotes_and_case_do_not_matter() {
        let html = r#"<META CONTENT='v1' data-x=1 NAME=App-Version>"#;
        let tag = find_meta(html, "app-version").unwrap().unwrap();
        assert_eq!(tag.content.as_deref(), Some("v1"));
    }

    #[test]
    fn ignores_tags_in_comments_and_scripts() {
        let html = r#"<head>
<!-- <meta name="app-version" content="old"> -->
<script>document.write('<meta name="app-version" content="evil">')</script>
</head>"#;
        assert_eq!(find_meta(html, "app-version").unwrap(), None);
    }

    #[test]
    fn raw_text_only_closes_on_its_own_end_tag() {
        let html = r#"<head><script>var s = '</style>'; var m = '<meta name="app-version" content="evil">';</script>
<meta name="app-version" content="real"></head>"#;
        let tag = find_meta(html, "app-version").unwrap().unwrap();
        assert_eq!(tag.content.as_deref(), Some("real"));

        let unterminated = r#"<script>x = 1</style><meta name="app-version" content="evil">"#;
        assert_eq!(find_meta(unterminated, "app-version").unwrap(), None);
    }

    #[test]
    fn unterminated_comment_hides_the_rest() {
        let html = r#"<head><!-- old build <meta name="app-version" content="evil"></head>"#;
        assert_eq!(find_meta(html, "app-version").unwrap(), None);
    }

    #[test]
    fn missing_content_attribute_reads_as_none() {
        let tag = find_meta(r#"<meta name="app-version">"#, "app-version")
            .unwrap()
            .unwrap();
        assert_eq!(tag.content, None);
    }

    #[test]
    fn decodes_entities_in_values() {
        let tag = find_meta(r#"<meta name="app-version" content="a&amp;b&quot;c">"#, "app-version")
            .unwrap()
            .unwrap();
        assert_eq!(tag.content.as_deref(), Some("a&b\"c"));
    }

    #[test]
    fn oversized_documents_are_refused() {
        let html = "x".repeat(MAX_DOCUMENT_BYTES + 1);
        assert!(matches!(parse_meta_tags(&html), Err(AppError::Parse(_))));
    }

    #[test]
    fn upsert_rewrites_existing_tag() {
        let out = upsert_meta_content(PAGE, "app-version", "1700000500000-def5678").unwrap();
        let tag = find_meta(&out, "app-version").unwrap().unwrap();
        assert_eq!(tag.content.as_deref(), Some("1700000500000-def5678"));
        assert!(!out.contains("abc1234"));
        assert!(out.contains(r#"<meta name="viewport""#));
    }

    #[test]
    fn upsert_inserts_before_head_close() {
        let html = "<html><head><title>t</title></head><body></body></html>";
        let out = upsert_meta_content(html, "app-version", "v2").unwrap();
        assert_eq!(
            out,
            r#"<html><head><title>t</title><meta name="app-version" content="v2" /></head><body></body></html>"#
        );
    }

    #[test]
    fn upsert_without_head_prepends() {
        let out = upsert_meta_content("<p>hi</p>", "app-version", "v<3").unwrap();
        assert_eq!(out, r#"<meta name="app-version" content="v&lt;3" /><p>hi</p>"#);
    }
}
