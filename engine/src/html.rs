use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static SCRIPT_OR_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</\1>").unwrap());

/// Fetches a URL's body, following redirects. Implemented as a trait so
/// tests can substitute an in-process stub instead of hitting the network.
pub trait Fetcher: Send + Sync {
    /// Returns `Some(body)` iff the final response status is 200 and its
    /// `content-type` begins with `text/html`; `None` otherwise (including
    /// on any transport error).
    fn fetch(&self, url: &str, max_redirects: usize) -> Option<String>;
}

/// The production [`Fetcher`], backed by a blocking `reqwest` client.
pub struct ReqwestFetcher;

impl Fetcher for ReqwestFetcher {
    fn fetch(&self, url: &str, max_redirects: usize) -> Option<String> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .build()
            .ok()?;

        let response = match client.get(url).send() {
            Ok(r) => r,
            Err(e) => {
                log::error!("failed to fetch {}: {}", url, e);
                return None;
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            return None;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)?
            .to_str()
            .ok()?
            .to_string();

        if !content_type.starts_with("text/html") {
            return None;
        }

        response.text().ok()
    }
}

/// Strips the fragment and re-serializes, giving a canonical absolute URL
/// string safe to use as a `seen`-set key and a location in the index.
pub fn clean_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return None;
    }
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Resolves `href` (possibly relative) against `base`, then cleans it.
pub fn resolve_and_clean(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    let joined = base.join(href).ok()?;
    clean_url(joined.as_str())
}

/// Removes `<script>`/`<style>`/`<noscript>` blocks, producing HTML that's
/// safe to scan for anchor links without tripping over URLs embedded in
/// inline scripts or stylesheets.
pub fn strip_block_elements(html: &str) -> String {
    SCRIPT_OR_STYLE.replace_all(html, "").into_owned()
}

/// Extracts every absolute http(s) link from anchor `href` attributes, in
/// document order, de-duplicated while preserving first-seen order.
pub fn extract_links(base_url: &str, html: &str) -> Vec<String> {
    let link_search_html = strip_block_elements(html);
    let document = Html::parse_document(&link_search_html);
    let selector = Selector::parse("a[href]").expect("static selector is valid");

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for element in document.select(&selector) {
        let href = match element.value().attr("href") {
            Some(h) => h,
            None => continue,
        };
        let cleaned = match resolve_and_clean(base_url, href) {
            Some(c) => c,
            None => continue,
        };
        if seen.insert(cleaned.clone()) {
            links.push(cleaned);
        }
    }
    links
}

/// Strips all tags and decodes entities, leaving plain text suitable for
/// tokenizing and indexing.
pub fn strip_all(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_url_strips_fragment() {
        assert_eq!(
            clean_url("https://example.com/page?x=1#section").unwrap(),
            "https://example.com/page?x=1"
        );
    }

    #[test]
    fn clean_url_rejects_non_http_schemes() {
        assert!(clean_url("mailto:a@b.com").is_none());
    }

    #[test]
    fn extract_links_resolves_relative_hrefs_in_order() {
        let html = r#"
            <html><body>
                <a href="/one">one</a>
                <a href="https://other.com/two">two</a>
                <a href="/one">dup</a>
            </body></html>
        "#;
        let links = extract_links("https://example.com/base", html);
        assert_eq!(
            links,
            vec![
                "https://example.com/one".to_string(),
                "https://other.com/two".to_string(),
            ]
        );
    }

    #[test]
    fn extract_links_ignores_hrefs_inside_script_blocks() {
        let html = r#"<html><body>
            <script>var a = "<a href=\"/evil\">x</a>";</script>
            <a href="/real">real</a>
        </body></html>"#;
        let links = extract_links("https://example.com/", html);
        assert_eq!(links, vec!["https://example.com/real".to_string()]);
    }

    #[test]
    fn strip_all_produces_plain_text() {
        let html = "<html><body><p>Hello &amp; welcome</p></body></html>";
        let text = strip_all(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("welcome"));
        assert!(!text.contains('<'));
    }
}
