//! Article fetching and text extraction.
//!
//! Extraction is deliberately simple: title from `og:title` or `<title>`,
//! body text from the `<p>` blocks inside `<article>` (or `<body>` when there
//! is no `<article>`). Scripts, styles and page chrome are skipped. Without any
//! `<p>` the visible text of the same scope is used.

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, warn};

/// Extracted article content handed to the LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub title: String,
    pub text: String,
    pub hostname: String,
}

impl ArticleMetadata {
    pub fn new(title: impl Into<String>, text: impl Into<String>, hostname: Option<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            hostname: hostname.unwrap_or_else(|| "unknown".to_string()),
        }
    }

    pub fn format_for_llm(&self) -> String {
        format!(
            "Title: {}\nSource: {}\nText: {}",
            self.title, self.hostname, self.text
        )
    }
}

#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// `Ok(None)` when the page was fetched but no article could be extracted.
    async fn fetch_and_extract(&self, url: &str) -> Result<Option<ArticleMetadata>>;
    fn name(&self) -> &'static str;
}

pub struct HttpArticleSource {
    client: reqwest::Client,
}

impl HttpArticleSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("article-rater/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building article http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ArticleSource for HttpArticleSource {
    async fn fetch_and_extract(&self, url: &str) -> Result<Option<ArticleMetadata>> {
        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = ?e, url, "article http error");
                return Err(e).context("fetching article");
            }
        };
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, url, "article fetch returned non-success status");
            return Ok(None);
        }
        let body = resp.text().await.context("reading article body")?;
        debug!(url, bytes = body.len(), "article fetched");
        Ok(extract_article(&body, url))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static article regex"))
}

/// Subtrees whose text never belongs to the article body.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside",
];

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Pull title, text and hostname out of an HTML page.
pub fn extract_article(html: &str, url: &str) -> Option<ArticleMetadata> {
    let document = Html::parse_document(html);

    let scope = selector("article")
        .and_then(|sel| document.select(&sel).next())
        .or_else(|| selector("body").and_then(|sel| document.select(&sel).next()))?;

    let paragraphs: Vec<String> = selector("p")
        .map(|sel| {
            scope
                .select(&sel)
                .filter(|p| !inside_noise(*p, scope))
                .map(|p| normalize_text(&visible_text(p)))
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let text = if paragraphs.is_empty() {
        normalize_text(&visible_text(scope))
    } else {
        paragraphs.join("\n")
    };
    if text.is_empty() {
        return None;
    }

    let title = extract_title(&document).unwrap_or_default();
    Some(ArticleMetadata::new(title, text, hostname_of(url)))
}

fn extract_title(document: &Html) -> Option<String> {
    let og = selector(r#"meta[property="og:title"]"#)
        .and_then(|sel| {
            document
                .select(&sel)
                .filter_map(|m| m.value().attr("content"))
                .map(normalize_text)
                .find(|t| !t.is_empty())
        });

    og.or_else(|| {
        selector("title")
            .and_then(|sel| document.select(&sel).next())
            .map(|t| normalize_text(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty())
    })
}

fn is_noise(el: ElementRef<'_>) -> bool {
    NOISE_TAGS.contains(&el.value().name())
}

/// True when `el` sits in a noise subtree below `scope`.
fn inside_noise(el: ElementRef<'_>, scope: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .take_while(|a| a.id() != scope.id())
        .any(is_noise)
}

/// Text under `el`, skipping noise subtrees.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|a| a.id() != el.id())
            .any(is_noise);
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

fn hostname_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

/// Decode leftover (double-escaped) entities, unify quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    let decoded = html_escape::decode_html_entities(s).to_string();
    let decoded = decoded
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    re(&RE_WS, r"\s+").replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
<title>Fallback title</title>
<meta property="og:title" content="Rocket lands &amp; returns">
<style>p { color: red }</style>
</head><body>
<nav><p>Home | News</p></nav>
<article>
  <h1>Rocket lands</h1>
  <p>The booster touched down   at <b>08:14</b>.</p>
  <script>var p = "<p>not text</p>";</script>
  <p>Engineers called it &ldquo;routine&rdquo;.</p>
</article>
<footer><p>Copyright</p></footer>
</body></html>"#;

    #[test]
    fn extracts_title_text_and_host() {
        let a = extract_article(PAGE, "https://www.example.com/news/1").unwrap();
        assert_eq!(a.title, "Rocket lands & returns");
        assert_eq!(a.hostname, "example.com");
        assert_eq!(
            a.text,
            "The booster touched down at 08:14.\nEngineers called it \"routine\"."
        );
    }

    #[test]
    fn falls_back_to_title_tag_and_unknown_host() {
        let html = "<html><head><title> Plain </title></head><body><p>Hello world</p></body></html>";
        let a = extract_article(html, "not a url").unwrap();
        assert_eq!(a.title, "Plain");
        assert_eq!(a.hostname, "unknown");
        assert_eq!(a.text, "Hello world");
    }

    #[test]
    fn empty_page_yields_none() {
        assert!(extract_article("<html><body><script>x()</script></body></html>", "https://a.b").is_none());
    }

    #[test]
    fn og_title_keeps_apostrophes_in_any_attribute_order() {
        let html = r#"<html><head><meta property="og:title" content="Rocket's return to Earth"></head><body><p>x</p></body></html>"#;
        assert_eq!(extract_article(html, "https://a.b").unwrap().title, "Rocket's return to Earth");

        let html = r#"<html><head><meta content="Real headline" property="og:title"><title>Site name</title></head><body><p>x</p></body></html>"#;
        assert_eq!(extract_article(html, "https://a.b").unwrap().title, "Real headline");
    }

    #[test]
    fn page_without_paragraphs_uses_body_text_only() {
        let html = r#"<html><head><title>Head title</title><meta name="description" content="meta text"></head>
<body><nav>Menu</nav><div>Launch   window opens <em>tonight</em></div><script>track()</script></body></html>"#;
        let a = extract_article(html, "https://a.b").unwrap();
        assert_eq!(a.text, "Launch window opens tonight");
        assert_eq!(a.title, "Head title");
    }

    #[test]
    fn paragraphs_in_page_chrome_are_skipped_without_article() {
        let html = "<html><body><header><p>Subscribe</p></header><div><p>First.</p><p>Second.</p></div><footer><p>Imprint</p></footer></body></html>";
        let a = extract_article(html, "https://news.example.org/x").unwrap();
        assert_eq!(a.text, "First.\nSecond.");
        assert_eq!(a.hostname, "news.example.org");
    }

    #[test]
    fn double_escaped_entities_are_decoded() {
        let html = r#"<html><head><meta property="og:title" content="Q&amp;amp;A"></head><body><p>x</p></body></html>"#;
        assert_eq!(extract_article(html, "https://a.b").unwrap().title, "Q&A");
    }

    #[test]
    fn llm_format_matches_layout() {
        let a = ArticleMetadata::new("T", "Body", None);
        assert_eq!(a.format_for_llm(), "Title: T\nSource: unknown\nText: Body");
    }
}
