use std::time::Instant;

use reqwest::Client;

use crate::domain::{SearchOutcome, SearchResultItem};
use crate::infra::config::ToolConfig;
use crate::infra::http::headers::{add_standard_headers, generate_request_id};
use crate::infra::runtime::limits::{make_http_client_with, retry_async_when};
use crate::search::SearchProvider;

const TITLE_MARKER: &str = "class=\"result__a\"";
const SNIPPET_MARKER: &str = "class=\"result__snippet\"";

/// DuckDuckGo HTML endpoint client. No API key required.
#[derive(Clone)]
pub struct DuckDuckGoProvider {
    base: String,
    http: Client,
    retries: u32,
}

#[derive(Debug)]
enum FetchError {
    Timeout,
    Retryable(String),
    Fatal(String),
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() || e.is_request() {
            FetchError::Retryable(e.to_string())
        } else {
            FetchError::Fatal(e.to_string())
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Retryable(_))
    }
}

impl DuckDuckGoProvider {
    pub fn from_config(cfg: &ToolConfig) -> reqwest::Result<Self> {
        Ok(Self {
            base: cfg.base_url().to_string(),
            http: make_http_client_with(cfg)?,
            retries: cfg.retries(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    async fn fetch_html(&self, query: &str) -> Result<String, FetchError> {
        let url = format!("{}/html/", self.base.trim_end_matches('/'));
        let body = format!("q={}&b=", urlencoding::encode(query));
        let req_id = generate_request_id();
        tracing::debug!(endpoint = %url, request_id = %req_id, "duckduckgo request");

        let http = self.http.clone();
        retry_async_when(self.retries, FetchError::is_retryable, move |_| {
            let (builder, _rid) = add_standard_headers(http.post(url.clone()), Some(req_id.clone()));
            let builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone());
            async move {
                let resp = builder.send().await.map_err(FetchError::from_reqwest)?;
                let status = resp.status();
                if status.is_server_error() {
                    return Err(FetchError::Retryable(format!("upstream status {status}")));
                }
                if !status.is_success() {
                    return Err(FetchError::Fatal(format!("upstream status {status}")));
                }
                resp.text().await.map_err(FetchError::from_reqwest)
            }
        })
        .await
    }
}

#[async_trait::async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, max_results: u32) -> SearchOutcome {
        let start = Instant::now();
        let outcome = match self.fetch_html(query).await {
            Ok(html) => SearchOutcome::Success(parse_results(&html, max_results as usize)),
            Err(FetchError::Timeout) => SearchOutcome::Timeout,
            Err(FetchError::Retryable(msg)) | Err(FetchError::Fatal(msg)) => {
                SearchOutcome::Failure(msg)
            }
        };
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "duckduckgo request finished"
        );
        outcome
    }
}

/// Pull ranked results out of the HTML results page.
///
/// Each hit is an `<a class="result__a" href=...>title</a>` followed, before
/// the next hit, by an optional `<a class="result__snippet">snippet</a>`.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResultItem> {
    let mut items = Vec::new();
    let mut rest = html;

    while items.len() < limit {
        let Some(marker) = rest.find(TITLE_MARKER) else {
            break;
        };
        let (before, after) = rest.split_at(marker);
        let Some(open_end) = after.find('>') else {
            break;
        };
        let tag_start = before.rfind("<a").map(|i| &before[i..]).unwrap_or_default();
        let tag = format!("{tag_start}{}", &after[..open_end]);

        let inner = &after[open_end + 1..];
        let Some(close) = inner.find("</a>") else {
            break;
        };
        let title = clean_text(&inner[..close]);
        let tail = &inner[close + "</a>".len()..];

        let block_end = tail.find(TITLE_MARKER).unwrap_or(tail.len());
        let snippet = snippet_in(&tail[..block_end]);
        let url = attr_value(&tag, "href")
            .map(|href| resolve_link(&href))
            .filter(|u| !u.is_empty());

        if !title.is_empty() {
            items.push(SearchResultItem { title, url, snippet });
        }
        rest = tail;
    }
    items
}

fn snippet_in(block: &str) -> Option<String> {
    let at = block.find(SNIPPET_MARKER)?;
    let from = at + block[at..].find('>')? + 1;
    let to = from + block[from..].find("</a>")?;
    Some(clean_text(&block[from..to])).filter(|s| !s.is_empty())
}

fn attr_value(tag: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=\"");
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(decode_entities(&tag[start..start + len]))
}

/// Result links go through a `/l/?uddg=<encoded target>` redirect; unwrap it.
fn resolve_link(href: &str) -> String {
    if let Some(pos) = href.find("uddg=") {
        let encoded = href[pos + "uddg=".len()..].split('&').next().unwrap_or_default();
        return urlencoding::decode(encoded)
            .map(|s| s.into_owned())
            .unwrap_or_default();
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        String::new()
    }
}

fn clean_text(fragment: &str) -> String {
    let mut text = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for ch in fragment.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = decode_entities(&text);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match candidate.find(';').filter(|&end| end <= 10) {
            Some(end) => match decode_entity(&candidate[1..end]) {
                Some(ch) => {
                    out.push(ch);
                    rest = &candidate[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    const PAGE: &str = r##"
    <div class="result results_links web-result">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming Language</a>
      </h2>
      <a class="result__url" href="https://www.rust-lang.org/">www.rust-lang.org</a>
      <a class="result__snippet" href="https://www.rust-lang.org/">A language empowering <b>everyone</b> to build reliable &amp; efficient software.</a>
    </div>
    <div class="result results_links web-result">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="https://en.wikipedia.org/wiki/Rust_(programming_language)">Rust (programming language) - Wikipedia</a>
      </h2>
      <a class="result__snippet" href="#">It&#x27;s noted for memory safety.</a>
    </div>
    <div class="result results_links web-result">
      <h2 class="result__title">
        <a rel="nofollow" class="result__a" href="/relative">Third &lt;hit&gt;</a>
      </h2>
    </div>
    "##;

    fn provider_for(server: &MockServer, timeout_ms: u64) -> DuckDuckGoProvider {
        DuckDuckGoProvider::from_config(&ToolConfig {
            base_url: Some(server.base_url()),
            timeout_ms: Some(timeout_ms),
            retries: Some(0),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_titles_links_and_snippets_in_rank_order() {
        let items = parse_results(PAGE, 10);
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title, "Rust Programming Language");
        assert_eq!(items[0].url.as_deref(), Some("https://www.rust-lang.org/"));
        assert_eq!(
            items[0].snippet.as_deref(),
            Some("A language empowering everyone to build reliable & efficient software.")
        );

        assert_eq!(
            items[1].url.as_deref(),
            Some("https://en.wikipedia.org/wiki/Rust_(programming_language)")
        );
        assert_eq!(items[1].snippet.as_deref(), Some("It's noted for memory safety."));

        assert_eq!(items[2].title, "Third <hit>");
        assert!(items[2].url.is_none());
        assert!(items[2].snippet.is_none());
    }

    #[test]
    fn stops_at_limit() {
        assert_eq!(parse_results(PAGE, 2).len(), 2);
        assert!(parse_results(PAGE, 0).is_empty());
    }

    #[test]
    fn page_without_results_is_empty() {
        assert!(parse_results("<html><body>No results.</body></html>", 5).is_empty());
    }

    #[test]
    fn entity_decoding_does_not_double_decode() {
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&#8212;&#x41;&bogus;"), "\u{2014}A&bogus;");
    }

    #[test]
    fn resolves_protocol_relative_links() {
        assert_eq!(resolve_link("//example.com/a"), "https://example.com/a");
        assert_eq!(resolve_link("/l/?uddg=https%3A%2F%2Fx.org%2Fp&rut=1"), "https://x.org/p");
        assert_eq!(resolve_link("/local"), "");
    }

    #[tokio::test]
    async fn posts_form_and_parses_response() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/html/")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("q=rust%20lang&b=");
            then.status(200).body(PAGE);
        });

        let outcome = provider_for(&server, 2_000).search("rust lang", 2).await;
        m.assert();
        match outcome {
            SearchOutcome::Success(items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].title, "Rust Programming Language");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_error_status_is_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/html/");
            then.status(403).body("forbidden");
        });

        let outcome = provider_for(&server, 2_000).search("x", 5).await;
        assert_eq!(
            outcome,
            SearchOutcome::Failure("upstream status 403 Forbidden".into())
        );
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/html/");
            then.status(503);
        });

        let provider = DuckDuckGoProvider::from_config(&ToolConfig {
            base_url: Some(server.base_url()),
            retries: Some(2),
            ..Default::default()
        })
        .unwrap();
        let outcome = provider.search("x", 5).await;
        m.assert_hits(3);
        assert!(matches!(outcome, SearchOutcome::Failure(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn slow_upstream_is_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/html/");
            then.status(200).body(PAGE).delay(Duration::from_millis(800));
        });

        let outcome = provider_for(&server, 100).search("slow", 5).await;
        assert_eq!(outcome, SearchOutcome::Timeout);
    }
}
