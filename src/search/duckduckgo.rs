use std::sync::LazyLock;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::{SearchError, SearchHit, SearchProvider};
use crate::settings::SearchSettings;

static RESULT_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.result").unwrap());
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a.result__a").unwrap());
static SNIPPET_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").unwrap());

/// DuckDuckGo's HTML results page, fetched with a blocking client.
pub struct DuckDuckGo {
    client: Client,
    endpoint: String,
    region: Option<String>,
}

impl DuckDuckGo {
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(DuckDuckGo {
            client,
            endpoint: settings.endpoint.clone(),
            region: settings.region.clone(),
        })
    }
}

impl SearchProvider for DuckDuckGo {
    fn search(&mut self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let mut params = vec![("q", query)];
        if let Some(region) = self.region.as_deref() {
            params.push(("kl", region));
        }

        let response = self.client.get(&self.endpoint).query(&params).send()?;
        let status = response.status();
        // DuckDuckGo answers throttled clients with 202 and an empty page
        if status == StatusCode::ACCEPTED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            return Err(SearchError::RateLimited(status.as_u16()));
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let html = response.text()?;
        let hits = parse_results(&html, max_results);
        debug!(%query, hits = hits.len(), "search page parsed");
        Ok(hits)
    }
}

/// Organic results from a results page, ads excluded, at most `max`.
pub fn parse_results(html: &str, max: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    doc.select(&RESULT_SEL)
        .filter(|r| !r.value().classes().any(|c| c == "result--ad"))
        .filter_map(|r| {
            let link = r.select(&TITLE_SEL).next()?;
            Some(SearchHit {
                title: Some(element_text(&link)).filter(|t| !t.is_empty()),
                href: link.value().attr("href").map(resolve_href),
                body: r
                    .select(&SNIPPET_SEL)
                    .next()
                    .map(|s| element_text(&s))
                    .filter(|t| !t.is_empty()),
            })
        })
        .take(max)
        .collect()
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<Vec<_>>().join("").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unwrap `//duckduckgo.com/l/?uddg=<target>` redirects to the target URL.
fn resolve_href(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let Ok(url) = Url::parse(&absolute) else {
        return href.to_string();
    };
    let is_redirect = url
        .host_str()
        .is_some_and(|h| h.ends_with("duckduckgo.com"))
        && url.path().starts_with("/l/");
    if !is_redirect {
        return absolute;
    }
    url.query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.into_owned())
        .unwrap_or(absolute)
}
