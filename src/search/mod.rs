pub mod duckduckgo;

use std::thread;
use std::time::Duration;

use clap::ValueEnum;
use indicatif::ProgressBar;
use itertools::Itertools;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::Result;
use crate::settings::SearchSettings;
use crate::table::{Cell, Table};

/// Results requested per query; only the first is kept.
pub const MAX_RESULTS: usize = 1;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited (HTTP {0})")]
    RateLimited(u16),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// One raw search hit. Providers may leave any field out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHit {
    pub title: Option<String>,
    pub href: Option<String>,
    pub body: Option<String>,
}

pub trait SearchProvider {
    fn search(&mut self, query: &str, max_results: usize) -> std::result::Result<Vec<SearchHit>, SearchError>;
}

/// Retry and throttling parameters for one collection run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    /// Total attempts per query.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub inter_call_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            inter_call_delay: Duration::from_secs(2),
        }
    }
}

impl From<&SearchSettings> for Pacing {
    fn from(s: &SearchSettings) -> Self {
        Pacing {
            max_retries: s.max_retries,
            retry_delay: Duration::from_secs(s.retry_delay_secs),
            inter_call_delay: Duration::from_secs(s.inter_call_delay_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum OutputColumn {
    Title,
    Href,
    Body,
}

impl OutputColumn {
    pub const ALL: [OutputColumn; 3] = [OutputColumn::Title, OutputColumn::Href, OutputColumn::Body];

    pub fn name(self) -> &'static str {
        match self {
            OutputColumn::Title => "title",
            OutputColumn::Href => "href",
            OutputColumn::Body => "body",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub title: String,
    pub href: String,
    pub body: String,
}

impl From<SearchHit> for ResultRow {
    fn from(hit: SearchHit) -> Self {
        ResultRow {
            title: hit.title.unwrap_or_default(),
            href: hit.href.unwrap_or_default(),
            body: hit.body.unwrap_or_default(),
        }
    }
}

impl ResultRow {
    fn get(&self, column: OutputColumn) -> &str {
        match column {
            OutputColumn::Title => &self.title,
            OutputColumn::Href => &self.href,
            OutputColumn::Body => &self.body,
        }
    }
}

/// A row whose query never produced a hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub row: usize,
    pub query: String,
    pub attempts: u32,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Collection {
    pub results: Vec<ResultRow>,
    pub failures: Vec<SearchFailure>,
}

impl Collection {
    pub fn to_table(&self, columns: &[OutputColumn]) -> Table {
        Table::with_rows(
            columns.iter().map(|c| c.name()),
            self.results
                .iter()
                .map(|r| columns.iter().map(|&c| Cell::text(r.get(c))).collect()),
        )
    }
}

/// Non-null values joined by a single space, in column order.
pub fn build_query(values: &[Cell]) -> String {
    values.iter().filter(|v| !v.is_null()).join(" ")
}

/// Search each row of `table` (restricted to `query_columns`) and keep
/// the first hit per row.
///
/// Calls are strictly sequential. A row that fails every attempt is
/// recorded in [`Collection::failures`] and the run moves on.
pub fn collect<P: SearchProvider>(
    table: &Table,
    query_columns: &[String],
    provider: &mut P,
    pacing: &Pacing,
    progress: &ProgressBar,
) -> Result<Collection> {
    let selected = table.select(query_columns)?;
    let mut out = Collection::default();
    progress.set_length(selected.len() as u64);

    for (row, values) in selected.rows().iter().enumerate() {
        let query = build_query(values);
        if query.is_empty() {
            warn!(row, "no query text; skipping");
            out.failures.push(SearchFailure {
                row,
                query,
                attempts: 0,
                reason: "all query columns are empty".into(),
            });
        } else {
            match search_with_retry(provider, &query, pacing) {
                Ok(hit) => out.results.push(hit.into()),
                Err((attempts, reason)) => {
                    warn!(row, %query, attempts, %reason, "giving up on query");
                    out.failures.push(SearchFailure {
                        row,
                        query,
                        attempts,
                        reason,
                    });
                }
            }
        }

        progress.inc(1);
        thread::sleep(pacing.inter_call_delay);
    }
    progress.finish_and_clear();

    info!(
        rows = selected.len(),
        results = out.results.len(),
        failures = out.failures.len(),
        "search collection finished"
    );
    Ok(out)
}

fn search_with_retry<P: SearchProvider>(
    provider: &mut P,
    query: &str,
    pacing: &Pacing,
) -> std::result::Result<SearchHit, (u32, String)> {
    let attempts = pacing.max_retries.max(1);
    let mut reason = String::new();

    for attempt in 1..=attempts {
        match provider.search(query, MAX_RESULTS) {
            Ok(hits) => match hits.into_iter().next() {
                Some(first) => return Ok(first),
                None => reason = "no results".to_string(),
            },
            Err(e) => reason = e.to_string(),
        }

        if attempt < attempts {
            warn!(
                %query,
                attempt,
                max = attempts,
                %reason,
                "retrying in {:.1}s",
                pacing.retry_delay.as_secs_f64()
            );
            thread::sleep(pacing.retry_delay);
        }
    }

    Err((attempts, reason))
}
