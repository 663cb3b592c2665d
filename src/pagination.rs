//! Link-header pagination.
//!
//! List endpoints return a JSON array per page and advertise the next page
//! with `Link: <url>; rel="next"`. The total item count, when the server
//! knows it, arrives in `X-Total-Count` on the first page.

use std::time::Instant;

use reqwest::header::{HeaderMap, LINK};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::{ClientConfig, DEFAULT_MAX_PAGES};
use crate::error::{BasecampError, Result};
use crate::executor::{ApiRequest, CallOptions, Executor};
use crate::operation::{OperationDescriptor, OperationResult};
use crate::security::is_same_origin;

/// Header carrying the total number of items across all pages.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// A single page of results.
#[derive(Debug, Clone, Serialize)]
#[serde(bound = "T: Serialize")]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages (if the server said).
    pub total_count: Option<u64>,
    /// Absolute URL of the next page.
    pub next: Option<Url>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total_count: Option<u64>, next: Option<Url>) -> Self {
        Self {
            items,
            total_count,
            next,
        }
    }

    /// Whether the server advertised another page.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Map the items to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            next: self.next,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Bounds on a paginated fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Stop after this many pages.
    pub max_pages: usize,
    /// Stop once this many items are collected.
    pub max_items: Option<usize>,
    /// On a failure after at least one page, return what was collected
    /// instead of failing the whole call.
    pub allow_partial: bool,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
            max_items: None,
            allow_partial: false,
        }
    }
}

impl From<&ClientConfig> for PageLimits {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_pages: config.max_pages.max(1),
            max_items: config.max_items,
            allow_partial: false,
        }
    }
}

impl PageLimits {
    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    #[must_use]
    pub fn max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    #[must_use]
    pub fn allow_partial(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }
}

/// Everything collected by a paginated fetch.
#[derive(Debug)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// Server-reported total from the first page.
    pub total_count: Option<u64>,
    /// More items exist than were returned.
    pub truncated: bool,
    pub pages_fetched: usize,
    /// The failure that ended a partial fetch.
    pub partial_error: Option<BasecampError>,
}

impl<T> Default for ListResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total_count: None,
            truncated: false,
            pages_fetched: 0,
            partial_error: None,
        }
    }
}

impl<T> ListResult<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for ListResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Extract the `rel="next"` target from a `Link` header.
pub fn parse_next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|part| {
            let mut segments = part.split(';');
            let target = segments.next()?.trim();
            let is_next = segments.any(|param| {
                let param = param.trim();
                param
                    .strip_prefix("rel=")
                    .map(|rel| rel.trim_matches('"').split_whitespace().any(|r| r == "next"))
                    .unwrap_or(false)
            });
            if !is_next {
                return None;
            }
            target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
}

/// Read `X-Total-Count`.
pub fn parse_total_count(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(TOTAL_COUNT_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Fetch one page with full operation hooks.
///
/// A `next` link on another origin is refused, so [`Page::next`] can always
/// be followed with the same credentials.
pub(crate) async fn fetch_page<T: DeserializeOwned>(
    exec: &Executor,
    op: &OperationDescriptor,
    url: Url,
    opts: &CallOptions,
) -> Result<Page<T>> {
    let response = exec.execute(op, ApiRequest::get(url.clone()), opts).await?;
    let items = response.json()?;
    let next = next_url(&url, &response.headers)?;
    if let Some(next) = &next {
        ensure_same_origin(&url, next)?;
    }
    Ok(Page::new(items, parse_total_count(&response.headers), next))
}

fn ensure_same_origin(expected: &Url, found: &Url) -> Result<()> {
    if is_same_origin(expected, found) {
        return Ok(());
    }
    Err(BasecampError::PaginationOriginMismatch {
        expected: expected.origin().ascii_serialization(),
        found: found.origin().ascii_serialization(),
    })
}

/// Follow `Link` headers from `url`, collecting every page within `limits`.
///
/// Fires one operation start/end pair for the whole walk. The deadline in
/// `opts` spans all pages.
#[tracing::instrument(skip_all, fields(operation = %op.name()))]
pub(crate) async fn fetch_all<T: DeserializeOwned>(
    exec: &Executor,
    op: &OperationDescriptor,
    url: Url,
    limits: &PageLimits,
    opts: &CallOptions,
) -> Result<ListResult<T>> {
    let started = Instant::now();
    exec.hooks().on_operation_start(op);

    let result = walk(exec, op, url, limits, opts, started).await;

    exec.hooks().on_operation_end(
        op,
        &OperationResult {
            status: match &result {
                Ok(_) => Some(200),
                Err(err) => err.status(),
            },
            duration: started.elapsed(),
            error: result.as_ref().err(),
        },
    );
    result
}

async fn walk<T: DeserializeOwned>(
    exec: &Executor,
    op: &OperationDescriptor,
    initial: Url,
    limits: &PageLimits,
    opts: &CallOptions,
    started: Instant,
) -> Result<ListResult<T>> {
    let mut state = ListResult::default();
    let mut page_url = initial.clone();

    loop {
        let (items, headers) = match fetch_decoded::<T>(exec, op, &page_url, opts, started).await {
            Ok(page) => page,
            // Cancellation and an expired deadline end the walk, never a partial result.
            Err(err @ (BasecampError::Cancelled | BasecampError::Timeout(_))) => return Err(err),
            Err(err) if limits.allow_partial && state.pages_fetched > 0 => {
                tracing::warn!(
                    pages_fetched = state.pages_fetched,
                    error = %err,
                    "pagination stopped early, returning partial results"
                );
                state.truncated = true;
                state.partial_error = Some(err);
                return Ok(state);
            }
            Err(err) => return Err(err),
        };

        state.pages_fetched += 1;
        if state.pages_fetched == 1 {
            state.total_count = parse_total_count(&headers);
        }
        state.items.extend(items);

        let next = next_url(&page_url, &headers)?;

        if let Some(max) = limits.max_items {
            if state.items.len() >= max {
                state.truncated = state.items.len() > max || next.is_some();
                state.items.truncate(max);
                return Ok(state);
            }
        }

        let Some(next) = next else {
            return Ok(state);
        };

        if state.pages_fetched >= limits.max_pages {
            tracing::warn!(
                max_pages = limits.max_pages,
                items = state.items.len(),
                "pagination stopped at page limit"
            );
            state.truncated = true;
            return Ok(state);
        }

        ensure_same_origin(&initial, &next)?;
        page_url = next;
    }
}

/// One page through the breaker and retry loop, bounded by what is left of
/// the caller's deadline.
async fn fetch_decoded<T: DeserializeOwned>(
    exec: &Executor,
    op: &OperationDescriptor,
    url: &Url,
    opts: &CallOptions,
    started: Instant,
) -> Result<(Vec<T>, HeaderMap)> {
    let remaining = CallOptions {
        deadline: opts
            .deadline
            .map(|limit| limit.saturating_sub(started.elapsed())),
        cancel: opts.cancel.clone(),
    };

    match exec.call(op, ApiRequest::get(url.clone()), &remaining).await {
        Ok(response) => {
            let items: Vec<T> = response.json()?;
            Ok((items, response.headers))
        }
        Err(BasecampError::Timeout(_)) => Err(BasecampError::Timeout(
            opts.deadline.unwrap_or_default(),
        )),
        Err(err) => Err(err),
    }
}

fn next_url(current: &Url, headers: &HeaderMap) -> Result<Option<Url>> {
    match parse_next_link(headers) {
        Some(link) => Ok(Some(current.join(&link)?)),
        None => Ok(None),
    }
}
