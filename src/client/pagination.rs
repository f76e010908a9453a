//! Cursor-based pagination shared by every list endpoint.
//!
//! A page request carries a page size (at most [`MAX_PAGE_SIZE`]) and an opaque
//! continuation token; `None` asks for the first page. The response carries the
//! next token, or `None` at the end of the stream. Tokens expire after
//! [`PAGE_TOKEN_LIFETIME_MINUTES`]; using an expired one yields
//! [`ZoomError::InvalidPageToken`] instead of restarting from the first page.

use std::future::Future;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ZoomError;

pub const MAX_PAGE_SIZE: u32 = 300;
pub const DEFAULT_PAGE_SIZE: u32 = 30;
pub const PAGE_TOKEN_LIFETIME_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: u32,
    pub next_page_token: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

impl PageRequest {
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            next_page_token: None,
        }
    }

    /// The request for the page after this one.
    pub fn next(&self, token: impl Into<String>) -> Self {
        Self {
            page_size: self.page_size,
            next_page_token: Some(token.into()),
        }
    }

    pub(crate) fn to_query(&self) -> Result<Vec<(&'static str, String)>, ZoomError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ZoomError::InvalidPageSize {
                requested: self.page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        let mut query = vec![("page_size", self.page_size.to_string())];
        if let Some(token) = &self.next_page_token {
            query.push(("next_page_token", token.clone()));
        }
        Ok(query)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub next_page_token: Option<String>,
    pub page_size: u32,
    pub total_records: Option<u64>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next_page_token.is_none()
    }
}

#[derive(Deserialize)]
struct PageEnvelope {
    #[serde(default)]
    page_size: u32,
    #[serde(default)]
    total_records: Option<u64>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Splits a list response into its records (found under `key`) and the cursor fields.
pub(crate) fn parse_page<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<Page<T>, ZoomError> {
    let records = match body.get_mut(key).map(Value::take) {
        Some(Value::Null) | None => Vec::new(),
        Some(raw) => serde_json::from_value(raw)?,
    };
    let envelope: PageEnvelope = serde_json::from_value(body)?;

    Ok(Page {
        records,
        // The API sends "" on the last page.
        next_page_token: envelope.next_page_token.filter(|t| !t.is_empty()),
        page_size: envelope.page_size,
        total_records: envelope.total_records,
    })
}

/// Walks pages until the stream ends or `max_records` have been gathered.
///
/// Cancellation is checked before every page.
pub async fn collect_all<T, F, Fut>(
    page_size: u32,
    max_records: Option<usize>,
    cancel: &CancellationToken,
    mut fetch: F,
) -> Result<Vec<T>, ZoomError>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>, ZoomError>>,
{
    let mut request = PageRequest::first(page_size);
    let mut records = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Err(ZoomError::Cancelled);
        }
        let page = fetch(request.clone()).await?;
        records.extend(page.records);

        if let Some(max) = max_records
            && records.len() >= max
        {
            records.truncate(max);
            break;
        }
        match page.next_page_token {
            Some(token) => request = request.next(token),
            None => break,
        }
    }
    Ok(records)
}
