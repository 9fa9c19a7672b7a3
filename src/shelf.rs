use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, USER_AGENT};
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::mapping::{GoodreadsShelf, SkoobStatus};
use crate::pacing::Pacer;

/// One entry read back from a Skoob shelf. Any field may be empty; the
/// bookcase endpoint has no published schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedBook {
    pub title: String,
    pub author: String,
    pub identifier: Option<String>,
    pub user_rating: Option<String>,
    pub date_read: Option<String>,
    pub publisher: Option<String>,
    pub year_published: Option<String>,
    pub resolved_shelf: GoodreadsShelf,
}

/// Fetches raw bookcase pages.
#[async_trait]
pub trait ShelfSource: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Reads the bookcase endpoint with the browser session's cookies.
#[derive(Debug, Clone)]
pub struct HttpShelfSource {
    client: reqwest::Client,
    cookie_header: Option<String>,
}

impl HttpShelfSource {
    pub fn new(cookie_header: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build shelf http client")?;
        Ok(Self {
            client,
            cookie_header: cookie_header.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[async_trait]
impl ShelfSource for HttpShelfSource {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, "shelfsync/0.1")
            .header(ACCEPT, "application/json, text/plain;q=0.9, */*;q=0.8");
        if let Some(cookie) = self.cookie_header.as_deref() {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await.with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        response.text().await.context("read shelf response body")
    }
}

/// A parsed bookcase page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfPage {
    pub books: Vec<ScrapedBook>,
    /// Raw item count, including items the extractor dropped.
    pub item_count: usize,
    pub total_pages: Option<u32>,
    pub has_next: Option<bool>,
}

pub fn parse_page(
    raw: &str,
    shelf: GoodreadsShelf,
    page_size: u32,
) -> anyhow::Result<ShelfPage> {
    let value: Value = serde_json::from_str(raw).context("parse shelf page json")?;
    let Some(root) = value.as_object() else {
        anyhow::bail!("shelf page json is not an object");
    };

    let items = root
        .get("response")
        .or_else(|| root.get("items"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let books = items
        .iter()
        .filter_map(|item| extract_book(item, shelf))
        .collect::<Vec<_>>();
    if books.len() < items.len() {
        tracing::debug!(
            dropped = items.len() - books.len(),
            "dropped shelf items without edition metadata"
        );
    }

    let paging = root.get("paging");
    let total_pages = paging
        .and_then(|p| p.get("total_pages").or_else(|| p.get("pages")))
        .or_else(|| root.get("total_pages"))
        .and_then(as_u32)
        .or_else(|| {
            let total = paging.and_then(|p| p.get("total")).and_then(as_u32)?;
            Some(total.div_ceil(page_size.max(1)))
        });
    let has_next = paging
        .and_then(|p| p.get("next_page"))
        .and_then(Value::as_bool);

    Ok(ShelfPage {
        books,
        item_count: items.len(),
        total_pages,
        has_next,
    })
}

/// Map one bookcase item. Items without the `edicao` block are unusable
/// and dropped; every other field is optional.
pub fn extract_book(item: &Value, shelf: GoodreadsShelf) -> Option<ScrapedBook> {
    let edition = item.get("edicao").filter(|e| e.is_object())?;

    let title = first_text(edition, &["titulo", "nome_portugues", "title"]).unwrap_or_default();
    let author = first_text(edition, &["autor", "author"]).unwrap_or_default();
    let identifier = first_text(edition, &["isbn", "isbn13", "isbn10"])
        .map(|isbn| crate::records::clean_isbn(&isbn))
        .filter(|isbn| !isbn.is_empty());

    Some(ScrapedBook {
        title,
        author,
        identifier,
        user_rating: item
            .get("ranking")
            .or_else(|| item.get("rating"))
            .and_then(rating),
        date_read: first_text(item, &["dt_leitura", "date_read"])
            .and_then(|raw| goodreads_date(&raw)),
        publisher: first_text(edition, &["editora", "publisher"]),
        year_published: first_text(edition, &["ano", "year"]).filter(|y| y != "0"),
        resolved_shelf: shelf,
    })
}

fn first_text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match value.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Goodreads ratings are whole stars 1..=5; 0 means unrated.
fn rating(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some((raw.round() as u8).clamp(1, 5).to_string())
}

/// `2023-05-10 00:00:00` becomes `2023/05/10`. Zero dates mean unset.
fn goodreads_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("0000") {
        return None;
    }
    let date_part = raw.get(..10).unwrap_or(raw);
    match chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date.format("%Y/%m/%d").to_string()),
        Err(_) => Some(raw.to_owned()),
    }
}

/// Lazily walks one shelf, page by page, until the endpoint runs out.
pub struct ShelfPaginator<'a> {
    source: &'a dyn ShelfSource,
    pacer: &'a dyn Pacer,
    config: &'a Config,
    user_id: String,
    status: SkoobStatus,
    shelf: GoodreadsShelf,
    page_size: u32,
    next_page: u32,
    requests: u32,
    pages_with_content: u32,
    finished: bool,
    previous: Option<Vec<ScrapedBook>>,
    buffer: VecDeque<ScrapedBook>,
}

impl<'a> ShelfPaginator<'a> {
    pub fn new(
        source: &'a dyn ShelfSource,
        pacer: &'a dyn Pacer,
        config: &'a Config,
        user_id: impl Into<String>,
        status: SkoobStatus,
        shelf: GoodreadsShelf,
    ) -> Self {
        Self {
            source,
            pacer,
            config,
            user_id: user_id.into(),
            status,
            shelf,
            page_size: config.page_size.max(1),
            next_page: 1,
            requests: 0,
            pages_with_content: 0,
            finished: false,
            previous: None,
            buffer: VecDeque::new(),
        }
    }

    /// HTTP requests issued so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Pages that returned at least one item.
    pub fn pages_with_content(&self) -> u32 {
        self.pages_with_content
    }

    pub async fn next_book(&mut self) -> Option<ScrapedBook> {
        loop {
            if let Some(book) = self.buffer.pop_front() {
                return Some(book);
            }
            let page = self.next_page().await?;
            self.buffer.extend(page);
        }
    }

    /// Next page of books. `None` once the shelf is exhausted.
    pub async fn next_page(&mut self) -> Option<Vec<ScrapedBook>> {
        if self.finished {
            return None;
        }

        let page_number = self.next_page;
        if page_number > 1 {
            self.pacer.jitter().await;
        }

        let url = self.config.shelf_url(
            &self.user_id,
            self.status.shelf_id(),
            page_number,
            self.page_size,
        );
        tracing::debug!(shelf = %self.status, page = page_number, %url, "fetching shelf page");
        self.requests += 1;

        let parsed = match self.source.fetch(&url).await {
            Ok(raw) => parse_page(&raw, self.shelf, self.page_size),
            Err(err) => Err(err),
        };
        let page = match parsed {
            Ok(page) => page,
            Err(err) => {
                self.finished = true;
                if page_number == 1 {
                    tracing::warn!(
                        shelf = %self.status,
                        ?err,
                        "shelf endpoint unreadable; the bookcase API may have changed"
                    );
                } else {
                    tracing::warn!(
                        shelf = %self.status,
                        page = page_number,
                        ?err,
                        "stopping shelf early"
                    );
                }
                return None;
            }
        };

        if page.item_count == 0 {
            self.finished = true;
            tracing::debug!(shelf = %self.status, page = page_number, "empty page; end of shelf");
            return None;
        }
        if self.previous.as_ref() == Some(&page.books) {
            self.finished = true;
            tracing::debug!(
                shelf = %self.status,
                page = page_number,
                "page repeats the previous one; end of shelf"
            );
            return None;
        }

        self.pages_with_content += 1;
        tracing::info!(
            shelf = %self.status,
            page = page_number,
            books = page.books.len(),
            "read shelf page"
        );

        let reached_total = page.total_pages.is_some_and(|total| page_number >= total);
        if reached_total || page.has_next == Some(false) {
            self.finished = true;
        }
        self.next_page = page_number.saturating_add(1);
        self.previous = Some(page.books.clone());
        Some(page.books)
    }

    /// Read every remaining book on the shelf.
    pub async fn drain(&mut self) -> Vec<ScrapedBook> {
        let mut books = self.buffer.drain(..).collect::<Vec<_>>();
        while let Some(page) = self.next_page().await {
            books.extend(page);
        }
        books
    }
}
