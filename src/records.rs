use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use crate::mapping::{GoodreadsShelf, SkoobStatus};

pub const ISBN13_COLUMN: &str = "ISBN13";
pub const ISBN_COLUMN: &str = "ISBN";
pub const SHELF_COLUMN: &str = "Exclusive Shelf";
pub const TITLE_COLUMN: &str = "Title";
pub const AUTHOR_COLUMN: &str = "Author";

const REQUIRED_COLUMNS: [&str; 2] = [ISBN13_COLUMN, SHELF_COLUMN];

/// One book from the Goodreads export, ready to be pushed to Skoob.
#[derive(Debug, Clone, Serialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub identifier: Option<String>,
    pub shelf: GoodreadsShelf,
    pub target_status: SkoobStatus,
    /// Original CSV fields, in header order.
    #[serde(skip)]
    pub row: Vec<String>,
}

/// The normalized import: the original header plus the rows that survived
/// filtering.
#[derive(Debug, Clone)]
pub struct GoodreadsImport {
    pub headers: Vec<String>,
    pub records: Vec<BookRecord>,
    pub total_rows: usize,
}

pub fn load_goodreads_csv(path: &Path) -> anyhow::Result<GoodreadsImport> {
    if !path.exists() {
        anyhow::bail!("goodreads export not found: {}", path.display());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("open goodreads export: {}", path.display()))?;
    let import = read_goodreads_csv(file)
        .with_context(|| format!("read goodreads export: {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        rows = import.total_rows,
        relevant = import.records.len(),
        "loaded goodreads export"
    );
    Ok(import)
}

pub fn read_goodreads_csv<R: std::io::Read>(reader: R) -> anyhow::Result<GoodreadsImport> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader
        .headers()
        .context("read csv header")?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_owned())
        .collect::<Vec<_>>();

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            anyhow::bail!("required column '{column}' not found in csv");
        }
    }
    let column = |name: &str| headers.iter().position(|h| h == name);
    let isbn13 = column(ISBN13_COLUMN);
    let isbn = column(ISBN_COLUMN);
    let shelf = column(SHELF_COLUMN);
    let title = column(TITLE_COLUMN);
    let author = column(AUTHOR_COLUMN);

    let mut records = Vec::new();
    let mut total_rows = 0_usize;
    for (index, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("parse csv row {}", index + 2))?;
        total_rows += 1;

        let field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("").trim();

        let raw_shelf = field(shelf);
        let Some((shelf, target_status)) = GoodreadsShelf::parse(raw_shelf)
            .and_then(|shelf| shelf.to_skoob().map(|status| (shelf, status)))
        else {
            tracing::debug!(row = index + 2, shelf = raw_shelf, "skipping unmapped shelf");
            continue;
        };

        let mut identifier = clean_isbn(field(isbn13));
        if identifier.is_empty() {
            identifier = clean_isbn(field(isbn));
        }

        records.push(BookRecord {
            title: non_empty_or(field(title), "Unknown Title"),
            author: non_empty_or(field(author), "Unknown Author"),
            identifier: (!identifier.is_empty()).then_some(identifier),
            shelf,
            target_status,
            row: row.iter().map(str::to_owned).collect(),
        });
    }

    Ok(GoodreadsImport {
        headers,
        records,
        total_rows,
    })
}

/// Goodreads wraps ISBNs as `="9780261103344"`; keep only the digits, plus
/// the `X` check digit of an ISBN-10.
pub fn clean_isbn(raw: &str) -> String {
    let mut isbn = raw.chars().filter(char::is_ascii_digit).collect::<String>();
    let last = raw
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .chars()
        .last();
    if isbn.len() == 9 && matches!(last, Some('x' | 'X')) {
        isbn.push('X');
    }
    isbn
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_owned()
    } else {
        value.to_owned()
    }
}
