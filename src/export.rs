use std::path::Path;

use anyhow::Context as _;

use crate::records::BookRecord;
use crate::shelf::ScrapedBook;

/// Column order of the Goodreads import template.
pub const GOODREADS_IMPORT_COLUMNS: [&str; 14] = [
    "Title",
    "Author",
    "ISBN",
    "My Rating",
    "Average Rating",
    "Publisher",
    "Binding",
    "Year Published",
    "Original Publication Year",
    "Date Read",
    "Date Added",
    "Shelves",
    "Bookshelves",
    "My Review",
];

fn goodreads_row(book: &ScrapedBook) -> [&str; 14] {
    fn opt(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or("")
    }
    [
        book.title.as_str(),
        book.author.as_str(),
        opt(&book.identifier),
        opt(&book.user_rating),
        "",
        opt(&book.publisher),
        "",
        opt(&book.year_published),
        "",
        opt(&book.date_read),
        "",
        book.resolved_shelf.as_str(),
        "",
        "",
    ]
}

pub fn write_goodreads_import<W: std::io::Write>(
    writer: W,
    books: &[ScrapedBook],
) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(GOODREADS_IMPORT_COLUMNS)
        .context("write goodreads header")?;
    for book in books {
        csv.write_record(goodreads_row(book))
            .with_context(|| format!("write goodreads row: {}", book.title))?;
    }
    csv.flush().context("flush goodreads csv")?;
    Ok(())
}

/// Failed records go back out in the import's own header and row shape so
/// the file can be fed to a later run.
pub fn write_failures<W: std::io::Write>(
    writer: W,
    headers: &[String],
    failures: &[BookRecord],
) -> anyhow::Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);
    csv.write_record(headers).context("write failure header")?;
    for record in failures {
        csv.write_record(&record.row)
            .with_context(|| format!("write failure row: {}", record.title))?;
    }
    csv.flush().context("flush failure csv")?;
    Ok(())
}

pub fn export_goodreads_csv(path: &Path, books: &[ScrapedBook]) -> anyhow::Result<()> {
    write_atomic(path, |file| write_goodreads_import(file, books))?;
    tracing::info!(path = %path.display(), books = books.len(), "exported goodreads csv");
    Ok(())
}

pub fn save_failures(
    path: &Path,
    headers: &[String],
    failures: &[BookRecord],
) -> anyhow::Result<()> {
    write_atomic(path, |file| write_failures(file, headers, failures))?;
    tracing::warn!(path = %path.display(), failures = failures.len(), "saved failed books");
    Ok(())
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomic(
    path: &Path,
    write: impl FnOnce(&mut std::fs::File) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let mut file = std::fs::File::create(&tmp_path)
        .with_context(|| format!("create tmp: {}", tmp_path.display()))?;
    if let Err(err) = write(&mut file) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err);
    }
    file.sync_all()
        .with_context(|| format!("sync tmp: {}", tmp_path.display()))?;
    drop(file);
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{GoodreadsShelf, SkoobStatus};

    fn scraped(title: &str) -> ScrapedBook {
        ScrapedBook {
            title: title.to_owned(),
            author: "Machado de Assis".to_owned(),
            identifier: None,
            user_rating: Some("5".to_owned()),
            date_read: Some("2020/02/01".to_owned()),
            publisher: None,
            year_published: None,
            resolved_shelf: GoodreadsShelf::Read,
        }
    }

    #[test]
    fn goodreads_import_has_fixed_columns() -> anyhow::Result<()> {
        let mut out = Vec::new();
        write_goodreads_import(&mut out, &[scraped("Dom Casmurro, 2a ed.")])?;
        let text = String::from_utf8(out)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "Title,Author,ISBN,My Rating,Average Rating,Publisher,Binding,Year Published,Original Publication Year,Date Read,Date Added,Shelves,Bookshelves,My Review"
            )
        );
        assert_eq!(
            lines.next(),
            Some("\"Dom Casmurro, 2a ed.\",Machado de Assis,,5,,,,,,2020/02/01,,read,,")
        );
        Ok(())
    }

    #[test]
    fn failures_keep_import_row_shape() -> anyhow::Result<()> {
        let headers = vec!["Title".to_owned(), "ISBN13".to_owned(), "Exclusive Shelf".to_owned()];
        let record = BookRecord {
            title: "Duna".to_owned(),
            author: "Frank Herbert".to_owned(),
            identifier: Some("123".to_owned()),
            shelf: GoodreadsShelf::Read,
            target_status: SkoobStatus::Read,
            row: vec!["Duna".to_owned(), "=\"123\"".to_owned(), "read".to_owned()],
        };
        let mut out = Vec::new();
        write_failures(&mut out, &headers, &[record])?;
        let text = String::from_utf8(out)?;
        assert_eq!(text, "Title,ISBN13,Exclusive Shelf\nDuna,\"=\"\"123\"\"\",read\n");
        Ok(())
    }

    #[test]
    fn export_replaces_existing_file() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("out").join("export.csv");
        std::fs::create_dir_all(path.parent().expect("parent"))?;
        std::fs::write(&path, "stale")?;

        export_goodreads_csv(&path, &[scraped("Memórias Póstumas")])?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with("Title,Author,ISBN"));
        assert!(text.contains("Memórias Póstumas"));
        let leftovers = std::fs::read_dir(path.parent().expect("parent"))?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }
}
