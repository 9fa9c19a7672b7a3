use std::path::PathBuf;

use crate::config::Config;
use crate::mapping::SkoobStatus;
use crate::pacing::Pacer;
use crate::session::Session;
use crate::shelf::{HttpShelfSource, ScrapedBook, ShelfPaginator, ShelfSource};

#[derive(Debug, Clone, Default)]
pub struct InboundReport {
    /// Books read per shelf, in the order the shelves were walked.
    pub shelves: Vec<(SkoobStatus, usize)>,
    pub books: Vec<ScrapedBook>,
    /// Set when the Goodreads import file was written.
    pub export_file: Option<PathBuf>,
}

/// Read every syncable Skoob shelf with the session's cookies and write a
/// Goodreads import file.
pub async fn run(
    session: &Session,
    pacer: &dyn Pacer,
    config: &Config,
) -> anyhow::Result<InboundReport> {
    let user_id = require_user_id(session)?;
    let cookies = match session.browser().cookie_header().await {
        Ok(cookies) => Some(cookies),
        Err(err) => {
            tracing::warn!(?err, "could not read session cookies; reading shelves anonymously");
            None
        }
    };
    let source = HttpShelfSource::new(cookies)?;
    run_with(&source, pacer, config, user_id).await
}

fn require_user_id(session: &Session) -> anyhow::Result<&str> {
    session.user_id().ok_or_else(|| {
        anyhow::anyhow!(
            "no Skoob user id available, cannot read shelves; after logging in, open your profile so the id appears in the url"
        )
    })
}

pub async fn run_with(
    source: &dyn ShelfSource,
    pacer: &dyn Pacer,
    config: &Config,
    user_id: &str,
) -> anyhow::Result<InboundReport> {
    if user_id.trim().is_empty() {
        anyhow::bail!("no Skoob user id available, cannot read shelves");
    }

    let mut report = InboundReport::default();
    for (index, (status, shelf)) in SkoobStatus::syncable().enumerate() {
        if index > 0 {
            pacer.jitter().await;
        }
        tracing::info!(%status, shelf = %shelf, "reading skoob shelf");

        let mut paginator = ShelfPaginator::new(source, pacer, config, user_id, status, shelf);
        let books = paginator.drain().await;
        tracing::info!(
            %status,
            books = books.len(),
            pages = paginator.pages_with_content(),
            "finished skoob shelf"
        );
        report.shelves.push((status, books.len()));
        report.books.extend(books);
    }

    if report.books.is_empty() {
        tracing::warn!("no books found on any skoob shelf");
        return Ok(report);
    }

    crate::export::export_goodreads_csv(&config.skoob_export_file, &report.books)?;
    report.export_file = Some(config.skoob_export_file.clone());
    Ok(report)
}
