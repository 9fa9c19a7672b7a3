use std::path::PathBuf;

use crate::config::Config;
use crate::pacing::Pacer;
use crate::records::{BookRecord, GoodreadsImport};
use crate::search::{BookFinder, Located};
use crate::session::Session;
use crate::status::StatusSetter;

#[derive(Debug, Clone, Default)]
pub struct OutboundReport {
    pub attempted: usize,
    pub synced: usize,
    pub failures: Vec<BookRecord>,
    /// Set when failures were written out.
    pub failure_file: Option<PathBuf>,
}

impl OutboundReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Push every imported record to Skoob: locate the book, then set its
/// status. Failures are collected and written once, after the last record.
pub async fn run(
    session: &Session,
    pacer: &dyn Pacer,
    config: &Config,
    import: &GoodreadsImport,
) -> anyhow::Result<OutboundReport> {
    let finder = BookFinder::new(session, pacer, config)?;
    let setter = StatusSetter::new(session, pacer, config);
    run_with(&finder, &setter, pacer, config, import).await
}

pub async fn run_with(
    finder: &BookFinder<'_>,
    setter: &StatusSetter<'_>,
    pacer: &dyn Pacer,
    config: &Config,
    import: &GoodreadsImport,
) -> anyhow::Result<OutboundReport> {
    let total = import.records.len();
    tracing::info!(books = total, "starting goodreads -> skoob sync");

    let mut report = OutboundReport::default();
    for (seq, record) in import.records.iter().enumerate() {
        if record.target_status.to_goodreads().is_none() {
            tracing::warn!(
                title = %record.title,
                status = %record.target_status,
                "skipping unsupported status"
            );
            continue;
        }

        tracing::info!(
            "[{}/{}] {} ({}) -> {}",
            seq + 1,
            total,
            record.title,
            record.author,
            record.target_status
        );
        report.attempted += 1;

        if sync_one(finder, setter, pacer, record).await {
            report.synced += 1;
        } else {
            report.failures.push(record.clone());
        }

        pacer.jitter().await;
    }

    if report.failures.is_empty() {
        tracing::info!(synced = report.synced, "all books synced");
    } else {
        crate::export::save_failures(
            &config.failed_books_file,
            &import.headers,
            &report.failures,
        )?;
        report.failure_file = Some(config.failed_books_file.clone());
        tracing::warn!(
            synced = report.synced,
            failed = report.failures.len(),
            path = %config.failed_books_file.display(),
            "sync finished with failures"
        );
    }

    Ok(report)
}

async fn sync_one(
    finder: &BookFinder<'_>,
    setter: &StatusSetter<'_>,
    pacer: &dyn Pacer,
    record: &BookRecord,
) -> bool {
    match finder.locate(record).await {
        Located::NotFound => {
            tracing::error!(
                title = %record.title,
                author = %record.author,
                "book not found on skoob"
            );
            false
        }
        Located::Found { via, .. } => {
            pacer.settle().await;
            if setter.set_status(record.target_status).await {
                tracing::info!(
                    title = %record.title,
                    status = %record.target_status,
                    strategy = via.as_str(),
                    "status set"
                );
                true
            } else {
                tracing::error!(
                    title = %record.title,
                    author = %record.author,
                    status = %record.target_status,
                    "could not set status"
                );
                false
            }
        }
    }
}
