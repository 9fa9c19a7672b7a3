use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;

use shelfsync::browser::{Browser, WebDriverBrowser};
use shelfsync::cli::{Cli, Command, NormalizeArgs, SyncArgs};
use shelfsync::config::Config;
use shelfsync::pacing::Jitter;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    shelfsync::logging::init(cli.log_file.as_deref().map(Path::new)).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        Command::Sync(args) => sync(args).await.context("sync")?,
        Command::Normalize(args) => normalize(args).context("normalize")?,
    }

    Ok(())
}

fn normalize(args: NormalizeArgs) -> anyhow::Result<()> {
    let import = shelfsync::records::load_goodreads_csv(Path::new(&args.csv))?;
    let mut out = std::io::stdout().lock();
    for record in &import.records {
        let line = serde_json::to_string(record).context("serialize record")?;
        writeln!(out, "{line}").context("write stdout")?;
    }
    Ok(())
}

fn load_config(args: &SyncArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(args.config.as_deref().map(Path::new))?;
    if let Some(csv) = &args.csv {
        config.goodreads_export_file = csv.into();
    }
    if let Some(ms) = args.jitter_min_ms {
        config.jitter_min_ms = ms;
    }
    if let Some(ms) = args.jitter_max_ms {
        config.jitter_max_ms = ms;
    }
    if args.headless {
        config.headless = true;
    }
    config.validate()?;
    Ok(config)
}

async fn sync(args: SyncArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let import = if args.direction.outbound() {
        Some(shelfsync::records::load_goodreads_csv(
            &config.goodreads_export_file,
        )?)
    } else {
        None
    };

    let browser: Arc<dyn Browser> = Arc::new(WebDriverBrowser::connect(&config).await?);
    let session = match shelfsync::auth::wait_for_login(Arc::clone(&browser), &config).await {
        Ok(session) => session,
        Err(err) => {
            if let Err(close_err) = browser.close().await {
                tracing::warn!(?close_err, "close browser");
            }
            return Err(err.context("wait for login"));
        }
    };
    let pacer = Jitter::from_config(&config);

    let mut inbound_error = None;
    if let Some(import) = &import {
        let report = shelfsync::outbound::run(&session, &pacer, &config, import)
            .await
            .context("goodreads -> skoob");
        match report {
            Ok(report) => tracing::info!(
                attempted = report.attempted,
                synced = report.synced,
                failed = report.failures.len(),
                "goodreads -> skoob done"
            ),
            Err(err) => {
                close_session(&session).await;
                return Err(err);
            }
        }
    }

    if args.direction.inbound() {
        match shelfsync::inbound::run(&session, &pacer, &config).await {
            Ok(report) => tracing::info!(
                books = report.books.len(),
                file = ?report.export_file,
                "skoob -> goodreads done"
            ),
            Err(err) => {
                tracing::error!(?err, "skoob -> goodreads failed");
                inbound_error = Some(err.context("skoob -> goodreads"));
            }
        }
    }

    close_session(&session).await;
    match inbound_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn close_session(session: &shelfsync::session::Session) {
    if let Err(err) = session.close().await {
        tracing::warn!(?err, "close browser");
    }
}
