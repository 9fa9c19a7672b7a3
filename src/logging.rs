use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt as _};

/// A log file at least this large is set aside before a run appends to it.
pub const LOG_ROTATE_BYTES: u64 = 10 * 1024 * 1024;

pub fn init(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
        .context("build log filter")?;

    let writer = match log_file {
        Some(path) => {
            rotate_if_large(path, LOG_ROTATE_BYTES)?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file: {}", path.display()))?;
            BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(log_file.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

/// Rename `path` to `<stem>.<timestamp>.<ext>` when it has grown to
/// `max_bytes`. Returns the rotated file's path.
pub fn rotate_if_large(path: &Path, max_bytes: u64) -> anyhow::Result<Option<PathBuf>> {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("stat log file: {}", path.display()));
        }
    };
    if size < max_bytes {
        return Ok(None);
    }

    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S_%6f");
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_owned());
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{stamp}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{stamp}"),
    };
    let rotated = path.with_file_name(name);
    std::fs::rename(path, &rotated)
        .with_context(|| format!("rotate log file: {}", path.display()))?;
    Ok(Some(rotated))
}
