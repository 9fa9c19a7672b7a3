use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Also append log lines to this file. A file of 10 MB or more is
    /// renamed aside with a timestamp before the run starts.
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sync between a Goodreads export and Skoob through a browser session.
    Sync(SyncArgs),
    /// Print the books a Goodreads export would sync, as JSON lines.
    Normalize(NormalizeArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Goodreads CSV -> Skoob statuses.
    ToSkoob,
    /// Skoob shelves -> Goodreads import CSV.
    ToGoodreads,
    Both,
}

impl Direction {
    pub fn outbound(self) -> bool {
        matches!(self, Self::ToSkoob | Self::Both)
    }

    pub fn inbound(self) -> bool {
        matches!(self, Self::ToGoodreads | Self::Both)
    }
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[arg(long, value_enum, default_value_t = Direction::ToSkoob)]
    pub direction: Direction,

    /// Goodreads export CSV (default: `goodreads_library_export.csv`).
    #[arg(long)]
    pub csv: Option<String>,

    /// YAML file overriding the default settings.
    #[arg(long)]
    pub config: Option<String>,

    /// Run the browser without a window. Login still needs a session, so
    /// this is only useful with a pre-authenticated WebDriver profile.
    #[arg(long)]
    pub headless: bool,

    /// Lower bound of the delay between remote requests.
    #[arg(long)]
    pub jitter_min_ms: Option<u64>,

    /// Upper bound of the delay between remote requests.
    #[arg(long)]
    pub jitter_max_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Goodreads export CSV.
    #[arg(long)]
    pub csv: String,
}
