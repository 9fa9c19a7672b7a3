use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub const WEBDRIVER_URL_ENV: &str = "SHELFSYNC_WEBDRIVER_URL";

/// Runtime settings. Every field has a default, so a YAML overlay only needs
/// the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub goodreads_export_file: PathBuf,
    pub failed_books_file: PathBuf,
    pub skoob_export_file: PathBuf,

    pub login_url: String,
    pub profile_home_url: String,
    /// `{query}` is replaced with the percent-encoded query.
    pub search_url_template: String,
    /// Placeholders: `{user_id}`, `{status_id}`, `{page}`, `{limit}`.
    pub shelf_endpoint_template: String,
    /// Regex a URL must match to count as a book detail page.
    pub detail_url_pattern: String,

    pub selectors: Selectors,

    pub page_size: u32,
    pub settle_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub login_poll_ms: u64,
    pub login_timeout_secs: u64,

    pub webdriver_url: String,
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Selectors {
    pub result_card_links: Vec<String>,
    pub search_input: Vec<String>,
    pub autocomplete_items: Vec<String>,
    pub detail_anchors: String,
    pub logged_in_marker: String,
    /// Classes Skoob puts on a status button that is already selected.
    pub active_status_classes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            goodreads_export_file: PathBuf::from("goodreads_library_export.csv"),
            failed_books_file: PathBuf::from("failed_books.csv"),
            skoob_export_file: PathBuf::from("skoob_export_for_goodreads.csv"),
            login_url: "https://www.skoob.com.br/login".to_owned(),
            profile_home_url: "https://www.skoob.com.br/usuario/home".to_owned(),
            search_url_template: "https://www.skoob.com.br/livro/lista/busca:{query}".to_owned(),
            shelf_endpoint_template: "https://www.skoob.com.br/v1/bookcase/books/{user_id}/shelf_id:{status_id}/page:{page}/limit:{limit}".to_owned(),
            detail_url_pattern: r"/livro/(?:resenhas/)?\d+".to_owned(),
            selectors: Selectors::default(),
            page_size: 50,
            settle_ms: 1500,
            jitter_min_ms: 2500,
            jitter_max_ms: 5000,
            login_poll_ms: 1000,
            login_timeout_secs: 600,
            webdriver_url: "http://localhost:4444".to_owned(),
            headless: false,
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            result_card_links: vec![
                ".box_livro a".to_owned(),
                ".resultado-busca a[href*='/livro/']".to_owned(),
            ],
            search_input: vec![
                "input#search".to_owned(),
                "input[name='busca']".to_owned(),
                "header input[type='search']".to_owned(),
            ],
            autocomplete_items: vec![
                ".ui-autocomplete li a".to_owned(),
                "[role='listbox'] [role='option']".to_owned(),
            ],
            detail_anchors:
                ".box_livro a[href*='/livro/'], .resultado-busca a[href*='/livro/']".to_owned(),
            logged_in_marker: "#topo-user".to_owned(),
            active_status_classes: vec!["ativo".to_owned(), "active".to_owned()],
        }
    }
}

impl Config {
    /// Defaults, overlaid with `path` (YAML) when given, then with the
    /// environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("read config: {}", path.display()))?;
                Self::from_yaml(&raw)
                    .with_context(|| format!("parse config: {}", path.display()))?
            }
            None => Self::default(),
        };
        if let Ok(url) = std::env::var(WEBDRIVER_URL_ENV)
            && !url.trim().is_empty()
        {
            config.webdriver_url = url.trim().to_owned();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("deserialize config yaml")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jitter_min_ms > self.jitter_max_ms {
            anyhow::bail!(
                "jitter_min_ms ({}) must not exceed jitter_max_ms ({})",
                self.jitter_min_ms,
                self.jitter_max_ms
            );
        }
        if self.page_size == 0 {
            anyhow::bail!("page_size must be > 0");
        }
        if !self.search_url_template.contains("{query}") {
            anyhow::bail!("search_url_template must contain {{query}}");
        }
        regex::Regex::new(&self.detail_url_pattern).context("compile detail_url_pattern")?;
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn jitter_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.jitter_min_ms),
            Duration::from_millis(self.jitter_max_ms),
        )
    }

    pub fn search_url(&self, query: &str) -> String {
        let encoded = url::form_urlencoded::byte_serialize(query.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        self.search_url_template.replace("{query}", &encoded)
    }

    pub fn shelf_url(&self, user_id: &str, status_id: u8, page: u32, limit: u32) -> String {
        self.shelf_endpoint_template
            .replace("{user_id}", user_id)
            .replace("{status_id}", &status_id.to_string())
            .replace("{page}", &page.to_string())
            .replace("{limit}", &limit.to_string())
    }
}
