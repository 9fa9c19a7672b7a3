use std::sync::LazyLock;

use anyhow::Context as _;
use async_trait::async_trait;
use regex::Regex;

use crate::browser::{Browser, Locator};
use crate::config::Config;
use crate::pacing::Pacer;
use crate::records::BookRecord;
use crate::session::Session;

static TRAILING_PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"\s*\([^()]*\)\s*$") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    });

/// Drop one trailing `(...)` annotation, e.g. `"Duna (Crônicas de Duna #1)"`
/// becomes `"Duna"`. Titles without one are returned unchanged.
pub fn clean_title(title: &str) -> String {
    TRAILING_PARENTHETICAL.replace(title, "").into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Identifier,
    TitleAuthor,
    TitleOnly,
}

impl QueryKind {
    pub const CASCADE: [QueryKind; 3] = [Self::Identifier, Self::TitleAuthor, Self::TitleOnly];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::TitleAuthor => "title+author",
            Self::TitleOnly => "title",
        }
    }

    /// Query text for `record`, or `None` when it would be empty.
    pub fn query_for(self, record: &BookRecord) -> Option<String> {
        let query = match self {
            Self::Identifier => record.identifier.clone().unwrap_or_default(),
            Self::TitleAuthor => format!("{} {}", clean_title(&record.title), record.author),
            Self::TitleOnly => clean_title(&record.title),
        };
        let query = query.trim();
        (!query.is_empty()).then(|| query.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    Found { via: QueryKind, url: String },
    NotFound,
}

impl Located {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Matches canonical book detail URLs.
#[derive(Debug, Clone)]
pub struct DetailPattern(Regex);

impl DetailPattern {
    pub fn new(pattern: &str) -> anyhow::Result<Self> {
        Regex::new(pattern)
            .map(Self)
            .with_context(|| format!("compile detail url pattern: {pattern}"))
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.detail_url_pattern)
    }

    pub fn matches(&self, url: &str) -> bool {
        self.0.is_match(url)
    }
}

pub struct SurfaceContext<'a> {
    pub browser: &'a dyn Browser,
    pub pacer: &'a dyn Pacer,
    pub config: &'a Config,
    pub detail: &'a DetailPattern,
    pub query: &'a str,
}

/// One place a search result can show up. `open` returns `Ok(false)` when
/// the surface is not present on the page.
#[async_trait]
pub trait ResultSurface: Send + Sync {
    fn name(&self) -> &'static str;
    async fn open(&self, cx: &SurfaceContext<'_>) -> anyhow::Result<bool>;
}

/// Inline result cards on the search page; follows the first card.
pub struct ResultCards;

#[async_trait]
impl ResultSurface for ResultCards {
    fn name(&self) -> &'static str {
        "result-cards"
    }

    async fn open(&self, cx: &SurfaceContext<'_>) -> anyhow::Result<bool> {
        for selector in &cx.config.selectors.result_card_links {
            let locator = Locator::css(selector.as_str());
            if cx.browser.count(&locator).await? == 0 {
                continue;
            }
            cx.browser.click(&locator).await?;
            cx.browser.wait_for_load().await?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// The header search box's suggestion dropdown.
pub struct Autocomplete;

#[async_trait]
impl ResultSurface for Autocomplete {
    fn name(&self) -> &'static str {
        "autocomplete"
    }

    async fn open(&self, cx: &SurfaceContext<'_>) -> anyhow::Result<bool> {
        let mut input = None;
        for selector in &cx.config.selectors.search_input {
            let locator = Locator::css(selector.as_str());
            if cx.browser.count(&locator).await? > 0 {
                input = Some(locator);
                break;
            }
        }
        let Some(input) = input else {
            return Ok(false);
        };

        cx.browser.fill(&input, cx.query).await?;
        cx.pacer.settle().await;

        for selector in &cx.config.selectors.autocomplete_items {
            let locator = Locator::css(selector.as_str());
            if cx.browser.count(&locator).await? == 0 {
                continue;
            }
            cx.browser.click(&locator).await?;
            cx.browser.wait_for_load().await?;
            return Ok(true);
        }
        Ok(false)
    }
}

/// Detail-page anchors inside the result listing; navigates to the first one
/// directly. Links elsewhere on the page (header, featured books) are not
/// results and must not match.
pub struct DetailLinks;

#[async_trait]
impl ResultSurface for DetailLinks {
    fn name(&self) -> &'static str {
        "detail-links"
    }

    async fn open(&self, cx: &SurfaceContext<'_>) -> anyhow::Result<bool> {
        let anchors = Locator::css(cx.config.selectors.detail_anchors.as_str());
        let hrefs = cx.browser.attributes(&anchors, "href").await?;
        let Some(href) = hrefs.into_iter().find(|href| cx.detail.matches(href)) else {
            return Ok(false);
        };

        let current = cx.browser.current_url().await?;
        let target = resolve_href(&current, &href);
        cx.browser.goto(&target).await?;
        Ok(true)
    }
}

fn resolve_href(base: &str, href: &str) -> String {
    url::Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_owned())
}

pub fn default_surfaces() -> Vec<Box<dyn ResultSurface>> {
    vec![
        Box::new(ResultCards),
        Box::new(Autocomplete),
        Box::new(DetailLinks),
    ]
}

pub struct BookFinder<'a> {
    session: &'a Session,
    pacer: &'a dyn Pacer,
    config: &'a Config,
    detail: DetailPattern,
    surfaces: Vec<Box<dyn ResultSurface>>,
}

impl<'a> BookFinder<'a> {
    pub fn new(
        session: &'a Session,
        pacer: &'a dyn Pacer,
        config: &'a Config,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            session,
            pacer,
            config,
            detail: DetailPattern::from_config(config)?,
            surfaces: default_surfaces(),
        })
    }

    pub fn with_surfaces(mut self, surfaces: Vec<Box<dyn ResultSurface>>) -> Self {
        self.surfaces = surfaces;
        self
    }

    /// Walk identifier, then title+author, then title, stopping at the first
    /// query that lands on a detail page.
    pub async fn locate(&self, record: &BookRecord) -> Located {
        let mut attempts = 0_usize;
        for kind in QueryKind::CASCADE {
            let Some(query) = kind.query_for(record) else {
                continue;
            };
            if attempts > 0 {
                self.pacer.jitter().await;
            }
            attempts += 1;

            tracing::debug!(title = %record.title, strategy = kind.as_str(), %query, "searching");
            match self.attempt(&query).await {
                Ok(Some(url)) => {
                    tracing::info!(
                        title = %record.title,
                        strategy = kind.as_str(),
                        %url,
                        "located detail page"
                    );
                    return Located::Found { via: kind, url };
                }
                Ok(None) => {
                    tracing::debug!(title = %record.title, strategy = kind.as_str(), "no result");
                }
                Err(err) => {
                    tracing::debug!(
                        title = %record.title,
                        strategy = kind.as_str(),
                        ?err,
                        "search attempt failed"
                    );
                }
            }
        }
        Located::NotFound
    }

    async fn attempt(&self, query: &str) -> anyhow::Result<Option<String>> {
        let browser = self.session.browser();
        browser.goto(&self.config.search_url(query)).await?;
        self.pacer.settle().await;

        let landed = browser.current_url().await?;
        if self.detail.matches(&landed) {
            return Ok(Some(landed));
        }

        let cx = SurfaceContext {
            browser,
            pacer: self.pacer,
            config: self.config,
            detail: &self.detail,
            query,
        };
        for surface in &self.surfaces {
            let opened = match surface.open(&cx).await {
                Ok(opened) => opened,
                Err(err) => {
                    tracing::debug!(
                        surface = surface.name(),
                        ?err,
                        "result surface failed"
                    );
                    continue;
                }
            };
            if !opened {
                continue;
            }

            let landed = browser.current_url().await?;
            if self.detail.matches(&landed) {
                tracing::debug!(surface = surface.name(), %landed, "result surface confirmed");
                return Ok(Some(landed));
            }
            tracing::debug!(
                surface = surface.name(),
                %landed,
                "result surface did not reach a detail page"
            );
            // The surface navigated away from the result page; later surfaces need it back.
            self.pacer.jitter().await;
            browser.goto(&self.config.search_url(query)).await?;
            self.pacer.settle().await;
        }
        Ok(None)
    }
}
