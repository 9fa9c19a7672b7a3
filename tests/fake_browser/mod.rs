#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shelfsync::browser::{Browser, Locator};

/// Something on a scripted page.
#[derive(Debug, Clone)]
pub struct FakeElement {
    pub locator: Locator,
    pub href: Option<String>,
    /// Where clicking the element navigates to, if anywhere.
    pub navigates_to: Option<String>,
    pub fails_on_click: bool,
}

impl FakeElement {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            href: None,
            navigates_to: None,
            fails_on_click: false,
        }
    }

    pub fn link(locator: Locator, href: &str) -> Self {
        Self {
            href: Some(href.to_owned()),
            ..Self::new(locator)
        }
    }

    pub fn navigating_to(mut self, url: &str) -> Self {
        self.navigates_to = Some(url.to_owned());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fails_on_click = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
struct FakePage {
    redirect: Option<String>,
    elements: Vec<FakeElement>,
}

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    visits: Vec<String>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    closed: bool,
}

/// An in-memory browser driven by a table of URL -> page. Unknown URLs load
/// as empty pages.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    pages: HashMap<String, FakePage>,
    state: Mutex<FakeState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigating to `from` lands on `to`.
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.pages.entry(from.to_owned()).or_default().redirect = Some(to.to_owned());
        self
    }

    pub fn element(mut self, url: &str, element: FakeElement) -> Self {
        self.pages
            .entry(url.to_owned())
            .or_default()
            .elements
            .push(element);
        self
    }

    pub fn starting_at(self, url: &str) -> Self {
        self.lock().url = url.to_owned();
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.lock().fills.clone()
    }

    pub fn closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake browser state")
    }

    fn matching(&self, locator: &Locator) -> Vec<FakeElement> {
        let url = self.lock().url.clone();
        self.pages
            .get(&url)
            .map(|page| {
                page.elements
                    .iter()
                    .filter(|e| &e.locator == locator)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn navigate(&self, url: &str) {
        let landed = self
            .pages
            .get(url)
            .and_then(|page| page.redirect.clone())
            .unwrap_or_else(|| url.to_owned());
        self.lock().url = landed;
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.lock().visits.push(url.to_owned());
        self.navigate(url);
        Ok(())
    }

    async fn current_url(&self) -> anyhow::Result<String> {
        Ok(self.lock().url.clone())
    }

    async fn count(&self, locator: &Locator) -> anyhow::Result<usize> {
        Ok(self.matching(locator).len())
    }

    async fn click(&self, locator: &Locator) -> anyhow::Result<()> {
        let Some(element) = self.matching(locator).into_iter().next() else {
            anyhow::bail!("no element matches {locator}");
        };
        if element.fails_on_click {
            anyhow::bail!("element {locator} is not clickable");
        }
        self.lock().clicks.push(locator.to_string());
        if let Some(target) = element.navigates_to.as_deref() {
            self.navigate(target);
        }
        Ok(())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> anyhow::Result<()> {
        if self.matching(locator).is_empty() {
            anyhow::bail!("no element matches {locator}");
        }
        self.lock()
            .fills
            .push((locator.to_string(), text.to_owned()));
        Ok(())
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> anyhow::Result<Vec<String>> {
        if name != "href" {
            return Ok(Vec::new());
        }
        Ok(self
            .matching(locator)
            .into_iter()
            .filter_map(|e| e.href)
            .collect())
    }

    async fn wait_for_load(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn cookie_header(&self) -> anyhow::Result<String> {
        Ok("PHPSESSID=fake".to_owned())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.lock().closed = true;
        Ok(())
    }
}
