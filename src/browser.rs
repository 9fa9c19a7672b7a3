use anyhow::Context as _;
use async_trait::async_trait;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Button,
    Link,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Link => "link",
        }
    }
}

/// How to find elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    /// Element exposed with an accessible role whose visible name is exactly `name`.
    Role { role: Role, name: String },
    /// Any element whose own text is exactly the given string.
    Text(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn role(role: Role, name: impl Into<String>) -> Self {
        Self::Role {
            role,
            name: name.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css={selector}"),
            Self::Role { role, name } => write!(f, "role={}[name={name:?}]", role.as_str()),
            Self::Text(text) => write!(f, "text={text:?}"),
        }
    }
}

/// One browser tab, driven sequentially. Actions that target a locator act
/// on its first match.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate and block until the document has loaded.
    async fn goto(&self, url: &str) -> anyhow::Result<()>;
    async fn current_url(&self) -> anyhow::Result<String>;
    async fn count(&self, locator: &Locator) -> anyhow::Result<usize>;
    async fn click(&self, locator: &Locator) -> anyhow::Result<()>;
    /// Replace the value of an input and type `text` into it.
    async fn fill(&self, locator: &Locator, text: &str) -> anyhow::Result<()>;
    /// Value of `name` on every match; matches without it are skipped.
    async fn attributes(&self, locator: &Locator, name: &str) -> anyhow::Result<Vec<String>>;
    async fn wait_for_load(&self) -> anyhow::Result<()>;
    /// `Cookie` header value carrying the session's cookies.
    async fn cookie_header(&self) -> anyhow::Result<String>;
    async fn close(&self) -> anyhow::Result<()>;
}

/// A browser driven over the WebDriver protocol (chromedriver, geckodriver).
pub struct WebDriverBrowser {
    client: fantoccini::Client,
}

impl WebDriverBrowser {
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let mut caps = serde_json::Map::new();
        if config.headless {
            caps.insert(
                "goog:chromeOptions".to_owned(),
                serde_json::json!({ "args": ["--headless=new", "--window-size=1280,900"] }),
            );
            caps.insert(
                "moz:firefoxOptions".to_owned(),
                serde_json::json!({ "args": ["-headless"] }),
            );
        }

        tracing::info!(
            webdriver = %config.webdriver_url,
            headless = config.headless,
            "connecting to webdriver"
        );
        let mut builder = fantoccini::ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(&config.webdriver_url)
            .await
            .with_context(|| format!("connect to webdriver: {}", config.webdriver_url))?;

        Ok(Self { client })
    }

    async fn find_all(
        &self,
        locator: &Locator,
    ) -> anyhow::Result<Vec<fantoccini::elements::Element>> {
        let elements = match locator {
            Locator::Css(selector) => self
                .client
                .find_all(fantoccini::Locator::Css(selector.as_str()))
                .await
                .with_context(|| format!("find {locator}"))?,
            Locator::Role { role, name } => self
                .client
                .find_all(fantoccini::Locator::XPath(&role_xpath(*role, name)))
                .await
                .with_context(|| format!("find {locator}"))?,
            Locator::Text(text) => self
                .client
                .find_all(fantoccini::Locator::XPath(&text_xpath(text)))
                .await
                .with_context(|| format!("find {locator}"))?,
        };
        Ok(elements)
    }

    async fn first(&self, locator: &Locator) -> anyhow::Result<fantoccini::elements::Element> {
        self.find_all(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no element matches {locator}"))
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("GET {url}"))
    }

    async fn current_url(&self) -> anyhow::Result<String> {
        let url = self.client.current_url().await.context("read current url")?;
        Ok(url.to_string())
    }

    async fn count(&self, locator: &Locator) -> anyhow::Result<usize> {
        Ok(self.find_all(locator).await?.len())
    }

    async fn click(&self, locator: &Locator) -> anyhow::Result<()> {
        let element = self.first(locator).await?;
        element
            .click()
            .await
            .with_context(|| format!("click {locator}"))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> anyhow::Result<()> {
        let element = self.first(locator).await?;
        element
            .clear()
            .await
            .with_context(|| format!("clear {locator}"))?;
        element
            .send_keys(text)
            .await
            .with_context(|| format!("type into {locator}"))
    }

    async fn attributes(&self, locator: &Locator, name: &str) -> anyhow::Result<Vec<String>> {
        let mut values = Vec::new();
        for element in self.find_all(locator).await? {
            if let Some(value) = element
                .attr(name)
                .await
                .with_context(|| format!("read {name} of {locator}"))?
            {
                values.push(value);
            }
        }
        Ok(values)
    }

    async fn wait_for_load(&self) -> anyhow::Result<()> {
        self.client
            .wait()
            .for_element(fantoccini::Locator::Css("body"))
            .await
            .context("wait for document body")?;
        Ok(())
    }

    async fn cookie_header(&self) -> anyhow::Result<String> {
        let cookies = self
            .client
            .get_all_cookies()
            .await
            .context("read session cookies")?;
        Ok(cookies
            .iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; "))
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.client
            .clone()
            .close()
            .await
            .context("close webdriver session")
    }
}

fn role_xpath(role: Role, name: &str) -> String {
    let name = xpath_literal(name);
    match role {
        Role::Button => format!(
            "//button[normalize-space(.)={name}] | //*[@role='button'][normalize-space(.)={name}] | //input[@type='button' or @type='submit'][@value={name}]"
        ),
        Role::Link => format!(
            "//a[@href][normalize-space(.)={name}] | //*[@role='link'][normalize-space(.)={name}]"
        ),
    }
}

fn text_xpath(text: &str) -> String {
    format!("//body//*[normalize-space(text())={}]", xpath_literal(text))
}

/// Quote `value` as an XPath 1.0 string literal. XPath has no escapes, so a
/// value holding both quote kinds is split with `concat()`.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }
    let parts = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect::<Vec<_>>()
        .join(", \"'\", ");
    format!("concat({parts})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpath_literal_picks_quote_style() {
        assert_eq!(xpath_literal("Lido"), "'Lido'");
        assert_eq!(xpath_literal("Vou l'er"), "\"Vou l'er\"");
        assert_eq!(xpath_literal(r#"a'b"c"#), r#"concat('a', "'", 'b"c')"#);
    }

    #[test]
    fn button_role_covers_inputs_and_aria() {
        let xpath = role_xpath(Role::Button, "Lido");
        assert!(xpath.starts_with("//button[normalize-space(.)='Lido']"));
        assert!(xpath.contains("@role='button'"));
        assert!(xpath.contains("@value='Lido'"));
    }

    #[test]
    fn link_role_requires_href_or_aria() {
        let xpath = role_xpath(Role::Link, "Lendo");
        assert!(xpath.contains("//a[@href][normalize-space(.)='Lendo']"));
        assert!(xpath.contains("@role='link'"));
    }

    #[test]
    fn locator_display_is_readable() {
        assert_eq!(Locator::css("#bt_lido").to_string(), "css=#bt_lido");
        assert_eq!(
            Locator::role(Role::Link, "Lido").to_string(),
            "role=link[name=\"Lido\"]"
        );
        assert_eq!(Locator::text("Lido").to_string(), "text=\"Lido\"");
    }
}
