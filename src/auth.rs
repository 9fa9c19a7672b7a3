use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use regex::Regex;

use crate::browser::{Browser, Locator};
use crate::config::Config;
use crate::session::Session;

static USER_ID_IN_URL: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"/usuario/(\d+)") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    });

pub fn user_id_from_url(url: &str) -> Option<String> {
    USER_ID_IN_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoginSignal {
    UserUrl(String),
    LandingUrl,
    Marker,
}

/// Open the login page and wait until the user has signed in by hand.
///
/// Login counts as done when the URL carries a user id, the URL is the
/// timeline or activity feed, or the logged-in header marker renders. If the
/// id was not in the URL, the profile home is visited to read it from the
/// redirect. An unresolved id yields a session with an empty id.
pub async fn wait_for_login(
    browser: Arc<dyn Browser>,
    config: &Config,
) -> anyhow::Result<Session> {
    tracing::info!(url = %config.login_url, "opening login page");
    browser.goto(&config.login_url).await?;
    tracing::info!("please log in to Skoob in the browser window; sync resumes automatically");

    let poll = Duration::from_millis(config.login_poll_ms);
    let deadline = Instant::now() + Duration::from_secs(config.login_timeout_secs);

    let signal = loop {
        if let Some(signal) = detect_login(browser.as_ref(), config).await {
            break signal;
        }
        if Instant::now() >= deadline {
            anyhow::bail!("login not detected within {}s", config.login_timeout_secs);
        }
        tokio::time::sleep(poll).await;
    };

    let mut user_id = match signal {
        LoginSignal::UserUrl(id) => {
            tracing::info!(user_id = %id, "login detected via url");
            id
        }
        LoginSignal::LandingUrl => {
            tracing::info!("login detected via timeline url");
            String::new()
        }
        LoginSignal::Marker => {
            tracing::info!(
                marker = %config.selectors.logged_in_marker,
                "login detected via page marker"
            );
            String::new()
        }
    };

    if user_id.is_empty() {
        match resolve_user_id(browser.as_ref(), config).await {
            Ok(Some(id)) => {
                tracing::info!(user_id = %id, "resolved user id from profile redirect");
                user_id = id;
            }
            Ok(None) => tracing::warn!("could not resolve Skoob user id; shelves cannot be read"),
            Err(err) => {
                tracing::warn!(?err, "could not resolve Skoob user id; shelves cannot be read");
            }
        }
    }

    Ok(Session::new(browser, user_id))
}

async fn detect_login(browser: &dyn Browser, config: &Config) -> Option<LoginSignal> {
    match browser.current_url().await {
        Ok(url) => {
            if let Some(id) = user_id_from_url(&url) {
                return Some(LoginSignal::UserUrl(id));
            }
            if url.contains("/timeline") || url.contains("/atividades") {
                return Some(LoginSignal::LandingUrl);
            }
        }
        Err(err) => tracing::debug!(?err, "read url while waiting for login"),
    }

    let marker = Locator::css(config.selectors.logged_in_marker.as_str());
    match browser.count(&marker).await {
        Ok(n) if n > 0 => Some(LoginSignal::Marker),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(?err, "look up login marker");
            None
        }
    }
}

async fn resolve_user_id(
    browser: &dyn Browser,
    config: &Config,
) -> anyhow::Result<Option<String>> {
    browser.goto(&config.profile_home_url).await?;
    browser.wait_for_load().await?;
    let url = browser.current_url().await?;
    Ok(user_id_from_url(&url))
}
