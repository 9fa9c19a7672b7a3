use std::sync::Arc;

use crate::browser::Browser;

/// An authenticated Skoob session: the browser tab holding the cookie jar,
/// plus the user id resolved at login. Passed by reference to every sync
/// component; never shared between concurrent callers.
#[derive(Clone)]
pub struct Session {
    browser: Arc<dyn Browser>,
    user_id: String,
}

impl Session {
    pub fn new(browser: Arc<dyn Browser>, user_id: impl Into<String>) -> Self {
        Self {
            browser,
            user_id: user_id.into(),
        }
    }

    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    /// `None` when login could not resolve the id; shelves cannot be read then.
    pub fn user_id(&self) -> Option<&str> {
        let id = self.user_id.trim();
        (!id.is_empty()).then_some(id)
    }

    pub async fn close(&self) -> anyhow::Result<()> {
        self.browser.close().await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
