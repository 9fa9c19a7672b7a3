use async_trait::async_trait;

use crate::browser::{Browser, Locator, Role};
use crate::config::Config;
use crate::mapping::SkoobStatus;
use crate::pacing::Pacer;
use crate::session::Session;

/// A way of finding the control that applies a status.
#[async_trait]
pub trait Activation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidates in the order they should be clicked.
    fn candidates(&self, status: SkoobStatus) -> Vec<Locator>;

    /// Click the first candidate that is present. Faults on one candidate
    /// move on to the next.
    async fn activate(&self, browser: &dyn Browser, status: SkoobStatus) -> bool {
        for locator in self.candidates(status) {
            match try_click(browser, &locator).await {
                Ok(true) => {
                    tracing::debug!(
                        strategy = self.name(),
                        %locator,
                        %status,
                        "clicked status control"
                    );
                    return true;
                }
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(
                        strategy = self.name(),
                        %locator,
                        ?err,
                        "status control click failed"
                    );
                }
            }
        }
        false
    }
}

async fn try_click(browser: &dyn Browser, locator: &Locator) -> anyhow::Result<bool> {
    if browser.count(locator).await? == 0 {
        return Ok(false);
    }
    browser.click(locator).await?;
    Ok(true)
}

/// Button, then link, by accessible name, for every text variant.
pub struct ByRole;

impl Activation for ByRole {
    fn name(&self) -> &'static str {
        "role"
    }

    fn candidates(&self, status: SkoobStatus) -> Vec<Locator> {
        status
            .text_variants()
            .iter()
            .flat_map(|text| {
                [
                    Locator::role(Role::Button, *text),
                    Locator::role(Role::Link, *text),
                ]
            })
            .collect()
    }
}

/// Any element whose text is one of the variants.
pub struct ByText;

impl Activation for ByText {
    fn name(&self) -> &'static str {
        "text"
    }

    fn candidates(&self, status: SkoobStatus) -> Vec<Locator> {
        status
            .text_variants()
            .iter()
            .map(|text| Locator::text(*text))
            .collect()
    }
}

/// The status button's element id.
pub struct ByElementId;

impl Activation for ByElementId {
    fn name(&self) -> &'static str {
        "element-id"
    }

    fn candidates(&self, status: SkoobStatus) -> Vec<Locator> {
        status
            .button_id()
            .map(|id| vec![Locator::css(format!("#{id}"))])
            .unwrap_or_default()
    }
}

pub fn default_activations() -> Vec<Box<dyn Activation>> {
    vec![Box::new(ByRole), Box::new(ByText), Box::new(ByElementId)]
}

pub struct StatusSetter<'a> {
    session: &'a Session,
    pacer: &'a dyn Pacer,
    config: &'a Config,
    activations: Vec<Box<dyn Activation>>,
}

impl<'a> StatusSetter<'a> {
    pub fn new(session: &'a Session, pacer: &'a dyn Pacer, config: &'a Config) -> Self {
        Self {
            session,
            pacer,
            config,
            activations: default_activations(),
        }
    }

    pub fn with_activations(mut self, activations: Vec<Box<dyn Activation>>) -> Self {
        self.activations = activations;
        self
    }

    /// Apply `status` on the current detail page. A status that is already
    /// active counts as applied and is not clicked again, since the control
    /// toggles.
    pub async fn set_status(&self, status: SkoobStatus) -> bool {
        let browser = self.session.browser();

        if self.is_already_active(browser, status).await {
            tracing::info!(%status, "status already set");
            return true;
        }

        for activation in &self.activations {
            if activation.activate(browser, status).await {
                self.pacer.settle().await;
                return true;
            }
        }

        tracing::debug!(%status, "no activation strategy matched");
        false
    }

    async fn is_already_active(&self, browser: &dyn Browser, status: SkoobStatus) -> bool {
        let Some(id) = status.button_id() else {
            return false;
        };
        for locator in active_markers(id, &self.config.selectors.active_status_classes) {
            match browser.count(&locator).await {
                Ok(n) if n > 0 => return true,
                Ok(_) => {}
                Err(err) => tracing::debug!(%locator, ?err, "active marker lookup failed"),
            }
        }
        false
    }
}

fn active_markers(id: &str, classes: &[String]) -> Vec<Locator> {
    classes
        .iter()
        .map(|class| Locator::css(format!("#{id}.{class}")))
        .chain(std::iter::once(Locator::css(format!(
            "#{id}[aria-pressed='true']"
        ))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_candidates_try_button_before_link() {
        let candidates = ByRole.candidates(SkoobStatus::Read);
        assert_eq!(candidates[0], Locator::role(Role::Button, "Lido"));
        assert_eq!(candidates[1], Locator::role(Role::Link, "Lido"));
        assert_eq!(candidates[2], Locator::role(Role::Button, "lido"));
        assert_eq!(candidates.len(), SkoobStatus::Read.text_variants().len() * 2);
    }

    #[test]
    fn text_candidates_follow_variant_order() {
        let candidates = ByText.candidates(SkoobStatus::WantToRead);
        assert_eq!(candidates[0], Locator::text("Vou Ler"));
        assert_eq!(candidates.last(), Some(&Locator::text("QUERO LER")));
    }

    #[test]
    fn element_id_candidates() {
        assert_eq!(
            ByElementId.candidates(SkoobStatus::Reading),
            vec![Locator::css("#bt_lendo")]
        );
        assert!(ByElementId.candidates(SkoobStatus::Abandoned).is_empty());
    }

    #[test]
    fn active_markers_cover_classes_and_aria() {
        let markers = active_markers("bt_lido", &["ativo".to_owned()]);
        assert_eq!(
            markers,
            vec![
                Locator::css("#bt_lido.ativo"),
                Locator::css("#bt_lido[aria-pressed='true']"),
            ]
        );
    }
}
