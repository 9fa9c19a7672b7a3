use std::time::Duration;

use async_trait::async_trait;
use rand::Rng as _;

use crate::config::Config;

/// Every wait between remote interactions goes through a `Pacer`.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Fixed wait for the remote page to finish rendering.
    async fn settle(&self);

    /// Randomized wait between two remote page fetches.
    async fn jitter(&self);
}

#[derive(Debug, Clone)]
pub struct Jitter {
    settle: Duration,
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub fn new(settle: Duration, min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { settle, min, max }
    }

    pub fn from_config(config: &Config) -> Self {
        let (min, max) = config.jitter_range();
        Self::new(config.settle(), min, max)
    }

    fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[async_trait]
impl Pacer for Jitter {
    async fn settle(&self) {
        tokio::time::sleep(self.settle).await;
    }

    async fn jitter(&self) {
        let delay = self.sample();
        tracing::debug!(delay_ms = delay.as_millis() as u64, "jitter");
        tokio::time::sleep(delay).await;
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn settle(&self) {}

    async fn jitter(&self) {}
}
