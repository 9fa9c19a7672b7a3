#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use shelfsync::pacing::Pacer;

/// Never waits; counts how often each delay was requested.
#[derive(Debug, Default)]
pub struct CountingPacer {
    settles: AtomicUsize,
    jitters: AtomicUsize,
}

impl CountingPacer {
    pub fn settles(&self) -> usize {
        self.settles.load(Ordering::SeqCst)
    }

    pub fn jitters(&self) -> usize {
        self.jitters.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CountingPacer {
    async fn settle(&self) {
        self.settles.fetch_add(1, Ordering::SeqCst);
    }

    async fn jitter(&self) {
        self.jitters.fetch_add(1, Ordering::SeqCst);
    }
}
