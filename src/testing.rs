//! Fakes shared by unit tests.

use crate::comparator::EntryFetcher;
use crate::error::AppError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub fn page(version: &str) -> String {
    format!(
        r#"<!doctype html><html><head><meta charset="utf-8"><meta name="app-version" content="{version}"><title>Challenge</title></head><body></body></html>"#
    )
}

/// Serves the same reply on every fetch.
pub struct StaticFetcher {
    reply: Result<String, AppError>,
    calls: AtomicUsize,
    gate: Option<Notify>,
}

impl StaticFetcher {
    pub fn ok(html: impl Into<String>) -> Self {
        Self {
            reply: Ok(html.into()),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn err(error: AppError) -> Self {
        Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Holds every fetch until `release` is called.
    pub fn gated(html: impl Into<String>) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::ok(html)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntryFetcher for StaticFetcher {
    async fn fetch_entry(&self) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.reply {
            Ok(html) => Ok(html.clone()),
            Err(e) => Err(AppError::Fetch(e.to_string())),
        }
    }
}
