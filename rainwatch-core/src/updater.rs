//! One fetch → decide → persist → publish cycle.
//!
//! Callers must not run two cycles against the same store at once; the
//! server serializes them behind a mutex, and the store's compare-and-swap
//! rejects a write whose prior was replaced by another process.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    Config,
    classifier::decide,
    feed::render_feed,
    ingest::ingest,
    model::RainResult,
    provider::{RainProvider, provider_from_config},
    store::{FileStore, StoreError},
};

const IO_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Outside the service window; nothing was fetched.
    Closed(String),
    /// Result stored, status unchanged so the feed was left alone.
    Skipped(RainResult),
    /// Result stored and the feed re-rendered.
    Published(RainResult),
}

#[derive(Debug)]
pub struct Updater {
    provider: Box<dyn RainProvider>,
    store: FileStore,
    config: Config,
}

impl Updater {
    pub fn new(provider: Box<dyn RainProvider>, store: FileStore, config: Config) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    pub fn from_config(config: Config) -> Result<Self> {
        let provider = provider_from_config(&config)?;
        let store = FileStore::new(config.data_dir()?);
        Ok(Self::new(provider, store, config))
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub async fn run(&self, now: DateTime<Utc>, force: bool) -> Result<UpdateOutcome> {
        if !force && !self.config.window.is_open(now) {
            info!("outside service window, skipping update");
            return Ok(UpdateOutcome::Closed(self.config.window.describe()));
        }

        let raw = self
            .provider
            .fetch()
            .await
            .context("Failed to fetch weather readings")?;
        let unix_now = now.timestamp();
        let readings = ingest(raw, unix_now);

        // An undecodable record is treated like a missing one so the
        // service recovers on its own; it is then overwritten.
        let (stored, unreadable) = match self.store.load_result() {
            Ok(stored) => (stored, false),
            Err(err @ StoreError::Json { .. }) => {
                warn!(error = %err, "stored result is unreadable, starting from an empty prior");
                (None, true)
            }
            Err(err) => return Err(err).context("Failed to load previous result"),
        };
        let prior = stored.clone().unwrap_or_default();

        let result = decide(
            &self.config.classifier,
            unix_now,
            &prior,
            &readings.observation,
            &readings.forecasts,
        );

        with_retries("storing result", || {
            if unreadable {
                self.store.replace_unreadable(&result)
            } else {
                self.store.compare_and_swap(stored.as_ref(), &result)
            }
        })
        .context("Failed to store result")?;

        if stored.is_some() && prior.status == result.status {
            info!(status = %result.status, "status unchanged, feed not republished");
            return Ok(UpdateOutcome::Skipped(result));
        }

        let document = render_feed(&self.config.feed_meta(), now, &result.text);
        with_retries("storing feed", || self.store.save_feed(&document))
            .context("Failed to store feed")?;

        info!(
            from = %prior.status,
            to = %result.status,
            text = %result.text,
            "published new status"
        );
        Ok(UpdateOutcome::Published(result))
    }
}

/// Retries transient store failures. The decision itself is never redone.
fn with_retries<T>(
    what: &str,
    mut op: impl FnMut() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_transient() && attempt < IO_ATTEMPTS => {
                warn!(attempt, error = %err, "{what} failed, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}
