use crate::{Config, ingest::RawReading, provider::yolp::YolpProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod yolp;

/// Upstream source of observation and forecast readings for the configured spot.
#[async_trait]
pub trait RainProvider: Send + Sync + Debug {
    async fn fetch(&self) -> anyhow::Result<Vec<RawReading>>;
}

/// Construct the upstream provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn RainProvider>> {
    let app_id = config.app_id.as_deref().filter(|id| !id.is_empty()).ok_or_else(|| {
        anyhow::anyhow!(
            "No Yahoo! application id configured.\n\
                 Hint: run `rainwatch configure` and enter your application id."
        )
    })?;

    Ok(Box::new(YolpProvider::new(
        app_id.to_owned(),
        config.coordinates.clone(),
        config.window.offset(),
    )))
}
