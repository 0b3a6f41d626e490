//! Rain status decision.
//!
//! [`decide`] turns the latest readings plus the previously persisted
//! [`RainResult`] into the next one. It performs no I/O; the caller owns
//! fetching, persistence and publishing.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{
    RainResult, RainStatus, Reading, classify_forecast, classify_observed, describe,
};

const IMMINENT_SECS: i64 = 10 * 60;
const SOON_SECS: i64 = 30 * 60;

/// Tunables for [`decide`].
///
/// Example TOML:
/// [classifier]
/// rain_threshold = 0.5
/// grace_secs = 1800
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Rainfall (mm/h) a reading must exceed to count as rain.
    pub rain_threshold: f64,
    /// How long an observed rain status survives after rain was last confirmed.
    pub grace_secs: i64,
    /// Fresh rain is only trusted if forecasts start within this many seconds.
    pub onset_lookahead_secs: i64,
    /// Forecasts above threshold needed to trust a fresh onset.
    pub onset_corroboration: usize,
    /// Forecasts above threshold needed before announcing expected rain.
    pub impending_corroboration: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rain_threshold: 0.5,
            grace_secs: 30 * 60,
            onset_lookahead_secs: 20 * 60,
            onset_corroboration: 1,
            impending_corroboration: 2,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.rain_threshold.is_finite() || self.rain_threshold < 0.0 {
            bail!(
                "Invalid classifier.rain_threshold {}: must be a finite, non-negative rate in mm/h",
                self.rain_threshold
            );
        }
        if self.grace_secs < 0 {
            bail!(
                "Invalid classifier.grace_secs {}: must not be negative",
                self.grace_secs
            );
        }
        if self.onset_lookahead_secs < 0 {
            bail!(
                "Invalid classifier.onset_lookahead_secs {}: must not be negative",
                self.onset_lookahead_secs
            );
        }
        Ok(())
    }
}

/// What the forecasts say once enough of them agree that rain is coming.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ForecastSignal {
    /// Heaviest rainfall across all forecasts.
    peak_rainfall: f64,
    /// Earliest valid time across all forecasts.
    earliest: i64,
}

/// Produces the next persisted result.
///
/// `forecasts` must already be sorted by timestamp; `prior` is
/// [`RainResult::default`] when nothing has been stored yet.
pub fn decide(
    config: &ClassifierConfig,
    now: i64,
    prior: &RainResult,
    observation: &Reading,
    forecasts: &[Reading],
) -> RainResult {
    let raining = observation.rainfall > config.rain_threshold;

    if prior.status.is_observed_rain() {
        if prior.rain_since.saturating_add(config.grace_secs) > now {
            debug!(
                status = %prior.status,
                rain_since = prior.rain_since,
                "within grace window, keeping status"
            );
            return RainResult {
                updated_at: now,
                rain_since: prior.rain_since,
                status: prior.status,
                text: prior.text.clone(),
            };
        }
        if raining {
            debug!(rainfall = observation.rainfall, "rain continues past grace window");
            return confirmed_rain(now, observation);
        }
    }

    if raining {
        match forecast_signal(config, forecasts, config.onset_corroboration) {
            Some(signal) if signal.earliest.saturating_sub(now) <= config.onset_lookahead_secs => {
                debug!(
                    rainfall = observation.rainfall,
                    earliest = signal.earliest,
                    "rain onset corroborated"
                );
                return confirmed_rain(now, observation);
            }
            _ => debug!(
                rainfall = observation.rainfall,
                "rain onset not corroborated by forecasts"
            ),
        }
    }

    not_raining(config, now, prior, forecasts)
}

fn confirmed_rain(now: i64, observation: &Reading) -> RainResult {
    let status = classify_observed(observation.rainfall);
    RainResult {
        updated_at: now,
        rain_since: now,
        status,
        text: format!("currently {} falling", describe(status)),
    }
}

fn not_raining(
    config: &ClassifierConfig,
    now: i64,
    prior: &RainResult,
    forecasts: &[Reading],
) -> RainResult {
    if let Some(signal) = forecast_signal(config, forecasts, config.impending_corroboration) {
        let status = classify_forecast(signal.peak_rainfall);
        let text = format!(
            "{} {} is expected",
            urgency_phrase(signal.earliest - now),
            describe(status)
        );
        debug!(%status, earliest = signal.earliest, "rain expected");
        return RainResult {
            updated_at: now,
            rain_since: 0,
            status,
            text,
        };
    }

    let text = if prior.status.is_observed_rain() {
        "the rain has stopped"
    } else {
        "it is not currently raining"
    };
    RainResult {
        updated_at: now,
        rain_since: 0,
        status: RainStatus::NoRain,
        text: text.to_string(),
    }
}

/// Requires `required` forecasts above threshold, then reports peak and
/// earliest time over every forecast, qualifying or not.
fn forecast_signal(
    config: &ClassifierConfig,
    forecasts: &[Reading],
    required: usize,
) -> Option<ForecastSignal> {
    let qualifying = forecasts
        .iter()
        .filter(|f| f.rainfall > config.rain_threshold)
        .count();
    if qualifying < required {
        return None;
    }

    let peak_rainfall = forecasts.iter().map(|f| f.rainfall).fold(0.0, f64::max);
    if peak_rainfall <= 0.0 {
        return None;
    }
    let earliest = forecasts
        .iter()
        .map(|f| f.timestamp)
        .min()
        .unwrap_or(i64::MAX);

    Some(ForecastSignal {
        peak_rainfall,
        earliest,
    })
}

fn urgency_phrase(time_left: i64) -> &'static str {
    if time_left < IMMINENT_SECS {
        return "imminently";
    }
    if time_left < SOON_SECS {
        return "soon";
    }
    "shortly"
}
