//! Turns provider output into the readings the classifier expects.

use tracing::warn;

use crate::model::{Reading, sort_forecasts};

/// A reading as decoded by a provider, before validation.
///
/// `timestamp` is `None` when the provider could not parse the date;
/// `rainfall` is `None` when the value was missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub kind: String,
    pub timestamp: Option<i64>,
    pub rainfall: Option<f64>,
}

/// Validated input for one classifier run.
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    pub observation: Reading,
    /// Sorted ascending by timestamp.
    pub forecasts: Vec<Reading>,
}

pub fn ingest(raw: Vec<RawReading>, now: i64) -> Readings {
    let mut observation = None;
    let mut forecasts = Vec::with_capacity(raw.len());

    for entry in raw {
        let Some(timestamp) = entry.timestamp else {
            warn!(kind = %entry.kind, "dropping reading with unparseable date");
            continue;
        };
        let rainfall = entry.rainfall.unwrap_or(0.0);
        if !rainfall.is_finite() || rainfall < 0.0 {
            warn!(
                kind = %entry.kind,
                timestamp,
                rainfall,
                "dropping reading with invalid rainfall"
            );
            continue;
        }

        match entry.kind.as_str() {
            "observation" => observation = Some(Reading::observation(timestamp, rainfall)),
            "forecast" => forecasts.push(Reading::forecast(timestamp, rainfall)),
            other => warn!(kind = other, "ignoring reading of unknown type"),
        }
    }

    sort_forecasts(&mut forecasts);

    let observation = observation.unwrap_or_else(|| {
        warn!("no observation in feed, assuming no rain");
        Reading::observation(now, 0.0)
    });

    Readings {
        observation,
        forecasts,
    }
}
