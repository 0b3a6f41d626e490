use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Observation,
    Forecast,
}

/// A single weather data point for the configured location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub kind: ReadingKind,
    /// Valid time, seconds since the Unix epoch.
    pub timestamp: i64,
    /// Rainfall rate in mm/h.
    pub rainfall: f64,
}

impl Reading {
    pub fn observation(timestamp: i64, rainfall: f64) -> Self {
        Self {
            kind: ReadingKind::Observation,
            timestamp,
            rainfall,
        }
    }

    pub fn forecast(timestamp: i64, rainfall: f64) -> Self {
        Self {
            kind: ReadingKind::Forecast,
            timestamp,
            rainfall,
        }
    }
}

/// Orders forecasts by valid time. Equal timestamps keep their input order.
pub fn sort_forecasts(forecasts: &mut [Reading]) {
    forecasts.sort_by_key(|r| r.timestamp);
}

/// Which group of statuses a [`RainStatus`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RainBand {
    Dry,
    Observed,
    Forecast,
}

/// Rain classification, declared band by band in ascending severity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RainStatus {
    #[default]
    NoRain,

    LightRain,
    SoftRain,
    ModerateRain,
    HeavyRain,

    ForecastSoftRain,
    ForecastModerateRain,
    ForecastHeavyRain,
}

impl RainStatus {
    pub const fn band(self) -> RainBand {
        match self {
            RainStatus::NoRain => RainBand::Dry,
            RainStatus::LightRain
            | RainStatus::SoftRain
            | RainStatus::ModerateRain
            | RainStatus::HeavyRain => RainBand::Observed,
            RainStatus::ForecastSoftRain
            | RainStatus::ForecastModerateRain
            | RainStatus::ForecastHeavyRain => RainBand::Forecast,
        }
    }

    /// Rain that was actually measured. Only these statuses get the grace window.
    pub const fn is_observed_rain(self) -> bool {
        matches!(self.band(), RainBand::Observed)
    }

    pub const fn is_forecast_rain(self) -> bool {
        matches!(self.band(), RainBand::Forecast)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            RainStatus::NoRain => "no_rain",
            RainStatus::LightRain => "light_rain",
            RainStatus::SoftRain => "soft_rain",
            RainStatus::ModerateRain => "moderate_rain",
            RainStatus::HeavyRain => "heavy_rain",
            RainStatus::ForecastSoftRain => "forecast_soft_rain",
            RainStatus::ForecastModerateRain => "forecast_moderate_rain",
            RainStatus::ForecastHeavyRain => "forecast_heavy_rain",
        }
    }
}

impl std::fmt::Display for RainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a measured rainfall rate (mm/h) onto the observed band.
pub fn classify_observed(rainfall: f64) -> RainStatus {
    if rainfall == 0.0 {
        return RainStatus::NoRain;
    }
    if rainfall < 1.0 {
        return RainStatus::LightRain;
    }
    if rainfall < 3.0 {
        return RainStatus::SoftRain;
    }
    if rainfall < 20.0 {
        return RainStatus::ModerateRain;
    }
    RainStatus::HeavyRain
}

/// Maps a predicted rainfall rate (mm/h) onto the forecast band.
pub fn classify_forecast(rainfall: f64) -> RainStatus {
    if rainfall == 0.0 {
        return RainStatus::NoRain;
    }
    if rainfall < 3.0 {
        return RainStatus::ForecastSoftRain;
    }
    if rainfall < 20.0 {
        return RainStatus::ForecastModerateRain;
    }
    RainStatus::ForecastHeavyRain
}

/// Severity phrase used in the published sentence.
pub fn describe(status: RainStatus) -> &'static str {
    match status {
        RainStatus::NoRain => "no rain",
        RainStatus::LightRain => "light rain",
        RainStatus::SoftRain | RainStatus::ForecastSoftRain => "weak rain",
        RainStatus::ModerateRain | RainStatus::ForecastModerateRain => "fairly strong rain",
        RainStatus::HeavyRain | RainStatus::ForecastHeavyRain => "strong rain",
    }
}

/// The persisted decision. Each update replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RainResult {
    pub updated_at: i64,
    /// Last moment rain was confirmed as falling, 0 outside a rain episode.
    pub rain_since: i64,
    pub status: RainStatus,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn observed_boundaries() {
        assert_eq!(classify_observed(0.0), RainStatus::NoRain);
        assert_eq!(classify_observed(0.01), RainStatus::LightRain);
        assert_eq!(classify_observed(0.99), RainStatus::LightRain);
        assert_eq!(classify_observed(1.0), RainStatus::SoftRain);
        assert_eq!(classify_observed(2.99), RainStatus::SoftRain);
        assert_eq!(classify_observed(3.0), RainStatus::ModerateRain);
        assert_eq!(classify_observed(19.99), RainStatus::ModerateRain);
        assert_eq!(classify_observed(20.0), RainStatus::HeavyRain);
        assert_eq!(classify_observed(120.0), RainStatus::HeavyRain);
    }

    #[test]
    fn forecast_boundaries() {
        assert_eq!(classify_forecast(0.0), RainStatus::NoRain);
        assert_eq!(classify_forecast(0.4), RainStatus::ForecastSoftRain);
        assert_eq!(classify_forecast(2.99), RainStatus::ForecastSoftRain);
        assert_eq!(classify_forecast(3.0), RainStatus::ForecastModerateRain);
        assert_eq!(classify_forecast(20.0), RainStatus::ForecastHeavyRain);
    }

    #[test]
    fn bands_partition_statuses() {
        assert_eq!(RainStatus::NoRain.band(), RainBand::Dry);
        for s in [
            RainStatus::LightRain,
            RainStatus::SoftRain,
            RainStatus::ModerateRain,
            RainStatus::HeavyRain,
        ] {
            assert!(s.is_observed_rain());
            assert!(!s.is_forecast_rain());
        }
        for s in [
            RainStatus::ForecastSoftRain,
            RainStatus::ForecastModerateRain,
            RainStatus::ForecastHeavyRain,
        ] {
            assert!(s.is_forecast_rain());
            assert!(!s.is_observed_rain());
        }
    }

    #[test]
    fn ordering_keeps_bands_contiguous() {
        assert!(RainStatus::NoRain < RainStatus::LightRain);
        assert!(RainStatus::HeavyRain < RainStatus::ForecastSoftRain);
        assert!(RainStatus::ForecastSoftRain < RainStatus::ForecastHeavyRain);
    }

    #[test]
    fn severity_phrase_is_shared_across_bands() {
        assert_eq!(describe(RainStatus::SoftRain), describe(RainStatus::ForecastSoftRain));
        assert_eq!(describe(RainStatus::HeavyRain), describe(RainStatus::ForecastHeavyRain));
        assert_eq!(describe(RainStatus::ModerateRain), "fairly strong rain");
        assert_eq!(describe(RainStatus::LightRain), "light rain");
    }

    #[test]
    fn sort_is_stable_for_equal_timestamps() {
        let mut forecasts = vec![
            Reading::forecast(200, 1.0),
            Reading::forecast(100, 2.0),
            Reading::forecast(100, 3.0),
        ];
        sort_forecasts(&mut forecasts);
        let rainfall: Vec<f64> = forecasts.iter().map(|r| r.rainfall).collect();
        assert_eq!(rainfall, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn default_result_is_the_empty_prior() {
        let r = RainResult::default();
        assert_eq!(r.status, RainStatus::NoRain);
        assert_eq!(r.rain_since, 0);
        assert!(r.text.is_empty());
    }

    #[test]
    fn result_serializes_status_in_snake_case() {
        let r = RainResult {
            updated_at: 10,
            rain_since: 10,
            status: RainStatus::ForecastModerateRain,
            text: "x".into(),
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"forecast_moderate_rain\""));
        let back: RainResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    proptest! {
        #[test]
        fn classify_observed_is_monotonic(a in 0.0f64..200.0, b in 0.0f64..200.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify_observed(lo) <= classify_observed(hi));
        }

        #[test]
        fn classify_forecast_is_monotonic(a in 0.0f64..200.0, b in 0.0f64..200.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify_forecast(lo) <= classify_forecast(hi));
        }

        #[test]
        fn positive_rainfall_never_classifies_dry(r in 0.0001f64..500.0) {
            prop_assert!(classify_observed(r).is_observed_rain());
            prop_assert!(classify_forecast(r).is_forecast_rain());
        }
    }
}
