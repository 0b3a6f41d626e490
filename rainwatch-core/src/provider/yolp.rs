use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::RawReading;

use super::RainProvider;

const PLACE_URL: &str = "https://map.yahooapis.jp/weather/V1/place";
const DATE_FORMAT: &str = "%Y%m%d%H%M";

/// Yahoo! Open Local Platform weather API: one observation plus
/// ten-minute rainfall forecasts for a coordinate.
#[derive(Debug, Clone)]
pub struct YolpProvider {
    app_id: String,
    coordinates: String,
    offset: FixedOffset,
    http: Client,
}

impl YolpProvider {
    pub fn new(app_id: String, coordinates: String, offset: FixedOffset) -> Self {
        Self {
            app_id,
            coordinates,
            offset,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl RainProvider for YolpProvider {
    async fn fetch(&self) -> Result<Vec<RawReading>> {
        let res = self
            .http
            .get(PLACE_URL)
            .query(&[
                ("coordinates", self.coordinates.as_str()),
                ("appid", self.app_id.as_str()),
                ("output", "json"),
            ])
            .send()
            .await
            .context("Failed to send request to YOLP weather API")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read YOLP weather response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "YOLP weather request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_body(&body, self.offset)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct YolpResponse {
    #[serde(default)]
    feature: Vec<YolpFeature>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct YolpFeature {
    property: YolpProperty,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct YolpProperty {
    weather_list: YolpWeatherList,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct YolpWeatherList {
    #[serde(default)]
    weather: Vec<YolpWeather>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct YolpWeather {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    rainfall: Option<Value>,
}

/// Decodes a YOLP JSON body. Dates are local time at `offset`.
pub fn parse_body(body: &str, offset: FixedOffset) -> Result<Vec<RawReading>> {
    let parsed: YolpResponse =
        serde_json::from_str(body).context("Failed to parse YOLP weather JSON")?;

    let feature = parsed
        .feature
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("YOLP weather response contained no features"))?;

    Ok(feature
        .property
        .weather_list
        .weather
        .into_iter()
        .map(|w| RawReading {
            timestamp: parse_date(&w.date, offset),
            rainfall: w.rainfall.as_ref().and_then(rainfall_value),
            kind: w.kind,
        })
        .collect())
}

fn parse_date(date: &str, offset: FixedOffset) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(date.trim(), DATE_FORMAT).ok()?;
    offset.from_local_datetime(&naive).single().map(|dt| dt.timestamp())
}

// Rainfall arrives as a number, but tolerate numeric strings.
fn rainfall_value(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "ResultInfo": {"Count": 1, "Total": 1, "Start": 1, "Status": 200},
        "Feature": [{
            "Id": "201906011200_139.691764_35.689661",
            "Name": "地点(139.691764,35.689661)の2019年06月01日 12時00分から60分間の天気情報",
            "Property": {
                "WeatherAreaCode": 4410,
                "WeatherList": {
                    "Weather": [
                        {"Type": "observation", "Date": "201906011200", "Rainfall": 0.65},
                        {"Type": "forecast", "Date": "201906011210", "Rainfall": 1.25},
                        {"Type": "forecast", "Date": "201906011220", "Rainfall": "2.5"},
                        {"Type": "forecast", "Date": "2019-06-01", "Rainfall": 3.0},
                        {"Type": "forecast", "Date": "201906011230"}
                    ]
                }
            }
        }]
    }"#;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn parses_weather_list() {
        let readings = parse_body(BODY, jst()).unwrap();

        assert_eq!(readings.len(), 5);
        // 2019-06-01 12:00 JST == 03:00 UTC
        assert_eq!(readings[0].kind, "observation");
        assert_eq!(readings[0].timestamp, Some(1_559_358_000));
        assert_eq!(readings[0].rainfall, Some(0.65));
        assert_eq!(readings[1].timestamp, Some(1_559_358_600));
        assert_eq!(readings[2].rainfall, Some(2.5));
        assert_eq!(readings[3].timestamp, None);
        assert_eq!(readings[4].rainfall, None);
    }

    #[test]
    fn empty_feature_list_is_an_error() {
        let err = parse_body(r#"{"Feature": []}"#, jst()).unwrap_err();
        assert!(err.to_string().contains("no features"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = parse_body("<html>", jst()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YOLP weather JSON"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "雨".repeat(300);
        let short = truncate_body(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 203);
    }
}
