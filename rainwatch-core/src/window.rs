use anyhow::{Result, bail};
use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Local hours during which updates run.
///
/// Example TOML:
/// [window]
/// utc_offset_hours = 9
/// open_hour = 10
/// close_hour = 22
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceWindow {
    pub utc_offset_hours: i32,
    pub open_hour: u32,
    /// Last hour that is still open; updates stop at `close_hour + 1`.
    pub close_hour: u32,
}

impl Default for ServiceWindow {
    fn default() -> Self {
        Self {
            utc_offset_hours: 9,
            open_hour: 10,
            close_hour: 22,
        }
    }
}

impl ServiceWindow {
    pub fn validate(&self) -> Result<()> {
        if !(-23..=23).contains(&self.utc_offset_hours) {
            bail!(
                "Invalid window.utc_offset_hours {}: must be within -23..=23",
                self.utc_offset_hours
            );
        }
        if self.open_hour > 23 || self.close_hour > 23 {
            bail!(
                "Invalid window hours {}..{}: hours must be within 0..=23",
                self.open_hour,
                self.close_hour
            );
        }
        if self.open_hour > self.close_hour {
            bail!(
                "Invalid window: open_hour {} is after close_hour {}",
                self.open_hour,
                self.close_hour
            );
        }
        Ok(())
    }

    /// The location's fixed UTC offset.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let hour = now.with_timezone(&self.offset()).hour();
        self.open_hour <= hour && hour <= self.close_hour
    }

    pub fn describe(&self) -> String {
        format!("Open: {:02}:00 - Close: {:02}:00", self.open_hour, self.close_hour)
    }
}
