// src/display.rs
//! Fixed-timezone rendering of timestamps.
//!
//! The dashboard shows every time in one configured civil timezone, never the
//! viewer's local zone. Nothing here reads the host clock or `TZ`.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

/// Shown until a timestamp has been computed once.
pub const PLACEHOLDER: &str = "--:--";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Africa::Algiers;

const FR_MONTHS: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];
const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayLocale {
    #[default]
    French,
    English,
}

impl DisplayLocale {
    fn short_month(self, month0: u32) -> &'static str {
        let table = match self {
            DisplayLocale::French => &FR_MONTHS,
            DisplayLocale::English => &EN_MONTHS,
        };
        table[(month0 as usize) % 12]
    }
}

impl FromStr for DisplayLocale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" | "fr-fr" | "fr_fr" => Ok(DisplayLocale::French),
            "en" | "en-gb" | "en_gb" => Ok(DisplayLocale::English),
            other => Err(format!("unsupported display locale: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPattern {
    /// `15:05`, 24h.
    HourMinute,
    /// `2 mars 15:05`.
    DayMonthTime,
}

/// Pure formatter: same input, same output on every host.
pub fn format(ts: DateTime<Utc>, tz: Tz, locale: DisplayLocale, pattern: DisplayPattern) -> String {
    let local = ts.with_timezone(&tz);
    let time = local.format("%H:%M").to_string();
    match pattern {
        DisplayPattern::HourMinute => time,
        DisplayPattern::DayMonthTime => format!(
            "{} {} {}",
            local.day(),
            locale.short_month(local.month0()),
            time
        ),
    }
}

/// Timezone + locale pair configured once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayClock {
    pub tz: Tz,
    pub locale: DisplayLocale,
}

impl Default for DisplayClock {
    fn default() -> Self {
        Self {
            tz: DEFAULT_TIMEZONE,
            locale: DisplayLocale::French,
        }
    }
}

impl DisplayClock {
    pub fn new(tz: Tz, locale: DisplayLocale) -> Self {
        Self { tz, locale }
    }

    pub fn scan_time(&self, ts: DateTime<Utc>) -> String {
        format(ts, self.tz, self.locale, DisplayPattern::HourMinute)
    }

    pub fn article_time(&self, ts: DateTime<Utc>) -> String {
        format(ts, self.tz, self.locale, DisplayPattern::DayMonthTime)
    }
}

/// Display strings derived after each refresh and each scan poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    pub last_scan: String,
    pub last_article: String,
}

impl Default for Timestamps {
    fn default() -> Self {
        Self {
            last_scan: PLACEHOLDER.to_string(),
            last_article: PLACEHOLDER.to_string(),
        }
    }
}
