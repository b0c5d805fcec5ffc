//! Candle ordering and headline stats for the premium chart

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Asia::Seoul;
use serde::Serialize;

use crate::types::MarketCandle;

/// Chart bucket sizes offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CandleInterval {
    OneHour,
    FourHours,
    OneDay,
}

impl CandleInterval {
    pub const ALL: [CandleInterval; 3] = [Self::OneHour, Self::FourHours, Self::OneDay];

    pub fn minutes(self) -> u32 {
        match self {
            Self::OneHour => 60,
            Self::FourHours => 240,
            Self::OneDay => 1440,
        }
    }

    pub fn from_minutes(minutes: u32) -> Result<Self> {
        match Self::ALL.iter().find(|i| i.minutes() == minutes) {
            Some(interval) => Ok(*interval),
            None => bail!("Unsupported candle interval: {}m (expected 60, 240 or 1440)", minutes),
        }
    }
}

impl std::fmt::Display for CandleInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneHour => write!(f, "1H"),
            Self::FourHours => write!(f, "4H"),
            Self::OneDay => write!(f, "1D"),
        }
    }
}

/// Current/max/min premium over the loaded range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub current: f64,
    pub max: f64,
    pub min: f64,
    pub last_updated: DateTime<Utc>,
}

/// Service rows arrive newest first; charts want oldest first
pub fn chronological(candles: &[MarketCandle]) -> Vec<MarketCandle> {
    candles.iter().rev().cloned().collect()
}

/// Headline stats from a newest-first candle list. `None` when empty.
pub fn market_stats(candles: &[MarketCandle]) -> Option<MarketStats> {
    let latest = candles.first()?;

    let max = candles.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let min = candles.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);

    Some(MarketStats {
        current: latest.close,
        max,
        min,
        last_updated: latest.bucket,
    })
}

/// Render a timestamp in Korea Standard Time
pub fn format_kst(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Seoul).format("%Y-%m-%d %H:%M:%S KST").to_string()
}

/// Short KST label for chart axes
pub fn axis_label_kst(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Seoul).format("%m/%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle(hour: u32, high: f64, low: f64, close: f64) -> MarketCandle {
        MarketCandle {
            bucket: Utc.with_ymd_and_hms(2025, 1, 6, hour, 0, 0).unwrap(),
            open: close,
            high,
            low,
            close,
            avg_spread: close,
        }
    }

    #[test]
    fn test_stats_empty() {
        assert_eq!(market_stats(&[]), None);
    }

    #[test]
    fn test_stats_use_newest_close() {
        let candles = vec![
            candle(3, 2.1, 1.4, 1.8),
            candle(2, 2.6, 1.1, 1.5),
            candle(1, 1.9, 0.7, 1.2),
        ];

        let stats = market_stats(&candles).unwrap();
        assert_eq!(stats.current, 1.8);
        assert_eq!(stats.max, 2.6);
        assert_eq!(stats.min, 0.7);
        assert_eq!(stats.last_updated, candles[0].bucket);
    }

    #[test]
    fn test_chronological_reverses() {
        let candles = vec![candle(3, 1.0, 1.0, 1.0), candle(1, 1.0, 1.0, 1.0)];
        let ordered = chronological(&candles);

        assert!(ordered[0].bucket < ordered[1].bucket);
        assert_eq!(candles[0].bucket.format("%H").to_string(), "03");
    }

    #[test]
    fn test_interval_from_minutes() {
        assert_eq!(CandleInterval::from_minutes(240).unwrap(), CandleInterval::FourHours);
        assert!(CandleInterval::from_minutes(15).is_err());
        assert_eq!(CandleInterval::OneDay.to_string(), "1D");
    }

    #[test]
    fn test_format_kst() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 6, 15, 30, 0).unwrap();
        assert_eq!(format_kst(ts), "2025-01-07 00:30:00 KST");
        assert_eq!(axis_label_kst(ts), "01/07 00:30");
    }
}
