//! Weekly spread heatmap
//!
//! The service keys cells by UTC day/hour/segment. The dashboard shows them
//! in KST, which shifts every cell by nine hours and can carry Saturday
//! evening over into Sunday morning.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::types::SpreadHeatmapCell;

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const MINUTES_PER_WEEK: u32 = 7 * MINUTES_PER_DAY;
pub const KST_OFFSET_MINUTES: u32 = 9 * 60;

pub const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Shift a UTC-keyed cell into KST, wrapping around the end of the week.
/// Out-of-range fields wrap instead of overflowing.
pub fn to_kst(cell: &SpreadHeatmapCell) -> SpreadHeatmapCell {
    let utc_minutes = u64::from(cell.day_of_week) * u64::from(MINUTES_PER_DAY)
        + u64::from(cell.hour_of_day) * 60
        + u64::from(cell.minute_segment);
    let kst_minutes = ((utc_minutes + u64::from(KST_OFFSET_MINUTES))
        % u64::from(MINUTES_PER_WEEK)) as u32;

    let remaining = kst_minutes % MINUTES_PER_DAY;
    SpreadHeatmapCell {
        day_of_week: kst_minutes / MINUTES_PER_DAY,
        hour_of_day: remaining / 60,
        minute_segment: remaining % 60,
        avg_spread: cell.avg_spread,
    }
}

/// 7 x (24 * slots per hour) grid of KST average spreads
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapGrid {
    pub segment_minutes: u32,
    /// Lower bound of the color scale (never above 0)
    pub min: f64,
    /// Upper bound of the color scale (never below 0.5)
    pub max: f64,
    /// One row per day, Sunday first
    pub rows: Vec<Vec<Option<f64>>>,
}

impl HeatmapGrid {
    pub fn build(cells: &[SpreadHeatmapCell], segment_minutes: u32) -> Result<Self> {
        if segment_minutes == 0 || 60 % segment_minutes != 0 {
            bail!(
                "Invalid heatmap segment: {}m (must divide an hour, e.g. 30 or 60)",
                segment_minutes
            );
        }

        let slots = Self::slots_per_day(segment_minutes);
        let mut rows = vec![vec![None; slots]; 7];

        let kst: Vec<SpreadHeatmapCell> = cells.iter().map(to_kst).collect();
        for cell in &kst {
            // Shifted cells that no longer sit on a slot boundary are dropped
            if cell.minute_segment % segment_minutes != 0 {
                continue;
            }
            let slot = (cell.hour_of_day * 60 + cell.minute_segment) / segment_minutes;
            if let Some(row) = rows.get_mut(cell.day_of_week as usize) {
                // First cell for a slot wins
                if let Some(value) = row.get_mut(slot as usize) {
                    if value.is_none() {
                        *value = Some(cell.avg_spread);
                    }
                }
            }
        }

        let max = kst.iter().map(|c| c.avg_spread).fold(0.5, f64::max);
        let min = kst.iter().map(|c| c.avg_spread).fold(0.0, f64::min);

        Ok(Self {
            segment_minutes,
            min,
            max,
            rows,
        })
    }

    pub fn slots_per_day(segment_minutes: u32) -> usize {
        (MINUTES_PER_DAY / segment_minutes) as usize
    }

    /// Hour and minute a slot index starts at
    pub fn slot_time(&self, slot: usize) -> (u32, u32) {
        let start = slot as u32 * self.segment_minutes;
        (start / 60, start % 60)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Option::is_none))
    }

    /// Position of a value on the scale: 0 at `min`, 1 at `max`
    pub fn ratio(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        let range = if range == 0.0 { 1.0 } else { range };
        (value - self.min) / range
    }

    /// Hue in degrees: 120 (green) for low spreads down to 0 (red) for high
    pub fn hue(&self, value: f64) -> f64 {
        (1.0 - self.ratio(value)) * 120.0
    }

    pub fn color(&self, value: f64) -> String {
        format!("hsl({:.0}, 70%, 50%)", self.hue(value))
    }
}
