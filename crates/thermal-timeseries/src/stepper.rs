//! Thermal Time Series Stepper
//!
//! Regular and calendar-aligned time grids used for resampling. A stepper
//! moves a timestamp forward or backward by whole grid steps and rounds an
//! arbitrary timestamp onto the grid.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thermal_common::{Result, ThermalError, Timestamp};

const SECOND: i64 = 1000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

// =============================================================================
// Calendar Unit
// =============================================================================

/// Calendar unit for calendar-aligned grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl CalendarUnit {
    /// Nominal width in milliseconds. Years and months report an average
    /// length and are only used for estimates.
    pub fn nominal_width(&self) -> i64 {
        match self {
            Self::Year => 365 * DAY,
            Self::Month => 30 * DAY,
            Self::Day => DAY,
            Self::Hour => HOUR,
            Self::Minute => MINUTE,
            Self::Second => SECOND,
        }
    }

    pub fn has_variable_length(&self) -> bool {
        matches!(self, Self::Year | Self::Month)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

impl FromStr for CalendarUnit {
    type Err = ThermalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            "hour" => Ok(Self::Hour),
            "minute" => Ok(Self::Minute),
            "second" => Ok(Self::Second),
            other => Err(ThermalError::InvalidStepper(format!(
                "unknown calendar unit '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Stepper
// =============================================================================

/// A time grid.
///
/// Deserializes from either an integer (fixed width in milliseconds) or a
/// calendar unit name, so `step = 5000` and `step = "month"` are both valid
/// configuration values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Stepper {
    /// Fixed-delta grid with the given width in milliseconds.
    Fixed(i64),
    /// Calendar-aligned grid.
    Calendar(CalendarUnit),
}

impl Stepper {
    pub fn fixed(width: i64) -> Self {
        Self::Fixed(width)
    }

    pub fn calendar(unit: CalendarUnit) -> Self {
        Self::Calendar(unit)
    }

    /// Reject non-positive fixed widths.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Fixed(width) if *width <= 0 => Err(ThermalError::InvalidStepper(format!(
                "step width must be positive, got {}",
                width
            ))),
            _ => Ok(()),
        }
    }

    /// Nominal step width in milliseconds.
    pub fn ref_step_width(&self) -> i64 {
        match self {
            Self::Fixed(width) => *width,
            Self::Calendar(unit) => unit.nominal_width(),
        }
    }

    /// Move `ts` by `n` grid steps.
    ///
    /// Year and month steps land exactly on the UTC boundary `n` units away
    /// from the unit containing `ts`. Timestamps chrono cannot represent are
    /// returned unchanged.
    pub fn step(&self, ts: Timestamp, n: i64) -> Timestamp {
        match self {
            Self::Calendar(unit) if unit.has_variable_length() => {
                calendar_step(*unit, ts, n).unwrap_or(ts)
            }
            _ => ts.saturating_add(self.ref_step_width().saturating_mul(n)),
        }
    }

    pub fn next(&self, ts: Timestamp) -> Timestamp {
        self.step(ts, 1)
    }

    pub fn prev(&self, ts: Timestamp) -> Timestamp {
        self.step(ts, -1)
    }

    /// Round `ts` onto the grid.
    ///
    /// Fixed grids round to the nearest multiple of the width (halves round
    /// up); calendar grids truncate to the start of the containing unit.
    pub fn round(&self, ts: Timestamp) -> Timestamp {
        match self {
            Self::Fixed(width) if *width > 0 => {
                let q = ts.div_euclid(*width);
                let r = ts.rem_euclid(*width);
                if r.saturating_mul(2) >= *width {
                    (q + 1).saturating_mul(*width)
                } else {
                    q.saturating_mul(*width)
                }
            }
            Self::Fixed(_) => ts,
            Self::Calendar(unit) if unit.has_variable_length() => {
                calendar_step(*unit, ts, 0).unwrap_or(ts)
            }
            Self::Calendar(unit) => ts - ts.rem_euclid(unit.nominal_width()),
        }
    }

    /// Grid points `from, step(from), ...` up to and including `to`.
    ///
    /// Stops early if a step fails to advance, which keeps saturated or
    /// unrepresentable timestamps from looping forever.
    pub fn grid(&self, from: Timestamp, to: Timestamp) -> Grid {
        Grid {
            stepper: *self,
            next: Some(from),
            to,
        }
    }
}

impl Default for Stepper {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

impl FromStr for Stepper {
    type Err = ThermalError;

    fn from_str(s: &str) -> Result<Self> {
        let stepper = match s.trim().parse::<i64>() {
            Ok(width) => Self::Fixed(width),
            Err(_) => Self::Calendar(s.parse()?),
        };
        stepper.validate()?;
        Ok(stepper)
    }
}

impl fmt::Display for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(width) => write!(f, "{}ms", width),
            Self::Calendar(unit) => write!(f, "{}", unit.as_str()),
        }
    }
}

fn calendar_step(unit: CalendarUnit, ts: Timestamp, n: i64) -> Option<Timestamp> {
    let date = DateTime::<Utc>::from_timestamp_millis(ts)?;
    let (year, month) = match unit {
        CalendarUnit::Year => (i64::from(date.year()).checked_add(n)?, 0),
        CalendarUnit::Month => {
            let total = (i64::from(date.year()) * 12 + i64::from(date.month0())).checked_add(n)?;
            (total.div_euclid(12), total.rem_euclid(12))
        }
        _ => return None,
    };
    let year = i32::try_from(year).ok()?;
    Utc.with_ymd_and_hms(year, month as u32 + 1, 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp_millis())
}

// =============================================================================
// Grid Iterator
// =============================================================================

/// Iterator over the grid points of a [`Stepper`] within a closed range.
#[derive(Debug, Clone)]
pub struct Grid {
    stepper: Stepper,
    next: Option<Timestamp>,
    to: Timestamp,
}

impl Iterator for Grid {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        let current = self.next.filter(|ts| *ts <= self.to)?;
        let following = self.stepper.next(current);
        self.next = (following > current).then_some(following);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap().timestamp_millis()
    }

    #[test]
    fn test_fixed_step_and_round() {
        let stepper = Stepper::fixed(5);
        assert_eq!(stepper.step(10, 2), 20);
        assert_eq!(stepper.prev(10), 5);
        assert_eq!(stepper.round(12), 10);
        assert_eq!(stepper.round(13), 15);
        assert_eq!(stepper.round(-3), -5);
        assert_eq!(stepper.ref_step_width(), 5);
    }

    #[test]
    fn test_month_step_lands_on_boundary() {
        let stepper = Stepper::calendar(CalendarUnit::Month);
        let mid_jan = utc(2024, 1, 17, 13, 5, 0);

        assert_eq!(stepper.step(mid_jan, 1), utc(2024, 2, 1, 0, 0, 0));
        assert_eq!(stepper.step(mid_jan, -1), utc(2023, 12, 1, 0, 0, 0));
        assert_eq!(stepper.step(mid_jan, 13), utc(2025, 2, 1, 0, 0, 0));
        assert_eq!(stepper.round(mid_jan), utc(2024, 1, 1, 0, 0, 0));
        assert_eq!(stepper.ref_step_width(), 30 * DAY);
    }

    #[test]
    fn test_year_step() {
        let stepper = Stepper::calendar(CalendarUnit::Year);
        let ts = utc(2023, 7, 4, 0, 0, 0);
        assert_eq!(stepper.next(ts), utc(2024, 1, 1, 0, 0, 0));
        assert_eq!(stepper.round(ts), utc(2023, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_fixed_units_truncate_on_round() {
        let ts = utc(2024, 3, 9, 17, 42, 31) + 250;

        assert_eq!(Stepper::calendar(CalendarUnit::Day).round(ts), utc(2024, 3, 9, 0, 0, 0));
        assert_eq!(Stepper::calendar(CalendarUnit::Hour).round(ts), utc(2024, 3, 9, 17, 0, 0));
        assert_eq!(Stepper::calendar(CalendarUnit::Minute).round(ts), utc(2024, 3, 9, 17, 42, 0));
        assert_eq!(Stepper::calendar(CalendarUnit::Second).round(ts), utc(2024, 3, 9, 17, 42, 31));
        assert_eq!(Stepper::calendar(CalendarUnit::Day).step(ts, 2), ts + 2 * DAY);
    }

    #[test]
    fn test_grid() {
        let points: Vec<_> = Stepper::fixed(5).grid(0, 20).collect();
        assert_eq!(points, vec![0, 5, 10, 15, 20]);

        assert_eq!(Stepper::fixed(5).grid(10, 0).count(), 0);
        assert_eq!(Stepper::fixed(0).grid(0, 10).count(), 1);
    }

    #[test]
    fn test_parse_and_deserialize() {
        assert_eq!("250".parse::<Stepper>().unwrap(), Stepper::fixed(250));
        assert_eq!("Month".parse::<Stepper>().unwrap(), Stepper::calendar(CalendarUnit::Month));
        assert!("0".parse::<Stepper>().is_err());
        assert!("fortnight".parse::<Stepper>().is_err());

        let parsed: Vec<Stepper> = serde_json::from_str(r#"[1000, "day"]"#).unwrap();
        assert_eq!(parsed, vec![Stepper::fixed(1000), Stepper::calendar(CalendarUnit::Day)]);
    }
}
