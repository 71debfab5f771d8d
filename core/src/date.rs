//! Calendar dates as the feed understands them.
//!
//! # Design
//! The feed is keyed by local calendar day, never by instant, so dates are
//! `chrono::NaiveDate` values wrapped in `CalendarDate`. The upper bound of the
//! selectable range is "today", which advances while the process runs; it is
//! read from a `Clock` at every check instead of being captured at startup.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Wire format for dates in both the query string and the response body.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// First day published by the feed.
pub const FEED_EPOCH: CalendarDate = match NaiveDate::from_ymd_opt(1995, 6, 16) {
    Some(d) => CalendarDate(d),
    None => panic!("feed epoch is a valid date"),
};

/// A single calendar day, formatted as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDate(NaiveDate);

impl CalendarDate {
    /// Returns `None` for days that do not exist (e.g. February 30th).
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// The following day, or `None` at the end of chrono's range.
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }
}

impl From<NaiveDate> for CalendarDate {
    fn from(d: NaiveDate) -> Self {
        Self(d)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_FORMAT))
    }
}

impl FromStr for CalendarDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, DATE_FORMAT).map(Self)
    }
}

/// Source of "today" in the local calendar.
pub trait Clock: Send + Sync {
    fn today(&self) -> CalendarDate;
}

/// Reads the host's local calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> CalendarDate {
        CalendarDate(Local::now().date_naive())
    }
}

/// A clock frozen on one day. Used by tests and by hosts that supply their
/// own notion of the current day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    today: CalendarDate,
}

impl FixedClock {
    pub const fn new(today: CalendarDate) -> Self {
        Self { today }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> CalendarDate {
        self.today
    }
}

/// Inclusive range of dates the feed can serve at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min: CalendarDate,
    pub max: CalendarDate,
}

impl DateBounds {
    /// Bounds as of the clock's current day.
    pub fn current(clock: &dyn Clock) -> Self {
        Self {
            min: FEED_EPOCH,
            max: clock.today(),
        }
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.min <= date && date <= self.max
    }
}
