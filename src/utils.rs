use crate::error::{DashboardError, Result};
use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveTime, Utc};

/// Storage format of every ledger date ("YYYY-MM-DD").
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%d";

/// A calendar month in UTC, inclusive on both ends. `end` is the last
/// nanosecond before the following month starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonthWindow {
    /// The month that contains `instant`.
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self::from_first_day(first_day_of_month(instant.date_naive()))
    }

    /// The month `month` (1-12) of `year`.
    pub fn for_month(year: i32, month: u32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            DashboardError::InvalidInput(format!("no such month: {:04}-{:02}", year, month))
        })?;
        Ok(Self::from_first_day(first))
    }

    fn from_first_day(first: NaiveDate) -> Self {
        let next = first.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
        Self {
            start: midnight_utc(first),
            end: midnight_utc(next) - Duration::nanoseconds(1),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn year(&self) -> i32 {
        self.start.year()
    }

    pub fn month(&self) -> u32 {
        self.start.month()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// A stored calendar date belongs to the month when its UTC midnight does.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(midnight_utc(date))
    }

    /// The window `months` calendar months earlier.
    pub fn months_back(&self, months: u32) -> Self {
        let first = self
            .first_day()
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        Self::from_first_day(first)
    }

    /// Chart label such as "Jan/24".
    pub fn label(&self) -> String {
        self.start.format("%b/%y").to_string()
    }
}

pub fn month_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    MonthWindow::containing(instant).start
}

pub fn month_end(instant: DateTime<Utc>) -> DateTime<Utc> {
    MonthWindow::containing(instant).end
}

pub fn is_in_month(date: NaiveDate, month_start: DateTime<Utc>, month_end: DateTime<Utc>) -> bool {
    let instant = midnight_utc(date);
    month_start <= instant && instant <= month_end
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Advances `date` by whole calendar months. Days past the end of the target
/// month clamp to its last day (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

pub fn parse_record_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), RECORD_DATE_FORMAT).map_err(|_| {
        DashboardError::DateParseError(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD",
            value
        ))
    })
}

pub fn format_record_date(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

pub fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
