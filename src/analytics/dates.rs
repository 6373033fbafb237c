use time::{
    format_description::FormatItem, macros::format_description, Date, Duration, OffsetDateTime,
    PrimitiveDateTime, Time,
};

use crate::error::{AppError, AppResult};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Inclusive time window covering whole UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl DateRange {
    /// From 00:00 on `start` through the last nanosecond of `end`.
    pub fn whole_days(start: Date, end: Date) -> AppResult<Self> {
        if end < start {
            return Err(AppError::bad_request("end_date cannot be before start_date"));
        }
        Ok(Self {
            start: start.midnight().assume_utc(),
            end: PrimitiveDateTime::new(end, Time::MAX).assume_utc(),
        })
    }

    /// First day of the current month through `now`.
    pub fn month_to_date(now: OffsetDateTime) -> Self {
        let now = now.to_offset(time::UtcOffset::UTC);
        let first = now.date() - Duration::days(i64::from(now.day()) - 1);
        Self {
            start: first.midnight().assume_utc(),
            end: now,
        }
    }

    pub fn start_date(&self) -> Date {
        self.start.date()
    }

    pub fn end_date(&self) -> Date {
        self.end.date()
    }

    /// Calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date() - self.start_date()).whole_days() + 1
    }
}

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

pub fn parse_date(field: &str, raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| AppError::bad_request(format!("Invalid {field} format. Use YYYY-MM-DD")))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Both bounds or neither; a lone bound is rejected.
pub fn optional_range(start: Option<&str>, end: Option<&str>) -> AppResult<Option<DateRange>> {
    match (non_empty(start), non_empty(end)) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => Ok(Some(DateRange::whole_days(
            parse_date("start_date", start)?,
            parse_date("end_date", end)?,
        )?)),
        _ => Err(AppError::bad_request(
            "start_date and end_date must be provided together",
        )),
    }
}

pub fn required_range(start: Option<&str>, end: Option<&str>) -> AppResult<DateRange> {
    match (non_empty(start), non_empty(end)) {
        (Some(start), Some(end)) => DateRange::whole_days(
            parse_date("start_date", start)?,
            parse_date("end_date", end)?,
        ),
        _ => Err(AppError::bad_request("Both start_date and end_date are required")),
    }
}
