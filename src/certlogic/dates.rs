//! Purpose: Date and date-time handling for CertLogic's time operations.
//! Exports: `TimeUnit`, `parse_date_time`, `parse_date_of_birth`, `plus_time`, `format_date_time`.
//! Role: Parses the ISO-8601 subset CertLogic allows and performs calendar arithmetic in UTC.
//! Invariants: Strings without a zone designator are read as UTC.
//! Invariants: Month/year arithmetic keeps the day-of-month and rolls over past month end
//! Invariants: (Jan 31 + 1 month = Mar 3 in a common year).
//! Invariants: Arithmetic overflow is an error, never a panic.

use time::format_description::{self, BorrowedFormatItem};
use time::parsing::Parsed;
use time::{Date, Duration, Month, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const CALENDAR_DATE: &str = "[year]-[month]-[day]";
const YEAR_MONTH: &str = "[year]-[month]";
const YEAR: &str = "[year]";
const OUTPUT: &str = "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z";

/// Local date-times, read as UTC (with or without a trailing `Z`).
const LOCAL_DATE_TIMES: [&str; 4] = [
    "[year]-[month]-[day]T[hour]:[minute]:[second]",
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
    "[year]-[month]-[day]T[hour]:[minute]:[second]Z",
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]Z",
];

/// Offsets as `±hh:mm`, `±hhmm`, or `±hh`.
const OFFSET_DATE_TIMES: [&str; 6] = [
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
    concat!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
        "[offset_hour sign:mandatory]:[offset_minute]"
    ),
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]",
    concat!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
        "[offset_hour sign:mandatory][offset_minute]"
    ),
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]",
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeUnit {
    Year,
    Month,
    Day,
    Hour,
}

impl TimeUnit {
    pub const NAMES: [&'static str; 4] = ["year", "month", "day", "hour"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "hour" => Some(Self::Hour),
            _ => None,
        }
    }
}

fn description(text: &'static str) -> Result<Vec<BorrowedFormatItem<'static>>, String> {
    format_description::parse(text).map_err(|err| format!("invalid format description: {err}"))
}

pub fn parse_date_time(text: &str) -> Result<OffsetDateTime, String> {
    if let Ok(date) = Date::parse(text, &description(CALENDAR_DATE)?) {
        return Ok(date.midnight().assume_utc());
    }
    for format in LOCAL_DATE_TIMES {
        if let Ok(value) = PrimitiveDateTime::parse(text, &description(format)?) {
            return Ok(value.assume_utc());
        }
    }
    for format in OFFSET_DATE_TIMES {
        if let Ok(value) = OffsetDateTime::parse(text, &description(format)?) {
            return Ok(value);
        }
    }
    Err(format!("not an allowed date or date-time format: {text}"))
}

/// `YYYY`, `YYYY-MM`, or `YYYY-MM-DD`; partial dates resolve to the last day they cover.
pub fn parse_date_of_birth(text: &str) -> Result<OffsetDateTime, String> {
    let invalid = || format!("not a valid date of birth: {text}");
    if let Ok(date) = Date::parse(text, &description(CALENDAR_DATE)?) {
        return Ok(date.midnight().assume_utc());
    }

    let (year, month) = if let Some(parsed) = parse_partial(text, YEAR_MONTH)? {
        (parsed.year(), parsed.month())
    } else if let Some(parsed) = parse_partial(text, YEAR)? {
        (parsed.year(), Some(Month::December))
    } else {
        return Err(invalid());
    };
    let (Some(year), Some(month)) = (year, month) else {
        return Err(invalid());
    };
    let date = Date::from_calendar_date(year, month, month.length(year)).map_err(|_| invalid())?;
    Ok(date.midnight().assume_utc())
}

/// Parses the whole of `text` against `format`, keeping whatever components it carries.
fn parse_partial(text: &str, format: &'static str) -> Result<Option<Parsed>, String> {
    let items = description(format)?;
    let mut parsed = Parsed::new();
    match parsed.parse_items(text.as_bytes(), &items) {
        Ok(rest) if rest.is_empty() => Ok(Some(parsed)),
        _ => Ok(None),
    }
}

pub fn plus_time(
    value: OffsetDateTime,
    amount: i64,
    unit: TimeUnit,
) -> Result<OffsetDateTime, String> {
    let overflow = || format!("date-time out of range after adding {amount} {unit:?}");
    let value = value.to_offset(UtcOffset::UTC);
    let seconds = |per_unit: i64| amount.checked_mul(per_unit).map(Duration::seconds);
    match unit {
        TimeUnit::Hour => seconds(3_600)
            .and_then(|duration| value.checked_add(duration))
            .ok_or_else(overflow),
        TimeUnit::Day => seconds(86_400)
            .and_then(|duration| value.checked_add(duration))
            .ok_or_else(overflow),
        TimeUnit::Month => add_months(value, amount).ok_or_else(overflow),
        TimeUnit::Year => amount
            .checked_mul(12)
            .and_then(|months| add_months(value, months))
            .ok_or_else(overflow),
    }
}

pub fn format_date_time(value: OffsetDateTime) -> Result<String, String> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&description(OUTPUT)?)
        .map_err(|err| format!("cannot format date-time: {err}"))
}

fn add_months(value: OffsetDateTime, months: i64) -> Option<OffsetDateTime> {
    let date = value.date();
    let index = i64::from(date.year())
        .checked_mul(12)?
        .checked_add(i64::from(u8::from(date.month())) - 1)?
        .checked_add(months)?;
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let shifted = first.checked_add(Duration::days(i64::from(date.day()) - 1))?;
    Some(value.replace_date(shifted))
}
