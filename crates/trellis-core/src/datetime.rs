use anyhow::anyhow;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Named date windows offered by the board's date-range filter. `Custom`
/// carries its bounds in the filter state; `All` disables the range filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateRangePreset {
    Today,
    Week,
    Month,
    Year,
    Custom,
    All,
}

impl DateRangePreset {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "today" => Ok(DateRangePreset::Today),
            "week" => Ok(DateRangePreset::Week),
            "month" => Ok(DateRangePreset::Month),
            "year" => Ok(DateRangePreset::Year),
            "custom" => Ok(DateRangePreset::Custom),
            "all" => Ok(DateRangePreset::All),
            other => Err(anyhow!("unknown date range preset: {other}")),
        }
    }
}

/// Half-open UTC window `[start, end)` for a preset, anchored at `now`.
/// `All` yields no window; `Custom` yields the bounds passed in (either side
/// may be open).
pub fn resolve_range(
    preset: DateRangePreset,
    now: DateTime<Utc>,
    custom: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
) -> Option<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    let day = now.date_naive();
    match preset {
        DateRangePreset::All => None,
        DateRangePreset::Custom => Some(custom),
        DateRangePreset::Today => window(day, day + Duration::days(1)),
        DateRangePreset::Week => {
            let start = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
            window(start, start + Duration::days(7))
        }
        DateRangePreset::Month => {
            let start = day.with_day(1)?;
            let end = next_month(start);
            window(start, end)
        }
        DateRangePreset::Year => {
            let start = NaiveDate::from_ymd_opt(day.year(), 1, 1)?;
            let end = NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)?;
            window(start, end)
        }
    }
}

pub fn in_range(
    value: DateTime<Utc>,
    range: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
) -> bool {
    let (start, end) = range;
    if let Some(start) = start
        && value < start
    {
        return false;
    }
    if let Some(end) = end
        && value >= end
    {
        return false;
    }
    true
}

pub fn format_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

pub fn parse_date(value: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| anyhow!("invalid date {value:?}: {err}"))?;
    midnight(date).ok_or_else(|| anyhow!("date out of range: {value}"))
}

fn window(
    start: NaiveDate,
    end: NaiveDate,
) -> Option<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    Some((Some(midnight(start)?), Some(midnight(end)?)))
}

fn midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    Utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}

fn next_month(start: NaiveDate) -> NaiveDate {
    if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).unwrap_or(start)
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1).unwrap_or(start)
    }
}
