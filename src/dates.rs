use crate::error::{GlactError, Result};
use crate::model::DateRange;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// Parse a date input: RFC3339, `YYYY-MM-DD` (midnight UTC), or a relative
/// duration such as "30d" or "2weeks" meaning that long before now.
pub fn parse_date_input(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&datetime));
        }
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        let ago = Duration::from_std(duration)
            .map_err(|_| GlactError::InvalidDate(format!("Duration overflow for '{input}'")))?;
        return Ok(Utc::now() - ago);
    }

    Err(GlactError::Parse(format!(
        "Invalid date '{input}': expected RFC3339, YYYY-MM-DD, or a duration like '30d'"
    )))
}

/// Build the analysis range. With no explicit `since`, the window defaults to
/// `default_days` before now, matching the configured analysis period.
pub fn resolve_range(
    since: Option<&str>,
    until: Option<&str>,
    default_days: u32,
) -> Result<DateRange> {
    let since_dt = match since {
        Some(s) => parse_date_input(s)?,
        None => Utc::now() - Duration::days(default_days as i64),
    };

    let until_dt = match until {
        Some(u) => Some(parse_date_input(u)?),
        None => None,
    };

    if let Some(u) = until_dt {
        if since_dt > u {
            return Err(GlactError::InvalidDate(format!(
                "Invalid range: since ({since_dt}) is after until ({u})"
            )));
        }
    }

    let mut range = DateRange::new().with_since(since_dt);
    if let Some(u) = until_dt {
        range = range.with_until(u);
    }
    Ok(range)
}
