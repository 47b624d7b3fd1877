//! Reporting-day computation.
//!
//! Raw event records are bucketed under `inventory_changes/{ymd}/data`,
//! where the day key follows the warehouse's reporting timezone rather
//! than UTC: an event landing at 05:00 UTC still belongs to the previous
//! business day on the US west coast. The timezone is approximated as a
//! fixed UTC offset, which is accurate outside DST transition hours and
//! keeps the service free of a timezone database.

use chrono::{DateTime, FixedOffset, Offset, Utc};

/// Day key (`YYYY-MM-DD`) for `now` shifted by the reporting offset.
///
/// Offsets outside chrono's representable range fall back to UTC.
pub fn day_key(now: DateTime<Utc>, utc_offset_hours: i32) -> String {
    let offset: FixedOffset =
        FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
