//! Wall-clock formatting in the active timezone.
//!
//! `None` means the host's local timezone. A resolved zone only ever
//! comes from `customLocation.timezone` — the weather API's
//! `timezone=auto` echo is never used here.

use chrono::{DateTime, Local, Utc};
use chrono_tz::Tz;

/// 12-hour clock line, e.g. "3:07:45 PM".
pub fn format_time(now: DateTime<Utc>, timezone: Option<Tz>) -> String {
    match timezone {
        Some(tz) => now.with_timezone(&tz).format("%-I:%M:%S %p").to_string(),
        None => now.with_timezone(&Local).format("%-I:%M:%S %p").to_string(),
    }
}

/// Long date line for the panel, e.g. "Sunday, February 1, 2026".
pub fn format_date(now: DateTime<Utc>, timezone: Option<Tz>) -> String {
    match timezone {
        Some(tz) => now.with_timezone(&tz).format("%A, %B %-d, %Y").to_string(),
        None => now.with_timezone(&Local).format("%A, %B %-d, %Y").to_string(),
    }
}
