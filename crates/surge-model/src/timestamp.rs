//! Wall-clock timestamps as they appear in the report.
//!
//! Times are rendered with millisecond precision and a numeric offset, e.g. `2024-03-05T07:08:09.123+0200`.
use std::sync::OnceLock;

use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};

const REPORT_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory][offset_minute]"
);

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Resolve and pin the local offset.
///
/// Must run while the process is still single-threaded: on Linux the platform lookup is refused once other
/// threads exist, and every later timestamp would fall back to UTC.
pub fn init_local_offset() -> UtcOffset {
    local_offset()
}

/// Local offset, resolved once. Falls back to UTC when the platform refuses to report it.
pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// Current time in the local offset.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

pub fn format(ts: OffsetDateTime) -> Result<String, time::error::Format> {
    ts.format(REPORT_FORMAT)
}
