use crate::error::{StoreError, StoreResult};
use chrono::{NaiveDate, NaiveTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MS_PER_DAY: i64 = 86_400_000;

pub(super) fn date_to_db(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(super) fn date_from_db(raw: &str) -> StoreResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StoreError::Decode(format!("date '{raw}': {e}")))
}

/// Half-open `[start, end)` range of unix milliseconds covering `date` in UTC.
pub(super) fn day_bounds_ms(date: NaiveDate) -> (i64, i64) {
    let start = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    (start, start + MS_PER_DAY)
}

pub(super) fn count_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(super) fn count_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}
