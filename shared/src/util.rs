use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Random v4 UUID as a string, used for every document id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn to_local(millis: i64, tz: Tz) -> DateTime<Tz> {
    let utc = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
    tz.from_utc_datetime(&utc.naive_utc())
}

/// Business day (`YYYY-MM-DD`) of a timestamp in the given timezone
pub fn business_date(millis: i64, tz: Tz) -> NaiveDate {
    to_local(millis, tz).date_naive()
}

/// Wall-clock time of a timestamp in the given timezone
pub fn local_time_of_day(millis: i64, tz: Tz) -> NaiveTime {
    to_local(millis, tz).time()
}
