use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

/// A single calendar entry as reported by an event source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Unique within the calendar it came from.
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    /// Exclusive.
    pub end_time: DateTime<Utc>,
    pub is_all_day: bool,
}

/// Half-open `[start, end)` range events are queried for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The 24 hours starting at local midnight of the day `now` falls on,
    /// local meaning the zone `now` is expressed in.
    pub fn day_of<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let start = local_midnight(now.date_naive(), &now.timezone());

        Self {
            start,
            end: start + Duration::hours(24),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Start of `date` in `tz`. When a DST transition skips midnight the
/// offset in effect at that wall time is applied to it directly.
pub fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);

    match tz.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => {
            let offset = tz.offset_from_utc_datetime(&midnight).fix();
            let utc = midnight - Duration::seconds(offset.local_minus_utc().into());
            Utc.from_utc_datetime(&utc)
        }
    }
}
