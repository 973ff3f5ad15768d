//! Lock decision over the events of a single day.
//!
//! Everything here is a pure function of its inputs: the caller reads the
//! clock once and passes the same instant to both the event query and
//! [`evaluate`].

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::event::CalendarEvent;

pub const MARKER_TITLE: &str = "kids";

/// How long before the marker's end boundary the phone unlocks.
pub fn unlock_offset() -> Duration {
    Duration::hours(12)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub locked: bool,
    pub cutoff: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
    pub marker: Option<CalendarEvent>,
}

/// Flattens per-calendar event lists into one list sorted by start time.
///
/// Events are deduplicated by id; the first occurrence in calendar order
/// wins and later copies are dropped.
pub fn merge<I, L>(calendar_event_lists: I) -> Vec<CalendarEvent>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = CalendarEvent>,
{
    let mut seen = HashSet::new();

    let mut events = calendar_event_lists
        .into_iter()
        .flatten()
        .filter(|event| seen.insert(event.id.clone()))
        .collect::<Vec<_>>();

    // stable, so equal start times keep calendar order
    events.sort_by_key(|event| event.start_time);
    events
}

pub fn is_marker(event: &CalendarEvent) -> bool {
    event.is_all_day && event.title.trim().to_lowercase() == MARKER_TITLE
}

pub fn find_marker(events: &[CalendarEvent]) -> Option<&CalendarEvent> {
    events.iter().find(|event| is_marker(event))
}

/// Noon of the marker's last day: the end boundary of an all-day event is
/// the midnight after it.
pub fn cutoff(marker: &CalendarEvent) -> DateTime<Utc> {
    marker.end_time - unlock_offset()
}

pub fn decide(marker: Option<&CalendarEvent>, now: DateTime<Utc>) -> Decision {
    let cutoff = marker.map(cutoff);

    Decision {
        locked: cutoff.is_some_and(|cutoff| now < cutoff),
        cutoff,
        now,
        marker: marker.cloned(),
    }
}

pub fn evaluate<I, L>(calendar_event_lists: I, now: DateTime<Utc>) -> Decision
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = CalendarEvent>,
{
    let events = merge(calendar_event_lists);
    decide(find_marker(&events), now)
}
