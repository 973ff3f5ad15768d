use std::future::Future;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use crate::event::{CalendarEvent, TimeWindow};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no calendar named `{0}`")]
    NotFound(String),

    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar provider answered {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("event `{id}` is invalid: {reason}")]
    InvalidEvent { id: String, reason: String },
}

/// One calendar resolved by an [`EventSource`].
pub trait CalendarHandle: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the account owner has the calendar switched on.
    fn is_selected(&self) -> bool;

    /// Events whose span intersects `window`, in provider order.
    fn events(
        &self,
        window: &TimeWindow,
    ) -> impl Future<Output = Result<Vec<CalendarEvent>, SourceError>> + Send;
}

/// Read-only access to a calendar provider.
pub trait EventSource: Send + Sync + 'static {
    type Calendar: CalendarHandle;

    /// Every calendar called `name`. An empty list means nothing matched.
    fn calendars_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<Self::Calendar>, SourceError>> + Send;
}

/// Fetches `window` from every selected calendar called `name`, one list per
/// calendar in the order the source reported them.
pub async fn fetch_selected<S: EventSource>(
    source: &S,
    name: &str,
    window: &TimeWindow,
) -> Result<Vec<Vec<CalendarEvent>>, SourceError> {
    let calendars = source.calendars_by_name(name).await?;
    if calendars.is_empty() {
        return Err(SourceError::NotFound(name.to_string()));
    }

    let selected = calendars
        .iter()
        .filter(|calendar| calendar.is_selected())
        .collect::<Vec<_>>();

    info!(
        calendar = name,
        matched = calendars.len(),
        selected = selected.len(),
        "resolved calendars"
    );

    let mut lists = Vec::with_capacity(selected.len());
    for calendar in selected {
        let events = calendar.events(window).await?;
        debug!(calendar = calendar.name(), events = events.len(), "fetched events");
        lists.push(events);
    }

    Ok(lists)
}
