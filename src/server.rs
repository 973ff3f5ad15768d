use std::sync::Arc;

use axum::{extract::State, routing::get, Router};
use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};

use crate::engine::{self, Decision};
use crate::event::TimeWindow;
use crate::source::{self, EventSource, SourceError};

pub const NO_ACCESS: &str = "no access to calendar";

pub struct AppState<S> {
    pub source: S,
    /// Name shared by the calendars that may carry the marker event.
    pub calendar: String,
}

pub fn router<S: EventSource>(state: AppState<S>) -> Router {
    Router::new()
        .route("/", get(handle_lock::<S>))
        .with_state(Arc::new(state))
}

async fn handle_lock<S: EventSource>(State(state): State<Arc<AppState<S>>>) -> &'static str {
    let now = Local::now();
    let window = TimeWindow::day_of(&now);

    match check_lock(&state.source, &state.calendar, &window, now.with_timezone(&Utc)).await {
        Ok(decision) if decision.locked => "true",
        Ok(_) => "false",
        Err(err) => {
            warn!(calendar = %state.calendar, %err, "calendar unavailable");
            NO_ACCESS
        }
    }
}

/// Fetches `window` from the selected calendars and decides against `now`.
/// The engine only runs once every calendar has answered.
pub async fn check_lock<S: EventSource>(
    source: &S,
    calendar: &str,
    window: &TimeWindow,
    now: DateTime<Utc>,
) -> Result<Decision, SourceError> {
    let lists = source::fetch_selected(source, calendar, window).await?;
    let events = lists.iter().map(Vec::len).sum::<usize>();

    let decision = engine::evaluate(lists, now);

    info!(
        events,
        marker = decision.marker.as_ref().map(|marker| marker.id.as_str()),
        cutoff = ?decision.cutoff,
        now = %decision.now,
        locked = decision.locked,
        "decided"
    );

    Ok(decision)
}
