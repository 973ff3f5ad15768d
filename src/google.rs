//! [`EventSource`] backed by the Google Calendar v3 REST API.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::event::{local_midnight, CalendarEvent, TimeWindow};
use crate::source::{CalendarHandle, EventSource, SourceError};

pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/calendar/v3";

struct Connection {
    client: Client,
    api_url: Url,
    token: String,
}

#[derive(Clone)]
pub struct GoogleCalendarSource {
    connection: Arc<Connection>,
}

pub struct GoogleCalendar {
    connection: Arc<Connection>,
    id: String,
    name: String,
    selected: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CalendarListEntry {
    id: String,
    summary: Option<String>,
    #[serde(default)]
    selected: bool,
}

#[derive(Deserialize)]
struct ApiEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

impl GoogleCalendarSource {
    /// `token` is an OAuth access token with calendar read scope.
    pub fn new(api_url: Url, token: String) -> Self {
        Self {
            connection: Arc::new(Connection {
                client: Client::new(),
                api_url,
                token,
            }),
        }
    }
}

impl Connection {
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Follows `nextPageToken` until the listing is exhausted.
    async fn get_all<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, SourceError> {
        let mut items = Vec::new();
        let mut page_token = None::<String>;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&self.token)
                .query(query);

            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            debug!(%url, page = ?page_token, "requesting");
            let response = request.send().await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SourceError::Status {
                    status,
                    url: url.to_string(),
                });
            }

            let page = response.json::<Page<T>>().await?;
            items.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(items),
            }
        }
    }
}

impl EventSource for GoogleCalendarSource {
    type Calendar = GoogleCalendar;

    async fn calendars_by_name(&self, name: &str) -> Result<Vec<GoogleCalendar>, SourceError> {
        let url = self.connection.endpoint(&["users", "me", "calendarList"]);
        let entries = self
            .connection
            .get_all::<CalendarListEntry>(url, &[])
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.summary.as_deref() == Some(name))
            .map(|entry| GoogleCalendar {
                connection: Arc::clone(&self.connection),
                id: entry.id,
                name: name.to_string(),
                selected: entry.selected,
            })
            .collect())
    }
}

impl GoogleCalendar {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl CalendarHandle for GoogleCalendar {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_selected(&self) -> bool {
        self.selected
    }

    async fn events(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, SourceError> {
        let url = self.connection.endpoint(&["calendars", &self.id, "events"]);
        let query = [
            ("timeMin", rfc3339(window.start)),
            ("timeMax", rfc3339(window.end)),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];

        let mut events = Vec::new();
        for event in self.connection.get_all::<ApiEvent>(url, &query).await? {
            if let Some(event) = event.into_event()? {
                events.push(event);
            }
        }

        Ok(events)
    }
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl ApiEvent {
    /// `None` for cancelled instances.
    fn into_event(self) -> Result<Option<CalendarEvent>, SourceError> {
        if self.status.as_deref() == Some("cancelled") {
            return Ok(None);
        }

        let invalid = |reason: &str| SourceError::InvalidEvent {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        let (start_time, is_all_day) = self
            .start
            .as_ref()
            .ok_or_else(|| invalid("missing start"))?
            .instant()
            .map_err(&invalid)?;

        let (end_time, _) = self
            .end
            .as_ref()
            .ok_or_else(|| invalid("missing end"))?
            .instant()
            .map_err(&invalid)?;

        Ok(Some(CalendarEvent {
            title: self.summary.unwrap_or_default(),
            id: self.id,
            start_time,
            end_time,
            is_all_day,
        }))
    }
}

impl ApiEventTime {
    /// The instant plus whether it came from a whole date. Dates are taken
    /// as local midnight of the host clock.
    fn instant(&self) -> Result<(DateTime<Utc>, bool), &'static str> {
        if let Some(date_time) = &self.date_time {
            let parsed = DateTime::parse_from_rfc3339(date_time)
                .map_err(|_| "dateTime is not RFC 3339")?;
            return Ok((parsed.with_timezone(&Utc), false));
        }

        let date = self.date.as_deref().ok_or("neither date nor dateTime set")?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| "date is not YYYY-MM-DD")?;
        Ok((local_midnight(date, &Local), true))
    }
}
