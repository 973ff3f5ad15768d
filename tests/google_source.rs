use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use reqwest::Url;
use tokio::net::TcpListener;

use phonebox_calendar::event::local_midnight;
use phonebox_calendar::google::GoogleCalendarSource;
use phonebox_calendar::server::{router, AppState, NO_ACCESS};
use phonebox_calendar::{CalendarHandle, EventSource, SourceError, TimeWindow};

const TOKEN: &str = "test-token";
const FAMILY: &str = "family#kids@group.calendar.google.com";

#[derive(Default)]
struct Upstream {
    /// Every events request as (calendar id, query).
    requests: Mutex<Vec<(String, HashMap<String, String>)>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == format!("Bearer {TOKEN}"))
}

fn json(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn day(offset: i64) -> String {
    (today() + Duration::days(offset)).format("%Y-%m-%d").to_string()
}

async fn calendar_list(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let body = match query.get("pageToken").map(String::as_str) {
        None => format!(
            r#"{{
                "items": [
                    {{ "id": "{FAMILY}", "summary": "Kids", "selected": true }},
                    {{ "id": "work@example.com", "summary": "Work", "selected": true }}
                ],
                "nextPageToken": "p2"
            }}"#
        ),
        Some("p2") => r#"{
            "items": [
                { "id": "hidden@example.com", "summary": "Kids" },
                { "id": "shared@example.com", "summary": "Kids", "selected": true },
                { "id": "untitled@example.com" }
            ]
        }"#
        .to_string(),
        Some(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    json(body)
}

async fn events(
    State(upstream): State<Arc<Upstream>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    upstream.requests.lock().unwrap().push((id.clone(), query));

    let body = match id.as_str() {
        FAMILY => format!(
            r#"{{
                "items": [
                    {{
                        "id": "marker",
                        "status": "confirmed",
                        "summary": "Kids",
                        "start": {{ "date": "{}" }},
                        "end": {{ "date": "{}" }}
                    }},
                    {{
                        "id": "swim",
                        "summary": "Swimming",
                        "start": {{ "dateTime": "2024-03-01T17:00:00+01:00" }},
                        "end": {{ "dateTime": "2024-03-01T18:00:00+01:00" }}
                    }},
                    {{ "id": "gone", "status": "cancelled" }}
                ]
            }}"#,
            day(-1),
            day(3)
        ),
        "shared@example.com" => format!(
            r#"{{
                "items": [
                    {{
                        "id": "marker",
                        "summary": "Kids",
                        "start": {{ "date": "{}" }},
                        "end": {{ "date": "{}" }}
                    }},
                    {{
                        "id": "untitled",
                        "start": {{ "date": "{}" }},
                        "end": {{ "date": "{}" }}
                    }}
                ]
            }}"#,
            day(-1),
            day(3),
            day(0),
            day(1)
        ),
        "work@example.com" => r#"{ "items": [] }"#.to_string(),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };

    json(body)
}

async fn upstream() -> (Url, Arc<Upstream>) {
    let state = Arc::new(Upstream::default());
    let app = Router::new()
        .route("/calendar/v3/users/me/calendarList", get(calendar_list))
        .route("/calendar/v3/calendars/:id/events", get(events))
        .with_state(Arc::clone(&state));

    let addr = serve(app).await;
    let url = Url::parse(&format!("http://{addr}/calendar/v3")).unwrap();
    (url, state)
}

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    addr
}

#[tokio::test]
async fn lists_matching_calendars_across_pages() {
    let (url, _) = upstream().await;
    let source = GoogleCalendarSource::new(url, TOKEN.into());

    let calendars = source.calendars_by_name("Kids").await.unwrap();

    let found = calendars
        .iter()
        .map(|calendar| (calendar.id(), calendar.name(), calendar.is_selected()))
        .collect::<Vec<_>>();
    assert_eq!(
        found,
        [
            (FAMILY, "Kids", true),
            ("hidden@example.com", "Kids", false),
            ("shared@example.com", "Kids", true),
        ]
    );

    assert!(source.calendars_by_name("Nope").await.unwrap().is_empty());
}

#[tokio::test]
async fn fetches_events_for_the_window() {
    let (url, upstream) = upstream().await;
    let source = GoogleCalendarSource::new(url, TOKEN.into());
    let family = source
        .calendars_by_name("Kids")
        .await
        .unwrap()
        .into_iter()
        .find(|calendar| calendar.id() == FAMILY)
        .unwrap();

    let window = TimeWindow::day_of(&Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
    let events = family.events(&window).await.unwrap();

    let requests = upstream.requests.lock().unwrap();
    let (id, query) = &requests[0];
    assert_eq!(id, FAMILY);
    assert_eq!(query["timeMin"], "2024-03-01T00:00:00Z");
    assert_eq!(query["timeMax"], "2024-03-02T00:00:00Z");
    assert_eq!(query["singleEvents"], "true");
    assert_eq!(query["orderBy"], "startTime");

    assert_eq!(events.len(), 2);

    let marker = &events[0];
    assert_eq!(marker.id, "marker");
    assert!(marker.is_all_day);
    assert_eq!(marker.start_time, local_midnight(today() - Duration::days(1), &Local));
    assert_eq!(marker.end_time, local_midnight(today() + Duration::days(3), &Local));

    let swim = &events[1];
    assert!(!swim.is_all_day);
    assert_eq!(swim.start_time, Utc.with_ymd_and_hms(2024, 3, 1, 16, 0, 0).unwrap());
}

#[tokio::test]
async fn rejected_token_is_a_status_error() {
    let (url, _) = upstream().await;
    let source = GoogleCalendarSource::new(url, "wrong".into());

    match source.calendars_by_name("Kids").await {
        Err(SourceError::Status { status, .. }) => assert_eq!(status, StatusCode::UNAUTHORIZED),
        Err(err) => panic!("unexpected error {err}"),
        Ok(_) => panic!("expected an error"),
    }
}

#[tokio::test]
async fn unreachable_provider_is_an_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = Url::parse(&format!("http://{addr}/calendar/v3")).unwrap();
    let source = GoogleCalendarSource::new(url, TOKEN.into());

    assert!(matches!(
        source.calendars_by_name("Kids").await,
        Err(SourceError::Http(_))
    ));
}

async fn lock_body(calendar: &str) -> (String, Arc<Upstream>) {
    let (url, upstream) = upstream().await;
    let addr = serve(router(AppState {
        source: GoogleCalendarSource::new(url, TOKEN.into()),
        calendar: calendar.into(),
    }))
    .await;

    let body = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    (body, upstream)
}

#[tokio::test]
async fn end_to_end_locked() {
    let (body, upstream) = lock_body("Kids").await;
    assert_eq!(body, "true");

    let fetched = upstream
        .requests
        .lock()
        .unwrap()
        .iter()
        .map(|(id, _)| id.clone())
        .collect::<Vec<_>>();
    assert_eq!(fetched, [FAMILY, "shared@example.com"]);
}

#[tokio::test]
async fn end_to_end_unlocked() {
    let (body, _) = lock_body("Work").await;
    assert_eq!(body, "false");
}

#[tokio::test]
async fn end_to_end_no_access() {
    let (body, upstream) = lock_body("Grandparents").await;
    assert_eq!(body, NO_ACCESS);
    assert!(upstream.requests.lock().unwrap().is_empty());
}
