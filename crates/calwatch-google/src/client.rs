use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use calwatch_core::{CalendarSource, Event, FetchWindow, SourceError};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::oauth::GoogleAuth;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const PAGE_SIZE: &str = "250";
/// Stop following `nextPageToken` after this many pages.
const MAX_PAGES: usize = 100;
const UNTITLED: &str = "(no title)";

/// One page of `events.list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventsPage {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<EventTime>,
    #[serde(default)]
    pub end: Option<EventTime>,
}

/// `dateTime` for timed events, `date` for all-day ones.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventTime {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

impl EventTime {
    fn raw(self) -> Option<String> {
        self.date_time.or(self.date)
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map one API item onto an [`Event`]. Cancelled items and items without an
/// id or a start are dropped.
pub(crate) fn to_event(item: ApiEvent, calendar_id: &str) -> Option<Event> {
    if item.status.as_deref() == Some("cancelled") {
        return None;
    }
    let id = item.id.filter(|id| !id.is_empty())?;
    let start = item.start.and_then(EventTime::raw)?;
    let end = item.end.and_then(EventTime::raw).unwrap_or_else(|| start.clone());
    let title = item
        .summary
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    Some(Event {
        id,
        title,
        start,
        end,
        source_tag: calendar_id.to_string(),
    })
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Google Calendar v3 event source.
pub struct GoogleCalendarSource {
    client: reqwest::Client,
    auth: GoogleAuth,
    api_base: String,
}

impl GoogleCalendarSource {
    pub fn new(
        credentials_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Request(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            auth: GoogleAuth::new(client.clone(), credentials_path, token_path),
            client,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the source at a different API root (e.g. a local test server).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_page(
        &self,
        calendar_id: &str,
        window: &FetchWindow,
        page_token: Option<&str>,
    ) -> Result<EventsPage, SourceError> {
        let token = self.auth.access_token().await?;
        let url = format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        );

        let mut query = vec![
            ("timeMin", window.time_min.to_rfc3339()),
            ("timeMax", window.time_max.to_rfc3339()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
        ];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token.to_string()));
        }

        let resp = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = api_error_message(&text);
            warn!(status, calendar_id, error = %message, "Google Calendar API error");
            return Err(match status {
                401 => SourceError::Auth(message),
                _ => SourceError::Api { status, message },
            });
        }

        resp.json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarSource {
    fn name(&self) -> &str {
        "google"
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        window: &FetchWindow,
    ) -> Result<Vec<Event>, SourceError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_PAGES {
            let body = self
                .fetch_page(calendar_id, window, page_token.as_deref())
                .await?;
            events.extend(
                body.items
                    .into_iter()
                    .filter_map(|item| to_event(item, calendar_id)),
            );

            match body.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => {
                    debug!(calendar_id, pages = page, count = events.len(), "calendar listed");
                    return Ok(events);
                }
            }
        }

        warn!(calendar_id, max_pages = MAX_PAGES, "page limit reached, result truncated");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(json: &str) -> EventsPage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn timed_and_all_day_items_map_to_raw_values() {
        let body = page(
            r#"{
              "items": [
                {"id": "a", "status": "confirmed", "summary": "Standup",
                 "start": {"dateTime": "2026-02-05T10:00:00+09:00", "timeZone": "Asia/Tokyo"},
                 "end": {"dateTime": "2026-02-05T10:15:00+09:00"}},
                {"id": "b", "summary": "Holiday",
                 "start": {"date": "2026-02-11"}, "end": {"date": "2026-02-12"}}
              ]
            }"#,
        );
        let events: Vec<Event> = body
            .items
            .into_iter()
            .filter_map(|i| to_event(i, "primary"))
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, "2026-02-05T10:00:00+09:00");
        assert_eq!(events[0].end, "2026-02-05T10:15:00+09:00");
        assert_eq!(events[0].source_tag, "primary");
        assert_eq!(events[1].start, "2026-02-11");
        assert!(body.next_page_token.is_none());
    }

    #[test]
    fn missing_summary_gets_placeholder() {
        let body = page(r#"{"items": [{"id": "a", "start": {"date": "2026-02-11"}}]}"#);
        let event = to_event(body.items.into_iter().next().unwrap(), "primary").unwrap();
        assert_eq!(event.title, "(no title)");
        // no end: falls back to start
        assert_eq!(event.end, "2026-02-11");
    }

    #[test]
    fn cancelled_and_startless_items_are_dropped() {
        let body = page(
            r#"{"items": [
                {"id": "gone", "status": "cancelled", "start": {"date": "2026-02-11"}},
                {"id": "nostart", "summary": "?"},
                {"summary": "no id", "start": {"date": "2026-02-11"}}
            ]}"#,
        );
        assert!(body.items.into_iter().all(|i| to_event(i, "primary").is_none()));
    }

    #[test]
    fn page_token_is_read() {
        let body = page(r#"{"items": [], "nextPageToken": "abc"}"#);
        assert_eq!(body.next_page_token.as_deref(), Some("abc"));
    }

    #[test]
    fn api_error_message_prefers_google_message() {
        let body = r#"{"error": {"code": 404, "message": "Not Found", "errors": []}}"#;
        assert_eq!(api_error_message(body), "Not Found");
        assert_eq!(api_error_message("plain text"), "plain text");
    }
}
