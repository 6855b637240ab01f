use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::formats::{RawDeadline, RawDue, RawSource};
use crate::portal::PortalClient;

pub const METHOD_NAME: &str = "core_calendar_get_action_events_by_timesort";
pub const EVENT_LIMIT: u32 = 20;
pub const LOOKBACK_DAYS: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiEvent {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub timesort: i64,
    #[serde(default)]
    pub course: Option<ApiCourse>,
    #[serde(default)]
    pub action: Option<ApiAction>,
    #[serde(default)]
    pub viewurl: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCourse {
    #[serde(default)]
    pub fullname: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAction {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub actionable: Option<bool>,
}

pub fn build_request_body(now: DateTime<Utc>) -> serde_json::Value {
    let timesort_from = (now - Duration::days(LOOKBACK_DAYS)).timestamp();
    serde_json::json!([{
        "index": 0,
        "methodname": METHOD_NAME,
        "args": {
            "limitnum": EVENT_LIMIT,
            "timesortfrom": timesort_from,
            "limittononsuspendedevents": true,
        },
    }])
}

pub async fn fetch_events(
    client: &PortalClient,
    token: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<ApiEvent>> {
    let mut url = client.config().service_url()?;
    url.query_pairs_mut()
        .append_pair("sesskey", token)
        .append_pair("info", METHOD_NAME);

    let response = client
        .http()
        .post(url.clone())
        .json(&build_request_body(now))
        .send()
        .await
        .with_context(|| format!("POST {}", url.path()))?;

    let status = response.status();
    let raw = response.text().await.context("read service response body")?;
    if !status.is_success() {
        anyhow::bail!("service endpoint returned {status}");
    }

    let value: serde_json::Value =
        serde_json::from_str(&raw).context("parse service response")?;
    parse_response(&value)
}

/// Any error marker fails the whole batch.
pub fn parse_response(value: &serde_json::Value) -> anyhow::Result<Vec<ApiEvent>> {
    if let Some(obj) = value.as_object() {
        let message = obj
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unexpected response shape");
        anyhow::bail!("{message}");
    }

    let items = value
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("unexpected response shape"))?;
    let Some(first) = items.first() else {
        return Ok(Vec::new());
    };

    if first.get("error").and_then(|v| v.as_bool()).unwrap_or(false) {
        let message = first
            .pointer("/exception/message")
            .and_then(|v| v.as_str())
            .unwrap_or("API Error");
        anyhow::bail!("{message}");
    }

    let events = match first.pointer("/data/events") {
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(events) => events,
    };
    serde_json::from_value(events.clone()).context("decode calendar events")
}

impl From<ApiEvent> for RawDeadline {
    fn from(event: ApiEvent) -> Self {
        let link = event
            .action
            .as_ref()
            .and_then(|action| action.url.clone())
            .filter(|url| !url.is_empty())
            .or(event.viewurl.filter(|url| !url.is_empty()));
        let submitted = event
            .action
            .as_ref()
            .and_then(|action| action.actionable)
            .is_some_and(|actionable| !actionable);

        RawDeadline {
            source: RawSource::ApiEvent {
                remote_id: event.id,
            },
            title: event.name,
            course: event.course.and_then(|course| course.fullname),
            due: RawDue::Epoch(event.timesort),
            link,
            submitted,
            overdue_hint: None,
        }
    }
}
