use anyhow::Context as _;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::portal::PortalClient;

/// Markup fragments that only appear on anonymous pages.
const ANONYMOUS_MARKERS: [&str; 3] = ["Log in", "You are not logged in", "loginform"];

static JSON_SESSKEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""sesskey":"([^"]+)""#).expect("json sesskey regex"));
static QUERY_SESSKEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sesskey=([\w\d]+)").expect("query sesskey regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NotAuthenticated,
    Authenticated { token: String },
    TokenMissing,
}

pub async fn resolve(client: &PortalClient) -> anyhow::Result<SessionState> {
    let url = client.config().landing_url()?;
    let response = client
        .http()
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("GET {url}"))?;

    let final_url = response.url().to_string();
    let html = response.text().await.context("read landing page body")?;
    let state = classify_landing_page(&final_url, &html);
    tracing::debug!(final_url, bytes = html.len(), ?state, "session probe");
    Ok(state)
}

pub fn classify_landing_page(final_url: &str, html: &str) -> SessionState {
    if final_url.contains("/login") || ANONYMOUS_MARKERS.iter().any(|m| html.contains(m)) {
        return SessionState::NotAuthenticated;
    }

    match extract_token(html) {
        Some(token) => SessionState::Authenticated { token },
        None => SessionState::TokenMissing,
    }
}

fn extract_token(html: &str) -> Option<String> {
    [&*JSON_SESSKEY_RE, &*QUERY_SESSKEY_RE]
        .into_iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_owned())
}
