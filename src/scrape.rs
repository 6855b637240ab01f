//! HTML adapter for the portal's dashboard markup.
//!
//! Tied to the vendor theme: class names, region attributes and accessible
//! label phrasing all come from one specific template and break with it.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::formats::{Deadline, RawDeadline, RawDue, RawSource, UNKNOWN_COURSE, UPCOMING_EVENT_COURSE};

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| selector("title"));
static UPCOMING_EVENT_SEL: Lazy<Selector> =
    Lazy::new(|| selector(".block_calendar_upcoming .event"));
static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| selector("a"));
static DATE_SEL: Lazy<Selector> = Lazy::new(|| selector(".date"));
static TIMELINE_SEL: Lazy<Selector> = Lazy::new(|| selector(r#"[data-region="timeline-view"]"#));
static DUE_LINK_SEL: Lazy<Selector> = Lazy::new(|| selector(r#"a[aria-label*="is due"]"#));

static FULL_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(.+?)\s+activity\s+in\s+(.+?)\s+is\s+due\s+on\s+(.+)$")
        .expect("full label regex")
});
static SIMPLE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+is\s+due$").expect("simple label regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static css selector")
}

/// Scrape a dashboard page and normalize the results.
pub fn scrape_deadlines(html: &str, origin: &str, now: DateTime<Utc>) -> Vec<Deadline> {
    crate::normalize::normalize(extract(html), origin, now)
}

/// Runs every strategy and concatenates their raw records, in strategy order.
pub fn extract(html: &str) -> Vec<RawDeadline> {
    let doc = Html::parse_document(html);

    let page_title = doc
        .select(&TITLE_SEL)
        .next()
        .map(|el| collapse_ws(&el.text().collect::<String>()))
        .unwrap_or_else(|| "No Title".to_owned());
    tracing::debug!(bytes = html.len(), page_title, "scraping dashboard html");

    let mut out = upcoming_block(&doc);
    log_timeline_region(&doc);
    out.extend(due_label_links(&doc));
    out
}

fn upcoming_block(doc: &Html) -> Vec<RawDeadline> {
    let mut out = Vec::new();
    for (index, event) in doc.select(&UPCOMING_EVENT_SEL).enumerate() {
        let anchor = event.select(&ANCHOR_SEL).next();
        let title = anchor
            .map(|a| collapse_ws(&a.text().collect::<String>()))
            .filter(|t| !t.is_empty());
        let date = event
            .select(&DATE_SEL)
            .next()
            .map(|d| collapse_ws(&d.text().collect::<String>()))
            .filter(|d| !d.is_empty());

        let (Some(title), Some(date)) = (title, date) else {
            tracing::debug!(index, "skipping upcoming event without title or date");
            continue;
        };

        out.push(RawDeadline {
            source: RawSource::UpcomingBlock { index },
            title: Some(title),
            course: Some(UPCOMING_EVENT_COURSE.to_owned()),
            due: RawDue::Text(date),
            link: anchor.and_then(|a| a.value().attr("href")).map(str::to_owned),
            submitted: false,
            overdue_hint: Some(false),
        });
    }
    if !out.is_empty() {
        tracing::debug!(count = out.len(), "found upcoming events block");
    }
    out
}

fn log_timeline_region(doc: &Html) {
    match doc.select(&TIMELINE_SEL).next() {
        Some(region) => {
            let links = region.select(&ANCHOR_SEL).count();
            tracing::debug!(links, "found timeline region");
        }
        None => tracing::debug!("timeline region not found"),
    }
}

fn due_label_links(doc: &Html) -> Vec<RawDeadline> {
    let mut out = Vec::new();
    for (index, link) in doc.select(&DUE_LINK_SEL).enumerate() {
        let label = link.value().attr("aria-label").unwrap_or_default();
        let Some(parsed) = parse_due_label(label) else {
            tracing::debug!(index, label, "skipping unrecognized due label");
            continue;
        };

        let parent = link.parent().and_then(ElementRef::wrap);
        let overdue = parent.is_some_and(|p| p.inner_html().contains("Overdue"));
        let submitted = parent
            .and_then(|p| p.parent())
            .and_then(ElementRef::wrap)
            .is_some_and(|gp| {
                let markup = gp.inner_html();
                markup.contains("badge-success") || markup.contains(">Submitted<")
            });

        out.push(RawDeadline {
            source: RawSource::DueLabel { index },
            title: Some(parsed.title),
            course: Some(parsed.course),
            due: parsed.due,
            link: link.value().attr("href").map(str::to_owned),
            submitted,
            overdue_hint: Some(overdue),
        });
    }
    out
}

#[derive(Debug, PartialEq, Eq)]
struct DueLabel {
    title: String,
    course: String,
    due: RawDue,
}

fn parse_due_label(label: &str) -> Option<DueLabel> {
    let label = label.trim();
    if let Some(caps) = FULL_LABEL_RE.captures(label) {
        return Some(DueLabel {
            title: caps[1].trim().to_owned(),
            course: caps[2].trim().to_owned(),
            due: RawDue::Text(caps[3].trim().to_owned()),
        });
    }
    let caps = SIMPLE_LABEL_RE.captures(label)?;
    Some(DueLabel {
        title: caps[1].trim().to_owned(),
        course: UNKNOWN_COURSE.to_owned(),
        due: RawDue::Missing,
    })
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
