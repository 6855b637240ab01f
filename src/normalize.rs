use chrono::{DateTime, Utc};
use url::Url;

use crate::dates;
use crate::formats::{
    Deadline, PLACEHOLDER_LINK, RawDeadline, RawDue, RawSource, UNKNOWN_COURSE,
    UNTITLED_ASSIGNMENT,
};

pub fn normalize(raw: Vec<RawDeadline>, origin: &str, now: DateTime<Utc>) -> Vec<Deadline> {
    let base = Url::parse(origin).ok();
    let mut deadlines = raw
        .into_iter()
        .map(|item| normalize_one(item, base.as_ref(), now))
        .collect::<Vec<_>>();
    sort_deadlines(&mut deadlines);
    deadlines
}

fn normalize_one(raw: RawDeadline, base: Option<&Url>, now: DateTime<Utc>) -> Deadline {
    let id = match raw.source {
        RawSource::ApiEvent { remote_id } => format!("event-{remote_id}"),
        RawSource::UpcomingBlock { index } => format!("upcoming-block-{index}"),
        RawSource::DueLabel { index } => format!("deadline-{index}-{}", now.timestamp_millis()),
    };

    let (due_date, due_text) = match raw.due {
        RawDue::Epoch(seconds) => (dates::from_epoch_seconds(seconds), None),
        RawDue::Text(text) => (dates::normalize_due_text(&text, now), Some(text)),
        RawDue::Missing => (None, None),
    };

    let is_overdue = match raw.overdue_hint {
        Some(hint) => hint,
        None => due_date.is_some_and(|due| due < now),
    };

    Deadline {
        id,
        course_name: non_empty(raw.course).unwrap_or_else(|| UNKNOWN_COURSE.to_owned()),
        assignment_title: non_empty(raw.title).unwrap_or_else(|| UNTITLED_ASSIGNMENT.to_owned()),
        due_date,
        due_text,
        link: resolve_link(raw.link.as_deref(), base),
        is_submitted: raw.submitted,
        is_overdue,
    }
}

/// Ascending by due date; unparsed dates go last, ties keep input order.
pub fn sort_deadlines(deadlines: &mut [Deadline]) {
    deadlines.sort_by_key(|d| (d.due_date.is_none(), d.due_date));
}

fn resolve_link(link: Option<&str>, base: Option<&Url>) -> String {
    let Some(link) = link.map(str::trim).filter(|l| !l.is_empty()) else {
        return PLACEHOLDER_LINK.to_owned();
    };
    if link.starts_with("http") || link == PLACEHOLDER_LINK {
        return link.to_owned();
    }
    base.and_then(|base| base.join(link).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| PLACEHOLDER_LINK.to_owned())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone as _};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 20, 12, 0, 0).unwrap()
    }

    fn api(remote_id: i64, due: DateTime<Utc>) -> RawDeadline {
        RawDeadline {
            source: RawSource::ApiEvent { remote_id },
            title: Some(format!("Task {remote_id}")),
            course: Some("CS101".to_owned()),
            due: RawDue::Epoch(due.timestamp()),
            link: None,
            submitted: false,
            overdue_hint: None,
        }
    }

    #[test]
    fn output_is_sorted_for_every_input_order() {
        let now = now();
        let items = vec![
            api(1, now + Duration::hours(5)),
            api(2, now - Duration::days(2)),
            api(3, now + Duration::days(3)),
            api(4, now + Duration::hours(5)),
        ];

        let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
        for order in orders {
            let input = order.iter().map(|i| items[*i].clone()).collect();
            let out = normalize(input, "https://spectrum.example", now);
            assert!(
                out.windows(2).all(|w| w[0].due_date <= w[1].due_date),
                "unsorted for order {order:?}"
            );
            assert_eq!(out[0].id, "event-2");
            assert_eq!(out[3].id, "event-3");
        }
    }

    #[test]
    fn unparsed_dates_sort_last() {
        let now = now();
        let mut missing = api(9, now);
        missing.due = RawDue::Text("sometime".to_owned());
        let out = normalize(
            vec![missing, api(1, now + Duration::days(30))],
            "https://spectrum.example",
            now,
        );
        assert_eq!(out[0].id, "event-1");
        assert_eq!(out[1].due_date, None);
        assert_eq!(out[1].due_text.as_deref(), Some("sometime"));
        assert!(!out[1].is_overdue);
    }

    #[test]
    fn fallbacks_and_overdue() {
        let now = now();
        let mut raw = api(5, now - Duration::minutes(1));
        raw.title = Some("   ".to_owned());
        raw.course = None;
        let out = normalize(vec![raw], "https://spectrum.example", now);
        assert_eq!(out[0].assignment_title, UNTITLED_ASSIGNMENT);
        assert_eq!(out[0].course_name, UNKNOWN_COURSE);
        assert_eq!(out[0].link, PLACEHOLDER_LINK);
        assert!(out[0].is_overdue);
    }

    #[test]
    fn relative_links_resolve_against_origin() {
        let base = Url::parse("https://spectrum.example").unwrap();
        assert_eq!(
            resolve_link(Some("/mod/assign/view.php?id=3"), Some(&base)),
            "https://spectrum.example/mod/assign/view.php?id=3"
        );
        assert_eq!(
            resolve_link(Some("https://other.example/x"), Some(&base)),
            "https://other.example/x"
        );
        assert_eq!(resolve_link(Some(""), Some(&base)), PLACEHOLDER_LINK);
    }

    #[test]
    fn scraped_ids_are_salted_with_fetch_time() {
        let now = now();
        let raw = RawDeadline {
            source: RawSource::DueLabel { index: 3 },
            title: Some("Essay".to_owned()),
            course: None,
            due: RawDue::Missing,
            link: None,
            submitted: false,
            overdue_hint: Some(false),
        };
        let out = normalize(vec![raw], "https://spectrum.example", now);
        assert_eq!(out[0].id, format!("deadline-3-{}", now.timestamp_millis()));
    }
}
