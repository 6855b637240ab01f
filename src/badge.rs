use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::formats::{Deadline, Snapshot, Status};

pub const ALERT_COLOR: &str = "#EF4444";
pub const ERROR_COLOR: &str = "#F59E0B";
pub const COUNT_COLOR: &str = "#3B82F6";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind {
    Alert,
    Error,
    Count,
    None,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Badge {
    pub kind: BadgeKind,
    pub text: String,
    pub color: Option<&'static str>,
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.kind, self.color) {
            (BadgeKind::None, _) | (_, None) => f.write_str("(no badge)"),
            (_, Some(color)) => write!(f, "[{}] {color}", self.text),
        }
    }
}

pub fn badge_for(status: Status, urgent: usize) -> Badge {
    match status {
        Status::NeedsLogin => Badge {
            kind: BadgeKind::Alert,
            text: "!".to_owned(),
            color: Some(ALERT_COLOR),
        },
        Status::Error => Badge {
            kind: BadgeKind::Error,
            text: "?".to_owned(),
            color: Some(ERROR_COLOR),
        },
        Status::Ok if urgent > 0 => Badge {
            kind: BadgeKind::Count,
            text: urgent.to_string(),
            color: Some(COUNT_COLOR),
        },
        Status::Ok | Status::Loading => Badge {
            kind: BadgeKind::None,
            text: String::new(),
            color: None,
        },
    }
}

pub fn from_snapshot(snapshot: &Snapshot, now: DateTime<Utc>) -> Badge {
    let urgent = match snapshot.status {
        Status::Ok => urgent_count(&snapshot.deadlines, now),
        _ => 0,
    };
    badge_for(snapshot.status, urgent)
}

/// Unsubmitted items due in the next 24 hours.
pub fn urgent_count(deadlines: &[Deadline], now: DateTime<Utc>) -> usize {
    deadlines
        .iter()
        .filter(|d| !d.is_submitted)
        .filter_map(|d| d.due_date)
        .filter(|due| *due > now && *due - now < Duration::days(1))
        .count()
}
