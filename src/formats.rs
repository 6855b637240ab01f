use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_COURSE: &str = "Unknown Course";
pub const UPCOMING_EVENT_COURSE: &str = "Upcoming Event";
pub const UNTITLED_ASSIGNMENT: &str = "Untitled Assignment";
pub const PLACEHOLDER_LINK: &str = "#";

/// `None` means the source date could not be parsed.
pub type DueDate = Option<DateTime<Utc>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deadline {
    pub id: String,
    pub course_name: String,
    pub assignment_title: String,
    pub due_date: DueDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_text: Option<String>,
    pub link: String,
    pub is_submitted: bool,
    pub is_overdue: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Loading,
    NeedsLogin,
    Ok,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Loading => "LOADING",
            Self::NeedsLogin => "NEEDS_LOGIN",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// Everything a fetch cycle writes. Replaced as a whole on every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub status: Status,
    #[serde(default)]
    pub deadlines: Vec<Deadline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetch: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where a raw record came from. Drives id derivation in the normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSource {
    /// Calendar API event with its remote id.
    ApiEvent { remote_id: i64 },
    /// Sidebar "upcoming events" block entry.
    UpcomingBlock { index: usize },
    /// Link carrying an accessible "... is due" label.
    DueLabel { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDue {
    Epoch(i64),
    Text(String),
    Missing,
}

/// Vendor-neutral intermediate form produced by the adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeadline {
    pub source: RawSource,
    pub title: Option<String>,
    pub course: Option<String>,
    pub due: RawDue,
    pub link: Option<String>,
    pub submitted: bool,
    /// Overdue state read from vendor markup; computed from the due date when absent.
    pub overdue_hint: Option<bool>,
}
