//! Terminal/JSON view over the stored snapshot and hidden set.

use std::collections::HashSet;
use std::fmt::Write;

use chrono::{DateTime, Duration, Local, Utc};
use serde::Serialize;

use crate::config::UrgencyScale;
use crate::formats::{Deadline, DueDate, Snapshot, Status};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Overdue,
    Most,
    Medium,
    Least,
    Unknown,
}

impl Urgency {
    fn marker(self) -> &'static str {
        match self {
            Self::Overdue => "[overdue]",
            Self::Most => "[!!!]",
            Self::Medium => "[!!]",
            Self::Least => "[!]",
            Self::Unknown => "[?]",
        }
    }
}

pub fn urgency(due: DueDate, now: DateTime<Utc>, scale: UrgencyScale) -> Urgency {
    let Some(due) = due else {
        return Urgency::Unknown;
    };
    let remaining = due - now;
    if remaining < Duration::zero() {
        Urgency::Overdue
    } else if remaining < Duration::days(1) {
        Urgency::Most
    } else if remaining < scale.medium_window() {
        Urgency::Medium
    } else {
        Urgency::Least
    }
}

pub fn describe_due(due: DueDate, now: DateTime<Utc>) -> String {
    let Some(due) = due else {
        return "Due date unknown".to_owned();
    };
    let local = due.with_timezone(&Local);
    let remaining = due - now;
    if remaining < Duration::zero() {
        return format!("Past due ({})", local.format("%b %-d"));
    }
    match remaining.num_days() {
        0 => match remaining.num_hours() {
            0 => format!("Due in {}m", remaining.num_minutes()),
            hours => format!("Due in {hours}h"),
        },
        1 => format!("Tomorrow, {}", local.format("%H:%M")),
        2..=6 => local.format("%a, %H:%M").to_string(),
        _ => local.format("%b %-d, %H:%M").to_string(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PanelCard {
    #[serde(flatten)]
    pub deadline: Deadline,
    pub urgency: Urgency,
    pub due_label: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub status: Status,
    pub error: Option<String>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub total: usize,
    pub visible: usize,
    pub hidden_count: usize,
    pub upcoming: Vec<PanelCard>,
    pub overdue: Vec<PanelCard>,
}

impl PanelView {
    pub fn build(
        snapshot: &Snapshot,
        hidden: &[String],
        now: DateTime<Utc>,
        scale: UrgencyScale,
    ) -> Self {
        let hidden_ids: HashSet<&str> = hidden.iter().map(String::as_str).collect();
        let visible = snapshot
            .deadlines
            .iter()
            .filter(|d| !hidden_ids.contains(d.id.as_str()))
            .collect::<Vec<_>>();

        let mut upcoming = Vec::new();
        let mut overdue = Vec::new();
        for deadline in visible.iter().filter(|d| !d.is_submitted) {
            let card = PanelCard {
                deadline: (*deadline).clone(),
                urgency: urgency(deadline.due_date, now, scale),
                due_label: describe_due(deadline.due_date, now),
            };
            if deadline.due_date.is_some_and(|due| due < now) {
                overdue.push(card);
            } else {
                upcoming.push(card);
            }
        }

        Self {
            status: snapshot.status,
            error: snapshot.error.clone(),
            last_fetch: snapshot.last_fetch,
            total: snapshot.deadlines.len(),
            visible: visible.len(),
            hidden_count: hidden.len(),
            upcoming,
            overdue,
        }
    }
}

pub fn render_text(view: &PanelView, portal_url: &str) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_panel(&mut out, view, portal_url)?;
    Ok(out)
}

pub fn write_panel(out: &mut impl Write, view: &PanelView, portal_url: &str) -> std::fmt::Result {
    writeln!(out, "Spectrum Buddy")?;
    writeln!(out)?;

    match view.status {
        Status::Loading => writeln!(out, "Loading...")?,
        Status::NeedsLogin => {
            writeln!(out, "Session Expired")?;
            writeln!(out, "Please log in to Spectrum to view your deadlines: {portal_url}")?;
        }
        Status::Error => {
            writeln!(out, "Connection Error")?;
            let message = view.error.as_deref().unwrap_or(
                "Unable to connect to Spectrum. Please check your internet connection.",
            );
            writeln!(out, "{message}")?;
        }
        Status::Ok => render_lists(out, view)?,
    }

    if let Some(last_fetch) = view.last_fetch {
        writeln!(out)?;
        writeln!(
            out,
            "Updated {}",
            last_fetch.with_timezone(&Local).format("%H:%M")
        )?;
    }
    Ok(())
}

fn render_lists(out: &mut impl Write, view: &PanelView) -> std::fmt::Result {
    if view.hidden_count > 0 {
        let plural = if view.hidden_count > 1 { "s" } else { "" };
        writeln!(
            out,
            "Show {} hidden assignment{plural} (unhide-all)",
            view.hidden_count
        )?;
        writeln!(out)?;
    }

    if view.visible == 0 {
        if view.total > 0 && view.hidden_count > 0 {
            writeln!(out, "All visible items cleared!")?;
            writeln!(out, "You've hidden all assignments.")?;
        } else {
            writeln!(out, "All Caught Up!")?;
            writeln!(out, "No upcoming deadlines found.")?;
        }
    }

    if view.upcoming.is_empty() && view.overdue.is_empty() {
        return Ok(());
    }

    let plural = if view.upcoming.len() == 1 { "" } else { "s" };
    writeln!(out, "{} Upcoming Deadline{plural}", view.upcoming.len())?;
    if view.upcoming.is_empty() {
        writeln!(out, "  No upcoming deadlines.")?;
    }
    for card in &view.upcoming {
        render_card(out, card)?;
    }
    writeln!(out)?;

    writeln!(out, "{} Overdue", view.overdue.len())?;
    for card in &view.overdue {
        render_card(out, card)?;
    }
    Ok(())
}

fn render_card(out: &mut impl Write, card: &PanelCard) -> std::fmt::Result {
    let d = &card.deadline;
    let submitted = if d.is_submitted { " [Submitted]" } else { "" };
    writeln!(
        out,
        "  {} {}{submitted}",
        card.urgency.marker(),
        d.assignment_title
    )?;
    writeln!(out, "      {} | {}", d.course_name, card.due_label)?;
    writeln!(out, "      {}  (id: {})", d.link, d.id)
}
