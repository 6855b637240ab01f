use std::sync::Arc;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::gate::{Admission, CycleGate};
use crate::app::store::SnapshotStore;
use crate::badge::{self, Badge};
use crate::formats::{Deadline, RawDeadline, Snapshot, Status};
use crate::portal::PortalClient;
use crate::session::{self, SessionState};

pub const TOKEN_MISSING_MESSAGE: &str = "Could not find sesskey";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub status: Status,
    pub deadline_count: usize,
    pub urgent_count: usize,
    pub badge: Badge,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

type CycleResult = Result<CycleReport, String>;

enum Outcome {
    NeedsLogin,
    Failed(String),
    Fetched(Vec<Deadline>),
}

/// One resolve → fetch → normalize → persist → badge pass.
pub struct FetchCycle {
    client: PortalClient,
    store: Arc<dyn SnapshotStore>,
    gate: Arc<CycleGate<CycleResult>>,
}

impl FetchCycle {
    pub fn new(client: PortalClient, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            client,
            store,
            gate: CycleGate::shared(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Runs a cycle through the single-writer gate.
    pub async fn trigger(&self, reason: &'static str) -> anyhow::Result<CycleReport> {
        let admission = self
            .gate
            .run(|| async { self.run_once(Utc::now()).await })
            .await;
        if admission.was_coalesced() {
            tracing::debug!(reason, "trigger coalesced into a newer cycle");
        }
        let report = admission_result(admission)?;
        tracing::info!(
            reason,
            status = %report.status,
            deadlines = report.deadline_count,
            urgent = report.urgent_count,
            badge = %report.badge,
            "fetch cycle finished"
        );
        Ok(report)
    }

    async fn run_once(&self, now: DateTime<Utc>) -> CycleResult {
        let outcome = self.fetch(now).await;
        self.persist(outcome, now).await.map_err(|err| {
            tracing::error!(?err, "persist snapshot failed");
            format!("{err:#}")
        })
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Outcome {
        let state = match session::resolve(&self.client).await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(?err, "session probe failed");
                return Outcome::Failed(format!("{err:#}"));
            }
        };

        let token = match state {
            SessionState::NotAuthenticated => {
                tracing::info!("portal session needs login");
                return Outcome::NeedsLogin;
            }
            SessionState::TokenMissing => {
                tracing::error!("session token not found in landing page");
                return Outcome::Failed(TOKEN_MISSING_MESSAGE.to_owned());
            }
            SessionState::Authenticated { token } => token,
        };

        match crate::events::fetch_events(&self.client, &token, now).await {
            Ok(events) => {
                let raw = events.into_iter().map(RawDeadline::from).collect();
                let origin = self.client.config().origin();
                Outcome::Fetched(crate::normalize::normalize(raw, &origin, now))
            }
            Err(err) => {
                tracing::error!(?err, "event fetch failed");
                Outcome::Failed(format!("Failed to fetch portal events: {err:#}"))
            }
        }
    }

    async fn persist(&self, outcome: Outcome, now: DateTime<Utc>) -> anyhow::Result<CycleReport> {
        let previous = self
            .store
            .load_snapshot()
            .await
            .context("load previous snapshot")?;
        let next = next_snapshot(previous, outcome, now);
        self.store
            .swap_snapshot(&next)
            .await
            .context("swap snapshot")?;

        let urgent_count = match next.status {
            Status::Ok => badge::urgent_count(&next.deadlines, now),
            _ => 0,
        };
        Ok(CycleReport {
            status: next.status,
            deadline_count: next.deadlines.len(),
            urgent_count,
            badge: badge::badge_for(next.status, urgent_count),
            error: next.error,
            finished_at: now,
        })
    }
}

fn admission_result(admission: Admission<CycleResult>) -> anyhow::Result<CycleReport> {
    admission
        .into_inner()
        .map_err(|message| anyhow::anyhow!("fetch cycle failed: {message}"))
}

/// A failed cycle keeps the previous deadlines; a logged-out one clears them.
fn next_snapshot(previous: Snapshot, outcome: Outcome, now: DateTime<Utc>) -> Snapshot {
    match outcome {
        Outcome::NeedsLogin => Snapshot {
            status: Status::NeedsLogin,
            deadlines: Vec::new(),
            last_fetch: Some(now),
            error: None,
        },
        Outcome::Failed(message) => Snapshot {
            status: Status::Error,
            deadlines: previous.deadlines,
            last_fetch: Some(now),
            error: Some(message),
        },
        Outcome::Fetched(deadlines) => Snapshot {
            status: Status::Ok,
            deadlines,
            last_fetch: Some(now),
            error: None,
        },
    }
}
