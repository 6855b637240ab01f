use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::app::store::SnapshotStore;
use crate::config::UrgencyScale;
use crate::panel::{self, PanelView};

/// Re-renders the panel to stdout whenever the store reports a write.
pub async fn follow_panel(store: Arc<dyn SnapshotStore>, scale: UrgencyScale, portal_url: String) {
    let changes = store.subscribe();
    follow_views(store, changes, scale, |view| {
        match panel::render_text(&view, &portal_url) {
            Ok(text) => println!("{text}"),
            Err(err) => tracing::warn!(?err, "render panel failed"),
        }
    })
    .await;
}

/// Calls `on_view` with a fresh view once per observed revision change.
/// Returns when the store is dropped.
pub async fn follow_views<F>(
    store: Arc<dyn SnapshotStore>,
    mut changes: watch::Receiver<u64>,
    scale: UrgencyScale,
    mut on_view: F,
) where
    F: FnMut(PanelView),
{
    loop {
        if changes.changed().await.is_err() {
            break;
        }
        changes.borrow_and_update();

        match load_view(store.as_ref(), scale).await {
            Ok(view) => on_view(view),
            Err(err) => tracing::warn!(?err, "render after store change failed"),
        }
    }
}

pub async fn load_view(store: &dyn SnapshotStore, scale: UrgencyScale) -> anyhow::Result<PanelView> {
    let snapshot = store.load_snapshot().await?;
    let hidden = store.load_hidden().await?;
    Ok(PanelView::build(&snapshot, &hidden, Utc::now(), scale))
}
