use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

/// Admits one cycle at a time and coalesces triggers that queue up behind it.
///
/// A trigger that has to wait is satisfied by any cycle that *started* after
/// the trigger arrived, so a burst of triggers causes at most one extra cycle.
#[derive(Debug)]
pub struct CycleGate<R> {
    started: AtomicU64,
    slot: Mutex<Option<(u64, R)>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission<R> {
    Ran(R),
    Coalesced(R),
}

impl<R> Admission<R> {
    pub fn into_inner(self) -> R {
        match self {
            Self::Ran(report) | Self::Coalesced(report) => report,
        }
    }

    pub fn was_coalesced(&self) -> bool {
        matches!(self, Self::Coalesced(_))
    }
}

impl<R: Clone> Default for CycleGate<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone> CycleGate<R> {
    pub fn new() -> Self {
        Self {
            started: AtomicU64::new(0),
            slot: Mutex::new(None),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn run<F, Fut>(&self, cycle: F) -> Admission<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
    {
        let ticket = self.started.load(Ordering::SeqCst);
        let mut slot = self.slot.lock().await;

        if let Some((seq, report)) = slot.as_ref()
            && *seq > ticket
        {
            return Admission::Coalesced(report.clone());
        }

        let seq = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        let report = cycle().await;
        *slot = Some((seq, report.clone()));
        Admission::Ran(report)
    }

    pub fn cycles_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }
}
