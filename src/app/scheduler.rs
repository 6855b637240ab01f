use std::future::Future;
use std::sync::Arc;

use tokio::time::{Instant, MissedTickBehavior};

use crate::app::cycle::FetchCycle;
use crate::config::ScheduleConfig;

/// Immediate cycle on start, then one per interval after the initial delay.
pub async fn run<S>(cycle: Arc<FetchCycle>, schedule: ScheduleConfig, shutdown: S)
where
    S: Future<Output = ()>,
{
    run_with(schedule, shutdown, |reason| {
        let cycle = Arc::clone(&cycle);
        async move { run_logged(&cycle, reason).await }
    })
    .await;
}

/// Timing loop behind [`run`]. `on_tick` is awaited to completion before the
/// next tick is considered; a tick missed meanwhile fires once and shifts the
/// schedule.
pub async fn run_with<S, F, Fut>(schedule: ScheduleConfig, shutdown: S, mut on_tick: F)
where
    S: Future<Output = ()>,
    F: FnMut(&'static str) -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tracing::info!(
        interval_secs = schedule.interval.as_secs(),
        initial_delay_secs = schedule.initial_delay.as_secs(),
        "scheduler started"
    );
    on_tick("startup").await;

    let mut ticks = tokio::time::interval_at(
        Instant::now() + schedule.initial_delay,
        schedule.interval,
    );
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("scheduler stopping");
                break;
            }
            _ = ticks.tick() => {
                on_tick("interval").await;
            }
        }
    }
}

async fn run_logged(cycle: &FetchCycle, reason: &'static str) {
    if let Err(err) = cycle.trigger(reason).await {
        tracing::error!(reason, ?err, "scheduled cycle failed");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    async fn advance_secs(secs: u64) {
        tokio::time::advance(Duration::from_secs(secs)).await;
        settle().await;
    }

    fn schedule() -> ScheduleConfig {
        ScheduleConfig {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(10),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn startup_then_initial_delay_then_interval() {
        let count = Arc::new(AtomicUsize::new(0));
        let reasons = Arc::new(std::sync::Mutex::new(Vec::new()));
        let (tx, rx) = oneshot::channel::<()>();

        let task = {
            let count = Arc::clone(&count);
            let reasons = Arc::clone(&reasons);
            tokio::spawn(run_with(
                schedule(),
                async {
                    let _ = rx.await;
                },
                move |reason| {
                    count.fetch_add(1, Ordering::SeqCst);
                    reasons.lock().unwrap().push(reason);
                    async {}
                },
            ))
        };

        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        advance_secs(9).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        advance_secs(1).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        advance_secs(59).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        advance_secs(1).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        tx.send(()).unwrap();
        task.await.unwrap();
        advance_secs(600).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(
            *reasons.lock().unwrap(),
            ["startup", "interval", "interval"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycle_delays_the_schedule_instead_of_bursting() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = oneshot::channel::<()>();

        let counter = Arc::clone(&count);
        tokio::spawn(run_with(
            schedule(),
            async {
                let _ = rx.await;
            },
            move |_reason| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 1 {
                        tokio::time::sleep(Duration::from_secs(150)).await;
                    }
                }
            },
        ));

        settle().await;
        advance_secs(10).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // The slow cycle ends at t=160; the missed ticks at 70 and 130 fire once.
        advance_secs(149).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        advance_secs(1).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        advance_secs(59).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        advance_secs(1).await;
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_before_first_tick_runs_only_startup() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        run_with(schedule(), async {}, move |_reason| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
