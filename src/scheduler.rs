//! In-process job scheduler
//!
//! Date-triggered jobs are keyed by id; scheduling an id that is still
//! pending is a no-op. The id is released as soon as its job fires, so a
//! later matcher pass may schedule it again for another day.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub struct JobScheduler {
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    periodic: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` at `when` (right away if it already passed)
    ///
    /// Returns `false` without scheduling when `id` is still pending.
    pub async fn schedule_at<F>(&self, id: &str, when: DateTime<Utc>, job: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock().await;
        pending.retain(|_, handle| !handle.is_finished());
        if pending.contains_key(id) {
            debug!("Job {} already exists", id);
            return false;
        }

        let delay = (when - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let registry = Arc::clone(&self.pending);
        let key = id.to_string();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            registry.lock().await.remove(&key);
            job.await;
        });

        info!("Scheduled {} at {}", id, when);
        pending.insert(id.to_string(), handle);
        true
    }

    /// Run `job` every `period`, first after one period
    pub async fn every<F, Fut>(&self, name: &str, period: Duration, job: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut periodic = self.periodic.lock().await;
        if periodic.contains_key(name) {
            return false;
        }

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                job().await;
            }
        });

        info!("Scheduled {} every {:?}", name, period);
        periodic.insert(name.to_string(), handle);
        true
    }

    pub async fn has_job(&self, id: &str) -> bool {
        self.pending
            .lock()
            .await
            .get(id)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Ids of date-triggered jobs that have not fired yet, sorted
    pub async fn pending(&self) -> Vec<String> {
        let pending = self.pending.lock().await;
        let mut ids: Vec<String> = pending
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Abort every pending and periodic job
    pub async fn shutdown(&self) {
        for (_, handle) in self.pending.lock().await.drain() {
            handle.abort();
        }
        for (_, handle) in self.periodic.lock().await.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_id_is_noop() {
        let scheduler = JobScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let when = Utc::now() + ChronoDuration::minutes(10);

        for _ in 0..2 {
            let runs = Arc::clone(&runs);
            scheduler
                .schedule_at("trade_decision(\"CPI\")", when, async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        assert_eq!(scheduler.pending().await, vec!["trade_decision(\"CPI\")"]);
        assert!(scheduler.has_job("trade_decision(\"CPI\")").await);

        sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.has_job("trade_decision(\"CPI\")").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_id_released_after_firing() {
        let scheduler = JobScheduler::new();
        let past = Utc::now() - ChronoDuration::seconds(1);

        assert!(scheduler.schedule_at("job", past, async {}).await);
        sleep(Duration::from_millis(10)).await;
        assert!(scheduler.schedule_at("job", past, async {}).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_and_shutdown() {
        let scheduler = JobScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        assert!(
            scheduler
                .every("calendar_sync", Duration::from_secs(60), move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .await
        );

        sleep(Duration::from_secs(185)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        scheduler.shutdown().await;
        sleep(Duration::from_secs(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
