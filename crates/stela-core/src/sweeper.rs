//! Retention sweeper — periodic age-based pruning
//!
//! An interval-driven background task owned by the service lifecycle: it
//! wakes every `sweep_interval`, deletes commits older than the retention
//! window, and stops when the shutdown channel fires. A failed sweep is
//! logged and retried at the next tick; it never takes the process down.
//! Reads never block on sweeping; WAL keeps them concurrent.
//!
//! `sweep_once` is public so tests trigger a sweep deterministically instead
//! of waiting out a wall-clock interval.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::RetentionPolicy;
use crate::error::StoreError;
use crate::store::CommitStore;

/// Periodically prunes commits that fell out of the retention window.
pub struct RetentionSweeper {
    store: Arc<CommitStore>,
    policy: RetentionPolicy,
    shutdown: broadcast::Receiver<()>,
}

impl RetentionSweeper {
    /// Sweeper over `store` with the given policy; `shutdown` cancels the
    /// spawned task.
    pub fn new(
        store: Arc<CommitStore>,
        policy: RetentionPolicy,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            store,
            policy,
            shutdown,
        }
    }

    /// Run one sweep now: delete everything older than the window measured
    /// from the current instant. Returns the number of pruned commits.
    pub fn sweep_once(&self) -> Result<usize, StoreError> {
        let cutoff = self.policy.cutoff(Utc::now());
        self.store.delete_older_than(cutoff, self.policy.field)
    }

    /// Spawn the interval loop. The first sweep runs one full interval after
    /// startup, then every interval until shutdown.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.policy.sweep_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // the immediate first tick; pruning starts an interval in
            ticker.tick().await;

            tracing::info!(
                window_days = self.policy.window_days,
                interval_secs = self.policy.sweep_interval_secs,
                "retention sweeper started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.sweep_once() {
                            Ok(0) => tracing::debug!("retention sweep: nothing to prune"),
                            Ok(n) => tracing::info!(pruned = n, "retention sweep complete"),
                            Err(e) => tracing::warn!("retention sweep failed, will retry: {e}"),
                        }
                    }
                    _ = self.shutdown.recv() => {
                        tracing::info!("retention sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}
