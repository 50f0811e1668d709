//! Fixed-interval job runner

use crate::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

/// A periodic unit of work that regenerates one part of the dashboard
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    async fn run_once(&self) -> Result<()>;
}

/// Run a job once inside its own cycle span, logging the outcome.
///
/// Returns whether the run succeeded.
pub async fn run_cycle(job: &dyn Job) -> bool {
    let cycle_id = Uuid::new_v4().to_string();
    let span = info_span!("job", name = job.name(), cycle_id = %cycle_id);

    async {
        debug!("Starting run");
        match job.run_once().await {
            Ok(()) => {
                debug!("Run finished");
                true
            }
            Err(e) => {
                error!("Job {} failed: {}", job.name(), e);
                false
            }
        }
    }
    .instrument(span)
    .await
}

/// Spawn one task per job: run immediately, then on every tick.
pub fn spawn_all(jobs: Vec<Arc<dyn Job>>) -> Vec<JoinHandle<()>> {
    jobs.into_iter()
        .map(|job| {
            info!("Scheduling {} every {:?}", job.name(), job.interval());
            tokio::spawn(async move {
                let mut ticker = interval(job.interval());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    ticker.tick().await;
                    run_cycle(job.as_ref()).await;
                }
            })
        })
        .collect()
}
