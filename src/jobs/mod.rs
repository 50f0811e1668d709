//! Periodic jobs that regenerate the dashboard fragments

pub mod breakdown;
pub mod down_detector;
pub mod history;
pub mod news;

use crate::config::Config;
use crate::errors::Result;
use crate::render::Renderer;
use crate::scheduler::Job;
use std::sync::Arc;

pub use breakdown::ThreatBreakdownJob;
pub use down_detector::DownDetectorJob;
pub use history::AttackHistoryJob;
pub use news::NewsJob;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum JobKind {
    History,
    Breakdown,
    DownDetector,
    News,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::History,
        JobKind::Breakdown,
        JobKind::DownDetector,
        JobKind::News,
    ];
}

pub fn build_job(kind: JobKind, config: Arc<Config>, renderer: Arc<Renderer>) -> Result<Arc<dyn Job>> {
    let job: Arc<dyn Job> = match kind {
        JobKind::History => Arc::new(AttackHistoryJob::new(config, renderer)?),
        JobKind::Breakdown => Arc::new(ThreatBreakdownJob::new(config, renderer)?),
        JobKind::DownDetector => Arc::new(DownDetectorJob::new(config, renderer)?),
        JobKind::News => Arc::new(NewsJob::new(config, renderer)?),
    };
    Ok(job)
}

pub fn build_all(config: Arc<Config>, renderer: Arc<Renderer>) -> Result<Vec<Arc<dyn Job>>> {
    JobKind::ALL
        .iter()
        .map(|kind| build_job(*kind, config.clone(), renderer.clone()))
        .collect()
}
