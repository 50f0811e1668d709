//! Status Dashboard Library
//!
//! Polls third-party status APIs, the Fortinet threat map and news feeds,
//! renders the results into HTML fragments and charts, and serves them
//! through a small web front end. Integrity checks guard the page's
//! external dependencies at startup.

pub mod charts;
pub mod config;
pub mod errors;
pub mod history;
pub mod http;
pub mod integrity;
pub mod jobs;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod sources;
pub mod status;
pub mod threatmap;

pub use config::Config;
pub use errors::{DashboardError, Result};
pub use integrity::{CheckReport, CheckStatus};
pub use jobs::JobKind;
pub use render::Renderer;
pub use scheduler::Job;
pub use status::{Category, RunState, StatusRecord, StatusReport};
