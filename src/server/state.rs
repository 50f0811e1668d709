use crate::config::Config;
use crate::render::Renderer;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

// App state
pub struct AppState {
    pub config: Arc<Config>,
    pub renderer: Arc<Renderer>,
    pub usage: UsageStats,
}

impl AppState {
    pub fn new(config: Arc<Config>, renderer: Arc<Renderer>) -> Self {
        Self {
            config,
            renderer,
            usage: UsageStats::default(),
        }
    }
}

/// Request counters shared by all workers
#[derive(Debug, Default)]
pub struct UsageStats {
    total_requests: AtomicU64,
    files_served: AtomicU64,
    /// Unix seconds of the last request, 0 before the first one
    last_request: AtomicI64,
}

impl UsageStats {
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.last_request.store(Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn record_file(&self) {
        self.files_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let last = self.last_request.load(Ordering::Relaxed);
        UsageSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            files_served: self.files_served.load(Ordering::Relaxed),
            last_request: (last > 0)
                .then(|| DateTime::<Utc>::from_timestamp(last, 0))
                .flatten(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub total_requests: u64,
    pub files_served: u64,
    pub last_request: Option<DateTime<Utc>>,
}

impl UsageSnapshot {
    /// Share of requests that served a fragment, in percent
    pub fn utilisation(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.files_served as f64 / self.total_requests as f64 * 100.0
    }
}

impl fmt::Display for UsageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total requests: {}", self.total_requests)?;
        writeln!(f, "Files served: {}", self.files_served)?;
        writeln!(f, "Utilisation rate: {:.2}%", self.utilisation())?;
        match self.last_request {
            Some(time) => writeln!(f, "Last request: {}", time.format("%Y-%m-%d %H:%M:%S UTC")),
            None => writeln!(f, "Last request: never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_snapshot() {
        let usage = UsageStats::default();
        assert_eq!(usage.snapshot().utilisation(), 0.0);
        assert!(usage.snapshot().to_string().contains("Last request: never"));

        for _ in 0..4 {
            usage.record_request();
        }
        usage.record_file();

        let snapshot = usage.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.files_served, 1);
        assert!(snapshot.last_request.is_some());
        assert!(snapshot.to_string().contains("Utilisation rate: 25.00%"));
    }
}
