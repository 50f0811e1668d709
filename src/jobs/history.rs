use crate::charts::trend_chart;
use crate::config::Config;
use crate::errors::{DashboardError, Result};
use crate::history::AttackHistory;
use crate::http::HttpFetcher;
use crate::render::{Renderer, write_atomic};
use crate::scheduler::Job;
use crate::threatmap::ThreatMapClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Keeps the rolling attack history and its trend chart current
pub struct AttackHistoryJob {
    config: Arc<Config>,
    renderer: Arc<Renderer>,
    client: ThreatMapClient,
    timezone: Tz,
}

impl AttackHistoryJob {
    pub fn new(config: Arc<Config>, renderer: Arc<Renderer>) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.threatmap_timeout, config.insecure_tls)?;
        let client = ThreatMapClient::new(fetcher, config.threatmap_url.clone());
        let timezone = config.timezone().map_err(DashboardError::Config)?;

        Ok(Self {
            config,
            renderer,
            client,
            timezone,
        })
    }

    fn render(&self, history: &AttackHistory, now: DateTime<Utc>) -> Result<()> {
        let chart_path = self.config.trend_chart_path();
        write_atomic(&chart_path, trend_chart(history, now)?.as_bytes())?;

        let chart_file = chart_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attack_trends.svg");
        let page = self
            .renderer
            .history_page(history.samples().last(), history.len(), chart_file, now)?;
        write_atomic(&self.config.history_page_path(), page.as_bytes())
    }
}

#[async_trait]
impl Job for AttackHistoryJob {
    fn name(&self) -> &'static str {
        "attack-history"
    }

    fn interval(&self) -> Duration {
        self.config.history_interval
    }

    async fn run_once(&self) -> Result<()> {
        let path = self.config.history_csv_path();
        let mut history = AttackHistory::load(&path, self.timezone)?;
        let now = Utc::now();

        match self.client.fetch().await {
            Ok(response) => {
                let samples = response.samples(self.timezone);
                info!("Fetched {} attack samples", samples.len());

                history.merge(samples);
                history.prune(now, self.config.history_retention);

                if history.save(&path)? {
                    info!("Saved {} samples to {}", history.len(), path.display());
                } else {
                    warn!("No samples inside the retention window; keeping {}", path.display());
                }
            }
            Err(e) => {
                warn!("Threat map unavailable, re-rendering stored history: {}", e);
            }
        }

        self.render(&history, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(output_dir: &std::path::Path, url: String) -> Arc<Config> {
        Arc::new(Config {
            output_dir: output_dir.to_path_buf(),
            threatmap_url: url,
            ..Config::default()
        })
    }

    fn job(config: Arc<Config>) -> AttackHistoryJob {
        let renderer = Arc::new(Renderer::new(&config.tailwind_url).unwrap());
        AttackHistoryJob::new(config, renderer).unwrap()
    }

    #[tokio::test]
    async fn test_run_merges_and_renders() {
        let server = MockServer::start().await;
        let recent = Utc::now().timestamp_millis() - 5 * 60 * 1000;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ips": {"1": [{"redis_ms": format!("{}-0", recent), "count": 12}]}
            })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let config = config(dir.path(), server.uri());
        job(config.clone()).run_once().await.unwrap();

        let history = AttackHistory::load(&config.history_csv_path(), config.timezone().unwrap()).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.samples()[0].attacks, 12);
        assert!(config.trend_chart_path().exists());
        let page = std::fs::read_to_string(config.history_page_path()).unwrap();
        assert!(page.contains("12 attacks"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_history_and_rerenders() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let config = config(dir.path(), server.uri());
        let stored = format!("timestamp,attacks\n{},7\n", Utc::now().to_rfc3339());
        write_atomic(&config.history_csv_path(), stored.as_bytes()).unwrap();

        job(config.clone()).run_once().await.unwrap();

        let csv = std::fs::read_to_string(config.history_csv_path()).unwrap();
        assert_eq!(csv, stored);
        assert!(config.history_page_path().exists());
    }
}
