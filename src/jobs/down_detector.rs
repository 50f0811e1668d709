use crate::config::Config;
use crate::errors::Result;
use crate::http::HttpFetcher;
use crate::render::{Renderer, write_atomic};
use crate::scheduler::Job;
use crate::sources::{
    FortinetStatusSource, MicrosoftStatusSource, SnowflakeStatusSource, StatusSource,
    WebsiteStatusSource,
};
use crate::status::StatusReport;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Polls every status source and renders the down detector page
pub struct DownDetectorJob {
    config: Arc<Config>,
    renderer: Arc<Renderer>,
    websites: WebsiteStatusSource,
    microsoft: MicrosoftStatusSource,
    fortinet: FortinetStatusSource,
    snowflake: SnowflakeStatusSource,
}

impl DownDetectorJob {
    pub fn new(config: Arc<Config>, renderer: Arc<Renderer>) -> Result<Self> {
        let api = HttpFetcher::new(config.http_timeout, config.insecure_tls)?;
        let sites = HttpFetcher::new(config.website_timeout, config.insecure_tls)?;

        Ok(Self {
            websites: WebsiteStatusSource::new(sites, config.websites.clone(), config.website_pause),
            microsoft: MicrosoftStatusSource::new(
                api.clone(),
                config.microsoft_status_url.clone(),
                config.microsoft_services.clone(),
            ),
            fortinet: FortinetStatusSource::new(api.clone(), config.fortinet_statuspages.clone()),
            snowflake: SnowflakeStatusSource::new(api, config.snowflake_status_url.clone()),
            config,
            renderer,
        })
    }

    /// Poll all sources concurrently
    pub async fn collect(&self) -> StatusReport {
        let (websites, microsoft, fortinet, snowflake) = tokio::join!(
            self.websites.poll(),
            self.microsoft.poll(),
            self.fortinet.poll(),
            self.snowflake.poll(),
        );
        StatusReport::new(websites, microsoft, fortinet, snowflake)
    }
}

#[async_trait]
impl Job for DownDetectorJob {
    fn name(&self) -> &'static str {
        "down-detector"
    }

    fn interval(&self) -> Duration {
        self.config.down_detector_interval
    }

    async fn run_once(&self) -> Result<()> {
        let report = self.collect().await;

        let html = self.renderer.status_report(&report)?;
        write_atomic(&self.config.status_report_path(), html.as_bytes())?;

        let snapshot = serde_json::to_vec_pretty(&report)?;
        write_atomic(&self.config.status_snapshot_path(), &snapshot)?;

        let down = report.down_count();
        if down > 0 {
            warn!("{} of {} services not running", down, report.records().count());
        } else {
            info!("All {} services running", report.records().count());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusPageEndpoint;
    use crate::status::RunState;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_run_writes_report_and_snapshot() {
        let server = MockServer::start().await;
        Mock::given(path("/site"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(path("/microsoft"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"ServiceDisplayName": "Outlook.com", "Status": "ServiceRestored", "Message": "Fixed"}
            ])))
            .mount(&server)
            .await;
        Mock::given(path("/fortinet"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "components": [{"name": "London", "status": "major_outage", "group": false}]
            })))
            .mount(&server)
            .await;
        Mock::given(path("/snowflake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"components": []})))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let config = Arc::new(Config {
            output_dir: dir.path().to_path_buf(),
            websites: vec![format!("{}/site", server.uri())],
            microsoft_status_url: format!("{}/microsoft", server.uri()),
            fortinet_statuspages: vec![StatusPageEndpoint {
                name: "Anycast".to_string(),
                url: format!("{}/fortinet", server.uri()),
            }],
            snowflake_status_url: format!("{}/snowflake", server.uri()),
            website_pause: Duration::ZERO,
            ..Config::default()
        });
        let renderer = Arc::new(Renderer::new(&config.tailwind_url).unwrap());

        DownDetectorJob::new(config.clone(), renderer)
            .unwrap()
            .run_once()
            .await
            .unwrap();

        let snapshot: StatusReport =
            serde_json::from_slice(&std::fs::read(config.status_snapshot_path()).unwrap()).unwrap();
        let states: Vec<RunState> = snapshot.records().map(|r| r.status).collect();
        assert_eq!(
            states,
            vec![
                RunState::Running,
                RunState::ServiceRestored,
                RunState::NotRunning,
                RunState::Running,
            ]
        );

        let html = std::fs::read_to_string(config.status_report_path()).unwrap();
        assert!(html.contains("Anycast - London"));
        assert!(html.contains("Service Restored"));
    }
}
