use crate::charts::bar_chart;
use crate::config::Config;
use crate::errors::Result;
use crate::http::HttpFetcher;
use crate::render::{ChartLink, Renderer, write_atomic};
use crate::scheduler::Job;
use crate::threatmap::{AttackBreakdown, Tally, ThreatMapClient};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name and title of each breakdown chart, in tally order
pub const CHARTS: [(&str, &str); 4] = [
    ("Attack_Severity.svg", "Attack Severity Distribution"),
    ("Attack_Types.svg", "Attack Types Distribution"),
    ("Most_Attacks_Incoming.svg", "Most Attacks Incoming by Country (Top 10)"),
    ("Most_Attacks_Outgoing.svg", "Most Attacks Outgoing by Country (Top 10)"),
];

/// Charts the distribution of the last hour of attacks
pub struct ThreatBreakdownJob {
    config: Arc<Config>,
    renderer: Arc<Renderer>,
    client: ThreatMapClient,
}

impl ThreatBreakdownJob {
    pub fn new(config: Arc<Config>, renderer: Arc<Renderer>) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.threatmap_timeout, config.insecure_tls)?;
        let client = ThreatMapClient::new(fetcher, config.threatmap_url.clone());

        Ok(Self {
            config,
            renderer,
            client,
        })
    }

    fn remove_previous(&self, images: &Path) -> Result<()> {
        for (file, _) in CHARTS {
            match std::fs::remove_file(images.join(file)) {
                Ok(()) => debug!("Removed previous chart {}", file),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn tallies(breakdown: &AttackBreakdown) -> [&[Tally]; 4] {
    [
        breakdown.severity.as_slice(),
        breakdown.profile_type.as_slice(),
        breakdown.incoming.as_slice(),
        breakdown.outgoing.as_slice(),
    ]
}

#[async_trait]
impl Job for ThreatBreakdownJob {
    fn name(&self) -> &'static str {
        "threat-breakdown"
    }

    fn interval(&self) -> Duration {
        self.config.breakdown_interval
    }

    async fn run_once(&self) -> Result<()> {
        let response = self.client.fetch().await?;

        let Some(breakdown) = AttackBreakdown::from_response(&response) else {
            warn!("Threat map returned no attacks; keeping previous charts");
            return Ok(());
        };

        let images = self.config.images_dir();
        self.remove_previous(&images)?;

        for ((file, title), data) in CHARTS.iter().zip(tallies(&breakdown)) {
            let svg = bar_chart(title, "Number of Attacks", data)?;
            write_atomic(&images.join(file), svg.as_bytes())?;
        }

        let links: Vec<ChartLink> = CHARTS
            .iter()
            .map(|(file, title)| ChartLink {
                file: file.to_string(),
                title: title.to_string(),
            })
            .collect();
        let page = self.renderer.breakdown_page(breakdown.total, &links, Utc::now())?;
        write_atomic(&self.config.breakdown_page_path(), page.as_bytes())?;

        info!("Rendered breakdown of {} attacks", breakdown.total);
        Ok(())
    }
}
