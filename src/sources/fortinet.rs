use super::{StatusSource, StatuspageComponents};
use crate::config::StatusPageEndpoint;
use crate::http::HttpFetcher;
use crate::status::{Category, RunState, StatusRecord, summarize};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error};

pub const SUMMARY_SERVICE: &str = "Fortinet Services";

/// Fortinet's statuspage.io endpoints, summarised into one card
pub struct FortinetStatusSource {
    fetcher: HttpFetcher,
    endpoints: Vec<StatusPageEndpoint>,
}

impl FortinetStatusSource {
    pub fn new(fetcher: HttpFetcher, endpoints: Vec<StatusPageEndpoint>) -> Self {
        Self { fetcher, endpoints }
    }

    /// Per-component records of a single endpoint
    pub async fn poll_endpoint(&self, endpoint: &StatusPageEndpoint) -> Vec<StatusRecord> {
        match self.fetcher.fetch_json::<StatuspageComponents>(&endpoint.url).await {
            Ok(summary) => {
                debug!("{} returned {} components", endpoint.name, summary.components.len());
                map_components(&endpoint.name, &summary)
            }
            Err(e) => {
                error!("Fortinet error: {} => {}", endpoint.name, e);
                vec![StatusRecord::new(
                    format!("{} Status API", endpoint.name),
                    RunState::NotRunning,
                    format!("Error fetching API data: {}", e),
                    Category::Fortinet,
                )]
            }
        }
    }

    /// Per-component records of every endpoint, fetched concurrently
    pub async fn poll_components(&self) -> Vec<StatusRecord> {
        join_all(self.endpoints.iter().map(|e| self.poll_endpoint(e)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[async_trait]
impl StatusSource for FortinetStatusSource {
    fn name(&self) -> &str {
        "fortinet"
    }

    async fn poll(&self) -> Vec<StatusRecord> {
        let components = self.poll_components().await;
        vec![summarize(
            SUMMARY_SERVICE,
            &components,
            Category::Fortinet,
            "The following Fortinet services are not operational:",
            "All Fortinet services are operational.",
        )]
    }
}

/// Leaf components become records; group headers are skipped.
pub fn map_components(endpoint_name: &str, summary: &StatuspageComponents) -> Vec<StatusRecord> {
    summary
        .components
        .iter()
        .filter(|c| !c.group.unwrap_or(false))
        .map(|c| {
            let status = c.status_text();
            StatusRecord::new(
                format!(
                    "{} - {}",
                    endpoint_name,
                    c.name.as_deref().unwrap_or("Unknown Region")
                ),
                RunState::running_if(status == "operational"),
                format!("Status: {}", status),
                Category::Fortinet,
            )
        })
        .collect()
}
