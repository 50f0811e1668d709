use super::StatusSource;
use crate::http::HttpFetcher;
use crate::status::{Category, RunState, StatusRecord};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

const API_SERVICE_NAME: &str = "Microsoft 365 Status API";

/// One entry of the Microsoft 365 consumer status feed
#[derive(Debug, Clone, Deserialize)]
pub struct MicrosoftService {
    #[serde(rename = "ServiceDisplayName", default)]
    pub display_name: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

pub struct MicrosoftStatusSource {
    fetcher: HttpFetcher,
    url: String,
    included: Vec<String>,
}

impl MicrosoftStatusSource {
    pub fn new(fetcher: HttpFetcher, url: String, included: Vec<String>) -> Self {
        Self { fetcher, url, included }
    }
}

#[async_trait]
impl StatusSource for MicrosoftStatusSource {
    fn name(&self) -> &str {
        "microsoft"
    }

    async fn poll(&self) -> Vec<StatusRecord> {
        match self.fetcher.fetch_json::<Vec<MicrosoftService>>(&self.url).await {
            Ok(services) => {
                debug!("Microsoft API returned {} services", services.len());
                map_services(&services, &self.included)
            }
            Err(e) => {
                error!("Error fetching Microsoft API: {}", e);
                vec![StatusRecord::new(
                    API_SERVICE_NAME,
                    RunState::NotRunning,
                    format!("Error fetching API data: {}", e),
                    Category::Microsoft,
                )]
            }
        }
    }
}

/// Map raw Microsoft statuses onto the tri-state.
///
/// The feed spells states inconsistently ("Service restored",
/// "ExtendedRecovery", "restoring_service"), so spaces and underscores are
/// dropped before matching.
pub fn normalize_status(raw: &str) -> RunState {
    let normalized: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect::<String>()
        .to_lowercase();

    match normalized.as_str() {
        "operational" => RunState::Running,
        "investigating" | "restoringservice" => RunState::NotRunning,
        "extendedrecovery" | "servicerestored" => RunState::ServiceRestored,
        _ => RunState::NotRunning,
    }
}

pub fn map_services(services: &[MicrosoftService], included: &[String]) -> Vec<StatusRecord> {
    services
        .iter()
        .filter_map(|service| {
            let name = service.display_name.as_deref().unwrap_or("Unknown Service");
            if !included.iter().any(|i| i == name) {
                return None;
            }

            let raw = service.status.as_deref().unwrap_or("Unknown");
            let status = normalize_status(raw);
            debug!("Microsoft {}: {} -> {}", name, raw, status);

            let message = match service.message.as_deref() {
                Some(message) if !message.is_empty() => message.to_string(),
                _ => format!("Status: {}", raw),
            };

            Some(StatusRecord::new(name, status, message, Category::Microsoft))
        })
        .collect()
}
