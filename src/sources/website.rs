use super::StatusSource;
use crate::http::HttpFetcher;
use crate::status::{Category, RunState, StatusRecord};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error};

/// Plain reachability check of arbitrary websites
pub struct WebsiteStatusSource {
    fetcher: HttpFetcher,
    urls: Vec<String>,
    pause: Duration,
}

impl WebsiteStatusSource {
    pub fn new(fetcher: HttpFetcher, urls: Vec<String>, pause: Duration) -> Self {
        Self { fetcher, urls, pause }
    }

    pub async fn check(&self, url: &str) -> StatusRecord {
        match self.fetcher.get(url).await {
            Ok(response) => {
                let code = response.status();
                debug!("Website {} responded with {}", url, code);
                StatusRecord::new(
                    url,
                    RunState::running_if(code.is_success()),
                    format!("Status Code: {}", code.as_u16()),
                    Category::Websites,
                )
            }
            Err(e) => {
                error!("Website error: {} => {}", url, e);
                StatusRecord::new(url, RunState::NotRunning, format!("Error: {}", e), Category::Websites)
            }
        }
    }
}

#[async_trait]
impl StatusSource for WebsiteStatusSource {
    fn name(&self) -> &str {
        "websites"
    }

    async fn poll(&self) -> Vec<StatusRecord> {
        let mut records = Vec::with_capacity(self.urls.len());

        for (index, url) in self.urls.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
            records.push(self.check(url).await);
        }

        records
    }
}
