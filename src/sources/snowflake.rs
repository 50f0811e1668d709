use super::{StatusSource, StatuspageComponents};
use crate::http::HttpFetcher;
use crate::status::{Category, RunState, StatusRecord, summarize};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, error};

pub const SUMMARY_SERVICE: &str = "Snowflake Services (includes AWS & Azure)";

pub struct SnowflakeStatusSource {
    fetcher: HttpFetcher,
    url: String,
}

impl SnowflakeStatusSource {
    pub fn new(fetcher: HttpFetcher, url: String) -> Self {
        Self { fetcher, url }
    }
}

#[async_trait]
impl StatusSource for SnowflakeStatusSource {
    fn name(&self) -> &str {
        "snowflake"
    }

    async fn poll(&self) -> Vec<StatusRecord> {
        match self.fetcher.fetch_json::<StatuspageComponents>(&self.url).await {
            Ok(components) => {
                debug!("Snowflake returned {} components", components.components.len());
                let records = categorize_components(&components);
                vec![summarize(
                    SUMMARY_SERVICE,
                    &records,
                    Category::Snowflake,
                    "The following Snowflake-related services are not operational:",
                    "All Snowflake services and their cloud dependencies are operational.",
                )]
            }
            Err(e) => {
                error!("Error fetching data from Snowflake API: {}", e);
                vec![StatusRecord::new(
                    SUMMARY_SERVICE,
                    RunState::NotRunning,
                    format!("Error fetching API data: {}", e),
                    Category::Snowflake,
                )]
            }
        }
    }
}

fn cloud_rank(category: Category) -> u8 {
    match category {
        Category::Aws => 1,
        Category::Azure => 2,
        _ => 0,
    }
}

/// Turn leaf components into records, tagging each with the cloud of its
/// parent group (AWS, Azure, or Snowflake itself when ungrouped).
///
/// Records are listed Snowflake first, then AWS, then Azure, keeping
/// component order within each cloud.
pub fn categorize_components(summary: &StatuspageComponents) -> Vec<StatusRecord> {
    let groups: HashMap<&str, Category> = summary
        .components
        .iter()
        .filter(|c| c.group == Some(true))
        .filter_map(|c| {
            let id = c.id.as_deref()?;
            let name = c.name.as_deref().unwrap_or("").to_lowercase();
            if name.contains("aws") {
                Some((id, Category::Aws))
            } else if name.contains("azure") {
                Some((id, Category::Azure))
            } else {
                None
            }
        })
        .collect();

    let mut records: Vec<StatusRecord> = summary
        .components
        .iter()
        .filter(|c| c.group == Some(false))
        .map(|c| {
            let category = c
                .group_id
                .as_deref()
                .and_then(|id| groups.get(id).copied())
                .unwrap_or(Category::Snowflake);
            let status = c.status_text();

            StatusRecord::new(
                c.name.as_deref().unwrap_or("Unknown Service"),
                RunState::running_if(status == "operational" || status == "under_maintenance"),
                format!("Status: {}", status),
                category,
            )
        })
        .collect();

    records.sort_by_key(|r| cloud_rank(r.category));
    records
}
