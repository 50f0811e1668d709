//! Third-party status sources polled by the down detector

pub mod fortinet;
pub mod microsoft;
pub mod snowflake;
pub mod website;

use crate::status::StatusRecord;
use async_trait::async_trait;
use serde::Deserialize;

pub use fortinet::FortinetStatusSource;
pub use microsoft::MicrosoftStatusSource;
pub use snowflake::SnowflakeStatusSource;
pub use website::WebsiteStatusSource;

/// A source of status records.
///
/// Polling never fails: upstream errors are turned into `Not Running`
/// records so one broken API never blanks the whole report.
#[async_trait]
pub trait StatusSource: Send + Sync {
    fn name(&self) -> &str;

    async fn poll(&self) -> Vec<StatusRecord>;
}

/// Component entry shared by statuspage.io style APIs
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatuspageComponent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub group: Option<bool>,
    #[serde(default)]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StatuspageComponents {
    #[serde(default)]
    pub components: Vec<StatuspageComponent>,
}

impl StatuspageComponent {
    pub fn status_text(&self) -> &str {
        self.status.as_deref().unwrap_or("Unknown")
    }
}
