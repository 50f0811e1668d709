use crate::config::{Config, FeedSource};
use crate::errors::{DashboardError, Result};
use crate::http::HttpFetcher;
use crate::render::{Renderer, write_atomic};
use crate::scheduler::Job;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// One feed entry as shown on a news page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewsArticle {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
}

impl NewsArticle {
    fn from_entry(entry: Entry, now: DateTime<Utc>) -> Self {
        let published = entry.published.or(entry.updated).unwrap_or(now);
        let summary = entry
            .summary
            .map(|text| text.content)
            .or_else(|| entry.content.and_then(|content| content.body))
            .unwrap_or_default();

        Self {
            title: entry
                .title
                .map(|text| text.content)
                .unwrap_or_else(|| "Untitled".to_string()),
            link: entry
                .links
                .into_iter()
                .map(|link| link.href)
                .find(|href| is_web_link(href))
                .unwrap_or_default(),
            published: published.format("%B %d, %Y").to_string(),
            summary,
        }
    }
}

/// Only http(s) links are rendered; `javascript:` and friends are dropped
fn is_web_link(href: &str) -> bool {
    reqwest::Url::parse(href.trim())
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Parse an RSS or Atom document. Entries without a date are stamped `now`.
pub fn parse_feed(bytes: &[u8], now: DateTime<Utc>) -> Result<Vec<NewsArticle>> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| DashboardError::Parse(e.to_string()))?;
    Ok(feed
        .entries
        .into_iter()
        .map(|entry| NewsArticle::from_entry(entry, now))
        .collect())
}

/// Renders one page per configured feed
pub struct NewsJob {
    config: Arc<Config>,
    renderer: Arc<Renderer>,
    fetcher: HttpFetcher,
}

impl NewsJob {
    pub fn new(config: Arc<Config>, renderer: Arc<Renderer>) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.http_timeout, config.insecure_tls)?;
        Ok(Self {
            config,
            renderer,
            fetcher,
        })
    }

    pub async fn refresh(&self, feed: &FeedSource) -> Result<usize> {
        let body = self.fetcher.fetch_bytes(&feed.url).await?;
        let articles = parse_feed(&body, Utc::now())?;

        let page = self.renderer.news_page(&feed.title, &articles)?;
        write_atomic(&self.config.news_page_path(&feed.filename), page.as_bytes())?;
        Ok(articles.len())
    }
}

#[async_trait]
impl Job for NewsJob {
    fn name(&self) -> &'static str {
        "news"
    }

    fn interval(&self) -> Duration {
        self.config.news_interval
    }

    async fn run_once(&self) -> Result<()> {
        let mut failed = Vec::new();

        for feed in &self.config.feeds {
            match self.refresh(feed).await {
                Ok(count) => info!("Rendered {} articles from {}", count, feed.title),
                Err(e) => {
                    error!("Error fetching {} feed: {}", feed.title, e);
                    failed.push(feed.title.as_str());
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(DashboardError::Other(format!(
                "{} of {} feeds failed: {}",
                failed.len(),
                self.config.feeds.len(),
                failed.join(", ")
            )))
        }
    }
}
