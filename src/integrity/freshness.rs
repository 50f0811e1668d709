//! Artefact freshness and external URL reachability

use super::CheckReport;
use crate::config::Config;
use crate::http::HttpFetcher;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use std::path::{Path, PathBuf};

/// Files the jobs are expected to have written by now
pub fn artifacts(config: &Config) -> Vec<(String, PathBuf)> {
    let mut files = vec![
        ("Fortinet Attack History".to_string(), config.history_csv_path()),
        ("FortiScraper Data".to_string(), config.breakdown_page_path()),
        ("Down Detector Data".to_string(), config.status_snapshot_path()),
    ];
    files.extend(
        config
            .feeds
            .iter()
            .map(|feed| (format!("News Feed: {}", feed.title), config.news_page_path(&feed.filename))),
    );
    files
}

pub fn check_artifact(name: &str, path: &Path) -> CheckReport {
    match std::fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(modified) => {
            let modified: DateTime<Utc> = modified.into();
            CheckReport::ok(
                name,
                format!("Last modified: {}", modified.format("%Y-%m-%d %H:%M:%S")),
            )
        }
        Err(_) => CheckReport::fail(name, format!("File not found: {}", path.display())),
    }
}

pub fn check_artifacts(config: &Config) -> Vec<CheckReport> {
    artifacts(config)
        .iter()
        .map(|(name, path)| check_artifact(name, path))
        .collect()
}

/// 200 is the only acceptable answer
pub async fn check_reachability(fetcher: &HttpFetcher, url: &str) -> CheckReport {
    let name = format!("External URL: {}", url);

    match fetcher.get(url).await {
        Ok(response) if response.status() == StatusCode::OK => {
            CheckReport::ok(name, "Successfully connected to the URL.")
        }
        Ok(response) => CheckReport::fail(
            name,
            format!("Received status code {}.", response.status().as_u16()),
        ),
        Err(e) => CheckReport::fail(name, format!("Request failed: {}", e)),
    }
}
