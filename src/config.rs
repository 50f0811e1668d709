//! Configuration management for the dashboard

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A statuspage.io summary endpoint polled by the down detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusPageEndpoint {
    pub name: String,
    pub url: String,
}

/// An RSS/Atom feed rendered into its own news page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedSource {
    pub url: String,
    /// File name under `NewNews/`
    pub filename: String,
    pub title: String,
}

/// Longest history the attack chart keeps (one year)
pub const MAX_HISTORY_RETENTION: Duration = Duration::from_secs(366 * 24 * 3600);

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Address the web front end binds to
    pub bind_address: String,

    /// Number of HTTP worker threads
    pub workers: usize,

    /// Root of the generated fragments, charts and data files
    pub output_dir: PathBuf,

    /// Remote script whose content hash is pinned
    pub tailwind_url: String,

    /// File holding the known-good SHA-256 of the Tailwind script
    pub hash_file: PathBuf,

    /// Public resolver used as the DNS baseline
    pub trusted_dns_server: IpAddr,

    /// Sites whose TLS certificates are inspected at startup
    pub monitored_sites: Vec<String>,

    /// Arbitrary websites checked by the down detector
    pub websites: Vec<String>,

    pub threatmap_url: String,
    pub snowflake_status_url: String,
    pub microsoft_status_url: String,

    /// Microsoft services kept from the status feed
    pub microsoft_services: Vec<String>,

    pub fortinet_statuspages: Vec<StatusPageEndpoint>,
    pub feeds: Vec<FeedSource>,

    /// IANA zone attack samples are stored in
    pub timezone: String,

    /// How long attack samples are kept
    pub history_retention: Duration,

    pub history_interval: Duration,
    pub breakdown_interval: Duration,
    pub down_detector_interval: Duration,
    pub news_interval: Duration,

    /// Timeout for status APIs and feeds
    pub http_timeout: Duration,

    /// Timeout for plain website checks
    pub website_timeout: Duration,

    /// Timeout for the threat map endpoint
    pub threatmap_timeout: Duration,

    /// Timeout for a certificate handshake
    pub cert_timeout: Duration,

    /// Pause between two website checks
    pub website_pause: Duration,

    /// Certificates expiring sooner than this are reported as warnings
    pub cert_expiry_warning_days: i64,

    /// Skip certificate verification on outbound HTTP calls
    pub insecure_tls: bool,

    /// Optional JSON log file in addition to stdout
    pub log_file: Option<PathBuf>,

    pub run_jobs: bool,
    pub run_integrity_checks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            workers: 8,
            output_dir: PathBuf::from("dashboard"),
            tailwind_url: "https://cdn.tailwindcss.com?version=3.4.3".to_string(),
            hash_file: PathBuf::from("tailwind_hash.txt"),
            trusted_dns_server: IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)),
            monitored_sites: vec![
                "https://www.fortinet.com".to_string(),
                "https://www.downdetector.com".to_string(),
                "https://www.bbc.co.uk".to_string(),
                "https://www.bleepingcomputer.com".to_string(),
                "https://www.wired.com".to_string(),
            ],
            websites: Vec::new(),
            threatmap_url: "https://fortiguard.fortinet.com/api/threatmap/live/outbreak?outbreak_id=0&segment_sec=300&last_sec=3600&replay=true&limit=500".to_string(),
            snowflake_status_url: "https://status.snowflake.com/api/v2/components.json".to_string(),
            microsoft_status_url: "https://status.cloud.microsoft/api/posts/m365Consumer".to_string(),
            microsoft_services: vec![
                "Microsoft 365 (Consumer)".to_string(),
                "Microsoft Copilot".to_string(),
                "Outlook.com".to_string(),
            ],
            fortinet_statuspages: default_statuspages(),
            feeds: default_feeds(),
            timezone: "Europe/Jersey".to_string(),
            history_retention: Duration::from_secs(12 * 3600),
            history_interval: Duration::from_secs(30 * 60),
            breakdown_interval: Duration::from_secs(60),
            down_detector_interval: Duration::from_secs(60),
            news_interval: Duration::from_secs(30 * 60),
            http_timeout: Duration::from_secs(10),
            website_timeout: Duration::from_secs(5),
            threatmap_timeout: Duration::from_secs(30),
            cert_timeout: Duration::from_secs(10),
            website_pause: Duration::from_secs(1),
            cert_expiry_warning_days: 14,
            insecure_tls: false,
            log_file: None,
            run_jobs: true,
            run_integrity_checks: true,
        }
    }
}

fn default_statuspages() -> Vec<StatusPageEndpoint> {
    [
        ("Fortinet Anycast Query", "https://2k10kk4nf91b.statuspage.io/api/v2/summary.json"),
        ("Fortinet Anycast Update", "https://py884f5vjpy3.statuspage.io/api/v2/summary.json"),
        ("FGD SDNS Anycast", "https://dq1kp00kn5f1.statuspage.io/api/v2/summary.json"),
        ("FGD DNS DoT", "https://q06s3wqk32zh.statuspage.io/api/v2/summary.json"),
        ("FGD SDNS Unicast", "https://mpbpks96wbvp.statuspage.io/api/v2/summary.json"),
    ]
    .into_iter()
    .map(|(name, url)| StatusPageEndpoint {
        name: name.to_string(),
        url: url.to_string(),
    })
    .collect()
}

fn default_feeds() -> Vec<FeedSource> {
    [
        ("https://www.bleepingcomputer.com/feed/", "BleepingComputer.html", "Bleeping Computer"),
        ("https://www.wired.com/feed/category/security/latest/rss", "WiredNews.html", "Wired Security"),
        ("http://newsrss.bbc.co.uk/rss/newsonline_uk_edition/technology/rss.xml", "BbcTech.html", "BBC Technology"),
    ]
    .into_iter()
    .map(|(url, filename, title)| FeedSource {
        url: url.to_string(),
        filename: filename.to_string(),
        title: title.to_string(),
    })
    .collect()
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(address) = lookup("BIND_ADDRESS") {
            config.bind_address = address;
        }

        if let Some(workers) = lookup("WORKERS") {
            if let Ok(workers) = workers.parse() {
                config.workers = workers;
            }
        }

        if let Some(dir) = lookup("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("TAILWIND_URL") {
            config.tailwind_url = url;
        }

        if let Some(path) = lookup("HASH_FILE") {
            config.hash_file = PathBuf::from(path);
        }

        if let Some(server) = lookup("TRUSTED_DNS_SERVER") {
            if let Ok(ip) = server.parse() {
                config.trusted_dns_server = ip;
            }
        }

        if let Some(sites) = lookup("MONITORED_SITES") {
            config.monitored_sites = split_list(&sites);
        }

        if let Some(websites) = lookup("WEBSITES") {
            config.websites = split_list(&websites);
        }

        if let Some(url) = lookup("THREATMAP_URL") {
            config.threatmap_url = url;
        }

        if let Some(url) = lookup("SNOWFLAKE_STATUS_URL") {
            config.snowflake_status_url = url;
        }

        if let Some(url) = lookup("MICROSOFT_STATUS_URL") {
            config.microsoft_status_url = url;
        }

        if let Some(timezone) = lookup("TIMEZONE") {
            config.timezone = timezone;
        }

        if let Some(hours) = lookup("HISTORY_RETENTION_HOURS") {
            if let Some(secs) = hours.parse::<u64>().ok().and_then(|h| h.checked_mul(3600)) {
                config.history_retention = Duration::from_secs(secs);
            }
        }

        let seconds = |key: &str| {
            lookup(key)
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        if let Some(interval) = seconds("HISTORY_INTERVAL_SECONDS") {
            config.history_interval = interval;
        }
        if let Some(interval) = seconds("BREAKDOWN_INTERVAL_SECONDS") {
            config.breakdown_interval = interval;
        }
        if let Some(interval) = seconds("DOWN_DETECTOR_INTERVAL_SECONDS") {
            config.down_detector_interval = interval;
        }
        if let Some(interval) = seconds("NEWS_INTERVAL_SECONDS") {
            config.news_interval = interval;
        }
        if let Some(timeout) = seconds("HTTP_TIMEOUT_SECONDS") {
            config.http_timeout = timeout;
        }
        if let Some(timeout) = seconds("WEBSITE_TIMEOUT_SECONDS") {
            config.website_timeout = timeout;
        }
        if let Some(timeout) = seconds("THREATMAP_TIMEOUT_SECONDS") {
            config.threatmap_timeout = timeout;
        }
        if let Some(timeout) = seconds("CERT_TIMEOUT_SECONDS") {
            config.cert_timeout = timeout;
        }

        if let Some(days) = lookup("CERT_EXPIRY_WARNING_DAYS") {
            if let Ok(days) = days.parse() {
                config.cert_expiry_warning_days = days;
            }
        }

        if let Some(insecure) = lookup("INSECURE_TLS") {
            config.insecure_tls = insecure.to_lowercase() == "true";
        }

        if let Some(path) = lookup("LOG_FILE") {
            if !path.trim().is_empty() {
                config.log_file = Some(PathBuf::from(path));
            }
        }

        if let Some(run_jobs) = lookup("RUN_JOBS") {
            config.run_jobs = run_jobs.to_lowercase() == "true";
        }

        if let Some(run_checks) = lookup("RUN_INTEGRITY_CHECKS") {
            config.run_integrity_checks = run_checks.to_lowercase() == "true";
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir cannot be empty".to_string());
        }

        if self.workers == 0 {
            return Err("workers must be greater than 0".to_string());
        }

        if self.tailwind_url.is_empty() {
            return Err("tailwind_url cannot be empty".to_string());
        }

        if self.history_retention.is_zero() {
            return Err("history_retention must be greater than 0".to_string());
        }

        if self.history_retention > MAX_HISTORY_RETENTION {
            return Err(format!(
                "history_retention cannot exceed {} hours",
                MAX_HISTORY_RETENTION.as_secs() / 3600
            ));
        }

        let intervals = [
            ("history_interval", self.history_interval),
            ("breakdown_interval", self.breakdown_interval),
            ("down_detector_interval", self.down_detector_interval),
            ("news_interval", self.news_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(format!("{} must be greater than 0", name));
            }
        }

        self.timezone()?;

        for feed in &self.feeds {
            if feed.url.is_empty() || feed.filename.is_empty() {
                return Err(format!("feed '{}' needs both a url and a filename", feed.title));
            }
            if feed.filename.contains('/') || feed.filename.contains('\\') || feed.filename.contains("..") {
                return Err(format!("feed filename '{}' must be a plain file name", feed.filename));
            }
        }

        Ok(())
    }

    /// Parsed form of `timezone`
    pub fn timezone(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("unknown timezone '{}'", self.timezone))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join("Images")
    }

    pub fn history_csv_path(&self) -> PathBuf {
        self.images_dir().join("cyberattack_data.csv")
    }

    pub fn trend_chart_path(&self) -> PathBuf {
        self.images_dir().join("attack_trends.svg")
    }

    pub fn status_report_path(&self) -> PathBuf {
        self.output_dir.join("DownDetector").join("Down_Detector_Test.html")
    }

    pub fn status_snapshot_path(&self) -> PathBuf {
        self.output_dir.join("DownDetector").join("status.json")
    }

    pub fn history_page_path(&self) -> PathBuf {
        self.output_dir.join("History").join("History.html")
    }

    pub fn breakdown_page_path(&self) -> PathBuf {
        self.output_dir
            .join("FortinetScraper")
            .join("Attempt3")
            .join("Scraper.html")
    }

    pub fn news_dir(&self) -> PathBuf {
        self.output_dir.join("NewNews")
    }

    /// News page for a configured feed file name
    pub fn news_page_path(&self, filename: &str) -> PathBuf {
        self.news_dir().join(Path::new(filename))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fortinet_statuspages.len(), 5);
        assert_eq!(config.feeds.len(), 3);
        assert!(config.websites.is_empty());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("BIND_ADDRESS", "127.0.0.1:9000"),
            ("WORKERS", "2"),
            ("WEBSITES", "https://a.example, ,https://b.example"),
            ("HISTORY_RETENTION_HOURS", "6"),
            ("NEWS_INTERVAL_SECONDS", "120"),
            ("TRUSTED_DNS_SERVER", "1.1.1.1"),
            ("INSECURE_TLS", "TRUE"),
            ("LOG_FILE", "integrity.log"),
        ]));

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.workers, 2);
        assert_eq!(config.websites, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.history_retention, Duration::from_secs(6 * 3600));
        assert_eq!(config.news_interval, Duration::from_secs(120));
        assert_eq!(config.trusted_dns_server.to_string(), "1.1.1.1");
        assert!(config.insecure_tls);
        assert_eq!(config.log_file, Some(PathBuf::from("integrity.log")));
    }

    #[test]
    fn test_unparsable_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("WORKERS", "many"),
            ("TRUSTED_DNS_SERVER", "not-an-ip"),
            ("DOWN_DETECTOR_INTERVAL_SECONDS", "-5"),
        ]));

        assert_eq!(config.workers, 8);
        assert_eq!(config.trusted_dns_server.to_string(), "8.8.8.8");
        assert_eq!(config.down_detector_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.workers = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.news_interval = Duration::ZERO;
        assert!(config.validate().unwrap_err().contains("news_interval"));

        let mut config = Config::default();
        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feeds[0].filename = "../escape.html".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_retention_is_rejected() {
        let config = Config::from_lookup(lookup_from(&[("HISTORY_RETENTION_HOURS", "3000000000")]));
        assert_eq!(config.history_retention, Duration::from_secs(3_000_000_000 * 3600));
        assert!(config.validate().unwrap_err().contains("history_retention"));

        // hours * 3600 would overflow u64; the default is kept
        let config = Config::from_lookup(lookup_from(&[("HISTORY_RETENTION_HOURS", "6000000000000000")]));
        assert_eq!(config.history_retention, Duration::from_secs(12 * 3600));

        let mut config = Config::default();
        config.history_retention = MAX_HISTORY_RETENTION;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_derived_paths() {
        let mut config = Config::default();
        config.output_dir = PathBuf::from("/srv/dash");

        assert_eq!(
            config.history_csv_path(),
            PathBuf::from("/srv/dash/Images/cyberattack_data.csv")
        );
        assert_eq!(
            config.breakdown_page_path(),
            PathBuf::from("/srv/dash/FortinetScraper/Attempt3/Scraper.html")
        );
        assert_eq!(
            config.news_page_path("BbcTech.html"),
            PathBuf::from("/srv/dash/NewNews/BbcTech.html")
        );
    }
}
