//! One-shot integrity checks run at startup and by the `check` command

pub mod certificate;
pub mod content_hash;
pub mod dns;
pub mod freshness;

use crate::config::Config;
use crate::http::HttpFetcher;
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

pub use certificate::{CertificateSummary, check_certificates};
pub use content_hash::{check_pinned_hash, pin_hash, sha256_hex};
pub use dns::{HickoryResolver, Resolver, SystemResolver, check_dns_consistency, compare_resolutions};
pub use freshness::{check_artifacts, check_reachability};

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Warning,
    Fail,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "OK"),
            CheckStatus::Warning => write!(f, "WARNING"),
            CheckStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Outcome of a single check
#[derive(Clone, Debug, Serialize)]
pub struct CheckReport {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

impl CheckReport {
    pub fn new(name: impl Into<String>, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
        }
    }

    pub fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Ok, message)
    }

    pub fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Warning, message)
    }

    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Fail, message)
    }

    pub fn log(&self) {
        match self.status {
            CheckStatus::Ok => info!(check = %self.name, "[{}] OK - {}", self.name, self.message),
            CheckStatus::Warning => warn!(check = %self.name, "[{}] WARNING - {}", self.name, self.message),
            CheckStatus::Fail => error!(check = %self.name, "[{}] FAIL - {}", self.name, self.message),
        }
    }
}

/// Host part of a URL, or the input itself when it has no scheme
pub fn host_of(target: &str) -> Option<String> {
    if !target.contains("://") {
        let host = target.split(['/', '?', ':']).next().unwrap_or("").trim();
        return (!host.is_empty()).then(|| host.to_string());
    }

    reqwest::Url::parse(target)
        .ok()?
        .host_str()
        .map(|host| host.to_string())
}

/// Run every check concurrently and log each outcome.
///
/// A check never aborts the others; the reports come back in a stable
/// order: artefacts, reachability, hash, DNS, certificates.
pub async fn run_all(config: &Config) -> Vec<CheckReport> {
    info!("--- Running Integrity Checks ---");

    let fetcher = match HttpFetcher::new(config.http_timeout, config.insecure_tls) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            let report = CheckReport::fail("Integrity Checks", format!("Could not build HTTP client: {}", e));
            report.log();
            return vec![report];
        }
    };

    let dns = async {
        match host_of(&config.tailwind_url) {
            Some(host) => {
                let trusted = HickoryResolver::new(config.trusted_dns_server, config.http_timeout);
                check_dns_consistency(&host, &SystemResolver, &trusted).await
            }
            None => CheckReport::fail(
                dns::CHECK_NAME,
                format!("No host in {}", config.tailwind_url),
            ),
        }
    };

    let (reachability, hash, dns, certificates) = tokio::join!(
        check_reachability(&fetcher, &config.tailwind_url),
        check_pinned_hash(&fetcher, &config.tailwind_url, &config.hash_file),
        dns,
        check_certificates(
            &config.monitored_sites,
            config.cert_timeout,
            config.cert_expiry_warning_days,
        ),
    );

    let mut reports = check_artifacts(config);
    reports.push(reachability);
    reports.push(hash);
    reports.push(dns);
    reports.extend(certificates);

    for report in &reports {
        report.log();
    }
    info!("--- Integrity Checks Complete ---");

    reports
}
