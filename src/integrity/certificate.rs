//! TLS certificate inspection of the monitored sites

use super::CheckReport;
use crate::errors::{DashboardError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use x509_parser::prelude::*;

const HTTPS_PORT: u16 = 443;

/// The parts of a leaf certificate worth logging
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CertificateSummary {
    pub subject_cn: String,
    pub issuer_cn: String,
    pub not_after: DateTime<Utc>,
}

fn common_name(name: &X509Name) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or("N/A")
        .to_string()
}

pub fn describe_certificate(der: &[u8]) -> Result<CertificateSummary> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| DashboardError::Tls(format!("Could not parse certificate: {}", e)))?;

    let expiry = cert.validity().not_after.timestamp();
    let not_after = DateTime::<Utc>::from_timestamp(expiry, 0)
        .ok_or_else(|| DashboardError::Tls(format!("Certificate expiry {} is out of range", expiry)))?;

    Ok(CertificateSummary {
        subject_cn: common_name(cert.subject()),
        issuer_cn: common_name(cert.issuer()),
        not_after,
    })
}

/// Client configuration trusting the platform's root store
pub fn client_config() -> Result<Arc<ClientConfig>> {
    let native = rustls_native_certs::load_native_certs();
    for e in &native.errors {
        warn!("Skipping unreadable native certificate: {}", e);
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("Loaded {} native roots ({} ignored)", added, ignored);

    let config = ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Handshake with `host:port` and return the DER of the leaf certificate
pub async fn fetch_leaf_certificate(
    config: Arc<ClientConfig>,
    host: &str,
    port: u16,
    limit: Duration,
) -> Result<Vec<u8>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| DashboardError::Tls(format!("Invalid server name '{}': {}", host, e)))?;

    let tcp = timeout(limit, TcpStream::connect((host, port)))
        .await
        .map_err(|_| DashboardError::Tls(format!("Connection to {}:{} timed out", host, port)))??;

    let stream = timeout(limit, TlsConnector::from(config).connect(server_name, tcp))
        .await
        .map_err(|_| DashboardError::Tls(format!("Handshake with {} timed out", host)))??;

    let (_, session) = stream.get_ref();
    let leaf = session
        .peer_certificates()
        .and_then(|certs| certs.first())
        .ok_or_else(|| DashboardError::Tls(format!("{} presented no certificate", host)))?;

    Ok(leaf.as_ref().to_vec())
}

/// Grade a certificate by how long it remains valid
pub fn evaluate(name: &str, summary: &CertificateSummary, now: DateTime<Utc>, warning_days: i64) -> CheckReport {
    let details = format!(
        "Subject: {}, Issuer: {}, Valid until: {}",
        summary.subject_cn,
        summary.issuer_cn,
        summary.not_after.format("%Y-%m-%d %H:%M:%S")
    );
    let remaining = summary.not_after - now;

    if remaining <= TimeDelta::zero() {
        CheckReport::fail(name, format!("Certificate expired. {}", details))
    } else if remaining < TimeDelta::days(warning_days) {
        CheckReport::warning(
            name,
            format!("Certificate expires in {} days. {}", remaining.num_days(), details),
        )
    } else {
        CheckReport::ok(name, details)
    }
}

fn target_of(site: &str) -> Option<(String, u16)> {
    let with_scheme = if site.contains("://") {
        site.to_string()
    } else {
        format!("https://{}", site)
    };
    let url = reqwest::Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?.to_string();
    Some((host, url.port().unwrap_or(HTTPS_PORT)))
}

async fn check_site(config: Arc<ClientConfig>, site: &str, limit: Duration, warning_days: i64) -> CheckReport {
    let Some((host, port)) = target_of(site) else {
        return CheckReport::fail(format!("{} SSL Check", site), "Not a valid site");
    };
    let name = format!("{} SSL Check", host);

    let summary = match fetch_leaf_certificate(config, &host, port, limit).await {
        Ok(der) => describe_certificate(&der),
        Err(e) => Err(e),
    };

    match summary {
        Ok(summary) => evaluate(&name, &summary, Utc::now(), warning_days),
        Err(e) => CheckReport::fail(name, e.to_string()),
    }
}

/// Inspect every site concurrently; one broken site never hides the others
pub async fn check_certificates(sites: &[String], limit: Duration, warning_days: i64) -> Vec<CheckReport> {
    let config = match client_config() {
        Ok(config) => config,
        Err(e) => {
            return sites
                .iter()
                .map(|site| CheckReport::fail(format!("{} SSL Check", site), e.to_string()))
                .collect();
        }
    };

    join_all(
        sites
            .iter()
            .map(|site| check_site(config.clone(), site, limit, warning_days)),
    )
    .await
}
