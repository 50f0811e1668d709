//! Error types for the dashboard jobs, checks and server

use std::fmt;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug)]
pub enum DashboardError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Attack history file could not be read or written
    Csv(csv::Error),

    /// Name resolution failed
    Dns(String),

    /// TLS handshake or certificate parsing failed
    Tls(String),

    /// Template rendering failed
    Template(tera::Error),

    /// Chart drawing failed
    Chart(String),

    /// Configuration error
    Config(String),

    /// Upstream payload did not have the expected shape
    Parse(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Io(err) => write!(f, "IO error: {}", err),
            DashboardError::Http(err) => write!(f, "HTTP error: {}", err),
            DashboardError::Json(err) => write!(f, "JSON error: {}", err),
            DashboardError::Csv(err) => write!(f, "CSV error: {}", err),
            DashboardError::Dns(msg) => write!(f, "DNS error: {}", msg),
            DashboardError::Tls(msg) => write!(f, "TLS error: {}", msg),
            DashboardError::Template(err) => write!(f, "Template error: {}", err),
            DashboardError::Chart(msg) => write!(f, "Chart error: {}", msg),
            DashboardError::Config(msg) => write!(f, "Configuration error: {}", msg),
            DashboardError::Parse(msg) => write!(f, "Parse error: {}", msg),
            DashboardError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DashboardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DashboardError::Io(err) => Some(err),
            DashboardError::Http(err) => Some(err),
            DashboardError::Json(err) => Some(err),
            DashboardError::Csv(err) => Some(err),
            DashboardError::Template(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        DashboardError::Io(err)
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        DashboardError::Http(err)
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Json(err)
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        DashboardError::Csv(err)
    }
}

impl From<tera::Error> for DashboardError {
    fn from(err: tera::Error) -> Self {
        DashboardError::Template(err)
    }
}

impl From<rustls::Error> for DashboardError {
    fn from(err: rustls::Error) -> Self {
        DashboardError::Tls(err.to_string())
    }
}
