//! SHA-256 pinning of a remote script

use super::CheckReport;
use crate::errors::Result;
use crate::http::HttpFetcher;
use crate::render::write_atomic;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

pub const CHECK_NAME: &str = "Tailwind CSS Hash Check";

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare the remote content against the pinned digest.
///
/// Missing or empty pin and download errors fail; a different digest is a
/// warning since the CDN may have shipped a legitimate update.
pub async fn check_pinned_hash(fetcher: &HttpFetcher, url: &str, hash_file: &Path) -> CheckReport {
    let expected = match tokio::fs::read_to_string(hash_file).await {
        Ok(contents) => contents.trim().to_string(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return CheckReport::fail(CHECK_NAME, format!("Hash file not found: {}", hash_file.display()));
        }
        Err(e) => {
            return CheckReport::fail(CHECK_NAME, format!("Could not read the hash file: {}", e));
        }
    };

    if expected.is_empty() {
        return CheckReport::fail(CHECK_NAME, format!("The hash file is empty: {}", hash_file.display()));
    }

    match fetcher.fetch_bytes(url).await {
        Ok(content) => {
            let got = sha256_hex(&content);
            if got.eq_ignore_ascii_case(&expected) {
                CheckReport::ok(CHECK_NAME, "Hash matches the stored value.")
            } else {
                CheckReport::warning(
                    CHECK_NAME,
                    format!("Hash mismatch! Expected: {}, Got: {}", expected, got),
                )
            }
        }
        Err(e) => CheckReport::fail(CHECK_NAME, format!("Could not download the file: {}", e)),
    }
}

/// Download `url` and store its digest in `output`
pub async fn pin_hash(fetcher: &HttpFetcher, url: &str, output: &Path) -> Result<String> {
    let content = fetcher.fetch_bytes(url).await?;
    let digest = sha256_hex(&content);
    write_atomic(output, digest.as_bytes())?;
    info!("Pinned {} ({} bytes) as {} in {}", url, content.len(), digest, output.display());
    Ok(digest)
}
