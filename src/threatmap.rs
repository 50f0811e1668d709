//! Fortinet threat-map client and the views derived from it

use crate::errors::Result;
use crate::history::AttackSample;
use crate::http::HttpFetcher;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Countries shown in the incoming/outgoing charts
pub const TOP_COUNTRIES: usize = 10;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThreatMapResponse {
    #[serde(default)]
    pub ips: BTreeMap<String, Vec<ThreatMapItem>>,
}

/// One aggregated attack entry of a threat-map segment
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ThreatMapItem {
    #[serde(default)]
    pub redis_ms: Option<String>,
    #[serde(default)]
    pub count: Option<Value>,
    #[serde(default)]
    pub severity: Option<Value>,
    #[serde(default)]
    pub profile_type: Option<Value>,
    #[serde(default)]
    pub dest_country: Option<Value>,
    #[serde(default)]
    pub src_country: Option<Value>,
}

impl ThreatMapItem {
    pub fn count(&self) -> u64 {
        match &self.count {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Milliseconds since the epoch, taken from the `"<ms>-<seq>"` stream id
    pub fn timestamp_ms(&self) -> Option<i64> {
        let id = self.redis_ms.as_deref().unwrap_or("0-0");
        id.split('-').next()?.trim().parse().ok()
    }

    pub fn timestamp(&self, timezone: Tz) -> Option<DateTime<Tz>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp_ms()?)
            .map(|utc| utc.with_timezone(&timezone))
    }
}

fn label(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => "Unknown".to_string(),
    }
}

impl ThreatMapResponse {
    pub fn items(&self) -> impl Iterator<Item = &ThreatMapItem> {
        self.ips.values().flatten()
    }

    /// Attack counts per segment timestamp, in the given zone
    pub fn samples(&self, timezone: Tz) -> Vec<AttackSample> {
        self.items()
            .filter_map(|item| match item.timestamp(timezone) {
                Some(timestamp) => Some(AttackSample::new(timestamp, item.count())),
                None => {
                    debug!("Skipping threat-map item with stream id {:?}", item.redis_ms);
                    None
                }
            })
            .collect()
    }
}

/// Label and how many attacks carried it
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Tally {
    pub label: String,
    pub count: u64,
}

/// Distribution of the attacks in one threat-map response
#[derive(Debug, Clone, Serialize)]
pub struct AttackBreakdown {
    pub total: u64,
    pub severity: Vec<Tally>,
    pub profile_type: Vec<Tally>,
    pub incoming: Vec<Tally>,
    pub outgoing: Vec<Tally>,
}

impl AttackBreakdown {
    /// Weight every item by its attack count.
    ///
    /// Returns `None` when the response holds no attacks at all.
    pub fn from_response(response: &ThreatMapResponse) -> Option<Self> {
        let mut severity: HashMap<String, u64> = HashMap::new();
        let mut profile_type: HashMap<String, u64> = HashMap::new();
        let mut incoming: HashMap<String, u64> = HashMap::new();
        let mut outgoing: HashMap<String, u64> = HashMap::new();
        let mut total = 0;

        for item in response.items() {
            let count = item.count();
            if count == 0 {
                continue;
            }
            total += count;
            *severity.entry(label(&item.severity)).or_default() += count;
            *profile_type.entry(label(&item.profile_type)).or_default() += count;
            *incoming.entry(label(&item.dest_country)).or_default() += count;
            *outgoing.entry(label(&item.src_country)).or_default() += count;
        }

        if total == 0 {
            return None;
        }

        Some(Self {
            total,
            severity: ranked(severity, None),
            profile_type: ranked(profile_type, None),
            incoming: ranked(incoming, Some(TOP_COUNTRIES)),
            outgoing: ranked(outgoing, Some(TOP_COUNTRIES)),
        })
    }
}

/// Count descending, label ascending on ties
fn ranked(counts: HashMap<String, u64>, limit: Option<usize>) -> Vec<Tally> {
    let mut tallies: Vec<Tally> = counts
        .into_iter()
        .map(|(label, count)| Tally { label, count })
        .collect();
    tallies.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    if let Some(limit) = limit {
        tallies.truncate(limit);
    }
    tallies
}

/// Client for the live outbreak endpoint
#[derive(Debug, Clone)]
pub struct ThreatMapClient {
    fetcher: HttpFetcher,
    url: String,
}

impl ThreatMapClient {
    pub fn new(fetcher: HttpFetcher, url: String) -> Self {
        Self { fetcher, url }
    }

    pub async fn fetch(&self) -> Result<ThreatMapResponse> {
        let response: ThreatMapResponse = self.fetcher.fetch_json(&self.url).await?;
        debug!(
            "Threat map returned {} segments, {} items",
            response.ips.len(),
            response.items().count()
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Jersey;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response() -> ThreatMapResponse {
        serde_json::from_value(json!({
            "ips": {
                "1736935200": [
                    {"redis_ms": "1736935200000-0", "count": 3, "severity": "high",
                     "profile_type": "ips", "dest_country": "GB", "src_country": "US"},
                    {"redis_ms": "1736935200000-1", "count": 0, "severity": "low"}
                ],
                "1736935500": [
                    {"redis_ms": "1736935500000-0", "count": 2, "severity": "medium",
                     "profile_type": "botnet", "dest_country": "GB"},
                    {"redis_ms": "bogus", "count": 1, "severity": 4}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_samples_convert_stream_ids() {
        let samples = response().samples(Jersey);

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].attacks, 3);
        assert_eq!(
            samples[0].timestamp.with_timezone(&Utc).to_rfc3339(),
            "2025-01-15T10:00:00+00:00"
        );
    }

    #[test]
    fn test_missing_stream_id_defaults_to_epoch() {
        let item = ThreatMapItem::default();
        assert_eq!(item.timestamp_ms(), Some(0));
        assert_eq!(item.count(), 0);
    }

    #[test]
    fn test_breakdown_weights_by_count() {
        let breakdown = AttackBreakdown::from_response(&response()).unwrap();

        assert_eq!(breakdown.total, 6);
        assert_eq!(
            breakdown.severity,
            vec![
                Tally { label: "high".to_string(), count: 3 },
                Tally { label: "medium".to_string(), count: 2 },
                Tally { label: "4".to_string(), count: 1 },
            ]
        );
        assert_eq!(breakdown.incoming[0], Tally { label: "GB".to_string(), count: 5 });
        assert_eq!(breakdown.outgoing[0], Tally { label: "US".to_string(), count: 3 });
        assert_eq!(breakdown.outgoing[1], Tally { label: "Unknown".to_string(), count: 3 });
    }

    #[test]
    fn test_breakdown_empty_response() {
        assert!(AttackBreakdown::from_response(&ThreatMapResponse::default()).is_none());
    }

    #[test]
    fn test_country_tallies_keep_top_ten() {
        let items: Vec<Value> = (0..15)
            .map(|i| json!({"redis_ms": "1-0", "count": i + 1, "dest_country": format!("C{:02}", i)}))
            .collect();
        let response: ThreatMapResponse =
            serde_json::from_value(json!({"ips": {"1": items}})).unwrap();

        let breakdown = AttackBreakdown::from_response(&response).unwrap();

        assert_eq!(breakdown.incoming.len(), TOP_COUNTRIES);
        assert_eq!(breakdown.incoming[0].label, "C14");
    }

    #[tokio::test]
    async fn test_client_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ips": {"1": [{"redis_ms": "1000-0", "count": 4}]}
            })))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5), false).unwrap();
        let client = ThreatMapClient::new(fetcher, server.uri());
        let response = client.fetch().await.unwrap();

        assert_eq!(response.items().count(), 1);
        assert_eq!(response.samples(Jersey)[0].attacks, 4);
    }
}
