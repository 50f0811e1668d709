//! Rolling attack-count history persisted as CSV

use crate::errors::{DashboardError, Result};
use crate::render::write_atomic;
use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Number of attacks reported for one threat-map segment
#[derive(Clone, Debug, PartialEq)]
pub struct AttackSample {
    pub timestamp: DateTime<Tz>,
    pub attacks: u64,
}

impl AttackSample {
    pub fn new(timestamp: DateTime<Tz>, attacks: u64) -> Self {
        Self { timestamp, attacks }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    timestamp: String,
    attacks: String,
}

/// Time-ordered attack samples, unique per timestamp
#[derive(Clone, Debug)]
pub struct AttackHistory {
    timezone: Tz,
    samples: Vec<AttackSample>,
}

impl AttackHistory {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            samples: Vec::new(),
        }
    }

    /// Load the history file.
    ///
    /// A missing or empty file is an empty history. Rows with an unreadable
    /// timestamp or count are dropped.
    pub fn load(path: &Path, timezone: Tz) -> Result<Self> {
        let mut history = Self::new(timezone);

        if !path.exists() {
            return Ok(history);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut dropped = 0;
        for row in reader.deserialize::<CsvRow>() {
            let sample = row.ok().and_then(|row| {
                let timestamp = parse_timestamp(&row.timestamp, timezone)?;
                let attacks = parse_count(&row.attacks)?;
                Some(AttackSample::new(timestamp, attacks))
            });

            match sample {
                Some(sample) => history.samples.push(sample),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!("Dropped {} unreadable rows from {}", dropped, path.display());
        }

        let loaded = std::mem::take(&mut history.samples);
        history.merge(loaded);
        Ok(history)
    }

    /// Add samples, keeping the first sample seen for any timestamp.
    ///
    /// Existing samples therefore win over new ones with the same
    /// timestamp. The result is sorted by time.
    pub fn merge(&mut self, samples: impl IntoIterator<Item = AttackSample>) {
        let mut seen: HashSet<DateTime<Utc>> = HashSet::new();
        let mut merged = Vec::with_capacity(self.samples.len());

        let timezone = self.timezone;
        let existing = std::mem::take(&mut self.samples);
        for sample in existing.into_iter().chain(samples) {
            if seen.insert(sample.timestamp.with_timezone(&Utc)) {
                merged.push(AttackSample::new(
                    sample.timestamp.with_timezone(&timezone),
                    sample.attacks,
                ));
            }
        }

        merged.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        self.samples = merged;
    }

    /// Keep only samples strictly newer than `now - retention`
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) {
        let cutoff = i64::try_from(retention.as_secs())
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|window| now.checked_sub_signed(window));

        // A window reaching past the representable range keeps everything
        let Some(cutoff) = cutoff else {
            debug!("Retention {:?} covers all samples", retention);
            return;
        };

        let before = self.samples.len();
        self.samples.retain(|s| s.timestamp.with_timezone(&Utc) > cutoff);
        debug!("Pruned {} samples older than {}", before - self.samples.len(), cutoff);
    }

    /// Write the history, unless it is empty.
    ///
    /// Returns whether the file was written.
    pub fn save(&self, path: &Path) -> Result<bool> {
        if self.samples.is_empty() {
            return Ok(false);
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        for sample in &self.samples {
            writer.serialize(CsvRow {
                timestamp: sample.timestamp.to_rfc3339(),
                attacks: sample.attacks.to_string(),
            })?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| DashboardError::Io(e.into_error()))?;

        write_atomic(path, &bytes)?;
        Ok(true)
    }

    pub fn samples(&self) -> &[AttackSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Mean attack count over the right-closed window `(t - window, t]`
    /// ending at each sample.
    pub fn rolling_mean(&self, window: TimeDelta) -> Vec<f64> {
        let mut means = Vec::with_capacity(self.samples.len());
        let mut start = 0;
        let mut sum: u64 = 0;

        for (end, sample) in self.samples.iter().enumerate() {
            sum += sample.attacks;
            let lower = sample.timestamp - window;
            while self.samples[start].timestamp <= lower {
                sum -= self.samples[start].attacks;
                start += 1;
            }
            means.push(sum as f64 / (end - start + 1) as f64);
        }

        means
    }
}

/// Parse a stored timestamp, converting into `timezone`.
///
/// Offset-less values are taken as local time in `timezone`.
pub fn parse_timestamp(value: &str, timezone: Tz) -> Option<DateTime<Tz>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&timezone));
    }

    let offset_formats = ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%.f%:z"];
    for format in offset_formats {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&timezone));
        }
    }

    let naive_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in naive_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return timezone.from_local_datetime(&naive).earliest();
        }
    }

    None
}

fn parse_count(value: &str) -> Option<u64> {
    if let Ok(count) = value.parse::<u64>() {
        return Some(count);
    }
    // pandas writes "12.0" once a column has held a NaN
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Jersey;
    use tempfile::tempdir;

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        Jersey.with_ymd_and_hms(2025, 1, 15, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_merge_dedups_keeping_existing_and_sorts() {
        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![AttackSample::new(at(10, 5), 5), AttackSample::new(at(10, 0), 3)]);
        history.merge(vec![AttackSample::new(at(10, 5), 99), AttackSample::new(at(9, 55), 1)]);

        let counts: Vec<u64> = history.samples().iter().map(|s| s.attacks).collect();
        assert_eq!(counts, vec![1, 3, 5]);
    }

    #[test]
    fn test_merge_treats_equal_instants_in_other_zones_as_duplicates() {
        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![AttackSample::new(at(10, 0), 3)]);

        let same_instant = at(10, 0).with_timezone(&chrono_tz::America::New_York);
        history.merge(vec![AttackSample::new(same_instant.with_timezone(&Jersey), 7)]);

        assert_eq!(history.len(), 1);
        assert_eq!(history.samples()[0].attacks, 3);
    }

    #[test]
    fn test_prune_is_strict() {
        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![
            AttackSample::new(at(0, 0), 1),
            AttackSample::new(at(0, 1), 2),
            AttackSample::new(at(11, 0), 3),
        ]);

        history.prune(at(12, 0).with_timezone(&Utc), Duration::from_secs(12 * 3600));

        let counts: Vec<u64> = history.samples().iter().map(|s| s.attacks).collect();
        assert_eq!(counts, vec![2, 3]);
    }

    #[test]
    fn test_prune_with_huge_retention_keeps_everything() {
        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![AttackSample::new(at(0, 0), 1), AttackSample::new(at(11, 0), 3)]);

        history.prune(Utc::now(), Duration::from_secs(3_000_000_000 * 3600));
        assert_eq!(history.len(), 2);

        history.prune(Utc::now(), Duration::from_secs(u64::MAX));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_rolling_mean_right_closed_hour() {
        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![
            AttackSample::new(at(10, 0), 10),
            AttackSample::new(at(10, 30), 20),
            AttackSample::new(at(11, 0), 30),
            AttackSample::new(at(12, 30), 40),
        ]);

        let means = history.rolling_mean(TimeDelta::hours(1));

        // 11:00 excludes 10:00 because the window is open on the left
        assert_eq!(means, vec![10.0, 15.0, 25.0, 40.0]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Images").join("cyberattack_data.csv");

        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![AttackSample::new(at(10, 0), 4), AttackSample::new(at(10, 5), 6)]);
        assert!(history.save(&path).unwrap());

        let loaded = AttackHistory::load(&path, Jersey).unwrap();
        assert_eq!(loaded.samples(), history.samples());
    }

    #[test]
    fn test_empty_history_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "timestamp,attacks\n2025-01-15T10:00:00+00:00,4\n").unwrap();

        let written = AttackHistory::new(Jersey).save(&path).unwrap();

        assert!(!written);
        assert_eq!(AttackHistory::load(&path, Jersey).unwrap().len(), 1);
    }

    #[test]
    fn test_load_tolerates_missing_empty_and_bad_rows() {
        let dir = tempdir().unwrap();

        let missing = AttackHistory::load(&dir.path().join("nope.csv"), Jersey).unwrap();
        assert!(missing.is_empty());

        let empty_path = dir.path().join("empty.csv");
        std::fs::write(&empty_path, "").unwrap();
        assert!(AttackHistory::load(&empty_path, Jersey).unwrap().is_empty());

        let mixed_path = dir.path().join("mixed.csv");
        std::fs::write(
            &mixed_path,
            "timestamp,attacks\n\
             2025-01-15 10:00:00+00:00,4\n\
             garbage,5\n\
             2025-01-15 10:05:00,6.0\n\
             2025-01-15T10:10:00Z,x\n",
        )
        .unwrap();

        let mixed = AttackHistory::load(&mixed_path, Jersey).unwrap();
        let counts: Vec<u64> = mixed.samples().iter().map(|s| s.attacks).collect();
        assert_eq!(counts, vec![4, 6]);
    }

    #[test]
    fn test_parse_timestamp_localises_naive_values() {
        let parsed = parse_timestamp("2025-07-01 12:00:00", Jersey).unwrap();
        // Jersey observes BST in July
        assert_eq!(parsed.with_timezone(&Utc).format("%H:%M").to_string(), "11:00");
        assert!(parse_timestamp("yesterday", Jersey).is_none());
    }
}
