//! Status records produced by the down detector on every polling cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tri-state of a polled service
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunState {
    #[serde(rename = "Running")]
    Running,
    #[serde(rename = "Not Running")]
    NotRunning,
    #[serde(rename = "Service Restored")]
    ServiceRestored,
}

impl RunState {
    pub fn label(&self) -> &'static str {
        match self {
            RunState::Running => "Running",
            RunState::NotRunning => "Not Running",
            RunState::ServiceRestored => "Service Restored",
        }
    }

    /// Running when the predicate holds, Not Running otherwise
    pub fn running_if(up: bool) -> Self {
        if up { RunState::Running } else { RunState::NotRunning }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Websites,
    Microsoft,
    Fortinet,
    Snowflake,
    Aws,
    Azure,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusRecord {
    pub service: String,
    pub status: RunState,
    pub message: String,
    pub category: Category,
}

impl StatusRecord {
    pub fn new(
        service: impl Into<String>,
        status: RunState,
        message: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            service: service.into(),
            status,
            message: message.into(),
            category,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunState::Running
    }
}

/// Collapse many records into one summary card.
///
/// Every `Not Running` record is listed by name, one per line, after
/// `down_heading`. Restored services count as up.
pub fn summarize(
    service: &str,
    records: &[StatusRecord],
    category: Category,
    down_heading: &str,
    all_up_message: &str,
) -> StatusRecord {
    let down: Vec<&str> = records
        .iter()
        .filter(|r| r.status == RunState::NotRunning)
        .map(|r| r.service.as_str())
        .collect();

    if down.is_empty() {
        StatusRecord::new(service, RunState::Running, all_up_message, category)
    } else {
        let message = format!("{}\n{}", down_heading, down.join("\n"));
        StatusRecord::new(service, RunState::NotRunning, message, category)
    }
}

/// One section of the rendered report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub records: Vec<StatusRecord>,
}

/// Everything the down detector found in one cycle
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportSection>,
}

impl StatusReport {
    /// Build a report with sections in display order: websites, Microsoft,
    /// Fortinet, Snowflake.
    pub fn new(
        websites: Vec<StatusRecord>,
        microsoft: Vec<StatusRecord>,
        fortinet: Vec<StatusRecord>,
        snowflake: Vec<StatusRecord>,
    ) -> Self {
        let sections = [
            ("Websites", websites),
            ("Microsoft", microsoft),
            ("Fortinet", fortinet),
            ("Snowflake", snowflake),
        ]
        .into_iter()
        .map(|(title, records)| ReportSection {
            title: title.to_string(),
            records,
        })
        .collect();

        Self {
            generated_at: Utc::now(),
            sections,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &StatusRecord> {
        self.sections.iter().flat_map(|s| s.records.iter())
    }

    pub fn down_count(&self) -> usize {
        self.records()
            .filter(|r| r.status == RunState::NotRunning)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_labels_serialize() {
        assert_eq!(
            serde_json::to_string(&RunState::NotRunning).unwrap(),
            "\"Not Running\""
        );
        assert_eq!(RunState::ServiceRestored.to_string(), "Service Restored");
        assert_eq!(
            serde_json::to_string(&Category::Websites).unwrap(),
            "\"websites\""
        );
    }

    #[test]
    fn test_summarize_lists_down_services() {
        let records = vec![
            StatusRecord::new("a", RunState::Running, "ok", Category::Fortinet),
            StatusRecord::new("b", RunState::NotRunning, "down", Category::Fortinet),
            StatusRecord::new("c", RunState::NotRunning, "down", Category::Fortinet),
        ];

        let summary = summarize(
            "Fortinet Services",
            &records,
            Category::Fortinet,
            "Down:",
            "All good",
        );

        assert_eq!(summary.status, RunState::NotRunning);
        assert_eq!(summary.message, "Down:\nb\nc");
    }

    #[test]
    fn test_summarize_all_running() {
        let records = vec![StatusRecord::new(
            "a",
            RunState::ServiceRestored,
            "restored",
            Category::Microsoft,
        )];

        let summary = summarize("X", &records, Category::Microsoft, "Down:", "All good");
        assert!(summary.is_running());
        assert_eq!(summary.message, "All good");
    }

    #[test]
    fn test_report_section_order_and_counts() {
        let report = StatusReport::new(
            vec![StatusRecord::new("w", RunState::NotRunning, "e", Category::Websites)],
            vec![],
            vec![StatusRecord::new("f", RunState::Running, "ok", Category::Fortinet)],
            vec![],
        );

        let titles: Vec<&str> = report.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Websites", "Microsoft", "Fortinet", "Snowflake"]);
        assert_eq!(report.records().count(), 2);
        assert_eq!(report.down_count(), 1);
    }
}
