//! HTML fragments served by the front end

use crate::config::FeedSource;
use crate::errors::Result;
use crate::history::AttackSample;
use crate::jobs::news::NewsArticle;
use crate::status::{RunState, StatusReport, StatusRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

const TEMPLATES: [(&str, &str); 6] = [
    ("status_report.html", include_str!("../templates/status_report.html")),
    ("news.html", include_str!("../templates/news.html")),
    ("history.html", include_str!("../templates/history.html")),
    ("breakdown.html", include_str!("../templates/breakdown.html")),
    ("dashboard.html", include_str!("../templates/dashboard.html")),
    ("redirect_tool.html", include_str!("../templates/redirect_tool.html")),
];

#[derive(Serialize)]
struct Card<'a> {
    service: &'a str,
    status: &'static str,
    lines: Vec<&'a str>,
    tone: &'static str,
}

impl<'a> From<&'a StatusRecord> for Card<'a> {
    fn from(record: &'a StatusRecord) -> Self {
        let tone = match record.status {
            RunState::Running => "bg-green-100 border-green-500",
            RunState::ServiceRestored => "bg-orange-100 border-orange-500",
            RunState::NotRunning => "bg-red-100 border-red-500",
        };

        Self {
            service: &record.service,
            status: record.status.label(),
            lines: record.message.lines().collect(),
            tone,
        }
    }
}

#[derive(Serialize)]
struct Section<'a> {
    title: &'a str,
    cards: Vec<Card<'a>>,
}

/// A chart image shown on a page
#[derive(Debug, Clone, Serialize)]
pub struct ChartLink {
    pub file: String,
    pub title: String,
}

#[derive(Serialize)]
struct Frame {
    title: String,
    src: String,
}

/// Renders every page from templates compiled into the binary
#[derive(Debug, Clone)]
pub struct Renderer {
    tera: Tera,
    tailwind_url: String,
}

impl Renderer {
    pub fn new(tailwind_url: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())?;
        tera.autoescape_on(vec![".html"]);

        Ok(Self {
            tera,
            tailwind_url: tailwind_url.to_string(),
        })
    }

    fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("tailwind_url", &self.tailwind_url);
        context
    }

    /// Down detector cards, one section per source family
    pub fn status_report(&self, report: &StatusReport) -> Result<String> {
        let sections: Vec<Section> = report
            .sections
            .iter()
            .map(|section| Section {
                title: &section.title,
                cards: section.records.iter().map(Card::from).collect(),
            })
            .collect();

        let mut context = self.context();
        context.insert("sections", &sections);
        context.insert("down_count", &report.down_count());
        context.insert("generated_at", &display_time(report.generated_at));
        Ok(self.tera.render("status_report.html", &context)?)
    }

    pub fn news_page(&self, title: &str, articles: &[NewsArticle]) -> Result<String> {
        let mut context = self.context();
        context.insert("title", title);
        context.insert("articles", articles);
        Ok(self.tera.render("news.html", &context)?)
    }

    pub fn history_page(
        &self,
        latest: Option<&AttackSample>,
        sample_count: usize,
        chart: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<String> {
        let latest = latest.map(|sample| {
            serde_json::json!({
                "timestamp": sample.timestamp.format("%Y-%m-%d %H:%M %Z").to_string(),
                "attacks": sample.attacks,
            })
        });

        let mut context = self.context();
        context.insert("latest", &latest);
        context.insert("sample_count", &sample_count);
        context.insert("chart", chart);
        context.insert("stamp", &generated_at.timestamp());
        Ok(self.tera.render("history.html", &context)?)
    }

    pub fn breakdown_page(
        &self,
        total: u64,
        charts: &[ChartLink],
        generated_at: DateTime<Utc>,
    ) -> Result<String> {
        let mut context = self.context();
        context.insert("total", &total);
        context.insert("charts", charts);
        context.insert("generated_at", &display_time(generated_at));
        context.insert("stamp", &generated_at.timestamp());
        Ok(self.tera.render("breakdown.html", &context)?)
    }

    /// Landing page embedding every fragment
    pub fn dashboard(&self, feeds: &[FeedSource]) -> Result<String> {
        let mut frames = vec![
            Frame {
                title: "Down Detector".to_string(),
                src: "/DownDetector/Down_Detector_Test.html".to_string(),
            },
            Frame {
                title: "Threat Breakdown".to_string(),
                src: "/FortinetScraper/Attempt3/Scraper.html".to_string(),
            },
            Frame {
                title: "Attack History".to_string(),
                src: "/History/History.html".to_string(),
            },
        ];
        frames.extend(feeds.iter().map(|feed| Frame {
            title: feed.title.clone(),
            src: format!("/NewNews/{}", feed.filename),
        }));

        let mut context = self.context();
        context.insert("frames", &frames);
        Ok(self.tera.render("dashboard.html", &context)?)
    }

    pub fn redirect_tool(&self, error: Option<&str>) -> Result<String> {
        let mut context = self.context();
        context.insert("error", &error);
        Ok(self.tera.render("redirect_tool.html", &context)?)
    }
}

fn display_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Replace `path` with `bytes` via a temporary sibling and a rename, so
/// readers never see a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Category;
    use tempfile::tempdir;

    fn renderer() -> Renderer {
        Renderer::new("https://cdn.example/tailwind.js").unwrap()
    }

    #[test]
    fn test_status_report_cards() {
        let report = StatusReport::new(
            vec![StatusRecord::new(
                "https://a.example",
                RunState::Running,
                "Status Code: 200",
                Category::Websites,
            )],
            vec![StatusRecord::new(
                "Outlook.com",
                RunState::ServiceRestored,
                "Fixed",
                Category::Microsoft,
            )],
            vec![StatusRecord::new(
                "Fortinet Services",
                RunState::NotRunning,
                "Down:\n<b>Anycast</b>",
                Category::Fortinet,
            )],
            vec![],
        );

        let html = renderer().status_report(&report).unwrap();

        assert!(html.contains("https://cdn.example/tailwind.js"));
        assert!(html.contains("bg-green-100"));
        assert!(html.contains("bg-orange-100"));
        assert!(html.contains("bg-red-100"));
        assert!(html.contains("Service Restored"));
        assert!(html.contains("Down:<br>&lt;b&gt;Anycast&lt;&#x2F;b&gt;"));
    }

    #[test]
    fn test_news_page_strips_summary_markup() {
        let articles = vec![NewsArticle {
            title: "Patch now".to_string(),
            link: "https://news.example/1".to_string(),
            published: "January 15, 2025".to_string(),
            summary: "<p>Critical <em>flaw</em></p>".to_string(),
        }];

        let html = renderer().news_page("Wired Security", &articles).unwrap();

        assert!(html.contains("Latest News from Wired Security"));
        assert!(html.contains("Critical flaw"));
        assert!(!html.contains("<em>"));
        assert!(html.contains("January 15, 2025"));
    }

    #[test]
    fn test_dashboard_embeds_feeds() {
        let html = renderer()
            .dashboard(&[FeedSource {
                url: "https://feed.example/rss".to_string(),
                filename: "Feed.html".to_string(),
                title: "Feed".to_string(),
            }])
            .unwrap();

        assert!(html.contains("/DownDetector/Down_Detector_Test.html"));
        assert!(html.contains("/NewNews/Feed.html"));
    }

    #[test]
    fn test_redirect_tool_error() {
        let html = renderer().redirect_tool(Some("Please enter a URL.")).unwrap();
        assert!(html.contains("Please enter a URL."));
        assert!(!renderer().redirect_tool(None).unwrap().contains("text-red-600"));
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("History").join("History.html");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let names: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(names.len(), 1);
    }
}
