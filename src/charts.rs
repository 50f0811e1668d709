//! SVG charts for the history and breakdown pages

use crate::errors::{DashboardError, Result};
use crate::history::AttackHistory;
use crate::threatmap::Tally;
use chrono::{DateTime, TimeDelta, Utc};
use plotters::prelude::*;

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const BAR: RGBColor = RGBColor(68, 1, 84);

fn chart_err<E: std::fmt::Debug>(err: E) -> DashboardError {
    DashboardError::Chart(format!("{:?}", err))
}

/// Attacks and their one-hour rolling mean against hours before `now`
pub fn trend_points(history: &AttackHistory, now: DateTime<Utc>) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let means = history.rolling_mean(TimeDelta::hours(1));

    history
        .samples()
        .iter()
        .zip(means)
        .map(|(sample, mean)| {
            let offset = sample.timestamp.with_timezone(&Utc) - now;
            let hours = offset.num_seconds() as f64 / 3600.0;
            ((hours, sample.attacks as f64), (hours, mean))
        })
        .unzip()
}

/// Line chart of the last twelve hours of attacks
pub fn trend_chart(history: &AttackHistory, now: DateTime<Utc>) -> Result<String> {
    let (attacks, rolling) = trend_points(history, now);
    let max_y = attacks
        .iter()
        .map(|(_, y)| *y)
        .fold(1.0_f64, f64::max)
        * 1.1;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (1200, 700)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Real-time Cyberattack Trends", ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-12f64..0f64, 0f64..max_y)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .x_desc("Hours Ago")
            .y_desc("Number of Attacks")
            .x_labels(5)
            .x_label_formatter(&|x| match x.round() as i64 {
                -12 => "-12 Hours".to_string(),
                0 => "0 Hours".to_string(),
                h => h.to_string(),
            })
            .draw()
            .map_err(chart_err)?;

        chart
            .draw_series(LineSeries::new(attacks, &BLUE))
            .map_err(chart_err)?
            .label("Attacks")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

        chart
            .draw_series(LineSeries::new(rolling, &ORANGE))
            .map_err(chart_err)?
            .label("Rolling Average (1h)")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &ORANGE));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg)
}

/// Horizontal bar chart, largest tally on top
pub fn bar_chart(title: &str, value_label: &str, tallies: &[Tally]) -> Result<String> {
    let rows = tallies.len().max(1) as f64;
    let max_x = tallies.iter().map(|t| t.count).max().unwrap_or(1) as f64 * 1.25;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (1000, 600)).into_drawing_area();
        root.fill(&WHITE).map_err(chart_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(10)
            .build_cartesian_2d(0f64..max_x, 0f64..rows)
            .map_err(chart_err)?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc(value_label)
            .y_label_formatter(&|_| String::new())
            .draw()
            .map_err(chart_err)?;

        let top = rows - 1.0;
        chart
            .draw_series(tallies.iter().enumerate().map(|(i, tally)| {
                let y = top - i as f64;
                Rectangle::new([(0.0, y + 0.15), (tally.count as f64, y + 0.85)], BAR.filled())
            }))
            .map_err(chart_err)?;

        chart
            .draw_series(tallies.iter().enumerate().map(|(i, tally)| {
                let y = top - i as f64;
                Text::new(
                    format!("{} ({})", tally.label, tally.count),
                    (tally.count as f64, y + 0.6),
                    ("sans-serif", 14),
                )
            }))
            .map_err(chart_err)?;

        root.present().map_err(chart_err)?;
    }

    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::AttackSample;
    use chrono::TimeZone;
    use chrono_tz::Europe::Jersey;

    fn history() -> AttackHistory {
        let mut history = AttackHistory::new(Jersey);
        history.merge(vec![
            AttackSample::new(Jersey.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap(), 10),
            AttackSample::new(Jersey.with_ymd_and_hms(2025, 1, 15, 11, 0, 0).unwrap(), 30),
        ]);
        history
    }

    #[test]
    fn test_trend_points_are_hours_before_now() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let (attacks, rolling) = trend_points(&history(), now);

        assert_eq!(attacks, vec![(-2.0, 10.0), (-1.0, 30.0)]);
        assert_eq!(rolling, vec![(-2.0, 10.0), (-1.0, 30.0)]);
    }

    #[test]
    fn test_trend_chart_renders_svg() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let svg = trend_chart(&history(), now).unwrap();

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Real-time Cyberattack Trends"));
        assert!(svg.contains("Rolling Average (1h)"));
    }

    #[test]
    fn test_trend_chart_with_no_samples() {
        let svg = trend_chart(&AttackHistory::new(Jersey), Utc::now()).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_bar_chart_labels_each_tally() {
        let tallies = vec![
            Tally { label: "GB".to_string(), count: 5 },
            Tally { label: "FR".to_string(), count: 2 },
        ];

        let svg = bar_chart("Most Attacks Incoming by Country (Top 10)", "Number of Attacks", &tallies).unwrap();

        assert!(svg.contains("Most Attacks Incoming by Country (Top 10)"));
        assert!(svg.contains("GB (5)"));
        assert!(svg.contains("FR (2)"));
    }
}
