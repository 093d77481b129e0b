use chrono::{Local, TimeZone};
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use crate::history::SpeedPoint;
use crate::range::TimeRange;
use crate::units::format_speed;

pub fn draw_history(f: &mut Frame, area: Rect, points: &[SpeedPoint], range: TimeRange) {
    let block = Block::default()
        .title(format!("Speed history ({})", range.label()))
        .borders(Borders::ALL);

    // A line needs at least two points; below that, explain instead.
    if points.len() < 2 {
        let empty = Paragraph::new(
            "Not enough data to draw the chart yet.\nKeep `netpulse watch` running to collect speed samples.",
        )
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let (download, upload) = series(points);
    let x = x_bounds(points);
    let y = y_bounds(points);

    let datasets = vec![
        Dataset::default()
            .name("Download")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&download),
        Dataset::default()
            .name("Upload")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&upload),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x)
                .labels(x_labels(x, range)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y)
                .labels(y_labels(y)),
        );

    f.render_widget(chart, area);
}

fn series(points: &[SpeedPoint]) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
    let download = points
        .iter()
        .map(|p| (p.timestamp as f64, p.download))
        .collect();
    let upload = points
        .iter()
        .map(|p| (p.timestamp as f64, p.upload))
        .collect();
    (download, upload)
}

// Callers hand in range-filtered, ascending points, so the window is just
// first to last. Equal endpoints are widened so the axis never collapses.
fn x_bounds(points: &[SpeedPoint]) -> [f64; 2] {
    let first = points.first().map(|p| p.timestamp).unwrap_or(0);
    let last = points.last().map(|p| p.timestamp).unwrap_or(0);
    if first == last {
        [first as f64 - 1.0, last as f64 + 1.0]
    } else {
        [first as f64, last as f64]
    }
}

fn y_bounds(points: &[SpeedPoint]) -> [f64; 2] {
    let peak = points
        .iter()
        .map(|p| p.download.max(p.upload))
        .fold(0.0_f64, f64::max);
    [0.0, (peak * 1.1).max(1.0)]
}

fn x_labels(bounds: [f64; 2], range: TimeRange) -> Vec<Span<'static>> {
    let mid = (bounds[0] + bounds[1]) / 2.0;
    [bounds[0], mid, bounds[1]]
        .iter()
        .map(|ms| Span::raw(time_label(*ms as i64, range)))
        .collect()
}

fn y_labels(bounds: [f64; 2]) -> Vec<Span<'static>> {
    [bounds[0], bounds[1] / 2.0, bounds[1]]
        .iter()
        .map(|bps| Span::raw(format_speed(*bps)))
        .collect()
}

// Hours and minutes inside a day, month and day across a week.
fn time_label(epoch_ms: i64, range: TimeRange) -> String {
    let pattern = match range {
        TimeRange::Last24h => "%H:%M",
        TimeRange::Last7d => "%b %-d",
    };
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(when) => when.format(pattern).to_string(),
        None => "?".to_string(),
    }
}
