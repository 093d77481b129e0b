use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Sparkline, Tabs},
    Frame, Terminal,
};

use crate::history::{HistoryStore, SpeedPoint};
use crate::metrics::RateSmoother;
use crate::range::{filter_recent, TimeRange};
use crate::sampler::SpeedSample;
use crate::state::Subscription;
use crate::ui::chart;
use crate::units::format_speed;

const EVENT_BACKLOG: usize = 100;
// One minute of sparkline at the default sampling interval.
const RECENT_SAMPLES: usize = 60;
const HISTORY_REFRESH: Duration = Duration::from_secs(300);

struct LiveState {
    down_recent: Vec<u64>,
    up_recent: Vec<u64>,
    down_avg: RateSmoother,
    up_avg: RateSmoother,
    last_sample_at: Option<Instant>,
}

impl LiveState {
    fn new() -> Self {
        Self {
            down_recent: Vec::new(),
            up_recent: Vec::new(),
            down_avg: RateSmoother::new(5.0),
            up_avg: RateSmoother::new(5.0),
            last_sample_at: None,
        }
    }

    fn push(&mut self, sample: SpeedSample) {
        let now = Instant::now();
        let dt = self
            .last_sample_at
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or(1.0);
        self.last_sample_at = Some(now);

        self.down_avg.update(sample.download_bps, dt);
        self.up_avg.update(sample.upload_bps, dt);

        // Sparklines plot the raw samples; smoothing is only for the big
        // readout.
        self.down_recent.push(sample.download_bps.max(0.0) as u64);
        self.up_recent.push(sample.upload_bps.max(0.0) as u64);
        if self.down_recent.len() > RECENT_SAMPLES {
            self.down_recent.remove(0);
        }
        if self.up_recent.len() > RECENT_SAMPLES {
            self.up_recent.remove(0);
        }
    }

    fn peak_down(&self) -> u64 {
        self.down_recent.iter().copied().max().unwrap_or(0)
    }

    fn peak_up(&self) -> u64 {
        self.up_recent.iter().copied().max().unwrap_or(0)
    }
}

struct HistoryView {
    store: HistoryStore,
    range: TimeRange,
    full: Vec<SpeedPoint>,
    shown: Vec<SpeedPoint>,
    fetched_at: Option<Instant>,
    load_error: Option<String>,
}

impl HistoryView {
    fn new(store: HistoryStore) -> Self {
        Self {
            store,
            range: TimeRange::Last24h,
            full: Vec::new(),
            shown: Vec::new(),
            fetched_at: None,
            load_error: None,
        }
    }

    fn reload(&mut self) {
        match self.store.load() {
            Ok(points) => {
                self.full = points;
                self.load_error = None;
            }
            Err(err) => {
                self.full.clear();
                self.load_error = Some(err.to_string());
            }
        }
        self.fetched_at = Some(Instant::now());
        self.apply_filter();
    }

    fn refresh_if_stale(&mut self) {
        let stale = self
            .fetched_at
            .map_or(true, |at| at.elapsed() >= HISTORY_REFRESH);
        if stale {
            self.reload();
        }
    }

    fn set_range(&mut self, range: TimeRange) {
        if range != self.range {
            self.range = range;
            self.apply_filter();
        }
    }

    fn apply_filter(&mut self) {
        self.shown = filter_recent(&self.full, self.range);
    }
}

pub fn run_dashboard(
    samples: Subscription,
    store: HistoryStore,
    events: Receiver<String>,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut logs: Vec<String> = Vec::new();
    let mut log_scroll: usize = 0;
    let mut active_tab: usize = 0; // 0: Live, 1: History
    let mut live = LiveState::new();
    let mut history = HistoryView::new(store);

    while !stop.load(Ordering::Relaxed) {
        while let Ok(ev) = events.try_recv() {
            logs.push(ev);
            if logs.len() > EVENT_BACKLOG {
                logs.remove(0);
            }
        }

        while let Ok(sample) = samples.try_recv() {
            live.push(sample);
        }

        if active_tab == 1 {
            history.refresh_if_stale();
        }

        terminal.draw(|f| {
            // Top-level: header tabs, main, footer
            let outer = Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(1), // Tabs header
                        Constraint::Min(0),    // Main
                        Constraint::Length(1), // Footer
                    ]
                    .as_ref(),
                )
                .split(f.size());

            let titles = ["Live", "History"].iter().map(|t| (*t).to_string());
            let tabs = Tabs::new(titles).select(active_tab);
            f.render_widget(tabs, outer[0]);

            if active_tab == 0 {
                draw_live(f, outer[1], &live, &logs, log_scroll);
            } else {
                draw_history_tab(f, outer[1], &history);
            }

            // Sticky footer with keybinds
            let footer = if active_tab == 0 {
                Paragraph::new("Tab: history | q: quit | ↑/↓/Home: scroll events | c: clear events")
            } else {
                Paragraph::new(format!(
                    "Tab: live | q: quit | t: switch to {} | r: reload",
                    history.range.toggled().label()
                ))
            };
            f.render_widget(footer, outer[2]);
        })?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q')
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    stop.store(true, Ordering::Relaxed);
                } else if key.code == KeyCode::Tab {
                    active_tab = (active_tab + 1) % 2;
                    if active_tab == 1 {
                        history.refresh_if_stale();
                    }
                } else if active_tab == 0 {
                    match key.code {
                        KeyCode::Up => {
                            log_scroll = log_scroll.saturating_add(1);
                        }
                        KeyCode::Down => {
                            log_scroll = log_scroll.saturating_sub(1);
                        }
                        KeyCode::Home => {
                            log_scroll = 0;
                        }
                        KeyCode::Char('c') => {
                            logs.clear();
                            log_scroll = 0;
                        }
                        _ => {}
                    }
                } else {
                    match key.code {
                        KeyCode::Char('t') => {
                            history.set_range(history.range.toggled());
                        }
                        KeyCode::Char('r') => {
                            history.reload();
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn draw_live(f: &mut Frame, area: Rect, live: &LiveState, logs: &[String], log_scroll: usize) {
    let sub = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4), // Current speed
                Constraint::Length(4), // Download sparkline
                Constraint::Length(4), // Upload sparkline
                Constraint::Min(0),    // Events
            ]
            .as_ref(),
        )
        .split(area);

    let current = Paragraph::new(format!(
        "Download: {}\nUpload:   {}",
        format_speed(live.down_avg.value()),
        format_speed(live.up_avg.value()),
    ))
    .block(Block::default().title("Current speed").borders(Borders::ALL));
    f.render_widget(current, sub[0]);

    // Sparklines draw from the front of the slice, so hand them the tail to
    // keep the newest samples on screen.
    let inner = area.width.saturating_sub(2) as usize;

    let down_title = format!("Download (peak {})", format_speed(live.peak_down() as f64));
    let down = Sparkline::default()
        .block(Block::default().title(down_title).borders(Borders::ALL))
        .style(Style::default().fg(Color::Blue))
        .data(tail(&live.down_recent, inner));
    f.render_widget(down, sub[1]);

    let up_title = format!("Upload (peak {})", format_speed(live.peak_up() as f64));
    let up = Sparkline::default()
        .block(Block::default().title(up_title).borders(Borders::ALL))
        .style(Style::default().fg(Color::Green))
        .data(tail(&live.up_recent, inner));
    f.render_widget(up, sub[2]);

    let viewport = sub[3].height.saturating_sub(2) as usize;
    let start = logs.len().saturating_sub(viewport + log_scroll);
    let log_items: Vec<ListItem> = logs
        .iter()
        .skip(start)
        .map(|l| ListItem::new(l.clone()))
        .collect();
    let log_list = List::new(log_items).block(Block::default().title("Events").borders(Borders::ALL));
    f.render_widget(log_list, sub[3]);
}

fn tail(data: &[u64], n: usize) -> &[u64] {
    &data[data.len().saturating_sub(n)..]
}

fn draw_history_tab(f: &mut Frame, area: Rect, history: &HistoryView) {
    let sub = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)].as_ref())
        .split(area);

    let status = match &history.load_error {
        Some(err) => format!("range: {} | load failed: {err}", history.range.label()),
        None => format!(
            "range: {} | {} points",
            history.range.label(),
            history.shown.len()
        ),
    };
    f.render_widget(Paragraph::new(status), sub[0]);

    chart::draw_history(f, sub[1], &history.shown, history.range);
}
