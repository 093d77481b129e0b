use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel as channel;
use tracing::{info, warn};

use crate::cli::Watch;
use crate::counters::{CounterSource, SysinfoCounters};
use crate::history::HistoryStore;
use crate::sampler::{Sampler, SpeedSample};
use crate::state::Subscription;
use crate::ui::dashboard::run_dashboard;
use crate::units::format_speed;

const PUMP_TIMEOUT: Duration = Duration::from_millis(200);
const REPORT_INTERVAL: Duration = Duration::from_secs(5);

pub fn run_watch(watch: Watch) -> Result<()> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop = stop_flag.clone();
        let _ = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        });
    }

    run_watch_with_shutdown(watch, Box::new(SysinfoCounters::new()), stop_flag)
}

pub(crate) fn run_watch_with_shutdown(
    watch: Watch,
    source: Box<dyn CounterSource>,
    stop_flag: Arc<AtomicBool>,
) -> Result<()> {
    let interval = Duration::from_millis(watch.interval_ms.max(1));
    let save_interval = Duration::from_secs(watch.save_interval_secs.max(1));
    let retention = Duration::from_secs(watch.retention_days * 24 * 60 * 60);
    let store = HistoryStore::new(&watch.data_file, retention);

    info!(
        data_file = %store.path().display(),
        interval_ms = watch.interval_ms,
        save_interval_secs = watch.save_interval_secs,
        retention_days = watch.retention_days,
        "Starting netpulse"
    );

    let mut sampler = Sampler::spawn(source, interval);

    let (event_tx, event_rx) = channel::unbounded::<String>();
    let _ = event_tx.send(format!(
        "Recording to {} every {}s",
        store.path().display(),
        watch.save_interval_secs.max(1)
    ));

    // Recorder thread: latest sample -> history file, on its own clock
    let recorder = {
        let samples = sampler.subscribe();
        let store = store.clone();
        let events = event_tx.clone();
        let stop = stop_flag.clone();
        let record_idle = watch.record_idle;
        thread::spawn(move || {
            recorder_loop(samples, store, save_interval, record_idle, events, stop);
        })
    };

    let ui_result = if watch.no_tui {
        drop(event_rx);
        headless_loop(sampler.subscribe(), &stop_flag);
        Ok(())
    } else {
        run_dashboard(sampler.subscribe(), store.clone(), event_rx, stop_flag.clone())
    };

    // Shutdown
    info!("Shutting down");
    stop_flag.store(true, Ordering::Relaxed);
    sampler.stop();
    let _ = recorder.join();

    ui_result
}

fn recorder_loop(
    samples: Subscription,
    store: HistoryStore,
    save_interval: Duration,
    record_idle: bool,
    events: channel::Sender<String>,
    stop: Arc<AtomicBool>,
) {
    let mut last_seen: Option<SpeedSample> = None;
    let mut next_save = Instant::now() + save_interval;

    while !stop.load(Ordering::Relaxed) {
        match samples.recv_timeout(PUMP_TIMEOUT) {
            Ok(sample) => last_seen = Some(sample),
            Err(channel::RecvTimeoutError::Timeout) => {}
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }

        if Instant::now() < next_save {
            continue;
        }
        next_save = Instant::now() + save_interval;

        let sample = match last_seen {
            Some(sample) => sample,
            // No tick landed yet; try again next deadline.
            None => continue,
        };

        if sample.is_idle() && !record_idle {
            continue;
        }

        match store.record(sample.download_bps, sample.upload_bps) {
            Ok(total) => {
                let _ = events.send(format!(
                    "Recorded {} down / {} up ({total} points stored)",
                    format_speed(sample.download_bps),
                    format_speed(sample.upload_bps)
                ));
            }
            Err(err) => {
                // Persistence is best effort; sampling carries on.
                warn!(error = %err, "History write failed");
                let _ = events.send(format!("History write failed: {err}"));
            }
        }
    }
}

fn headless_loop(samples: Subscription, stop: &AtomicBool) {
    let mut latest: Option<SpeedSample> = None;
    let mut next_report = Instant::now() + REPORT_INTERVAL;

    while !stop.load(Ordering::Relaxed) {
        match samples.recv_timeout(PUMP_TIMEOUT) {
            Ok(sample) => latest = Some(sample),
            Err(channel::RecvTimeoutError::Timeout) => {}
            Err(channel::RecvTimeoutError::Disconnected) => break,
        }

        if Instant::now() >= next_report {
            next_report = Instant::now() + REPORT_INTERVAL;
            if let Some(sample) = latest {
                info!(
                    download_bps = sample.download_bps as u64,
                    upload_bps = sample.upload_bps as u64,
                    "Throughput"
                );
            }
        }
    }

    samples.detach();
}
