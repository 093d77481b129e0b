use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::counters::{ByteCounters, CounterSource};
use crate::state::{Subscribers, Subscription};

// Samples queued per subscriber before broadcast starts skipping it; about a
// minute of backlog at the default one-second interval.
const SUBSCRIBER_QUEUE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSample {
    pub download_bps: f64,
    pub upload_bps: f64,
}

impl SpeedSample {
    pub fn is_idle(&self) -> bool {
        self.download_bps == 0.0 && self.upload_bps == 0.0
    }
}

// Per-tick rate from two cumulative readings. A counter that went backwards
// (interface reset, counter wrap) clamps to zero instead of going negative.
fn rate_between(prev: ByteCounters, current: ByteCounters, interval: Duration) -> SpeedSample {
    let secs = interval.as_secs_f64();
    SpeedSample {
        download_bps: current.rx_total.saturating_sub(prev.rx_total) as f64 / secs,
        upload_bps: current.tx_total.saturating_sub(prev.tx_total) as f64 / secs,
    }
}

/// Reads a [`CounterSource`] on a fixed delay and broadcasts one
/// [`SpeedSample`] per successful tick. Stops on [`Sampler::stop`] or drop.
pub struct Sampler {
    subscribers: Arc<Subscribers>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    pub fn spawn(mut source: Box<dyn CounterSource>, interval: Duration) -> Self {
        let subscribers = Arc::new(Subscribers::new());
        let stop = Arc::new(AtomicBool::new(false));

        let subs = Arc::clone(&subscribers);
        let stop_tick = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            // Baseline before the first tick; stays None until the source
            // reports, so the first published sample always spans one interval.
            let mut baseline = source.read();

            loop {
                sleep_interval(interval, &stop_tick);
                if stop_tick.load(Ordering::Relaxed) {
                    break;
                }

                let current = match source.read() {
                    Some(current) => current,
                    None => {
                        // Unsupported tick: publish nothing, keep the old
                        // baseline so the next delta spans the gap.
                        debug!("Byte counters unavailable, skipping tick");
                        continue;
                    }
                };

                if let Some(prev) = baseline {
                    subs.broadcast(rate_between(prev, current, interval));
                }
                baseline = Some(current);
            }
        });

        Self {
            subscribers,
            stop,
            handle: Some(handle),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription::register(Arc::clone(&self.subscribers), SUBSCRIBER_QUEUE)
    }

    /// Stops the tick thread and disconnects every subscriber. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.subscribers.dispose();
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.stop();
    }
}

// Fixed-delay scheduling: a full interval after each tick, slept in small
// chunks so stop() takes effect quickly.
fn sleep_interval(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCounters, RampCounters};
    use crossbeam_channel as channel;

    fn counters(rx_total: u64, tx_total: u64) -> ByteCounters {
        ByteCounters { rx_total, tx_total }
    }

    #[test]
    fn rate_is_the_counter_delta_over_one_second() {
        let prev = counters(1000, 500);
        let current = counters(1500, 800);
        let sample = rate_between(prev, current, Duration::from_secs(1));
        assert_eq!(sample.download_bps, 500.0);
        assert_eq!(sample.upload_bps, 300.0);
    }

    #[test]
    fn counter_going_backwards_clamps_to_zero() {
        let prev = counters(1000, 500);
        let current = counters(900, 500);
        let sample = rate_between(prev, current, Duration::from_secs(1));
        assert_eq!(sample.download_bps, 0.0);
        assert_eq!(sample.upload_bps, 0.0);
    }

    #[test]
    fn sub_second_interval_scales_to_bytes_per_second() {
        let prev = counters(0, 0);
        let current = counters(500, 100);
        let sample = rate_between(prev, current, Duration::from_millis(500));
        assert!((sample.download_bps - 1000.0).abs() < 1e-6);
        assert!((sample.upload_bps - 200.0).abs() < 1e-6);
    }

    #[test]
    fn idle_means_both_directions_zero() {
        assert!(SpeedSample {
            download_bps: 0.0,
            upload_bps: 0.0
        }
        .is_idle());
        assert!(!SpeedSample {
            download_bps: 0.0,
            upload_bps: 1.0
        }
        .is_idle());
    }

    #[test]
    fn sampler_publishes_deltas_and_bridges_unsupported_ticks() {
        // First reading seeds the baseline; the None tick publishes nothing
        // and the following delta spans the gap. The interval leaves room to
        // subscribe before the first tick fires.
        let source = MockCounters::new(vec![
            Some(counters(0, 0)),
            Some(counters(100, 10)),
            None,
            Some(counters(300, 30)),
        ]);
        let interval = Duration::from_millis(25);
        let mut sampler = Sampler::spawn(Box::new(source), interval);
        let sub = sampler.subscribe();

        let first = sub.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = sub.recv_timeout(Duration::from_secs(2)).unwrap();
        sampler.stop();

        // Deltas of 100 and 200 bytes over the same interval
        assert!((second.download_bps / first.download_bps - 2.0).abs() < 1e-9);
        assert!((second.upload_bps / first.upload_bps - 2.0).abs() < 1e-9);
        assert!((first.download_bps - 4_000.0).abs() < 1e-3);
    }

    #[test]
    fn stop_disconnects_subscribers_and_is_idempotent() {
        let mut sampler = Sampler::spawn(Box::new(RampCounters::new(1000)), Duration::from_millis(5));
        let sub = sampler.subscribe();

        sampler.stop();
        sampler.stop();

        // Drain whatever was queued; after that the channel reports closed.
        loop {
            match sub.try_recv() {
                Ok(_) => continue,
                Err(channel::TryRecvError::Disconnected) => break,
                Err(channel::TryRecvError::Empty) => panic!("subscriber still connected"),
            }
        }
    }

    #[test]
    fn dropping_the_sampler_stops_the_tick_thread() {
        let sampler = Sampler::spawn(Box::new(RampCounters::new(1)), Duration::from_millis(5));
        let sub = sampler.subscribe();
        drop(sampler);

        // The registry was disposed, so the subscription reads as closed once
        // drained.
        loop {
            match sub.try_recv() {
                Ok(_) => continue,
                Err(channel::TryRecvError::Disconnected) => break,
                Err(channel::TryRecvError::Empty) => panic!("subscriber still connected"),
            }
        }
    }
}
