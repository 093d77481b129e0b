use std::collections::VecDeque;

use crate::counters::{ByteCounters, CounterSource};

/// Scripted source: returns the queued readings in order, then reads as
/// unsupported once the script runs out.
pub struct MockCounters {
    readings: VecDeque<Option<ByteCounters>>,
}

impl MockCounters {
    pub fn new(readings: Vec<Option<ByteCounters>>) -> Self {
        Self {
            readings: readings.into(),
        }
    }
}

impl CounterSource for MockCounters {
    fn read(&mut self) -> Option<ByteCounters> {
        self.readings.pop_front().flatten()
    }
}

/// Endless source with constant traffic: rx grows by `step` per read, tx by
/// half that.
pub struct RampCounters {
    next: ByteCounters,
    step: u64,
}

impl RampCounters {
    pub fn new(step: u64) -> Self {
        Self {
            next: ByteCounters {
                rx_total: 0,
                tx_total: 0,
            },
            step,
        }
    }
}

impl CounterSource for RampCounters {
    fn read(&mut self) -> Option<ByteCounters> {
        let current = self.next;
        self.next = ByteCounters {
            rx_total: current.rx_total + self.step,
            tx_total: current.tx_total + self.step / 2,
        };
        Some(current)
    }
}

/// Endless source that never moves, for exercising idle handling.
pub struct FlatCounters;

impl CounterSource for FlatCounters {
    fn read(&mut self) -> Option<ByteCounters> {
        Some(ByteCounters {
            rx_total: 1_000_000,
            tx_total: 500_000,
        })
    }
}
