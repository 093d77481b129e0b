use sysinfo::Networks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCounters {
    pub rx_total: u64,
    pub tx_total: u64,
}

pub trait CounterSource: Send {
    /// Cumulative byte totals since boot, or `None` when the platform
    /// cannot report them for this tick.
    fn read(&mut self) -> Option<ByteCounters>;
}

pub struct SysinfoCounters {
    networks: Networks,
}

impl SysinfoCounters {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl CounterSource for SysinfoCounters {
    fn read(&mut self) -> Option<ByteCounters> {
        self.networks.refresh();

        let mut seen = false;
        let mut totals = ByteCounters {
            rx_total: 0,
            tx_total: 0,
        };
        for (_interface_name, network) in &self.networks {
            seen = true;
            totals.rx_total += network.total_received();
            totals.tx_total += network.total_transmitted();
        }

        if seen {
            Some(totals)
        } else {
            None
        }
    }
}
