use crate::history::{now_millis, SpeedPoint};

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Last24h,
    Last7d,
}

impl TimeRange {
    pub fn window_ms(self) -> i64 {
        match self {
            TimeRange::Last24h => 24 * HOUR_MS,
            TimeRange::Last7d => 7 * 24 * HOUR_MS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::Last24h => "24h",
            TimeRange::Last7d => "7d",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TimeRange::Last24h => TimeRange::Last7d,
            TimeRange::Last7d => TimeRange::Last24h,
        }
    }
}

pub fn filter_recent(points: &[SpeedPoint], range: TimeRange) -> Vec<SpeedPoint> {
    filter_range(points, range, now_millis())
}

// Pure so tests can pin the clock. Store order is not trusted; the result is
// re-sorted by timestamp.
pub(crate) fn filter_range(points: &[SpeedPoint], range: TimeRange, now_ms: i64) -> Vec<SpeedPoint> {
    let cutoff = now_ms - range.window_ms();
    let mut shown: Vec<SpeedPoint> = points
        .iter()
        .copied()
        .filter(|p| p.timestamp >= cutoff)
        .collect();
    shown.sort_by_key(|p| p.timestamp);
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(timestamp: i64, download: f64) -> SpeedPoint {
        SpeedPoint {
            timestamp,
            download,
            upload: 0.0,
        }
    }

    #[test]
    fn last_24h_keeps_only_the_last_day() {
        let now = 100 * 24 * HOUR_MS;
        let points = vec![
            point(now - HOUR_MS, 1.0),
            point(now - 25 * HOUR_MS, 2.0),
            point(now - 23 * HOUR_MS, 3.0),
        ];

        let shown = filter_range(&points, TimeRange::Last24h, now);
        let downloads: Vec<f64> = shown.iter().map(|p| p.download).collect();
        assert_eq!(downloads, vec![3.0, 1.0]);
    }

    #[test]
    fn last_7d_keeps_only_the_last_week() {
        let now = 100 * 24 * HOUR_MS;
        let points = vec![
            point(now - 6 * 24 * HOUR_MS, 1.0),
            point(now - 8 * 24 * HOUR_MS, 2.0),
        ];

        let shown = filter_range(&points, TimeRange::Last7d, now);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].download, 1.0);
    }

    #[test]
    fn point_exactly_at_the_cutoff_is_included() {
        let now = 50 * 24 * HOUR_MS;
        let points = vec![point(now - 24 * HOUR_MS, 1.0)];
        assert_eq!(filter_range(&points, TimeRange::Last24h, now).len(), 1);
    }

    #[test]
    fn output_is_sorted_ascending_even_when_input_is_not() {
        let now = 10 * 24 * HOUR_MS;
        let points = vec![
            point(now - HOUR_MS, 3.0),
            point(now - 3 * HOUR_MS, 1.0),
            point(now - 2 * HOUR_MS, 2.0),
        ];

        let shown = filter_range(&points, TimeRange::Last24h, now);
        let downloads: Vec<f64> = shown.iter().map(|p| p.download).collect();
        assert_eq!(downloads, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(filter_range(&[], TimeRange::Last24h, 1_000_000).is_empty());
        assert!(filter_range(&[], TimeRange::Last7d, 1_000_000).is_empty());
    }

    #[test]
    fn duplicate_timestamps_are_all_kept() {
        let now = 10 * 24 * HOUR_MS;
        let points = vec![point(now - 1, 1.0), point(now - 1, 2.0)];
        assert_eq!(filter_range(&points, TimeRange::Last24h, now).len(), 2);
    }

    #[test]
    fn toggling_flips_between_the_two_windows() {
        assert_eq!(TimeRange::Last24h.toggled(), TimeRange::Last7d);
        assert_eq!(TimeRange::Last7d.toggled(), TimeRange::Last24h);
        assert_eq!(TimeRange::Last24h.label(), "24h");
        assert_eq!(TimeRange::Last7d.label(), "7d");
    }
}
