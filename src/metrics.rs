pub struct RateSmoother {
    tau_secs: f64,
    smoothed_bps: f64,
}

impl RateSmoother {
    pub fn new(tau_secs: f64) -> Self {
        Self {
            tau_secs,
            smoothed_bps: 0.0,
        }
    }

    /// Folds an instantaneous rate into a time-weighted moving average. The
    /// recorded history keeps raw samples; smoothing is display-only.
    pub fn update(&mut self, instant_bps: f64, dt_secs: f64) -> f64 {
        let dt = dt_secs.max(1e-3);
        let alpha = 1.0 - (-dt / self.tau_secs).exp();
        self.smoothed_bps = self.smoothed_bps * (1.0 - alpha) + instant_bps * alpha;
        self.smoothed_bps
    }

    pub fn value(&self) -> f64 {
        self.smoothed_bps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_smooths_rate() {
        let mut avg = RateSmoother::new(5.0);
        // 1000 B/s for one second
        let r1 = avg.update(1000.0, 1.0);
        // next second silent; smoothed should not drop to zero instantly
        let r2 = avg.update(0.0, 1.0);
        assert!(r1 > r2);
        assert!(r2 > 0.0);
    }

    #[test]
    fn steady_input_converges_to_the_input() {
        let mut avg = RateSmoother::new(2.0);
        let mut last = 0.0;
        for _ in 0..50 {
            last = avg.update(500.0, 1.0);
        }
        assert!((last - 500.0).abs() < 1.0);
        assert!(avg.value() == last);
    }

    #[test]
    fn longer_gaps_weigh_the_new_sample_more() {
        let mut slow = RateSmoother::new(5.0);
        let mut fast = RateSmoother::new(5.0);
        let after_short = slow.update(1000.0, 0.5);
        let after_long = fast.update(1000.0, 5.0);
        assert!(after_long > after_short);
    }
}
