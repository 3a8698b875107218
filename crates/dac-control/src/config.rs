//! Controller timing and retry policy.

use embassy_time::Duration;

/// Timing and retry policy, fixed at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Wait after power on before the first initialisation attempt
    pub settle_delay: Duration,
    /// Minimum time between lock/automute samples
    pub sample_interval: Duration,
    /// Extra passes over devices that failed to initialise
    pub init_retries: u8,
}

impl ControllerConfig {
    /// Defaults: 1.5 s settle, 250 ms sampling, one retry pass.
    pub const fn new() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
            sample_interval: Duration::from_millis(250),
            init_retries: 1,
        }
    }

    /// Set the settle delay.
    #[must_use]
    pub const fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the sample interval.
    #[must_use]
    pub const fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Set the number of retry passes.
    #[must_use]
    pub const fn with_init_retries(mut self, retries: u8) -> Self {
        self.init_retries = retries;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.settle_delay, Duration::from_millis(1500));
        assert_eq!(cfg.sample_interval, Duration::from_millis(250));
        assert_eq!(cfg.init_retries, 1);
    }

    #[test]
    fn test_overrides() {
        let cfg = ControllerConfig::new()
            .with_settle_delay(Duration::from_millis(10))
            .with_sample_interval(Duration::from_millis(5))
            .with_init_retries(3);
        assert_eq!(cfg.settle_delay.as_millis(), 10);
        assert_eq!(cfg.sample_interval.as_millis(), 5);
        assert_eq!(cfg.init_retries, 3);
    }
}
