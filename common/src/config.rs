use serde::{Deserialize, Serialize};

/// Tunables for the comfort rules. Defaults follow the demo deployment;
/// every field can be overridden through the controller's environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComfortConfig {
    /// Occupied rooms at or above this temperature get the AC turned on.
    pub comfort_temp_c: f64,
    /// Continuous non-occupancy after which a running AC is shut off.
    pub idle_timeout_ms: u64,
    /// Above this temperature a commanded-on AC is suspected of not working.
    pub ineffective_temp_c: f64,
    /// Cadence of the timer-driven idle re-evaluation.
    pub tick_interval_ms: u64,
    /// Cadence of the retained state snapshot.
    pub state_publish_interval_ms: u64,
    /// Neutral fallbacks for missing or garbled telemetry fields.
    pub default_temperature_c: f64,
    pub default_humidity_pct: f64,
}

impl Default for ComfortConfig {
    fn default() -> Self {
        Self {
            comfort_temp_c: 26.0,
            idle_timeout_ms: 15_000,
            ineffective_temp_c: 28.0,
            tick_interval_ms: 1_000,
            state_publish_interval_ms: 10_000,
            default_temperature_c: 25.0,
            default_humidity_pct: 60.0,
        }
    }
}

impl ComfortConfig {
    /// Clamp out-of-range values into something the rules can work with.
    /// The ineffective threshold must not sit below the comfort threshold,
    /// otherwise the alert fires on every occupied-and-warm cycle.
    pub fn sanitize(&mut self) {
        if !self.comfort_temp_c.is_finite() {
            self.comfort_temp_c = 26.0;
        }
        self.comfort_temp_c = self.comfort_temp_c.clamp(10.0, 40.0);

        if !self.ineffective_temp_c.is_finite() {
            self.ineffective_temp_c = 28.0;
        }
        self.ineffective_temp_c = self.ineffective_temp_c.clamp(10.0, 50.0);
        if self.ineffective_temp_c < self.comfort_temp_c {
            self.ineffective_temp_c = self.comfort_temp_c;
        }

        self.idle_timeout_ms = self.idle_timeout_ms.clamp(1_000, 86_400_000);
        self.tick_interval_ms = self.tick_interval_ms.clamp(100, 60_000);
        self.state_publish_interval_ms = self.state_publish_interval_ms.clamp(1_000, 3_600_000);

        if !self.default_temperature_c.is_finite() {
            self.default_temperature_c = 25.0;
        }
        if !self.default_humidity_pct.is_finite() {
            self.default_humidity_pct = 60.0;
        }
        self.default_humidity_pct = self.default_humidity_pct.clamp(0.0, 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_thresholds() {
        let mut config = ComfortConfig {
            comfort_temp_c: 500.0,
            ineffective_temp_c: -20.0,
            idle_timeout_ms: 0,
            ..ComfortConfig::default()
        };
        config.sanitize();

        assert_eq!(config.comfort_temp_c, 40.0);
        // Pulled up to the comfort threshold, never left below it.
        assert_eq!(config.ineffective_temp_c, 40.0);
        assert_eq!(config.idle_timeout_ms, 1_000);
    }

    #[test]
    fn sanitize_replaces_non_finite_values() {
        let mut config = ComfortConfig {
            comfort_temp_c: f64::NAN,
            default_temperature_c: f64::NAN,
            default_humidity_pct: f64::INFINITY,
            ..ComfortConfig::default()
        };
        config.sanitize();

        assert_eq!(config.comfort_temp_c, 26.0);
        assert_eq!(config.default_temperature_c, 25.0);
        assert_eq!(config.default_humidity_pct, 60.0);
    }

    #[test]
    fn defaults_pass_sanitize_unchanged() {
        let mut config = ComfortConfig::default();
        let before = config.clone();
        config.sanitize();

        assert_eq!(config.comfort_temp_c, before.comfort_temp_c);
        assert_eq!(config.ineffective_temp_c, before.ineffective_temp_c);
        assert_eq!(config.idle_timeout_ms, before.idle_timeout_ms);
    }
}
