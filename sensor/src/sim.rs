//! Simulated room telemetry for local development.
//!
//! Emulates the three supported detection modalities against a shared room
//! model: temperature random walk with mean reversion toward a scenario
//! baseline, occupancy in bursts (someone arrives, lingers, leaves), and
//! per-kind signal synthesis. Swap in real sensor drivers on hardware.

use std::fmt;

use serde::Serialize;

use comfort_common::SensorKind;

/// Approximate a sample from N(0,1) with the Irwin-Hall method: sum of 12
/// uniform [0,1) values minus 6.
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Pre-configured simulation profiles selectable via the `SIM_SCENARIO`
/// env var.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Frequent occupancy in a warm room. Exercises the on/off cycle.
    Busy,
    /// Rare, short visits. Exercises the idle shutoff path.
    Empty,
    /// Hot room that barely cools. Exercises the ineffective-AC alert.
    Heatwave,
}

impl Scenario {
    pub fn from_str_lossy(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "empty" => Self::Empty,
            "heatwave" => Self::Heatwave,
            _ => Self::Busy, // default
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "busy"),
            Self::Empty => write!(f, "empty"),
            Self::Heatwave => write!(f, "heatwave"),
        }
    }
}

/// One telemetry message as published on the wire. Modality fields are only
/// present for the kinds that report them.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryReading {
    pub movement: bool,
    pub temperature: f64,
    pub humidity: f64,
    pub sensor_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    pub ts: i64,
}

pub struct RoomSim {
    kind: SensorKind,
    baseline_c: f64,
    temperature_c: f64,
    humidity_pct: f64,
    arrival_prob: f32,
    stay_ticks: (u32, u32),
    presence_ticks_left: u32,
}

impl RoomSim {
    pub fn new(kind: SensorKind, scenario: Scenario) -> Self {
        let (baseline_c, arrival_prob, stay_ticks) = match scenario {
            Scenario::Busy => (27.0, 0.35_f32, (3, 12)),
            Scenario::Empty => (24.0, 0.03, (1, 4)),
            Scenario::Heatwave => (31.5, 0.25, (3, 12)),
        };

        Self {
            kind,
            baseline_c,
            temperature_c: baseline_c,
            humidity_pct: 60.0,
            arrival_prob,
            stay_ticks,
            presence_ticks_left: 0,
        }
    }

    pub fn occupied(&self) -> bool {
        self.presence_ticks_left > 0
    }

    /// Advance the room one tick and synthesize the next wire reading.
    pub fn next_reading(&mut self, now_epoch: i64) -> TelemetryReading {
        self.step_presence();
        self.step_climate();

        let present = self.occupied();
        // PIR-style motion flickers even while someone sits still, and the
        // occasional false trigger happens in an empty room.
        let movement = if present {
            fastrand::f32() < 0.9
        } else {
            fastrand::f32() < 0.05
        };

        let (heat, confidence, distance) = match self.kind {
            SensorKind::Pir => (None, None, None),
            SensorKind::Ir => {
                let heat_c = if present {
                    gaussian(36.0, 1.0)
                } else {
                    // Nothing warm in view: the spot reads near ambient.
                    self.temperature_c + gaussian(0.0, 0.5)
                };
                (Some(round1(heat_c)), None, None)
            }
            SensorKind::MmWave => {
                // Mostly solid detections with the occasional weak one.
                let raw_confidence = if present {
                    if fastrand::f32() < 0.1 {
                        gaussian(0.5, 0.1)
                    } else {
                        gaussian(0.85, 0.06)
                    }
                } else {
                    gaussian(0.15, 0.1)
                };
                let confidence = (raw_confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0;

                let distance_m = if present {
                    gaussian(2.5, 0.7).clamp(0.2, 6.0)
                } else {
                    gaussian(3.5, 1.5).clamp(0.2, 8.0)
                };

                (None, Some(confidence), Some(round1(distance_m)))
            }
        };

        TelemetryReading {
            movement,
            temperature: round1(self.temperature_c),
            humidity: round1(self.humidity_pct),
            sensor_type: self.kind.as_str(),
            heat,
            confidence,
            distance,
            ts: now_epoch,
        }
    }

    fn step_presence(&mut self) {
        if self.presence_ticks_left > 0 {
            self.presence_ticks_left -= 1;
        } else if fastrand::f32() < self.arrival_prob {
            let (lo, hi) = self.stay_ticks;
            self.presence_ticks_left = fastrand::u32(lo..=hi);
        }
    }

    fn step_climate(&mut self) {
        let pull = 0.05 * (self.baseline_c - self.temperature_c);
        let body_heat = if self.occupied() { 0.05 } else { 0.0 };
        self.temperature_c =
            (self.temperature_c + pull + body_heat + gaussian(0.0, 0.15)).clamp(10.0, 45.0);

        let drift = 0.02 * (60.0 - self.humidity_pct);
        self.humidity_pct = (self.humidity_pct + drift + gaussian(0.0, 0.8)).clamp(20.0, 95.0);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use comfort_common::{normalize, ComfortConfig};

    use super::*;

    fn collect(kind: SensorKind, scenario: Scenario, n: usize) -> Vec<TelemetryReading> {
        let mut sim = RoomSim::new(kind, scenario);
        (0..n).map(|i| sim.next_reading(i as i64)).collect()
    }

    #[test]
    fn readings_stay_in_physical_range() {
        fastrand::seed(7);
        for kind in [SensorKind::Pir, SensorKind::Ir, SensorKind::MmWave] {
            for reading in collect(kind, Scenario::Busy, 500) {
                assert!((10.0..=45.0).contains(&reading.temperature));
                assert!((20.0..=95.0).contains(&reading.humidity));
                if let Some(confidence) = reading.confidence {
                    assert!((0.0..=1.0).contains(&confidence));
                }
                if let Some(distance) = reading.distance {
                    assert!(distance > 0.0);
                }
            }
        }
    }

    #[test]
    fn busy_scenario_moves_more_than_empty() {
        fastrand::seed(11);
        let busy = collect(SensorKind::Pir, Scenario::Busy, 400)
            .iter()
            .filter(|reading| reading.movement)
            .count();
        let empty = collect(SensorKind::Pir, Scenario::Empty, 400)
            .iter()
            .filter(|reading| reading.movement)
            .count();

        assert!(busy > empty, "busy={busy} empty={empty}");
    }

    #[test]
    fn heatwave_runs_hotter_than_empty() {
        fastrand::seed(13);
        fn average_temp(readings: &[TelemetryReading]) -> f64 {
            readings.iter().map(|reading| reading.temperature).sum::<f64>()
                / readings.len() as f64
        }

        let heatwave = collect(SensorKind::Pir, Scenario::Heatwave, 300);
        let empty = collect(SensorKind::Pir, Scenario::Empty, 300);

        assert!(average_temp(&heatwave) > average_temp(&empty) + 2.0);
    }

    #[test]
    fn modality_fields_match_sensor_kind() {
        fastrand::seed(17);
        let pir = collect(SensorKind::Pir, Scenario::Busy, 10);
        let ir = collect(SensorKind::Ir, Scenario::Busy, 10);
        let mmwave = collect(SensorKind::MmWave, Scenario::Busy, 10);

        assert!(pir.iter().all(|r| r.heat.is_none() && r.confidence.is_none()));
        assert!(ir.iter().all(|r| r.heat.is_some() && r.distance.is_none()));
        assert!(mmwave
            .iter()
            .all(|r| r.confidence.is_some() && r.distance.is_some() && r.heat.is_none()));
    }

    #[test]
    fn readings_normalize_cleanly() {
        fastrand::seed(19);
        let config = ComfortConfig::default();

        for kind in [SensorKind::Pir, SensorKind::Ir, SensorKind::MmWave] {
            for reading in collect(kind, Scenario::Busy, 50) {
                let raw = serde_json::to_value(&reading).unwrap();
                let obs = normalize(&raw, &config, Utc::now()).unwrap();

                assert_eq!(obs.sensor_kind, kind);
                assert!(obs.temperature_c.is_finite());
                assert!(obs.humidity_pct.is_finite());
            }
        }
    }

    #[test]
    fn scenario_from_str_lossy() {
        assert_eq!(Scenario::from_str_lossy("busy"), Scenario::Busy);
        assert_eq!(Scenario::from_str_lossy("EMPTY"), Scenario::Empty);
        assert_eq!(Scenario::from_str_lossy("Heatwave"), Scenario::Heatwave);
        assert_eq!(Scenario::from_str_lossy("unknown"), Scenario::Busy);
        assert_eq!(Scenario::from_str_lossy(""), Scenario::Busy);
    }
}
