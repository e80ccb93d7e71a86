use crate::{
    config::ComfortConfig,
    telemetry::Observation,
    types::{AcCommand, AlertCode, ControlAction, RoomStatePayload, SwitchReason},
};

/// Rule-based comfort controller for a single room.
///
/// Owns the room belief exclusively: `ac_commanded_on` is what the engine
/// last asked the actuator to do, not a hardware-confirmed truth. The two
/// can diverge, which is exactly what the ineffective-AC alert watches for.
///
/// All entry points are synchronous and non-blocking; they return a list of
/// intents for the caller to publish. The engine never retries and is never
/// told whether a publish succeeded.
#[derive(Debug, Clone)]
pub struct ComfortEngine {
    config: ComfortConfig,
    ac_commanded_on: bool,
    last_occupied_at_ms: u64,
    last_temperature_c: f64,
}

impl ComfortEngine {
    /// Fresh never-occupied, AC-off belief. State is not persisted across
    /// restarts; a restarting controller always begins here.
    pub fn new(mut config: ComfortConfig) -> Self {
        config.sanitize();
        Self {
            last_temperature_c: config.default_temperature_c,
            config,
            ac_commanded_on: false,
            last_occupied_at_ms: 0,
        }
    }

    pub fn config(&self) -> &ComfortConfig {
        &self.config
    }

    pub fn ac_commanded_on(&self) -> bool {
        self.ac_commanded_on
    }

    pub fn last_temperature_c(&self) -> f64 {
        self.last_temperature_c
    }

    /// Milliseconds since the room was last seen occupied. Saturates at zero
    /// if `now_ms` runs behind the recorded timestamp, so a clock anomaly can
    /// never produce a spurious shutdown.
    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_occupied_at_ms)
    }

    /// Apply the ordered rule set to one observation.
    ///
    /// First matching rule wins; at most one actuator command per evaluation.
    /// Turning on and turning off are mutually exclusive by construction: the
    /// ON rule requires occupancy seen right now, the OFF rule requires no
    /// occupancy for the whole idle window.
    pub fn observe(&mut self, obs: &Observation, now_ms: u64) -> Vec<ControlAction> {
        let mut actions = Vec::new();

        self.last_temperature_c = obs.temperature_c;
        if obs.occupied {
            self.last_occupied_at_ms = now_ms;
        }

        // Comfort: somebody is here and the room is warm.
        if obs.occupied && obs.temperature_c >= self.config.comfort_temp_c && !self.ac_commanded_on
        {
            self.ac_commanded_on = true;
            actions.push(ControlAction::Switch {
                command: AcCommand::On,
                reason: SwitchReason::OccupiedAndWarm,
            });
            return actions;
        }

        // Economy: nobody seen for the whole idle window.
        if self.idle_shutoff_due(now_ms) {
            self.ac_commanded_on = false;
            actions.push(ControlAction::Switch {
                command: AcCommand::Off,
                reason: SwitchReason::IdleTimeout,
            });
            return actions;
        }

        // AC believed on, yet the room stays hot: open window, broken unit,
        // wrong setpoint. Non-actuating, belief unchanged.
        if self.ac_commanded_on && obs.temperature_c > self.config.ineffective_temp_c {
            actions.push(ControlAction::Alert {
                code: AlertCode::AcIneffective,
            });
        }

        actions
    }

    /// Timer-driven re-evaluation of the idle rule, independent of message
    /// arrival. A room that goes silent still converges to OFF.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ControlAction> {
        if self.idle_shutoff_due(now_ms) {
            self.ac_commanded_on = false;
            return vec![ControlAction::Switch {
                command: AcCommand::Off,
                reason: SwitchReason::IdleTimeout,
            }];
        }
        Vec::new()
    }

    /// Unconditional fail-safe OFF intent for shutdown paths. Mirrors the
    /// retained last-will the bus delivers on abnormal disconnect.
    pub fn force_off(&mut self) -> ControlAction {
        self.ac_commanded_on = false;
        ControlAction::Switch {
            command: AcCommand::Off,
            reason: SwitchReason::FailSafe,
        }
    }

    pub fn state_payload(&self, now_ms: u64) -> RoomStatePayload {
        RoomStatePayload {
            ac_on: self.ac_commanded_on,
            last_temp: self.last_temperature_c,
            idle_ms: self.idle_ms(now_ms),
        }
    }

    fn idle_shutoff_due(&self, now_ms: u64) -> bool {
        self.ac_commanded_on && self.idle_ms(now_ms) > self.config.idle_timeout_ms
    }
}
