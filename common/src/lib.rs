pub mod config;
pub mod engine;
pub mod telemetry;
pub mod topics;
pub mod types;

pub use config::ComfortConfig;
pub use engine::ComfortEngine;
pub use telemetry::{normalize, Observation, TelemetryError};
pub use topics::*;
pub use types::{AcCommand, AlertCode, ControlAction, RoomStatePayload, SensorKind, SwitchReason};
