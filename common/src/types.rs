use serde::{Deserialize, Serialize};

/// Detection modality that produced an occupancy reading. Each kind has its
/// own presence-derivation rule in the telemetry module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    #[serde(rename = "PIR")]
    Pir,
    #[serde(rename = "IR")]
    Ir,
    #[serde(rename = "mmWave")]
    MmWave,
}

impl SensorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pir => "PIR",
            Self::Ir => "IR",
            Self::MmWave => "mmWave",
        }
    }

    /// Parse the `sensor_type` wire string. `None` means the label is not a
    /// recognized modality, which callers treat as a normalization error.
    pub fn from_wire(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "pir" => Some(Self::Pir),
            "ir" => Some(Self::Ir),
            "mmwave" => Some(Self::MmWave),
            _ => None,
        }
    }
}

/// Actuator command published on the AC command topic as a literal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AcCommand {
    On,
    Off,
}

impl AcCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

/// Why the engine decided to switch the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchReason {
    OccupiedAndWarm,
    IdleTimeout,
    FailSafe,
}

impl SwitchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OccupiedAndWarm => "OCCUPIED_AND_WARM",
            Self::IdleTimeout => "IDLE_TIMEOUT",
            Self::FailSafe => "FAIL_SAFE",
        }
    }
}

/// Machine-readable alert codes published on the alert topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCode {
    AcIneffective,
}

impl AlertCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AcIneffective => "AC_INEFFICIENTE",
        }
    }
}

/// Outward intent yielded by one engine evaluation. The caller publishes it;
/// the engine never performs I/O and is never told whether delivery worked.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    Switch {
        command: AcCommand,
        reason: SwitchReason,
    },
    Alert {
        code: AlertCode,
    },
}

/// Retained room-state snapshot published on the controller state topic.
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatePayload {
    #[serde(rename = "acOn")]
    pub ac_on: bool,
    #[serde(rename = "lastTemp")]
    pub last_temp: f64,
    #[serde(rename = "idleMs")]
    pub idle_ms: u64,
}
