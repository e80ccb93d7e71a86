pub const TOPIC_ROOM_TELEMETRY: &str = "comfort/room/telemetry";

pub const TOPIC_AC_COMMAND: &str = "comfort/room/ac/command";
pub const TOPIC_ROOM_ALERT: &str = "comfort/room/alert";

pub const TOPIC_CONTROLLER_STATE: &str = "comfort/controller/state";
pub const TOPIC_SENSOR_STATUS: &str = "comfort/sensor/status";
