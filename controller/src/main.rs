use std::{
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use chrono::Utc;
use rumqttc::{AsyncClient, Event, Incoming, LastWill, MqttOptions, QoS};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use comfort_common::{
    normalize, AcCommand, ComfortConfig, ComfortEngine, ControlAction, SwitchReason,
    TOPIC_AC_COMMAND, TOPIC_CONTROLLER_STATE, TOPIC_ROOM_ALERT, TOPIC_ROOM_TELEMETRY,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const MQTT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<ComfortEngine>>,
    config: ComfortConfig,
    mqtt: AsyncClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let engine = ComfortEngine::new(config_from_env());
    let config = engine.config().clone();
    info!(
        comfort_temp_c = config.comfort_temp_c,
        idle_timeout_ms = config.idle_timeout_ms,
        ineffective_temp_c = config.ineffective_temp_c,
        "comfort controller starting"
    );

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(1883);

    let mut mqtt_options = MqttOptions::new("comfort-controller", mqtt_host, mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    // Fail-safe: if this process drops off the bus abnormally, the broker
    // delivers a retained OFF on our behalf.
    mqtt_options.set_last_will(LastWill::new(
        TOPIC_AC_COMMAND,
        AcCommand::Off.as_str().as_bytes().to_vec(),
        QoS::AtLeastOnce,
        true,
    ));

    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, MQTT_CHANNEL_CAPACITY);

    let app_state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        config,
        mqtt,
    };

    app_state
        .mqtt
        .subscribe(TOPIC_ROOM_TELEMETRY, QoS::AtMostOnce)
        .await
        .context("failed to subscribe to telemetry topic")?;

    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(app_state.clone());
    spawn_state_publish_loop(app_state.clone());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    shutdown(&app_state).await;
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_telemetry(&app_state, &message.topic, &message.payload).await
                    {
                        warn!("telemetry message dropped: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

/// Idle re-evaluation decoupled from sensor traffic: a room that goes silent
/// still gets shut off once the idle window expires.
fn spawn_control_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(app_state.config.tick_interval_ms));

        loop {
            interval.tick().await;

            let actions = {
                let mut engine = app_state.engine.lock().await;
                engine.tick(monotonic_ms())
            };
            publish_actions(&app_state, actions).await;
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(
            app_state.config.state_publish_interval_ms,
        ));

        loop {
            interval.tick().await;

            let payload = {
                let engine = app_state.engine.lock().await;
                serde_json::to_vec(&engine.state_payload(monotonic_ms()))
            };

            match payload {
                Ok(body) => {
                    if let Err(err) = app_state
                        .mqtt
                        .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                        .await
                    {
                        warn!("room state publish failed: {err}");
                    }
                }
                Err(err) => warn!("room state serialization failed: {err}"),
            }
        }
    });
}

async fn handle_telemetry(
    app_state: &AppState,
    topic: &str,
    payload: &[u8],
) -> anyhow::Result<()> {
    if topic != TOPIC_ROOM_TELEMETRY {
        return Ok(());
    }
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        anyhow::bail!("oversized payload ({} bytes)", payload.len());
    }

    let raw: serde_json::Value =
        serde_json::from_slice(payload).context("payload is not valid JSON")?;
    let observation = normalize(&raw, &app_state.config, Utc::now())?;

    if observation.occupied {
        debug!(
            sensor = observation.sensor_kind.as_str(),
            temperature_c = observation.temperature_c,
            "movement detected"
        );
    }

    let actions = {
        let mut engine = app_state.engine.lock().await;
        engine.observe(&observation, monotonic_ms())
    };
    publish_actions(app_state, actions).await;

    Ok(())
}

/// Apply engine intents: publish and log each one. Failures are logged and
/// dropped; the engine never retries.
async fn publish_actions(app_state: &AppState, actions: Vec<ControlAction>) {
    for action in actions {
        match action {
            ControlAction::Switch { command, reason } => {
                info!(
                    command = command.as_str(),
                    reason = reason.as_str(),
                    "switching ac"
                );
                // Only the fail-safe OFF is retained, so a restarting
                // actuator never replays a stale ON.
                let retain = matches!(reason, SwitchReason::FailSafe);
                if let Err(err) = app_state
                    .mqtt
                    .publish(TOPIC_AC_COMMAND, QoS::AtLeastOnce, retain, command.as_str())
                    .await
                {
                    warn!("ac command publish failed: {err}");
                }
            }
            ControlAction::Alert { code } => {
                warn!(code = code.as_str(), "ac appears ineffective");
                if let Err(err) = app_state
                    .mqtt
                    .publish(TOPIC_ROOM_ALERT, QoS::AtLeastOnce, false, code.as_str())
                    .await
                {
                    warn!("alert publish failed: {err}");
                }
            }
        }
    }
}

async fn shutdown(app_state: &AppState) {
    info!("shutting down, publishing fail-safe off");

    let action = {
        let mut engine = app_state.engine.lock().await;
        engine.force_off()
    };
    publish_actions(app_state, vec![action]).await;

    if let Err(err) = app_state.mqtt.disconnect().await {
        warn!("mqtt disconnect failed: {err}");
    }
}

fn config_from_env() -> ComfortConfig {
    let mut config = ComfortConfig::default();

    if let Some(value) = env_parse::<f64>("COMFORT_TEMP_C") {
        config.comfort_temp_c = value;
    }
    if let Some(value) = env_parse::<u64>("IDLE_TIMEOUT_SECS") {
        config.idle_timeout_ms = value.saturating_mul(1_000);
    }
    if let Some(value) = env_parse::<f64>("INEFFECTIVE_TEMP_C") {
        config.ineffective_temp_c = value;
    }
    if let Some(value) = env_parse::<u64>("TICK_INTERVAL_MS") {
        config.tick_interval_ms = value;
    }
    if let Some(value) = env_parse::<u64>("STATE_PUBLISH_INTERVAL_MS") {
        config.state_publish_interval_ms = value;
    }
    if let Some(value) = env_parse::<f64>("DEFAULT_TEMP_C") {
        config.default_temperature_c = value;
    }
    if let Some(value) = env_parse::<f64>("DEFAULT_HUMIDITY_PCT") {
        config.default_humidity_pct = value;
    }

    config
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
