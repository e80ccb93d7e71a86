mod sim;

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use rumqttc::{AsyncClient, LastWill, MqttOptions, QoS};
use tracing::{info, warn};

use comfort_common::{SensorKind, TOPIC_ROOM_TELEMETRY, TOPIC_SENSOR_STATUS};
use sim::{RoomSim, Scenario};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let kind = std::env::var("SENSOR_KIND")
        .ok()
        .and_then(|label| SensorKind::from_wire(&label))
        .unwrap_or(SensorKind::Pir);
    let scenario = Scenario::from_str_lossy(&std::env::var("SIM_SCENARIO").unwrap_or_default());
    let interval_secs = std::env::var("SENSOR_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(5);

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(1883);

    let mut mqtt_options = MqttOptions::new("comfort-sensor", mqtt_host, mqtt_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_last_will(LastWill::new(
        TOPIC_SENSOR_STATUS,
        b"offline".to_vec(),
        QoS::AtLeastOnce,
        true,
    ));

    if let Ok(user) = std::env::var("MQTT_USER") {
        let pass = std::env::var("MQTT_PASS").unwrap_or_default();
        mqtt_options.set_credentials(user, pass);
    }

    let (mqtt, mut eventloop) = AsyncClient::new(mqtt_options, 32);

    mqtt.publish(TOPIC_SENSOR_STATUS, QoS::AtLeastOnce, true, "online")
        .await
        .context("failed to publish sensor online status")?;

    tokio::spawn(async move {
        loop {
            if let Err(err) = eventloop.poll().await {
                warn!("sensor mqtt poll error: {err}");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    });

    info!(
        kind = kind.as_str(),
        scenario = %scenario,
        interval_secs,
        "sensor simulator started"
    );

    let mut sim = RoomSim::new(kind, scenario);
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let reading = sim.next_reading(Utc::now().timestamp());
        match serde_json::to_vec(&reading) {
            Ok(body) => {
                mqtt.publish(TOPIC_ROOM_TELEMETRY, QoS::AtLeastOnce, false, body)
                    .await
                    .context("failed to publish telemetry")?;
            }
            Err(err) => warn!("telemetry serialization failed: {err}"),
        }
    }
}
