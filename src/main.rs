use std::{
    process,
    sync::{Arc, OnceLock},
    time::Duration,
};

use thermbridge::{
    config::Config,
    core::{
        bridge::{Bridge, TelemetrySink},
        serial::SerialSource,
    },
    logger::LoggerManager,
    print_error,
};
use thermbridge_mqtt::{ConnectionState, MqttInstance, MqttManager};
use tracing::{error, info};

static CONFIG: OnceLock<Config> = OnceLock::new();

pub fn config() -> &'static Config {
    CONFIG.get_or_init(|| {
        Config::new().unwrap_or_else(|e| {
            print_error!("{}", e);
            process::exit(1);
        })
    })
}

/// Grace window for the broker DISCONNECT on shutdown, matching the
/// conventional 250 ms client disconnect timeout.
const DISCONNECT_GRACE: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    let cfg = config();
    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting thermbridge version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);

    // The single positional argument overrides the configured device path.
    let mut serial_config = cfg.serial.clone();
    if let Some(device) = std::env::args().nth(1) {
        serial_config.device = device;
    }

    info!(
        "Connecting to MQTT broker at {}:{}...",
        cfg.transport.host, cfg.transport.port
    );
    let manager = MqttManager::from_config(cfg.transport.clone()).unwrap_or_else(|e| {
        error!("Invalid MQTT configuration: {}", e);
        process::exit(1);
    });
    let instance = manager.build_and_start().await.unwrap_or_else(|e| {
        error!("Failed to start MQTT client: {}", e);
        process::exit(1);
    });

    // The broker connection is a startup requirement: anything other than a
    // clean CONNACK within the timeout aborts the process.
    let connect_timeout = Duration::from_secs(cfg.transport.connection_timeout);
    if let Err(reason) = wait_for_initial_connection(&instance, connect_timeout).await {
        error!("Failed to connect to MQTT broker: {}", reason);
        process::exit(1);
    }
    info!("Connected to MQTT broker");

    let source = SerialSource::open(&serial_config).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });
    info!(
        "Serial port {} open at {} baud",
        source.device(),
        serial_config.baud_rate
    );

    let publisher = instance
        .publisher(cfg.telemetry.metadata.clone())
        .unwrap_or_else(|e| {
            error!("Invalid telemetry endpoint: {}", e);
            process::exit(1);
        });
    info!("Publishing readings to topic '{}'", publisher.topic());

    let bridge = Bridge::new(
        Box::new(source),
        Arc::new(publisher) as Arc<dyn TelemetrySink>,
        Duration::from_secs(serial_config.read_retry_delay),
    );

    tokio::select! {
        _ = bridge.run() => {
            error!("Bridge loop unexpectedly finished");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C — initiating graceful shutdown...");
            instance.shutdown(DISCONNECT_GRACE).await;
            info!("Shutdown complete");
        }
    }
}

/// Waits for the connection kernel's first definitive state.
///
/// `Connected` lets startup proceed. Any failure state before that, or no
/// CONNACK within the timeout, is reported as a fatal startup error; the
/// kernel's reconnection policy only applies after the bridge is up.
async fn wait_for_initial_connection(
    instance: &MqttInstance,
    timeout: Duration,
) -> Result<(), String> {
    let mut state_rx = instance.state_receiver();

    let wait = async {
        loop {
            let state = state_rx.borrow_and_update().clone();
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected(reason) => return Err(reason),
                ConnectionState::Reconnecting(_) => {
                    return Err("broker refused the initial connection".to_string());
                }
                ConnectionState::Connecting => {}
            }

            if state_rx.changed().await.is_err() {
                return Err("connection kernel stopped before the first CONNACK".to_string());
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(format!("no CONNACK within {} seconds", timeout.as_secs())),
    }
}
