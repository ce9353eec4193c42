use anyhow::Result;
use imulink_config::DriverConfig;
use imulink_driver::ImuManager;
use imulink_serial::SerialTransport;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "imulink_app=info,imulink_driver=info,imulink_serial=info".into()
            }),
        )
        .init();

    info!("IMU serial link starting");

    // Load config.
    let config = imulink_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        DriverConfig::default()
    });

    let transport = SerialTransport::new(config.port.clone());
    let mut imu = ImuManager::new(
        transport,
        config.connection,
        config.auto_reconnect,
        config.reconnect_interval_secs,
    );

    for device in imu.list_devices() {
        info!(device = %device, "Serial device");
    }

    imu.on_connected(|| info!("IMU connected"));
    imu.on_disconnected(|| warn!("IMU disconnected"));
    imu.on_error(|message| warn!(message, "IMU error"));
    imu.on_sample(|sample| {
        tracing::debug!(
            x = sample.orientation.x,
            y = sample.orientation.y,
            z = sample.orientation.z,
            w = sample.orientation.w,
            t = sample.timestamp,
            "Sample"
        );
    });

    imu.connect();

    // Drive the tick loop until Ctrl-C.
    let period = Duration::from_secs_f64(1.0 / config.tick_rate_hz.max(1) as f64);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last = Instant::now();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let delta = now.duration_since(last).as_secs_f32();
                last = now;
                imu.tick(delta);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    imu.shutdown();
    Ok(())
}
