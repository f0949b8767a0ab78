//! Enroll a finger into the sensor library
//!
//! Usage: `cargo run --example enroll -- [slot]` with `SENSOR_PORT` pointing
//! at the serial device (default `/dev/ttyUSB0`).

use std::time::Duration;

use anyhow::{bail, Context};
use tokio::time::sleep;
use zfm::{CharBuffer, ConfirmationCode, Error, SearchResult, Sensor, SensorConfig};

async fn wait_for_finger(sensor: &Sensor) -> zfm::Result<()> {
    loop {
        match sensor.capture_image().await {
            Ok(()) => return Ok(()),
            Err(e) if e.confirmation_code() == Some(ConfirmationCode::NoFinger) => {
                sleep(Duration::from_millis(100)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn wait_for_removal(sensor: &Sensor) -> zfm::Result<()> {
    loop {
        match sensor.capture_image().await {
            Err(e) if e.confirmation_code() == Some(ConfirmationCode::NoFinger) => return Ok(()),
            Ok(()) => sleep(Duration::from_millis(100)).await,
            Err(e) => return Err(e),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = std::env::var("SENSOR_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let sensor = Sensor::new(SensorConfig::new(port))?;
    sensor.connect().await.context("connecting to sensor")?;

    let slot = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<u16>().context("slot must be a number")?,
        None => {
            let page = sensor.read_occupancy_page(0).await?;
            page.first_free().context("first page of the library is full")?
        }
    };

    println!("Place your finger on the sensor...");
    wait_for_finger(&sensor).await?;
    sensor.extract_features(CharBuffer::Buffer1).await?;

    if let SearchResult::Found { slot, score } = sensor.search(CharBuffer::Buffer1).await? {
        bail!("finger already enrolled in slot {} (score {})", slot, score);
    }

    println!("Remove your finger");
    wait_for_removal(&sensor).await?;

    println!("Place the same finger again...");
    wait_for_finger(&sensor).await?;
    sensor.extract_features(CharBuffer::Buffer2).await?;

    match sensor.combine_features().await {
        Ok(()) => {}
        Err(Error::DeviceRejected { code, .. }) => bail!("the two scans differ: {}", code),
        Err(e) => return Err(e.into()),
    }

    sensor.store(slot, CharBuffer::Buffer1).await?;
    println!("Enrolled in slot {}", slot);

    sensor.disconnect().await?;
    Ok(())
}
