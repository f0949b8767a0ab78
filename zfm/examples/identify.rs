//! Identify a finger against the sensor library
//!
//! Optionally saves the scanned image: `cargo run --example identify -- scan.bmp`

use std::time::Duration;

use tokio::time::sleep;
use zfm::{CharBuffer, ConfirmationCode, SearchResult, Sensor, SensorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = std::env::var("SENSOR_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let sensor = Sensor::new(SensorConfig::new(port))?;
    sensor.connect().await?;

    let params = sensor.system_parameters().await?;
    println!("{}", params);
    println!("{} templates stored", sensor.template_count().await?);

    println!("Place your finger on the sensor...");
    loop {
        match sensor.capture_image().await {
            Ok(()) => break,
            Err(e) if e.confirmation_code() == Some(ConfirmationCode::NoFinger) => {
                sleep(Duration::from_millis(100)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if let Some(path) = std::env::args().nth(1) {
        sensor.download_image(&path).await?;
        println!("Image saved to {}", path);
    }

    sensor.extract_features(CharBuffer::Buffer1).await?;

    match sensor.search(CharBuffer::Buffer1).await? {
        SearchResult::Found { slot, score } => println!("Match in slot {} (score {})", slot, score),
        SearchResult::NotFound => println!("No match"),
    }

    sensor.disconnect().await?;
    Ok(())
}
