// Read-only controller diagnostic over a real serial link.
//
// Usage: cargo run --example motor_check -- [port]
// Example: cargo run --example motor_check -- /dev/ttyUSB0
//
// Reads the health status and encoder counters; never writes speeds.

use diffdrive_runtime::{CommandQueue, ExecutorConfig, MotionExecutor, SerialLink};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    println!("Serial port: {port}");

    let link = SerialLink::open(&port)?;
    let mut executor = MotionExecutor::new(link, CommandQueue::new(), ExecutorConfig::default())?;

    let health = executor.check_health()?;
    println!(
        "Health: {} ({})",
        if health.ok { "OK" } else { "FAULT" },
        health.message
    );
    println!("{}", serde_json::to_string_pretty(&health)?);

    let (encoder1, encoder2) = executor.read_encoders()?;
    println!("Encoders: wheel1 = {encoder1}, wheel2 = {encoder2}");

    Ok(())
}
