//! Publishes a tick every few milliseconds to whoever is connected
//!
//! Run with: cargo run --example ticker [ENDPOINT] [HIGH_WATER_MARK]
//!
//! Examples:
//!   cargo run --example ticker                         # tcp://127.0.0.1:5556, hwm 0
//!   cargo run --example ticker tcp://*:7000 16         # all interfaces, hwm 16
//!
//! Then, in another terminal:
//!   cargo run --example listen 127.0.0.1:5556
//!
//! Press Ctrl+C in a listener to watch it disappear from the subscriber
//! count; the ticker keeps going regardless.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use framecast::{Broadcaster, ServerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let endpoint = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| framecast::server::DEFAULT_ENDPOINT.to_string());
    let hwm: usize = match args.get(2) {
        Some(s) => s.parse()?,
        None => 0,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("framecast=debug".parse()?)
                .add_directive("ticker=info".parse()?),
        )
        .init();

    let broadcaster = Broadcaster::new(ServerConfig::with_endpoint(endpoint).high_water_mark(hwm))?;
    let addr = broadcaster.start()?;
    println!("Publishing on {addr} (high-water mark {hwm})");

    let mut last_report = Instant::now();
    for seq in 0u64.. {
        let ts = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
        let metadata = format!(r#"{{"seq":{seq},"ts":{ts}}}"#);
        let payload = seq.to_be_bytes().repeat(128);

        broadcaster.publish(metadata, payload)?;

        if last_report.elapsed() >= Duration::from_secs(5) {
            let stats = broadcaster.stats();
            tracing::info!(
                subscribers = stats.active_subscribers,
                published = stats.frames_published,
                sent = stats.frames_sent,
                evicted = stats.frames_evicted,
                "Ticker stats"
            );
            last_report = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    Ok(())
}
