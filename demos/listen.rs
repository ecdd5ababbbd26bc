//! Subscribes to a broadcaster and prints what arrives
//!
//! Run with: cargo run --example listen [ADDR] [DELAY_MS]
//!
//! Examples:
//!   cargo run --example listen                     # 127.0.0.1:5556, read as fast as possible
//!   cargo run --example listen 127.0.0.1:5556 250  # slow reader: watch frames get skipped

use std::time::Duration;

use framecast::client::FrameSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let addr = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "127.0.0.1:5556".to_string());
    let delay = Duration::from_millis(match args.get(2) {
        Some(s) => s.parse()?,
        None => 0,
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("listen=info".parse()?),
        )
        .init();

    let mut subscriber = FrameSubscriber::connect(addr.as_str()).await?;
    println!("Connected to {addr}");

    loop {
        tokio::select! {
            frame = subscriber.next_frame() => {
                let Some(frame) = frame? else {
                    println!("Broadcaster closed the connection");
                    break;
                };
                println!(
                    "{} ({} payload bytes)",
                    String::from_utf8_lossy(frame.metadata()),
                    frame.payload().len()
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    Ok(())
}
