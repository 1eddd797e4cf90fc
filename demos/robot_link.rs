//! Robot link demo.
//!
//! Connects to a drive-command server, applies `{"w":..,"a":..,"s":..,"d":..}`
//! commands and reports telemetry every few seconds. Reconnects on loss and
//! exits once reconnection is abandoned.
//!
//! Run with:
//! ```bash
//! RUST_LOG=debug cargo run --example robot_link -- 192.168.86.69 8080
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;
use wslink::{Client, Endpoint, Event, ReconnectStatus, WsError};

const POLL_PERIOD: Duration = Duration::from_millis(100);
const TELEMETRY_PERIOD: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Deserialize)]
struct Drive {
    #[serde(default)]
    w: bool,
    #[serde(default)]
    a: bool,
    #[serde(default)]
    s: bool,
    #[serde(default)]
    d: bool,
}

impl Drive {
    fn describe(&self) -> &'static str {
        match (self.w, self.s, self.a, self.d) {
            (true, false, false, false) => "forward",
            (false, true, false, false) => "backward",
            (false, false, true, false) => "left",
            (false, false, false, true) => "right",
            (false, false, false, false) => "stop",
            _ => "mixed",
        }
    }
}

#[derive(Debug, Serialize)]
struct Telemetry {
    uptime_secs: u64,
    commands: u64,
    last: &'static str,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> wslink::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let mut client = Client::builder()
        .identify(r#"{"client":"Robot"}"#)
        .build_tcp(Endpoint::with_default_path(host, port))?;

    if let Err(e) = client.connect().await {
        tracing::warn!("Initial connect failed: {}", e);
    }

    let started = Instant::now();
    let mut next_report = started + TELEMETRY_PERIOD;
    let mut commands = 0u64;
    let mut last = "stop";

    loop {
        match client.poll::<Drive>().await {
            Ok(Event::Message(drive)) => {
                commands += 1;
                last = drive.describe();
                tracing::info!("Drive: {}", last);
            }
            Ok(Event::NoData) => {}
            Ok(Event::ConnectionLost) => match client.recover().await {
                Ok(ReconnectStatus::Reconnected) => tracing::info!("Link restored"),
                Ok(_) => {}
                Err(e @ WsError::GivenUp { .. }) => {
                    tracing::error!("{}", e);
                    return Err(e);
                }
                Err(e) => tracing::warn!("Recover error: {}", e),
            },
            Err(e) => {
                tracing::error!("{}", e);
                return Err(e);
            }
        }

        if Instant::now() >= next_report {
            next_report += TELEMETRY_PERIOD;
            let report = Telemetry {
                uptime_secs: started.elapsed().as_secs(),
                commands,
                last,
            };
            if let Err(e) = client.send_json(&report).await {
                tracing::debug!("Telemetry not sent: {}", e);
            }
        }

        tokio::time::sleep(POLL_PERIOD).await;
    }
}
