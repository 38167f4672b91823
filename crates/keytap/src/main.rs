//! keytap command-line entry point.
//!
//! Starts global keyboard capture and prints one line per key transition until
//! Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- $KEYTAP_CONFIG or <config dir>/keytap/config.toml
//!  └─ keytap::init()         -- configures the process-wide engine
//!  └─ keytap::event_channel()
//!       ├─ OS hook thread     (platform backend)
//!       ├─ dispatcher thread  (translate + deliver)
//!       └─ this task          (print until Ctrl-C)
//! ```

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use keytap::infrastructure::storage::config::{self, AppConfig, OutputFormat};
use keytap::KeyEvent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("loading keytap config")?;
    init_logging(&config);

    info!(
        table_version = keytap::KEY_TABLE_VERSION,
        repeat_policy = ?config.engine.repeat_policy,
        "keytap starting"
    );

    keytap::init(config.engine.clone());
    let (_listener, mut events) =
        keytap::event_channel().context("starting global keyboard capture")?;

    info!("capturing keys. Press Ctrl-C to exit.");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event, config.output.format),
                None => {
                    warn!("event stream closed");
                    break;
                }
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("failed to listen for Ctrl-C: {e}");
                }
                info!("shutdown signal received");
                break;
            }
        }
    }

    keytap::stop();
    info!("keytap stopped");
    Ok(())
}

/// Structured logging to stderr. `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &AppConfig) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();
}

fn print_event(event: &KeyEvent, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", format_text(event)),
        OutputFormat::Json => match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("failed to encode event: {e}"),
        },
    }
}

fn format_text(event: &KeyEvent) -> String {
    let direction = if event.is_key_up { "up" } else { "down" };
    let key = match event.key {
        " " => "Space",
        key => key,
    };
    let repeat = if event.is_repeat { "  (repeat)" } else { "" };
    format!(
        "{direction:<5} {key:<12} keyCode={:<4} code={}{repeat}",
        event.key_code, event.code
    )
}
