//! LA Bridge: headless host for the booking widget message bridge.
//!
//! Reads newline-delimited `{"origin": ..., "data": ...}` messages, routes
//! each through the bridge exactly as the host page would, and prints the
//! resulting data layer and iframe state as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use la_bridge_core::{BridgeConfig, DataLayer};
use la_bridge_web::{
    HostEnvironment, InMemoryDocument, InMemoryFrame, MessageBridge, MessageOutcome,
    RecordingGtag,
};

#[derive(Parser, Debug)]
#[command(name = "la-bridge")]
#[command(about = "Replay booking widget messages through the host-page bridge")]
#[command(version)]
struct Cli {
    /// Message file, one JSON envelope per line (default: stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// TOML configuration file (overridden by LA_BRIDGE__* variables)
    #[arg(long, env = "LA_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// GA4 measurement id (overrides config)
    #[arg(long)]
    measurement_id: Option<String>,

    /// Simulate a page with gtag loaded
    #[arg(long, default_value_t = false)]
    gtag: bool,

    /// `src` of the booking iframe on the simulated page
    #[arg(long, default_value = "https://book.mylimobiz.com/v4/widget")]
    iframe_src: String,

    /// Enable debug logging (overrides config)
    #[arg(long, default_value_t = false)]
    debug: bool,
}

/// One inbound cross-document message.
#[derive(Debug, Deserialize)]
struct Envelope {
    origin: String,
    #[serde(default)]
    data: Value,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = BridgeConfig::load_with_file(cli.config.as_ref());
    let debug_enabled = cli.debug || loaded.as_ref().is_ok_and(|c| c.debug);

    let default_filter = if debug_enabled {
        "la_bridge=debug,la_bridge_web=debug,la_bridge_core=debug"
    } else {
        "la_bridge=info,la_bridge_web=info,la_bridge_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let mut config = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        BridgeConfig::default()
    });

    // Apply CLI overrides
    if let Some(id) = cli.measurement_id {
        config.measurement_id = Some(id);
    }
    config.debug = debug_enabled;
    config.validate()?;

    info!(
        mode = ?config.mode,
        event_prefix = %config.event_prefix,
        allowed_origins = %config.allowed_origins.join(","),
        min_height = config.min_height,
        max_height = config.max_height,
        "Configuration loaded"
    );

    let layer = Arc::new(DataLayer::new());
    let env = Arc::new(HostEnvironment::new(layer.clone()));
    let gtag = Arc::new(RecordingGtag::new());
    if cli.gtag {
        env.install_gtag(gtag.clone());
    }

    let document = Arc::new(InMemoryDocument::new());
    let frame = Arc::new(InMemoryFrame::new(cli.iframe_src));
    document.attach(frame.clone());

    let mut bridge = MessageBridge::init(&config, env, document);

    let summary = match cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            replay(&mut bridge, file).await?
        }
        None => replay(&mut bridge, tokio::io::stdin()).await?,
    };

    let mut stdout = tokio::io::stdout();
    for record in layer.records() {
        stdout
            .write_all(format!("{}\n", json!({ "dataLayer": record })).as_bytes())
            .await?;
    }
    for (name, params) in gtag.calls() {
        stdout
            .write_all(format!("{}\n", json!({ "gtag": [name, params] })).as_bytes())
            .await?;
    }
    stdout
        .write_all(
            format!(
                "{}\n",
                json!({
                    "iframeHeight": frame.style_height(),
                    "transport": bridge.transport(),
                    "summary": summary,
                })
            )
            .as_bytes(),
        )
        .await?;
    stdout.flush().await?;

    Ok(())
}

/// Per-run tallies of routing outcomes.
#[derive(Debug, Default, serde::Serialize)]
struct ReplaySummary {
    lines: u64,
    malformed: u64,
    ignored: u64,
    duplicates: u64,
    resized: u64,
    dispatched: u64,
    fallbacks: u64,
}

async fn replay<R>(bridge: &mut MessageBridge, reader: R) -> anyhow::Result<ReplaySummary>
where
    R: AsyncRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        let envelope: Envelope = match serde_json::from_str(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                summary.malformed += 1;
                warn!(line = summary.lines, error = %e, "skipping malformed envelope");
                continue;
            }
        };

        let outcome = bridge.on_message(&envelope.origin, &envelope.data);
        debug!(line = summary.lines, outcome = ?outcome, "message handled");
        match outcome {
            MessageOutcome::Ignored(_) => summary.ignored += 1,
            MessageOutcome::Duplicate => summary.duplicates += 1,
            MessageOutcome::Resized(_) => summary.resized += 1,
            MessageOutcome::Dispatched { delivered } => {
                summary.dispatched += 1;
                if !delivered {
                    summary.fallbacks += 1;
                }
            }
        }
    }

    info!(
        lines = summary.lines,
        dispatched = summary.dispatched,
        ignored = summary.ignored,
        "replay finished"
    );
    Ok(summary)
}
