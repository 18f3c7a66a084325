//! `securegate`: run the contactless badge scanner from the command line.
//!
//! ```text
//! securegate readers                 list readers, marking the contactless ones
//! securegate scan [--json]           print every badge read until Ctrl-C
//! securegate send <reader> <cmd>     send one named or hex command
//! ```
//!
//! `--simulate` replaces the PC/SC service with a simulated reader.

mod config;
mod simulate;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use config::Overrides;
use securegate_core::CardSnapshot;
use securegate_hardware::{AnyBackend, ReaderBackend};
use securegate_rfid::transport::connect_and_transmit;
use securegate_rfid::{CardState, Command as ReaderCommand, Feedback, Scanner, ScannerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "securegate", version, about = "Contactless badge reader engine")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long, env = "SECUREGATE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Use a simulated reader instead of PC/SC
    #[arg(long, global = true)]
    simulate: bool,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// List attached readers
    Readers,

    /// Watch the contactless readers and print each badge
    Scan {
        /// One JSON object per line
        #[arg(long)]
        json: bool,

        /// Flash the success pattern on the reader after each read
        #[arg(long)]
        feedback: bool,
    },

    /// Send one command to a reader and print the response
    Send {
        /// Full reader descriptor
        reader: String,

        /// Command name (mute, unmute, getuid, firmver, auth1, auth2, data,
        /// success, invalid, engaged) or hex bytes
        command: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::load(cli.config.as_deref(), &cli.overrides)?;
    let (backend, simulation) = open_backend(cli.simulate, &config)?;

    let result = match cli.action {
        Action::Readers => list_readers(&backend, &config.reader_marker).await,
        Action::Scan { json, feedback } => scan(backend, config, json, feedback).await,
        Action::Send { reader, command } => send(&backend, &reader, &command).await,
    };

    if let Some(task) = simulation {
        task.abort();
    }
    result
}

fn open_backend(
    simulate: bool,
    config: &ScannerConfig,
) -> Result<(AnyBackend, Option<JoinHandle<()>>)> {
    if simulate {
        let (backend, task) = simulate::start(Duration::from_secs(3));
        info!(reader = simulate::SIMULATED_READER, "using simulated reader");
        return Ok((backend.into(), Some(task)));
    }
    Ok((hardware_backend(config)?, None))
}

#[cfg(feature = "hardware-pcsc")]
fn hardware_backend(config: &ScannerConfig) -> Result<AnyBackend> {
    use securegate_hardware::pcsc_backend::PcscBackend;

    let backend = PcscBackend::establish(config.command_timeout())
        .context("failed to establish PC/SC context")?;
    Ok(backend.into())
}

#[cfg(not(feature = "hardware-pcsc"))]
fn hardware_backend(_config: &ScannerConfig) -> Result<AnyBackend> {
    bail!("built without PC/SC support; rebuild with `--features hardware-pcsc` or pass --simulate")
}

async fn list_readers(backend: &AnyBackend, marker: &str) -> Result<()> {
    let names = backend.list_readers().await.context("failed to list readers")?;
    if names.is_empty() {
        println!("no readers attached");
    }
    for name in names {
        let kind = if name.contains(marker) { "contactless" } else { "other" };
        println!("{name}\t[{kind}]");
    }
    Ok(())
}

async fn scan(
    backend: AnyBackend,
    config: ScannerConfig,
    json: bool,
    feedback: bool,
) -> Result<()> {
    let state = CardState::new();
    let scanner = Scanner::new(backend, config, state.clone());
    let handle = scanner.start().await.context("failed to start scanner")?;
    info!(readers = ?handle.readers(), "scanning, press Ctrl-C to stop");

    let mut updates = state.subscribe();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(card) = updates.borrow_and_update().clone() else {
                    continue;
                };
                println!("{}", render(&card, json)?);

                if feedback && let Err(e) = scanner.signal(&card.reader, Feedback::Success).await {
                    warn!(reader = %card.reader, error = %e, "feedback failed");
                }
            }
        }
    }

    let report = handle.shutdown().await;
    if report.panicked > 0 {
        bail!("{} monitor task(s) panicked", report.panicked);
    }
    Ok(())
}

fn render(card: &CardSnapshot, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(card)?);
    }

    let data = card
        .payload
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    Ok(format!(
        "{} {} uid={} ({}) type=\"{}\" data={}",
        card.observed_at.to_rfc3339(),
        card.reader,
        card.uid,
        card.uid.to_hex(),
        card.card_type,
        data
    ))
}

async fn send(backend: &AnyBackend, reader: &str, input: &str) -> Result<()> {
    let command = ReaderCommand::resolve(input)
        .with_context(|| format!("`{input}` is neither a command name nor hex bytes"))?;
    let reader_handle = backend
        .open_reader(reader)
        .with_context(|| format!("failed to open {reader}"))?;

    let response = connect_and_transmit(&reader_handle, &command).await?;
    let data = if response.data.is_empty() {
        "(no data)".to_string()
    } else {
        hex::encode_upper(&response.data)
    };
    println!("{command}: {data} [{}]", response.status);
    Ok(())
}
