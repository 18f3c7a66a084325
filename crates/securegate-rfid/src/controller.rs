//! Reader lifecycle controller.
//!
//! [`Scanner::start`] finds the contactless readers, configures the buzzer
//! on each one and spawns one [`PresenceMonitor`] task per reader. Monitors
//! share nothing but the [`CardState`]; a reader that faults only stalls
//! its own task.

use crate::apdu::{Command, Feedback};
use crate::config::ScannerConfig;
use crate::error::{Result, ScanError};
use crate::monitor::PresenceMonitor;
use crate::state::CardState;
use crate::transport::{connect_and_transmit, enumerate_contactless};
use securegate_hardware::{AnyBackend, AnyReader, CardReader, ReaderBackend, Response};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Card scanner over a set of readers.
///
/// # Examples
///
/// ```
/// use securegate_hardware::mock::{MockBackend, MockCard};
/// use securegate_rfid::{CardState, Scanner, ScannerConfig};
///
/// #[tokio::main]
/// async fn main() -> securegate_rfid::Result<()> {
///     let backend = MockBackend::new();
///     let reader = backend.add_reader("Mock Reader PICC 0");
///     reader.insert_card(MockCard::new([0x04, 0xA1, 0xB2, 0xC3]));
///
///     let scanner = Scanner::new(backend, ScannerConfig::default(), CardState::new());
///     let handle = scanner.start().await?;
///     assert_eq!(handle.readers(), ["Mock Reader PICC 0"]);
///
///     let report = handle.shutdown().await;
///     assert_eq!(report.stopped, 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Scanner {
    backend: AnyBackend,
    config: ScannerConfig,
    state: CardState,
    started: AtomicBool,
}

impl Scanner {
    pub fn new(backend: impl Into<AnyBackend>, config: ScannerConfig, state: CardState) -> Self {
        Self {
            backend: backend.into(),
            config,
            state,
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn state(&self) -> &CardState {
        &self.state
    }

    /// Enumerate readers and start one monitor per contactless reader.
    ///
    /// A scanner starts at most once; a failed start may be retried.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The scanner was already started
    /// - No contactless reader could be opened
    pub async fn start(&self) -> Result<ScannerHandle> {
        self.config.validate()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ScanError::AlreadyStarted);
        }

        match self.spawn_monitors().await {
            Ok(handle) => Ok(handle),
            Err(e) => {
                self.started.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn spawn_monitors(&self) -> Result<ScannerHandle> {
        let names = enumerate_contactless(&self.backend, &self.config.reader_marker).await;

        let cancel = CancellationToken::new();
        let mut tasks = JoinSet::new();
        let mut readers = Vec::with_capacity(names.len());

        for name in names {
            let reader = match self.backend.open_reader(&name) {
                Ok(reader) => reader,
                Err(e) => {
                    warn!(reader = %name, error = %e, "cannot open reader, skipping");
                    continue;
                }
            };

            self.prepare_reader(&reader).await;

            let monitor = PresenceMonitor::new(reader, self.config.clone(), self.state.clone());
            let token = cancel.child_token();
            let task_name = name.clone();
            tasks.spawn(async move {
                monitor.run(token).await;
                task_name
            });
            readers.push(name);
        }

        if readers.is_empty() {
            return Err(ScanError::NoReaders {
                marker: self.config.reader_marker.clone(),
            });
        }

        info!(count = readers.len(), "scanner started");
        Ok(ScannerHandle {
            readers,
            cancel,
            tasks,
            state: self.state.clone(),
        })
    }

    /// Set the buzzer and optionally log the firmware version.
    ///
    /// Best-effort: failures are logged and the reader is scanned anyway.
    async fn prepare_reader(&self, reader: &AnyReader) {
        let buzzer = if self.config.mute_buzzer {
            Command::Mute
        } else {
            Command::Unmute
        };

        match connect_and_transmit(reader, &buzzer).await {
            Ok(response) if response.is_success() => {
                debug!(reader = reader.name(), %buzzer, "buzzer configured");
            }
            Ok(response) => {
                warn!(
                    reader = reader.name(),
                    %buzzer,
                    status = %response.status,
                    "buzzer command rejected"
                );
            }
            Err(e) => {
                warn!(
                    reader = reader.name(),
                    %buzzer,
                    error = %e,
                    "could not configure buzzer, continuing"
                );
            }
        }

        if self.config.query_firmware {
            match connect_and_transmit(reader, &Command::FirmwareVersion).await {
                Ok(response) => {
                    let firmware = firmware_text(&response);
                    info!(reader = reader.name(), %firmware, "reader firmware");
                }
                Err(e) => warn!(reader = reader.name(), error = %e, "firmware query failed"),
            }
        }
    }

    /// Play a feedback pattern on a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader cannot be opened or the command
    /// cannot be delivered.
    pub async fn signal(&self, reader: &str, feedback: Feedback) -> Result<()> {
        let reader = self.backend.open_reader(reader)?;
        let command = Command::from(feedback);

        let response = connect_and_transmit(&reader, &command).await?;
        if !response.is_success() {
            warn!(reader = reader.name(), %command, status = %response.status, "feedback rejected");
        }
        Ok(())
    }
}

/// The ACR1252U answers the firmware query with the bare version string and
/// no status word, so the last two characters land in `status`.
fn firmware_text(response: &Response) -> String {
    let mut raw = response.data.to_vec();
    if !response.is_success() {
        raw.extend([response.status.sw1, response.status.sw2]);
    }
    String::from_utf8_lossy(&raw).trim().to_string()
}

/// Running scanner.
///
/// Dropping the handle aborts the monitor tasks; [`shutdown`](Self::shutdown)
/// stops them cooperatively.
#[derive(Debug)]
pub struct ScannerHandle {
    readers: Vec<String>,
    cancel: CancellationToken,
    tasks: JoinSet<String>,
    state: CardState,
}

impl ScannerHandle {
    /// Readers being monitored.
    pub fn readers(&self) -> &[String] {
        &self.readers
    }

    pub fn state(&self) -> &CardState {
        &self.state
    }

    /// Number of monitor tasks not yet joined.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every monitor and wait for the tasks to finish.
    pub async fn shutdown(mut self) -> ShutdownReport {
        self.cancel.cancel();

        let mut report = ShutdownReport::default();
        while let Some(result) = self.tasks.join_next().await {
            match classify_task_result(result) {
                TaskTermination::Stopped(reader) => {
                    debug!(%reader, "monitor joined");
                    report.stopped += 1;
                }
                TaskTermination::Cancelled => report.cancelled += 1,
                TaskTermination::Panic(message) => {
                    error!(error = %message, "monitor task panicked");
                    report.panicked += 1;
                }
            }
        }

        info!(
            stopped = report.stopped,
            cancelled = report.cancelled,
            panicked = report.panicked,
            "scanner stopped"
        );
        report
    }
}

/// How the monitor tasks ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Monitors that observed the cancellation and returned.
    pub stopped: usize,

    /// Monitors aborted before they could return.
    pub cancelled: usize,

    /// Monitors that panicked.
    pub panicked: usize,
}

#[derive(Debug)]
enum TaskTermination {
    Stopped(String),
    Cancelled,
    Panic(String),
}

fn classify_task_result(
    result: std::result::Result<String, tokio::task::JoinError>,
) -> TaskTermination {
    match result {
        Ok(reader) => TaskTermination::Stopped(reader),
        Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
        Err(e) => TaskTermination::Panic(e.to_string()),
    }
}
