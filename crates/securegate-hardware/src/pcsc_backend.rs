//! PC/SC backend.
//!
//! Talks to the system smart-card service (pcsc-lite on Linux, WinSCard on
//! Windows) through the `pcsc` crate. Every service call blocks, so each one
//! runs on the blocking pool and is bounded by the configured command
//! timeout; a reader that stops answering fails the call instead of
//! stalling the scanner.

use crate::traits::{CardConnection, CardReader, LinkProtocol, ReaderBackend, Response, ShareMode};
use crate::{HardwareError, Result};
use pcsc::{Attribute, Card, Context, Disposition, Protocols, Scope};
use std::ffi::CString;
use std::time::Duration;
use tracing::{debug, warn};

/// Backend over the system PC/SC service.
#[derive(Clone)]
pub struct PcscBackend {
    context: Context,
    command_timeout: Duration,
}

impl std::fmt::Debug for PcscBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscBackend")
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl PcscBackend {
    /// Establish a user-scope context with the PC/SC service.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ServiceUnavailable`] if the service is not
    /// running or refuses the context.
    pub fn establish(command_timeout: Duration) -> Result<Self> {
        let context = Context::establish(Scope::User).map_err(|e| {
            HardwareError::service_unavailable(format!("PC/SC context: {e}"))
        })?;
        debug!(timeout_ms = command_timeout.as_millis() as u64, "PC/SC context established");

        Ok(Self {
            context,
            command_timeout,
        })
    }
}

impl ReaderBackend for PcscBackend {
    type Reader = PcscReader;

    async fn list_readers(&self) -> Result<Vec<String>> {
        let context = self.context.clone();
        let names = run_blocking(self.command_timeout, move || {
            match context.list_readers_owned() {
                Ok(names) => Ok(names),
                Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
                Err(e) => Err(e),
            }
        })
        .await?
        .map_err(HardwareError::from)?;

        Ok(names
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn open_reader(&self, name: &str) -> Result<PcscReader> {
        let descriptor = CString::new(name)
            .map_err(|_| HardwareError::malformed(format!("reader name contains NUL: {name}")))?;

        Ok(PcscReader {
            context: self.context.clone(),
            descriptor,
            name: name.to_string(),
            command_timeout: self.command_timeout,
        })
    }
}

/// Reader exposed by the PC/SC service.
#[derive(Clone)]
pub struct PcscReader {
    context: Context,
    descriptor: CString,
    name: String,
    command_timeout: Duration,
}

impl std::fmt::Debug for PcscReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscReader")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

fn protocols_for(protocol: LinkProtocol) -> Result<Protocols> {
    match protocol {
        LinkProtocol::T0 => Ok(Protocols::T0),
        LinkProtocol::T1 => Ok(Protocols::T1),
        LinkProtocol::Raw => Ok(Protocols::RAW),
        LinkProtocol::Any => Ok(Protocols::ANY),
        LinkProtocol::T15 => Err(HardwareError::unsupported("T=15 link protocol")),
    }
}

impl CardReader for PcscReader {
    type Connection = PcscConnection;

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, mode: ShareMode, protocol: LinkProtocol) -> Result<PcscConnection> {
        let protocols = protocols_for(protocol)?;
        let share = match mode {
            ShareMode::Shared => pcsc::ShareMode::Shared,
            ShareMode::Direct => pcsc::ShareMode::Direct,
        };

        let context = self.context.clone();
        let descriptor = self.descriptor.clone();
        let card = run_blocking(self.command_timeout, move || {
            context.connect(&descriptor, share, protocols)
        })
        .await?
        .map_err(|e| map_card_error(&self.name, e))?;

        Ok(PcscConnection {
            reader: self.name.clone(),
            card: Some(card),
            protocol,
            command_timeout: self.command_timeout,
        })
    }
}

/// Open PC/SC card session.
pub struct PcscConnection {
    reader: String,

    /// Moved onto the blocking pool for each call; `None` after a call
    /// timed out and the session was abandoned.
    card: Option<Card>,

    protocol: LinkProtocol,
    command_timeout: Duration,
}

impl std::fmt::Debug for PcscConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscConnection")
            .field("reader", &self.reader)
            .field("protocol", &self.protocol)
            .field("open", &self.card.is_some())
            .finish()
    }
}

impl PcscConnection {
    async fn with_card<T, F>(&mut self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Card) -> std::result::Result<T, pcsc::Error> + Send + 'static,
    {
        let card = self
            .card
            .take()
            .ok_or_else(|| HardwareError::reader_unavailable(&self.reader))?;

        let (card, result) = run_blocking(self.command_timeout, move || {
            let result = op(&card);
            (card, result)
        })
        .await?;

        self.card = Some(card);
        result.map_err(|e| map_card_error(&self.reader, e))
    }
}

impl CardConnection for PcscConnection {
    fn protocol(&self) -> LinkProtocol {
        self.protocol
    }

    async fn atr(&mut self) -> Result<Vec<u8>> {
        self.with_card(|card| card.get_attribute_owned(Attribute::AtrString))
            .await
    }

    async fn transmit(&mut self, frame: &[u8]) -> Result<Response> {
        let frame = frame.to_vec();
        let raw = self
            .with_card(move |card| {
                let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE];
                card.transmit(&frame, &mut buffer).map(<[u8]>::to_vec)
            })
            .await?;

        Response::from_raw(&raw)
    }

    async fn disconnect(mut self) -> Result<()> {
        let Some(card) = self.card.take() else {
            return Ok(());
        };

        run_blocking(self.command_timeout, move || {
            card.disconnect(Disposition::LeaveCard)
                .map_err(|(_card, e)| e)
        })
        .await?
        .map_err(|e| map_card_error(&self.reader, e))
    }
}

/// Run a blocking PC/SC call on the blocking pool, bounded by `timeout`.
async fn run_blocking<T, F>(timeout: Duration, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(op)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_error)) => Err(HardwareError::link(format!(
            "PC/SC call aborted: {join_error}"
        ))),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "PC/SC call timed out");
            Err(HardwareError::timeout(timeout.as_millis() as u64))
        }
    }
}

fn map_card_error(reader: &str, error: pcsc::Error) -> HardwareError {
    match error {
        pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard | pcsc::Error::ResetCard => {
            HardwareError::no_card(reader)
        }
        pcsc::Error::ReaderUnavailable | pcsc::Error::UnknownReader => {
            HardwareError::reader_unavailable(reader)
        }
        pcsc::Error::Timeout => HardwareError::timeout(0),
        other => HardwareError::from(other),
    }
}
