//! Reader access trait definitions.
//!
//! These traits are the hardware-access boundary of the scanner: listing
//! reader descriptors, opening a connection under a given share mode and
//! link protocol, and exchanging raw APDU frames. Everything above this
//! boundary (command table, authentication, presence tracking) is written
//! against these traits and never against a concrete backend.
//!
//! Methods are native `async fn` (edition 2024), so no `async_trait` macro.
//! The traits are not object-safe; the enum wrappers in
//! [`devices`](crate::devices) provide dispatch over backends.

#![allow(async_fn_in_trait)]

use bytes::Bytes;
use securegate_core::StatusWord;
use std::fmt;

use crate::error::Result;

/// How a connection shares the reader with other applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShareMode {
    /// Normal card session; requires a card in the field.
    Shared,

    /// Talk to the reader itself; succeeds without a card.
    Direct,
}

/// Link protocol negotiated for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkProtocol {
    /// Character-oriented half-duplex.
    T0,

    /// Block-oriented half-duplex.
    T1,

    /// Reserved for future use by ISO 7816-3; some drivers accept it for
    /// reader-level commands.
    T15,

    /// Raw frames, no transmission protocol.
    Raw,

    /// Let the backend pick T=0 or T=1.
    Any,
}

/// Order in which link protocols are tried when opening a connection.
pub const PROTOCOL_FALLBACK: [LinkProtocol; 4] = [
    LinkProtocol::T0,
    LinkProtocol::T1,
    LinkProtocol::T15,
    LinkProtocol::Raw,
];

impl fmt::Display for LinkProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T0 => write!(f, "T=0"),
            Self::T1 => write!(f, "T=1"),
            Self::T15 => write!(f, "T=15"),
            Self::Raw => write!(f, "RAW"),
            Self::Any => write!(f, "ANY"),
        }
    }
}

/// Response to a transmitted frame: payload plus trailing status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response data without the status word.
    pub data: Bytes,

    /// SW1/SW2 outcome code.
    pub status: StatusWord,
}

impl Response {
    /// Create a response from its parts.
    pub fn new(data: impl Into<Bytes>, status: StatusWord) -> Self {
        Self {
            data: data.into(),
            status,
        }
    }

    /// Split a raw receive buffer into data and status word.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than the two status bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let (data, status) = StatusWord::split_response(raw)?;
        Ok(Self::new(Bytes::copy_from_slice(data), status))
    }

    /// Check if the status word is `90 00`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Source of reader descriptors.
///
/// # Examples
///
/// ```no_run
/// use securegate_hardware::traits::{CardReader, ReaderBackend};
/// use securegate_hardware::error::Result;
///
/// async fn print_readers<B: ReaderBackend>(backend: &B) -> Result<()> {
///     for name in backend.list_readers().await? {
///         let reader = backend.open_reader(&name)?;
///         println!("{}", reader.name());
///     }
///     Ok(())
/// }
/// ```
pub trait ReaderBackend: Send + Sync {
    /// Reader handle produced by this backend.
    type Reader: CardReader;

    /// List the descriptors of every attached reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader service cannot be queried.
    async fn list_readers(&self) -> Result<Vec<String>>;

    /// Obtain a handle to the reader with the given descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor does not name a reader.
    fn open_reader(&self, name: &str) -> Result<Self::Reader>;
}

/// A physical contactless interface.
pub trait CardReader: Send + Sync {
    /// Session type produced by [`connect`](CardReader::connect).
    type Connection: CardConnection;

    /// Reader descriptor.
    fn name(&self) -> &str;

    /// Open a connection under exactly one link protocol.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No card is in the field (`ShareMode::Shared` only)
    /// - The reader refuses the requested protocol
    /// - The reader is disconnected
    async fn connect(&self, mode: ShareMode, protocol: LinkProtocol) -> Result<Self::Connection>;
}

/// An open session on a reader.
pub trait CardConnection: Send {
    /// Link protocol this session was opened with.
    fn protocol(&self) -> LinkProtocol;

    /// Answer-To-Reset of the card in the field.
    ///
    /// # Errors
    ///
    /// Returns an error if the card left the field or the reader fails.
    async fn atr(&mut self) -> Result<Vec<u8>>;

    /// Send one command frame and wait for the response.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The card was removed mid-session
    /// - The reader does not answer in time
    /// - The response is shorter than a status word
    async fn transmit(&mut self, frame: &[u8]) -> Result<Response>;

    /// Close the session, leaving the card powered.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend reports a failure while releasing
    /// the session.
    async fn disconnect(self) -> Result<()>;
}
