//! Reader access layer for the SecureGate contactless scanner.
//!
//! This crate owns everything that touches a reader: enumerating reader
//! descriptors, opening sessions under a share mode and link protocol, and
//! exchanging raw APDU frames. The scanner logic in `securegate-rfid` is
//! written against the traits defined here, so it runs unchanged against
//! simulated readers in tests and against the PC/SC service in production.
//!
//! # Backends
//!
//! - [`mock`]: in-memory readers driven by a control handle. Always built.
//! - `pcsc_backend`: the system PC/SC service. Requires the `hardware-pcsc` feature,
//!   which links against pcsc-lite (Linux) or WinSCard (Windows).
//!
//! [`devices::AnyBackend`] wraps the available backends for callers that
//! pick one at runtime.
//!
//! # Example
//!
//! ```no_run
//! use securegate_hardware::traits::{
//!     CardConnection, CardReader, LinkProtocol, ReaderBackend, ShareMode,
//! };
//! use securegate_hardware::Result;
//!
//! async fn first_uid<B: ReaderBackend>(backend: &B) -> Result<Vec<u8>> {
//!     let names = backend.list_readers().await?;
//!     let Some(name) = names.iter().find(|name| name.contains("PICC")) else {
//!         return Ok(Vec::new());
//!     };
//!
//!     let reader = backend.open_reader(name)?;
//!     let mut conn = reader.connect(ShareMode::Shared, LinkProtocol::T1).await?;
//!     let response = conn.transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00]).await?;
//!     conn.disconnect().await?;
//!
//!     Ok(response.data.to_vec())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`] with [`HardwareError`]. Card-absence
//! conditions (no card, card removed, reader gone) can be told apart from
//! genuine faults with [`HardwareError::is_card_absent`].

pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc_backend;
pub mod traits;

pub use devices::{AnyBackend, AnyConnection, AnyReader};
pub use error::{HardwareError, Result};
pub use traits::{
    CardConnection, CardReader, LinkProtocol, PROTOCOL_FALLBACK, ReaderBackend, Response, ShareMode,
};
