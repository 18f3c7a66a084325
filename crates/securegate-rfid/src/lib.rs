//! Contactless card scanner engine.
//!
//! This crate drives ACR1252U-class contactless readers: it watches each
//! reader for cards, reads the UID of every card that arrives, optionally
//! authenticates and reads the badge data block, and publishes the result
//! to a [`CardState`] the control layer reads from.
//!
//! # Architecture
//!
//! ```text
//! Scanner::start
//!   ├─ transport::enumerate_contactless      reader descriptors containing "PICC"
//!   ├─ transport::connect_and_transmit       buzzer mute/unmute (direct mode)
//!   └─ PresenceMonitor::run (one task per reader)
//!        ├─ transport::open_with_fallback    T=0, T=1, T=15, raw
//!        ├─ identify::identify               ATR -> card family
//!        ├─ uid::extract_uid                 get-UID, byte-reversed
//!        ├─ auth::read_block_with_retry      key A / key B, read block 8
//!        └─ CardState::publish
//! ```
//!
//! # Example
//!
//! ```no_run
//! use securegate_hardware::mock::MockBackend;
//! use securegate_rfid::{CardState, Scanner, ScannerConfig};
//!
//! #[tokio::main]
//! async fn main() -> securegate_rfid::Result<()> {
//!     let backend = MockBackend::new();
//!     backend.add_reader("Mock Reader PICC 0");
//!
//!     let state = CardState::new();
//!     let scanner = Scanner::new(backend, ScannerConfig::default(), state.clone());
//!     let handle = scanner.start().await?;
//!
//!     let mut updates = state.subscribe();
//!     while updates.changed().await.is_ok() {
//!         if let Some(card) = updates.borrow_and_update().clone() {
//!             println!("{} on {}", card.uid, card.reader);
//!         }
//!     }
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod apdu;
pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod identify;
pub mod monitor;
pub mod retry;
pub mod state;
pub mod transport;
pub mod uid;

pub use apdu::{Command, Feedback};
pub use config::ScannerConfig;
pub use controller::{Scanner, ScannerHandle, ShutdownReport};
pub use error::{AuthError, DecodeError, Result, ScanError, TransportError};
pub use monitor::{PollAction, PresenceMonitor, PresenceTracker};
pub use state::{CardState, ReaderSlot};
pub use uid::UidReading;
