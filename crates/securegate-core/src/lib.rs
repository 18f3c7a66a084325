//! Domain types shared by the SecureGate card scanner crates.
//!
//! Everything here is free of hardware access: status words, card
//! identifiers, card families, presence states and the snapshot published
//! to the control layer.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
