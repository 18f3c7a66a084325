//! Simulated readers for testing and development.
//!
//! The mock backend behaves like a PC/SC service with a configurable set of
//! readers. Each reader is driven through a [`MockReaderHandle`] that places
//! and removes cards and injects faults.

pub mod reader;

pub use reader::{
    CLASSIC_1K_ATR, MockBackend, MockCard, MockConnection, MockReader, MockReaderHandle,
};
