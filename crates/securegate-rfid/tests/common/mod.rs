//! Shared helpers for scanner integration tests.

#![allow(dead_code)]

use securegate_hardware::mock::{MockBackend, MockCard, MockReaderHandle};
use securegate_rfid::{CardState, Scanner, ScannerConfig};

pub const GET_UID: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];
pub const READ_BLOCK: [u8; 5] = [0xFF, 0xB0, 0x00, 0x08, 0x10];
pub const AUTH_KEY_A: [u8; 10] = [0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, 0x08, 0x60, 0x00];

/// A provisioned badge: 4-byte UID and a text identifier in block 8.
pub fn badge(uid: [u8; 4], id: &str) -> MockCard {
    let mut block = id.as_bytes().to_vec();
    block.resize(16, b' ');
    MockCard::new(uid).with_block(block)
}

/// Backend with one contactless reader per name.
pub fn backend_with(names: &[&str]) -> (MockBackend, Vec<MockReaderHandle>) {
    let backend = MockBackend::new();
    let handles = names.iter().map(|name| backend.add_reader(*name)).collect();
    (backend, handles)
}

pub fn scanner(backend: &MockBackend, config: ScannerConfig) -> (Scanner, CardState) {
    let state = CardState::new();
    let scanner = Scanner::new(backend.clone(), config, state.clone());
    (scanner, state)
}
