//! Simulated reader for running without hardware.

use securegate_hardware::mock::{MockBackend, MockCard, MockReaderHandle};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

pub const SIMULATED_READER: &str = "SecureGate Simulated Reader PICC 0";

/// Badges presented in turn by the simulation.
fn demo_cards() -> Vec<MockCard> {
    vec![
        MockCard::new([0x04, 0xA1, 0xB2, 0xC3]).with_block(b"BADGE-0042      ".to_vec()),
        MockCard::new([0x04, 0x5E, 0x71, 0x2A, 0x9C, 0x3B, 0x80]),
        MockCard::new([0xDE, 0xAD, 0xBE, 0xEF])
            .with_block([0x00, 0x01, 0x02, 0x03, 0xFF, 0xFE, 0xFD, 0xFC, 0, 0, 0, 0, 0, 0, 0, 0]),
    ]
}

/// Create a backend with one simulated reader and start tapping badges on it.
///
/// Each badge stays on the reader for `dwell`, followed by an empty reader
/// for the same time. Abort the returned task to stop.
pub fn start(dwell: Duration) -> (MockBackend, JoinHandle<()>) {
    let backend = MockBackend::new();
    let handle = backend.add_reader(SIMULATED_READER);
    let task = tokio::spawn(present_badges(handle, dwell));
    (backend, task)
}

async fn present_badges(reader: MockReaderHandle, dwell: Duration) {
    let cards = demo_cards();
    for card in cards.iter().cycle() {
        tokio::time::sleep(dwell).await;
        info!(uid = %hex::encode_upper(card.uid()), "simulated badge presented");
        reader.insert_card(card.clone());

        tokio::time::sleep(dwell).await;
        info!("simulated badge removed");
        reader.remove_card();
    }
}
