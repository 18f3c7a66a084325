//! End-to-end scanner tests over the mock backend.
//!
//! Time is paused, so the poll intervals advance instantly and the tests
//! can reason about how many polls a wait covers.

mod common;

use common::{AUTH_KEY_A, GET_UID, READ_BLOCK, backend_with, badge, scanner};
use securegate_core::{CardPayload, CardUid, PresenceState};
use securegate_rfid::{Feedback, ScannerConfig};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_card_arrival_read_and_removal() {
    let (backend, handles) = backend_with(&["ACS ACR1252 1S CL Reader PICC 0"]);
    let reader = &handles[0];
    let (scanner, state) = scanner(&backend, ScannerConfig::default());

    let handle = scanner.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!state.is_card_present());
    assert_eq!(state.current_uid(), None);

    reader.insert_card(badge([0x04, 0xA1, 0xB2, 0xC3], "BADGE-0042"));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(state.is_card_present());
    assert_eq!(state.present_uid(), Some(CardUid::new(0xC3B2A104)));
    let snapshot = state.snapshot().unwrap();
    assert_eq!(snapshot.payload, Some(CardPayload::Text("BADGE-0042".to_string())));

    // Many polls while the card rests on the reader, one extraction.
    assert_eq!(reader.transmit_count(&GET_UID), 1);
    assert_eq!(reader.transmit_count(&READ_BLOCK), 1);

    reader.remove_card();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!state.is_card_present());
    assert_eq!(state.present_uid(), None);
    assert_eq!(state.current_uid(), Some(CardUid::new(0xC3B2A104)));
    assert_eq!(
        state.reader("ACS ACR1252 1S CL Reader PICC 0").unwrap().presence,
        PresenceState::Absent
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reinserted_card_is_read_again() {
    let (backend, handles) = backend_with(&["Reader PICC 0"]);
    let reader = &handles[0];
    let (scanner, state) = scanner(&backend, ScannerConfig::default());
    let handle = scanner.start().await.unwrap();

    for _ in 0..3 {
        reader.insert_card(badge([0x01, 0x02, 0x03, 0x04], "A"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        reader.remove_card();
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    assert_eq!(reader.transmit_count(&GET_UID), 3);
    assert_eq!(state.current_uid(), Some(CardUid::new(0x04030201)));
    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_fault_on_one_reader_does_not_affect_other() {
    let (backend, handles) = backend_with(&["Reader PICC 0", "Reader PICC 1"]);
    let (faulty, healthy) = (&handles[0], &handles[1]);
    let (scanner, state) = scanner(&backend, ScannerConfig::default());
    let handle = scanner.start().await.unwrap();

    healthy.insert_card(badge([0x0A, 0x0B, 0x0C, 0x0D], "HEALTHY"));
    tokio::time::sleep(Duration::from_secs(1)).await;
    let before = state.reader("Reader PICC 1").unwrap();

    faulty.insert_card(badge([0x01, 0x02, 0x03, 0x04], "FAULTY"));
    faulty.fail_transmits(true);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let after = state.reader("Reader PICC 1").unwrap();
    assert_eq!(after, before);
    assert_eq!(after.snapshot.unwrap().uid, CardUid::new(0x0D0C0B0A));

    // The faulty reader saw its card but published no UID.
    let faulty_slot = state.reader("Reader PICC 0").unwrap();
    assert!(faulty_slot.presence.is_present());
    assert!(faulty_slot.snapshot.is_none());

    let report = handle.shutdown().await;
    assert_eq!(report.stopped, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unplugged_reader_keeps_polling() {
    let (backend, handles) = backend_with(&["Reader PICC 0"]);
    let reader = &handles[0];
    let (scanner, state) = scanner(&backend, ScannerConfig::default());
    let handle = scanner.start().await.unwrap();

    reader.set_unplugged(true);
    tokio::time::sleep(Duration::from_secs(2)).await;
    reader.set_unplugged(false);

    reader.insert_card(badge([0x01, 0x02, 0x03, 0x04], "BACK"));
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(state.current_uid(), Some(CardUid::new(0x04030201)));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_auth_retries_before_giving_up() {
    let (backend, handles) = backend_with(&["Reader PICC 0"]);
    let reader = &handles[0];
    let config = ScannerConfig {
        read_attempts: 3,
        ..Default::default()
    };
    let (scanner, state) = scanner(&backend, config);
    let handle = scanner.start().await.unwrap();

    let denied = vec![0x69, 0x82];
    reader.insert_card(
        badge([0x01, 0x02, 0x03, 0x04], "LOCKED")
            .with_responses(&AUTH_KEY_A, std::iter::repeat_n(denied, 5)),
    );
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(reader.transmit_count(&AUTH_KEY_A), 3);
    assert_eq!(reader.transmit_count(&READ_BLOCK), 0);
    let snapshot = state.snapshot().unwrap();
    assert_eq!(snapshot.uid, CardUid::new(0x04030201));
    assert_eq!(snapshot.payload, None);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_each_card() {
    let (backend, handles) = backend_with(&["Reader PICC 0"]);
    let reader = &handles[0];
    let (scanner, state) = scanner(&backend, ScannerConfig::default());
    let mut updates = state.subscribe();
    let handle = scanner.start().await.unwrap();

    reader.insert_card(badge([0x01, 0x02, 0x03, 0x04], "FIRST"));
    updates.changed().await.unwrap();
    let first = updates.borrow_and_update().clone().unwrap();
    assert_eq!(first.payload, Some(CardPayload::Text("FIRST".to_string())));
    assert_eq!(first.reader, "Reader PICC 0");

    handle.shutdown().await;
}

#[tokio::test]
async fn test_signal_while_scanning() {
    let (backend, handles) = backend_with(&["Reader PICC 0"]);
    let (scanner, _state) = scanner(&backend, ScannerConfig::default());
    let handle = scanner.start().await.unwrap();

    scanner
        .signal("Reader PICC 0", Feedback::Engaged)
        .await
        .unwrap();
    assert_eq!(
        handles[0].transmit_count(&[0xFF, 0x00, 0x40, 0x50, 0x04, 0x02, 0x02, 0x02, 0x01]),
        1
    );

    handle.shutdown().await;
}
