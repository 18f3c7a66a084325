//! Published card state.
//!
//! [`CardState`] is the only state shared between the per-reader monitor
//! tasks and the control layer. Each reader writes its own [`ReaderSlot`];
//! the global accessors (`current_uid`, `snapshot`) reflect the most recent
//! publication from any reader.
//!
//! # Examples
//!
//! ```
//! use securegate_core::CardUid;
//! use securegate_rfid::CardState;
//!
//! let state = CardState::new();
//! assert_eq!(state.current_uid(), None);
//! assert!(!state.is_card_present());
//!
//! state.force_set_uid(Some(CardUid::new(3_281_429_764)));
//! assert_eq!(state.current_uid(), Some(CardUid::new(3_281_429_764)));
//! ```

use parking_lot::RwLock;
use securegate_core::{CardSnapshot, CardUid, PresenceState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// What one reader last published.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderSlot {
    pub presence: PresenceState,

    /// Last card extracted on this reader; kept after the card leaves.
    pub snapshot: Option<CardSnapshot>,
}

#[derive(Debug, Default)]
struct Inner {
    readers: HashMap<String, ReaderSlot>,
    current_uid: Option<CardUid>,
    latest: Option<CardSnapshot>,

    /// UID of the card sitting on each reader, tagged with its publication
    /// number. Dropped when the reader reports the card gone.
    on_reader: HashMap<String, (u64, CardUid)>,
    publications: u64,
}

/// Cloneable handle to the published card state.
#[derive(Debug, Clone)]
pub struct CardState {
    inner: Arc<RwLock<Inner>>,
    updates: Arc<watch::Sender<Option<CardSnapshot>>>,
}

impl Default for CardState {
    fn default() -> Self {
        Self::new()
    }
}

impl CardState {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            updates: Arc::new(updates),
        }
    }

    /// Last published UID, from any reader or from [`force_set_uid`](Self::force_set_uid).
    pub fn current_uid(&self) -> Option<CardUid> {
        self.inner.read().current_uid
    }

    /// Check if any reader currently holds a card.
    pub fn is_card_present(&self) -> bool {
        self.inner
            .read()
            .readers
            .values()
            .any(|slot| slot.presence.is_present())
    }

    /// UID of a card that is on a reader right now.
    ///
    /// With cards on several readers, the most recently published one wins.
    /// `None` when no reader holds a card that was read.
    pub fn present_uid(&self) -> Option<CardUid> {
        self.inner
            .read()
            .on_reader
            .values()
            .max_by_key(|(publication, _)| *publication)
            .map(|(_, uid)| *uid)
    }

    /// Override the published UID, bypassing the readers.
    pub fn force_set_uid(&self, uid: Option<CardUid>) {
        self.inner.write().current_uid = uid;
    }

    /// State published by one reader.
    pub fn reader(&self, name: &str) -> Option<ReaderSlot> {
        self.inner.read().readers.get(name).cloned()
    }

    /// Names of every reader that has published anything.
    pub fn reader_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().readers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Most recent snapshot from any reader.
    pub fn snapshot(&self) -> Option<CardSnapshot> {
        self.inner.read().latest.clone()
    }

    /// Receive every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<CardSnapshot>> {
        self.updates.subscribe()
    }

    /// Record the presence state of a reader.
    pub fn set_presence(&self, reader: &str, presence: PresenceState) {
        let mut inner = self.inner.write();
        inner.readers.entry(reader.to_string()).or_default().presence = presence;
        if !presence.is_present() {
            inner.on_reader.remove(reader);
        }
    }

    /// Publish an extracted card.
    pub fn publish(&self, snapshot: CardSnapshot) {
        {
            let mut inner = self.inner.write();
            let slot = inner.readers.entry(snapshot.reader.clone()).or_default();
            slot.snapshot = Some(snapshot.clone());
            if slot.presence.is_present() {
                inner.publications += 1;
                let publication = inner.publications;
                inner
                    .on_reader
                    .insert(snapshot.reader.clone(), (publication, snapshot.uid));
            }
            inner.current_uid = Some(snapshot.uid);
            inner.latest = Some(snapshot.clone());
        }
        self.updates.send_replace(Some(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use securegate_core::CardType;

    fn snapshot(reader: &str, uid: u128) -> CardSnapshot {
        CardSnapshot {
            reader: reader.to_string(),
            uid: CardUid::new(uid),
            forward_uid: CardUid::new(uid.swap_bytes()),
            card_type: CardType::MifareClassic1K,
            payload: None,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = CardState::new();
        assert_eq!(state.current_uid(), None);
        assert_eq!(state.present_uid(), None);
        assert_eq!(state.snapshot(), None);
        assert!(state.reader("Reader PICC 0").is_none());
    }

    #[test]
    fn test_publish_and_presence() {
        let state = CardState::new();
        state.set_presence("Reader PICC 0", PresenceState::PresentUnprocessed);
        state.publish(snapshot("Reader PICC 0", 42));

        assert!(state.is_card_present());
        assert_eq!(state.current_uid(), Some(CardUid::new(42)));
        assert_eq!(state.present_uid(), Some(CardUid::new(42)));

        state.set_presence("Reader PICC 0", PresenceState::Absent);
        assert!(!state.is_card_present());
        assert_eq!(state.current_uid(), Some(CardUid::new(42)));
        assert_eq!(state.present_uid(), None);

        let slot = state.reader("Reader PICC 0").unwrap();
        assert_eq!(slot.presence, PresenceState::Absent);
        assert_eq!(slot.snapshot.unwrap().uid, CardUid::new(42));
    }

    #[test]
    fn test_readers_are_namespaced() {
        let state = CardState::new();
        state.publish(snapshot("Reader PICC 0", 1));
        state.publish(snapshot("Reader PICC 1", 2));

        let uid_on = |name: &str| state.reader(name).unwrap().snapshot.unwrap().uid;
        assert_eq!(uid_on("Reader PICC 0"), CardUid::new(1));
        assert_eq!(uid_on("Reader PICC 1"), CardUid::new(2));
        assert_eq!(state.current_uid(), Some(CardUid::new(2)));
        assert_eq!(state.reader_names(), vec!["Reader PICC 0", "Reader PICC 1"]);
    }

    #[test]
    fn test_present_uid_ignores_card_removed_elsewhere() {
        let state = CardState::new();
        state.set_presence("Reader PICC 0", PresenceState::PresentUnprocessed);
        state.publish(snapshot("Reader PICC 0", 0xAA));
        state.set_presence("Reader PICC 1", PresenceState::PresentUnprocessed);
        state.publish(snapshot("Reader PICC 1", 0xBB));
        assert_eq!(state.present_uid(), Some(CardUid::new(0xBB)));

        state.set_presence("Reader PICC 1", PresenceState::Absent);
        assert_eq!(state.present_uid(), Some(CardUid::new(0xAA)));
        assert_eq!(state.current_uid(), Some(CardUid::new(0xBB)));

        state.set_presence("Reader PICC 0", PresenceState::Absent);
        assert_eq!(state.present_uid(), None);
    }

    #[test]
    fn test_present_uid_skips_previous_card_on_same_reader() {
        let state = CardState::new();
        state.set_presence("Reader PICC 0", PresenceState::PresentUnprocessed);
        state.publish(snapshot("Reader PICC 0", 7));
        state.set_presence("Reader PICC 0", PresenceState::Absent);

        // A new card arrives but its UID has not been read.
        state.set_presence("Reader PICC 0", PresenceState::PresentProcessed);
        assert!(state.is_card_present());
        assert_eq!(state.present_uid(), None);
    }

    #[test]
    fn test_force_set_uid() {
        let state = CardState::new();
        state.publish(snapshot("Reader PICC 0", 7));

        state.force_set_uid(None);
        assert_eq!(state.current_uid(), None);

        state.force_set_uid(Some(CardUid::new(99)));
        assert_eq!(state.current_uid(), Some(CardUid::new(99)));
        assert_eq!(state.snapshot().unwrap().uid, CardUid::new(7));
    }

    #[tokio::test]
    async fn test_subscribe_receives_publications() {
        let state = CardState::new();
        let mut updates = state.subscribe();

        let writer = state.clone();
        tokio::spawn(async move {
            writer.publish(snapshot("Reader PICC 0", 5));
        });

        updates.changed().await.unwrap();
        let received = updates.borrow_and_update().clone().unwrap();
        assert_eq!(received.uid, CardUid::new(5));
    }
}
