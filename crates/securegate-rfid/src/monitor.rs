//! Per-reader presence monitor.
//!
//! The reader reports no insertion or removal events; presence is inferred
//! from whether a shared connect succeeds. [`PresenceTracker`] turns that
//! stream of connect results into actions:
//!
//! ```text
//! Absent             --connect ok-->   PresentUnprocessed   (extract)
//! PresentUnprocessed --extracted-->    PresentProcessed
//! PresentProcessed   --connect ok-->   PresentProcessed     (hold)
//! Present*           --connect fail--> Absent               (removed)
//! Absent             --connect fail--> Absent               (idle)
//! ```
//!
//! Extraction therefore runs once per insertion, however long the card
//! stays on the reader.

use crate::auth::read_block_with_retry;
use crate::config::ScannerConfig;
use crate::identify::{format_atr, identify};
use crate::state::CardState;
use crate::transport::open_with_fallback;
use crate::uid::extract_uid;
use chrono::Utc;
use securegate_core::{CardSnapshot, PresenceState};
use securegate_hardware::{CardConnection, CardReader, ShareMode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span};

/// What the monitor should do after one connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// A card arrived; read it.
    Extract,

    /// The card already read is still present.
    Hold,

    /// The card left the reader.
    Removed,

    /// Still no card.
    Idle,
}

/// Presence state machine for one reader.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    state: PresenceState,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Feed the result of one connect attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use securegate_rfid::monitor::{PollAction, PresenceTracker};
    ///
    /// let mut tracker = PresenceTracker::new();
    /// assert_eq!(tracker.observe(false), PollAction::Idle);
    /// assert_eq!(tracker.observe(true), PollAction::Extract);
    /// tracker.mark_processed();
    /// assert_eq!(tracker.observe(true), PollAction::Hold);
    /// assert_eq!(tracker.observe(false), PollAction::Removed);
    /// ```
    pub fn observe(&mut self, connected: bool) -> PollAction {
        match (self.state, connected) {
            (PresenceState::Absent, true) => {
                self.state = PresenceState::PresentUnprocessed;
                PollAction::Extract
            }
            (PresenceState::PresentUnprocessed, true) => PollAction::Extract,
            (PresenceState::PresentProcessed, true) => PollAction::Hold,
            (PresenceState::Absent, false) => PollAction::Idle,
            (_, false) => {
                self.state = PresenceState::Absent;
                PollAction::Removed
            }
        }
    }

    /// Record that the card currently present has been read.
    pub fn mark_processed(&mut self) {
        if self.state == PresenceState::PresentUnprocessed {
            self.state = PresenceState::PresentProcessed;
        }
    }
}

/// Polling loop for one reader.
pub struct PresenceMonitor<R> {
    reader: R,
    config: ScannerConfig,
    state: CardState,
    tracker: PresenceTracker,
}

impl<R: CardReader> PresenceMonitor<R> {
    pub fn new(reader: R, config: ScannerConfig, state: CardState) -> Self {
        Self {
            reader,
            config,
            state,
            tracker: PresenceTracker::new(),
        }
    }

    pub fn presence(&self) -> PresenceState {
        self.tracker.state()
    }

    /// Delay before the next poll in the current presence state.
    pub fn next_interval(&self) -> Duration {
        if self.tracker.state().is_present() {
            self.config.present_interval()
        } else {
            self.config.absent_interval()
        }
    }

    /// Run one connect attempt and act on it.
    ///
    /// Returns the delay before the next poll. Nothing that happens while
    /// reading a card escapes this call.
    pub async fn poll_once(&mut self) -> Duration {
        let name = self.reader.name().to_string();

        match open_with_fallback(&self.reader, ShareMode::Shared).await {
            Ok(mut conn) => {
                if self.tracker.observe(true) == PollAction::Extract {
                    self.state.set_presence(&name, PresenceState::PresentUnprocessed);
                    self.extract(&name, &mut conn).await;
                    self.tracker.mark_processed();
                    self.state.set_presence(&name, PresenceState::PresentProcessed);
                }
                if let Err(e) = conn.disconnect().await {
                    debug!(error = %e, "disconnect failed");
                }
            }
            Err(e) => {
                if self.tracker.observe(false) == PollAction::Removed {
                    info!("card removed");
                    self.state.set_presence(&name, PresenceState::Absent);
                } else if !e.is_card_absent() {
                    debug!(error = %e, "connect failed");
                }
            }
        }

        self.next_interval()
    }

    async fn extract<C: CardConnection>(&self, name: &str, conn: &mut C) {
        let atr = conn.atr().await.unwrap_or_else(|e| {
            debug!(error = %e, "ATR unavailable");
            Vec::new()
        });
        let card_type = identify(&atr);
        info!(%card_type, atr = %format_atr(&atr), "card detected");

        let reading = extract_uid(conn).await;
        if reading.is_none() {
            debug!("no usable UID, nothing published");
            return;
        }

        let payload = if self.config.read_data {
            read_block_with_retry(conn, self.config.read_attempts).await
        } else {
            None
        };

        match &payload {
            Some(data) => info!(uid = %reading.reversed, %data, "card read"),
            None => info!(uid = %reading.reversed, "card read, no data"),
        }
        self.state.publish(CardSnapshot {
            reader: name.to_string(),
            uid: reading.reversed,
            forward_uid: reading.forward,
            card_type,
            payload,
            observed_at: Utc::now(),
        });
    }

    /// Poll until `cancel` fires.
    ///
    /// Cancellation is checked before every poll and interrupts the wait
    /// between polls; a poll in progress is allowed to finish.
    pub async fn run(mut self, cancel: CancellationToken) {
        let span = info_span!("reader", name = %self.reader.name());

        async move {
            info!("monitor started");
            self.state.set_presence(self.reader.name(), PresenceState::Absent);

            while !cancel.is_cancelled() {
                let delay = self.poll_once().await;
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            info!("monitor stopped");
        }
        .instrument(span)
        .await;
    }
}
