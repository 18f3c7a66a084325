//! Constants for the contactless reader engine.
//!
//! Values are taken from the ACR1252U reader API reference (pseudo-APDUs
//! addressed to the reader with class byte `FF`) and from the timing the
//! scanner has always used in the field.
//!
//! # Usage
//!
//! ```
//! use securegate_core::constants::*;
//! use std::time::Duration;
//!
//! let absent = Duration::from_millis(DEFAULT_ABSENT_POLL_MS);
//! let present = Duration::from_millis(DEFAULT_PRESENT_POLL_MS);
//! assert!(present < absent);
//! ```

// ============================================================================
// Status Words
// ============================================================================

/// SW1 of a successful command (`90 00`).
pub const SW1_SUCCESS: u8 = 0x90;

/// SW2 of a successful command (`90 00`).
pub const SW2_SUCCESS: u8 = 0x00;

/// SW1 of a failed authentication that may be retried with the other key (`63 00`).
pub const SW1_AUTH_RETRY: u8 = 0x63;

/// SW2 of a failed authentication that may be retried with the other key (`63 00`).
pub const SW2_AUTH_RETRY: u8 = 0x00;

// ============================================================================
// Card Memory Layout
// ============================================================================

/// Block holding the badge identifier on provisioned cards.
///
/// Block 8 is the first block of sector 2 on MIFARE Classic cards.
pub const DATA_BLOCK: u8 = 8;

/// Number of bytes read from [`DATA_BLOCK`].
pub const DATA_BLOCK_LENGTH: u8 = 16;

/// Reader key slot holding the sector key used for authentication.
pub const KEY_SLOT: u8 = 0x00;

/// Key type byte for MIFARE key A.
pub const KEY_TYPE_A: u8 = 0x60;

/// Key type byte for MIFARE key B.
pub const KEY_TYPE_B: u8 = 0x61;

/// Largest UID, in bytes, that fits a [`CardUid`](crate::CardUid).
pub const MAX_UID_BYTES: usize = 16;

// ============================================================================
// Reader Discovery
// ============================================================================

/// Substring identifying the contactless (PICC) interface of a reader.
///
/// Dual-interface readers expose a contact slot (`SAM`) and a contactless
/// slot (`PICC`) as separate PC/SC readers; only the latter is scanned.
pub const CONTACTLESS_MARKER: &str = "PICC";

// ============================================================================
// Timing
// ============================================================================

/// Delay between connect attempts while no card is on the reader.
///
/// Bounds CPU use without a noticeable increase in tap-to-read latency.
pub const DEFAULT_ABSENT_POLL_MS: u64 = 250;

/// Delay between connect attempts while a processed card is still present.
///
/// Shorter than [`DEFAULT_ABSENT_POLL_MS`] so removal is noticed promptly.
pub const DEFAULT_PRESENT_POLL_MS: u64 = 100;

/// Upper bound for a single transmit on a physical reader.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 2000;

/// Number of authenticate-and-read attempts per card.
pub const DEFAULT_READ_ATTEMPTS: u32 = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_words() {
        assert_eq!((SW1_SUCCESS, SW2_SUCCESS), (0x90, 0x00));
        assert_eq!((SW1_AUTH_RETRY, SW2_AUTH_RETRY), (0x63, 0x00));
    }

    #[test]
    fn test_poll_intervals() {
        assert!(DEFAULT_PRESENT_POLL_MS < DEFAULT_ABSENT_POLL_MS);
        assert!(DEFAULT_COMMAND_TIMEOUT_MS > DEFAULT_ABSENT_POLL_MS);
    }

    #[test]
    fn test_key_types_differ() {
        assert_ne!(KEY_TYPE_A, KEY_TYPE_B);
    }
}
