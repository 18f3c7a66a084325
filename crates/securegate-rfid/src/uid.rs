//! UID extraction.
//!
//! The get-UID response carries the UID least significant byte first, so
//! the canonical identifier is the big-endian integer of the reversed
//! payload. The as-received ordering is kept alongside it for diagnostics.

use crate::apdu::Command;
use crate::error::DecodeError;
use crate::transport::transmit;
use securegate_core::{CardUid, constants::MAX_UID_BYTES};
use securegate_hardware::CardConnection;
use tracing::{debug, warn};

/// Decoded get-UID response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidReading {
    /// Payload bytes as returned by the reader.
    pub raw: Vec<u8>,

    /// Big-endian integer of the payload as received.
    pub forward: CardUid,

    /// Big-endian integer of the reversed payload; the published identifier.
    pub reversed: CardUid,
}

impl UidReading {
    /// Decode a get-UID payload.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Empty`] for an empty payload and
    /// [`DecodeError::TooLong`] for one that exceeds [`MAX_UID_BYTES`].
    ///
    /// # Examples
    ///
    /// ```
    /// use securegate_rfid::uid::UidReading;
    ///
    /// let reading = UidReading::decode(&[0x04, 0xA1, 0xB2, 0xC3]).unwrap();
    /// assert_eq!(reading.reversed.value(), 0xC3B2A104);
    /// assert_eq!(reading.forward.value(), 0x04A1B2C3);
    /// ```
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Empty);
        }
        if payload.len() > MAX_UID_BYTES {
            return Err(DecodeError::TooLong(payload.len()));
        }

        let forward =
            CardUid::from_be_bytes(payload).map_err(|_| DecodeError::TooLong(payload.len()))?;
        let reversed = CardUid::from_reversed_bytes(payload)
            .map_err(|_| DecodeError::TooLong(payload.len()))?;

        Ok(Self {
            raw: payload.to_vec(),
            forward,
            reversed,
        })
    }

    /// Reading that stands for "no UID".
    pub fn none() -> Self {
        Self {
            raw: Vec::new(),
            forward: CardUid::NONE,
            reversed: CardUid::NONE,
        }
    }

    pub fn is_none(&self) -> bool {
        self.reversed.is_none()
    }
}

/// Send get-UID and decode the response.
///
/// # Errors
///
/// Returns a [`DecodeError`] when the transmit fails, the status word is
/// not `90 00` or the payload cannot be decoded.
pub async fn read_uid<C: CardConnection>(conn: &mut C) -> Result<UidReading, DecodeError> {
    let response = transmit(conn, &Command::GetUid).await?;
    if !response.is_success() {
        return Err(DecodeError::Status(response.status));
    }
    UidReading::decode(&response.data)
}

/// Read the UID, or [`UidReading::none`] when no usable UID comes back.
///
/// A failed read and an all-zero UID both yield the sentinel reading, whose
/// `reversed` identifier is [`CardUid::NONE`]. Failures are logged, never
/// returned.
pub async fn extract_uid<C: CardConnection>(conn: &mut C) -> UidReading {
    match read_uid(conn).await {
        Ok(reading) if reading.reversed.is_none() => {
            warn!(raw = %hex::encode_upper(&reading.raw), "card reported an all-zero UID");
            UidReading::none()
        }
        Ok(reading) => {
            debug!(
                uid = %reading.reversed,
                forward = %reading.forward,
                raw = %hex::encode_upper(&reading.raw),
                "UID extracted"
            );
            reading
        }
        Err(e) => {
            warn!(error = %e, "UID extraction failed");
            UidReading::none()
        }
    }
}
