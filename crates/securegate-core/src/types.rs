use crate::{
    Result,
    constants::{MAX_UID_BYTES, SW1_AUTH_RETRY, SW1_SUCCESS, SW2_AUTH_RETRY, SW2_SUCCESS},
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Two-byte outcome code (SW1, SW2) returned with every APDU response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusWord {
    pub sw1: u8,
    pub sw2: u8,
}

impl StatusWord {
    /// `90 00`: command completed.
    pub const SUCCESS: Self = Self::new(SW1_SUCCESS, SW2_SUCCESS);

    /// `63 00`: authentication refused, another key may be tried.
    pub const AUTH_RETRY: Self = Self::new(SW1_AUTH_RETRY, SW2_AUTH_RETRY);

    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    #[must_use]
    pub fn is_auth_retry(&self) -> bool {
        *self == Self::AUTH_RETRY
    }

    /// Split a raw response buffer into payload and trailing status word.
    ///
    /// # Errors
    /// Returns `Error::InvalidStatusWord` if the buffer is shorter than two bytes.
    pub fn split_response(raw: &[u8]) -> Result<(&[u8], Self)> {
        match raw {
            [data @ .., sw1, sw2] => Ok((data, Self::new(*sw1, *sw2))),
            _ => Err(Error::InvalidStatusWord(raw.len())),
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X} {:02X}", self.sw1, self.sw2)
    }
}

impl TryFrom<&[u8]> for StatusWord {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [sw1, sw2] => Ok(Self::new(*sw1, *sw2)),
            _ => Err(Error::InvalidStatusWord(bytes.len())),
        }
    }
}

/// Canonical numeric card identifier.
///
/// Zero is reserved as the "no UID" sentinel ([`CardUid::NONE`]); readers
/// never report an all-zero UID for a real card.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CardUid(u128);

impl CardUid {
    /// Sentinel published when no UID could be extracted.
    pub const NONE: Self = Self(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    /// Interpret `bytes` as a big-endian integer.
    ///
    /// Equivalent to hex-encoding the bytes in order and parsing the result
    /// as base 16.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardUid` if `bytes` is empty or longer than
    /// [`MAX_UID_BYTES`].
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidCardUid("empty UID".to_string()));
        }
        if bytes.len() > MAX_UID_BYTES {
            return Err(Error::InvalidCardUid(format!(
                "UID must be at most {MAX_UID_BYTES} bytes, got {}",
                bytes.len()
            )));
        }
        let value = bytes
            .iter()
            .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));
        Ok(Self(value))
    }

    /// Interpret `bytes` in reverse order (last byte most significant).
    ///
    /// This is the ordering the reader's get-UID response must be read in to
    /// obtain the identifier printed on provisioned badges.
    ///
    /// # Errors
    /// Same as [`CardUid::from_be_bytes`].
    pub fn from_reversed_bytes(bytes: &[u8]) -> Result<Self> {
        let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
        Self::from_be_bytes(&reversed)
    }

    #[must_use]
    pub fn value(&self) -> u128 {
        self.0
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Uppercase hexadecimal rendering without leading zeros.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("{:X}", self.0)
    }
}

impl fmt::Display for CardUid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardUid {
    type Err = Error;

    /// Parses a decimal UID, or a hexadecimal one when prefixed with `0x`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u128::from_str_radix(hex, 16),
            None => s.parse::<u128>(),
        };
        parsed
            .map(Self)
            .map_err(|_| Error::InvalidCardUid(s.to_string()))
    }
}

/// Card family resolved from the Answer-To-Reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    MifareClassic1K,
    MifareClassic4K,
    MifareUltralight,
    MifareUltralightC,
    MifarePlus,
    MifarePlusEv1,
    MifarePlusEv2,
    Unknown,
}

impl CardType {
    /// Human-readable family name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::MifareClassic1K => "MIFARE Classic 1K",
            Self::MifareClassic4K => "MIFARE Classic 4K",
            Self::MifareUltralight => "MIFARE Ultralight",
            Self::MifareUltralightC => "MIFARE Ultralight C",
            Self::MifarePlus => "MIFARE Plus",
            Self::MifarePlusEv1 => "MIFARE Plus EV1",
            Self::MifarePlusEv2 => "MIFARE Plus EV2",
            Self::Unknown => "Unknown",
        }
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of the two-stage key A / key B authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthResult {
    Success,
    Fail,
    Error,
}

/// Per-reader card presence as seen by the polling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// No card answered the last connect attempt.
    #[default]
    Absent,

    /// A card just arrived and has not been read yet.
    PresentUnprocessed,

    /// The card on the reader has been read; waiting for removal.
    PresentProcessed,
}

impl PresenceState {
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Absent => "Absent",
            Self::PresentUnprocessed => "PresentUnprocessed",
            Self::PresentProcessed => "PresentProcessed",
        };
        f.write_str(name)
    }
}

/// Data block contents read after a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CardPayload {
    /// Every byte was printable ASCII; surrounding whitespace trimmed.
    Text(String),

    /// At least one byte outside the printable ASCII range.
    Binary(Vec<u8>),
}

impl CardPayload {
    /// Decode a raw block.
    ///
    /// Returns `None` when there is nothing to report: an empty block, or a
    /// printable block that trims down to an empty string.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() {
            return None;
        }
        if bytes.iter().all(|b| (32..=126).contains(b)) {
            let text = String::from_utf8_lossy(bytes).trim().to_string();
            return (!text.is_empty()).then_some(Self::Text(text));
        }
        Some(Self::Binary(bytes.to_vec()))
    }
}

impl fmt::Display for CardPayload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Binary(bytes) => write!(f, "Binary Data: {}", hex::encode_upper(bytes)),
        }
    }
}

/// Everything learned about one card during one presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Reader the card was presented to.
    pub reader: String,

    /// Canonical (byte-reversed) UID.
    pub uid: CardUid,

    /// UID in the byte order the reader returned it.
    pub forward_uid: CardUid,

    pub card_type: CardType,

    /// Data block contents, when reading was enabled and succeeded.
    pub payload: Option<CardPayload>,

    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_status_word_constants() {
        assert!(StatusWord::SUCCESS.is_success());
        assert!(StatusWord::AUTH_RETRY.is_auth_retry());
        assert!(!StatusWord::new(0x6A, 0x82).is_success());
        assert_eq!(StatusWord::new(0x6A, 0x82).to_string(), "6A 82");
    }

    #[test]
    fn test_split_response() {
        let (data, sw) = StatusWord::split_response(&[0x04, 0xA1, 0x90, 0x00]).unwrap();
        assert_eq!(data, &[0x04, 0xA1]);
        assert!(sw.is_success());

        let (data, sw) = StatusWord::split_response(&[0x63, 0x00]).unwrap();
        assert!(data.is_empty());
        assert!(sw.is_auth_retry());

        assert!(StatusWord::split_response(&[0x90]).is_err());
    }

    #[test]
    fn test_status_word_try_from() {
        let sw = StatusWord::try_from(&[0x90u8, 0x00][..]).unwrap();
        assert!(sw.is_success());
        assert!(StatusWord::try_from(&[0x90u8][..]).is_err());
    }

    #[rstest]
    #[case(&[0x04, 0x03, 0x02, 0x01], 0x0403_0201)]
    #[case(&[0x01], 1)]
    #[case(&[0x00, 0x0A], 10)]
    fn test_card_uid_from_be_bytes(#[case] bytes: &[u8], #[case] expected: u128) {
        assert_eq!(CardUid::from_be_bytes(bytes).unwrap().value(), expected);
    }

    #[test]
    fn test_card_uid_reversed() {
        let uid = CardUid::from_reversed_bytes(&[0x04, 0x03, 0x02, 0x01]).unwrap();
        assert_eq!(uid.value(), 0x0102_0304);
        assert_eq!(uid.to_string(), "16909060");
        assert_eq!(uid.to_hex(), "1020304");
    }

    #[test]
    fn test_card_uid_keeps_low_nibble_bytes() {
        // Every byte contributes two hex digits, even when below 0x10.
        let uid = CardUid::from_reversed_bytes(&[0x05, 0x0A]).unwrap();
        assert_eq!(uid.value(), 0x0A05);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0u8; 17])]
    fn test_card_uid_invalid_length(#[case] bytes: &[u8]) {
        assert!(CardUid::from_be_bytes(bytes).is_err());
    }

    #[rstest]
    #[case("16909060", 16909060)]
    #[case("0x01020304", 0x0102_0304)]
    #[case(" 42 ", 42)]
    fn test_card_uid_from_str(#[case] input: &str, #[case] expected: u128) {
        let uid: CardUid = input.parse().unwrap();
        assert_eq!(uid.value(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("0xZZ")]
    #[case("")]
    fn test_card_uid_from_str_invalid(#[case] input: &str) {
        assert!(input.parse::<CardUid>().is_err());
    }

    #[test]
    fn test_card_uid_sentinel() {
        assert!(CardUid::NONE.is_none());
        assert!(CardUid::default().is_none());
        assert!(!CardUid::new(1).is_none());
    }

    #[test]
    fn test_card_type_names() {
        assert_eq!(CardType::MifareClassic1K.to_string(), "MIFARE Classic 1K");
        assert_eq!(CardType::MifarePlusEv2.to_string(), "MIFARE Plus EV2");
        assert_eq!(CardType::Unknown.to_string(), "Unknown");
        assert!(!CardType::Unknown.is_known());
    }

    #[test]
    fn test_presence_state() {
        assert_eq!(PresenceState::default(), PresenceState::Absent);
        assert!(!PresenceState::Absent.is_present());
        assert!(PresenceState::PresentUnprocessed.is_present());
        assert!(PresenceState::PresentProcessed.is_present());
    }

    #[test]
    fn test_payload_ascii_is_trimmed() {
        let payload = CardPayload::decode(&[0x41, 0x42, 0x20]).unwrap();
        assert_eq!(payload, CardPayload::Text("AB".to_string()));
        assert_eq!(payload.to_string(), "AB");
    }

    #[test]
    fn test_payload_binary_hex_dump() {
        let payload = CardPayload::decode(&[0x00, 0xFF]).unwrap();
        assert_eq!(payload, CardPayload::Binary(vec![0x00, 0xFF]));
        assert!(payload.to_string().contains("00FF"));
        assert!(payload.to_string().starts_with("Binary Data: "));
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0x20, 0x20, 0x20])]
    fn test_payload_nothing_to_report(#[case] bytes: &[u8]) {
        assert_eq!(CardPayload::decode(bytes), None);
    }

    #[test]
    fn test_payload_boundaries() {
        // 0x7E is printable, 0x7F is not.
        assert!(matches!(
            CardPayload::decode(&[0x7E, 0x41]),
            Some(CardPayload::Text(_))
        ));
        assert!(matches!(
            CardPayload::decode(&[0x7F, 0x41]),
            Some(CardPayload::Binary(_))
        ));
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = CardSnapshot {
            reader: "ACS ACR1252 1S CL Reader PICC 0".to_string(),
            uid: CardUid::new(16909060),
            forward_uid: CardUid::new(0x0403_0201),
            card_type: CardType::MifareClassic1K,
            payload: Some(CardPayload::Text("BADGE-0042".to_string())),
            observed_at: Utc::now(),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: CardSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
