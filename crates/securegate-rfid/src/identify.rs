//! Card family identification from the Answer-To-Reset.
//!
//! PC/SC readers synthesize a storage-card ATR for contactless cards
//! (PC/SC part 3, `3B 8F 80 01 80 4F 0C A0 00 00 03 06 ...`) in which the
//! card name byte and the checksum vary by family. Matching is exact:
//! an ATR that differs in any byte is [`CardType::Unknown`].
//!
//! The Ultralight C entry is the literal two-byte ATR `3B 00`. It matches
//! an ATR consisting of exactly those two bytes and nothing longer.

use securegate_core::CardType;

const ATR_TABLE: [(&[u8], CardType); 7] = [
    (
        &[
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x01, 0x00, 0x00, 0x00, 0x00, 0x6A,
        ],
        CardType::MifareClassic1K,
    ),
    (
        &[
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x00, 0x69,
        ],
        CardType::MifareClassic4K,
    ),
    (
        &[
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x03, 0x00, 0x00, 0x00, 0x00, 0x68,
        ],
        CardType::MifareUltralight,
    ),
    (&[0x3B, 0x00], CardType::MifareUltralightC),
    (
        &[
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x04, 0x00, 0x00, 0x00, 0x00, 0x67,
        ],
        CardType::MifarePlus,
    ),
    (
        &[
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x05, 0x00, 0x00, 0x00, 0x00, 0x66,
        ],
        CardType::MifarePlusEv1,
    ),
    (
        &[
            0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00,
            0x06, 0x00, 0x00, 0x00, 0x00, 0x65,
        ],
        CardType::MifarePlusEv2,
    ),
];

/// Resolve the card family from an ATR.
///
/// # Examples
///
/// ```
/// use securegate_core::CardType;
/// use securegate_rfid::identify::identify;
///
/// assert_eq!(identify(&[0x3B, 0x00]), CardType::MifareUltralightC);
/// assert_eq!(identify(&[0x3B, 0x00, 0x01]), CardType::Unknown);
/// ```
pub fn identify(atr: &[u8]) -> CardType {
    ATR_TABLE
        .iter()
        .find(|(known, _)| *known == atr)
        .map_or(CardType::Unknown, |(_, card_type)| *card_type)
}

/// Every ATR the identifier recognizes, with its card family.
pub fn known_atrs() -> impl Iterator<Item = (&'static [u8], CardType)> {
    ATR_TABLE.iter().copied()
}

/// Render an ATR as space-separated uppercase hex (`3B 8F 80 ...`).
pub fn format_atr(atr: &[u8]) -> String {
    atr.iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
