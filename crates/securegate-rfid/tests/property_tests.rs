//! Property-based tests for UID decoding and ATR identification.

use proptest::prelude::*;
use securegate_core::CardType;
use securegate_rfid::UidReading;
use securegate_rfid::identify::{format_atr, identify, known_atrs};

/// Strategy for ATRs that are not in the identification table.
fn unknown_atr() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..33)
        .prop_filter("ATR must not be a known one", |atr| {
            known_atrs().all(|(known, _)| known != atr.as_slice())
        })
}

proptest! {
    /// Property: any ATR outside the table resolves to Unknown.
    #[test]
    fn prop_unknown_atr_is_unknown(atr in unknown_atr()) {
        prop_assert_eq!(identify(&atr), CardType::Unknown);
    }

    /// Property: flipping any single byte of a known ATR makes it unknown.
    #[test]
    fn prop_single_byte_change_is_unknown(
        index in 0usize..20,
        delta in 1u8..=255,
        table_row in 0usize..7,
    ) {
        let (atr, _) = known_atrs().nth(table_row).unwrap();
        prop_assume!(index < atr.len());

        let mut changed = atr.to_vec();
        changed[index] = changed[index].wrapping_add(delta);
        prop_assert_eq!(identify(&changed), CardType::Unknown);
    }

    /// Property: the canonical UID is the big-endian value of the reversed
    /// 4-byte payload.
    #[test]
    fn prop_uid_is_reversed_payload(payload in any::<[u8; 4]>()) {
        let reading = UidReading::decode(&payload).unwrap();

        let mut reversed = payload;
        reversed.reverse();
        let expected = u128::from_str_radix(&hex::encode(reversed), 16).unwrap();
        prop_assert_eq!(reading.reversed.value(), expected);
        prop_assert_eq!(reading.forward.value(), u128::from(u32::from_be_bytes(payload)));
    }

    /// Property: reversing twice gives back the forward reading.
    #[test]
    fn prop_double_reversal_is_identity(payload in prop::collection::vec(any::<u8>(), 1..=16)) {
        let reading = UidReading::decode(&payload).unwrap();

        let reversed_payload: Vec<u8> = payload.iter().rev().copied().collect();
        let twice = UidReading::decode(&reversed_payload).unwrap();
        prop_assert_eq!(twice.reversed, reading.forward);
        prop_assert_eq!(twice.forward, reading.reversed);
    }

    /// Property: format_atr prints three characters per byte, minus the last space.
    #[test]
    fn prop_format_atr_length(atr in prop::collection::vec(any::<u8>(), 1..33)) {
        prop_assert_eq!(format_atr(&atr).len(), atr.len() * 3 - 1);
    }
}
