//! APDU command table.
//!
//! Every frame the scanner sends is one of the fixed commands below. They are
//! ACR1252U pseudo-APDUs (class `FF`) interpreted by the reader firmware,
//! which forwards the card-level ones (get UID, authenticate, read binary)
//! to the card in the field.
//!
//! [`Command::Raw`] is the only way to send an arbitrary frame; it exists for
//! diagnostics (`securegate send`) and is never built from card data.

use bytes::Bytes;
use securegate_core::constants::{DATA_BLOCK, DATA_BLOCK_LENGTH, KEY_SLOT, KEY_TYPE_A, KEY_TYPE_B};
use std::fmt;

const MUTE: [u8; 5] = [0xFF, 0x00, 0x52, 0x00, 0x00];
const UNMUTE: [u8; 5] = [0xFF, 0x00, 0x52, 0xFF, 0x00];
const GET_UID: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];
const FIRMWARE_VERSION: [u8; 5] = [0xFF, 0x00, 0x48, 0x00, 0x00];

// LED and buzzer control: FF 00 40 <LED state> 04 <T1> <T2> <repetitions> <buzzer>
const SIGNAL_SUCCESS: [u8; 9] = [0xFF, 0x00, 0x40, 0xA0, 0x04, 0x08, 0x00, 0x01, 0x03];
const SIGNAL_INVALID: [u8; 9] = [0xFF, 0x00, 0x40, 0x50, 0x04, 0x02, 0x02, 0x04, 0x01];
const SIGNAL_ENGAGED: [u8; 9] = [0xFF, 0x00, 0x40, 0x50, 0x04, 0x02, 0x02, 0x02, 0x01];

// General authenticate: FF 86 00 00 05 <version 01> <MSB 00> <block> <key type> <key slot>
const AUTH_KEY_A: [u8; 10] = [
    0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, DATA_BLOCK, KEY_TYPE_A, KEY_SLOT,
];
const AUTH_KEY_B: [u8; 10] = [
    0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, DATA_BLOCK, KEY_TYPE_B, KEY_SLOT,
];

// Read binary: FF B0 00 <block> <length>
const READ_DATA_BLOCK: [u8; 5] = [0xFF, 0xB0, 0x00, DATA_BLOCK, DATA_BLOCK_LENGTH];

/// A command frame sent to the reader or card.
///
/// # Examples
///
/// ```
/// use securegate_rfid::apdu::Command;
///
/// let cmd = Command::by_name("getuid").unwrap();
/// assert_eq!(cmd, Command::GetUid);
/// assert_eq!(cmd.frame(), &[0xFF, 0xCA, 0x00, 0x00, 0x00]);
///
/// let raw = Command::resolve("FF CA 00 00 00").unwrap();
/// assert_eq!(raw.frame(), cmd.frame());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Silence the buzzer on card detection.
    Mute,

    /// Re-enable the buzzer on card detection.
    Unmute,

    /// Read the UID of the card in the field.
    GetUid,

    /// Read the reader firmware version string.
    FirmwareVersion,

    /// Authenticate the data block with key A.
    AuthenticateKeyA,

    /// Authenticate the data block with key B.
    AuthenticateKeyB,

    /// Read the data block (requires prior authentication).
    ReadDataBlock,

    /// Green LED and a short beep.
    SignalSuccess,

    /// Red LED blinking with four beeps.
    SignalInvalid,

    /// Red LED blinking with two beeps.
    SignalEngaged,

    /// Arbitrary frame.
    Raw(Bytes),
}

impl Command {
    /// Every named command, in table order.
    pub const NAMED: [Command; 10] = [
        Command::Mute,
        Command::Unmute,
        Command::GetUid,
        Command::FirmwareVersion,
        Command::AuthenticateKeyA,
        Command::AuthenticateKeyB,
        Command::ReadDataBlock,
        Command::SignalSuccess,
        Command::SignalInvalid,
        Command::SignalEngaged,
    ];

    /// Frame bytes to transmit.
    pub fn frame(&self) -> &[u8] {
        match self {
            Self::Mute => &MUTE,
            Self::Unmute => &UNMUTE,
            Self::GetUid => &GET_UID,
            Self::FirmwareVersion => &FIRMWARE_VERSION,
            Self::AuthenticateKeyA => &AUTH_KEY_A,
            Self::AuthenticateKeyB => &AUTH_KEY_B,
            Self::ReadDataBlock => &READ_DATA_BLOCK,
            Self::SignalSuccess => &SIGNAL_SUCCESS,
            Self::SignalInvalid => &SIGNAL_INVALID,
            Self::SignalEngaged => &SIGNAL_ENGAGED,
            Self::Raw(frame) => frame.as_ref(),
        }
    }

    /// Short name used in logs and on the command line; `None` for raw frames.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Mute => Some("mute"),
            Self::Unmute => Some("unmute"),
            Self::GetUid => Some("getuid"),
            Self::FirmwareVersion => Some("firmver"),
            Self::AuthenticateKeyA => Some("auth1"),
            Self::AuthenticateKeyB => Some("auth2"),
            Self::ReadDataBlock => Some("data"),
            Self::SignalSuccess => Some("success"),
            Self::SignalInvalid => Some("invalid"),
            Self::SignalEngaged => Some("engaged"),
            Self::Raw(_) => None,
        }
    }

    /// Look up a named command.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::NAMED
            .into_iter()
            .find(|cmd| cmd.name() == Some(name))
    }

    /// Resolve a command name, or hex-decode the input into a raw frame.
    ///
    /// Whitespace between hex bytes is ignored, so both `FFCA000000` and
    /// `FF CA 00 00 00` are accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is neither a command name nor a
    /// non-empty hex string.
    pub fn resolve(input: &str) -> Result<Self, hex::FromHexError> {
        if let Some(cmd) = Self::by_name(input.trim()) {
            return Ok(cmd);
        }

        let digits: String = input.split_whitespace().collect();
        let frame = hex::decode(digits)?;
        if frame.is_empty() {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(Self::Raw(Bytes::from(frame)))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "raw[{}]", hex::encode_upper(self.frame())),
        }
    }
}

/// Reader feedback pattern signalled to the person holding the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feedback {
    /// Badge accepted.
    Success,

    /// Badge rejected.
    Invalid,

    /// Reader busy with another badge.
    Engaged,
}

impl From<Feedback> for Command {
    fn from(feedback: Feedback) -> Self {
        match feedback {
            Feedback::Success => Command::SignalSuccess,
            Feedback::Invalid => Command::SignalInvalid,
            Feedback::Engaged => Command::SignalEngaged,
        }
    }
}
