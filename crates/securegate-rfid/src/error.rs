//! Error types for the scanner.
//!
//! Per-card errors ([`TransportError`], [`AuthError`], [`DecodeError`]) are
//! logged and absorbed inside a poll; only lifecycle errors reach callers
//! through [`ScanError`].

use securegate_core::StatusWord;
use securegate_hardware::HardwareError;
use std::fmt;

/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Failure to reach the reader or card.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The reader refused every link protocol in the fallback list.
    #[error("no link protocol accepted by reader {reader}")]
    NoProtocolAvailable { reader: String },

    /// Connect or transmit failed in the hardware layer.
    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl TransportError {
    /// Check if the failure means there is no card (or no reader) to talk to.
    pub fn is_card_absent(&self) -> bool {
        match self {
            Self::NoProtocolAvailable { .. } => false,
            Self::Hardware(e) => e.is_card_absent(),
        }
    }
}

/// Authentication stage of the two-key handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    KeyA,
    KeyB,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyA => write!(f, "key A"),
            Self::KeyB => write!(f, "key B"),
        }
    }
}

/// Authentication aborted.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The card answered with a status word outside `90 00` / `63 00`.
    #[error("unexpected status {status} during {stage} authentication")]
    UnexpectedStatus { stage: AuthStage, status: StatusWord },

    #[error("transport failure during authentication: {0}")]
    Transport(#[from] TransportError),
}

/// UID response could not be turned into an identifier.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("get UID returned status {0}")]
    Status(StatusWord),

    #[error("get UID returned no bytes")]
    Empty,

    #[error("UID of {0} bytes does not fit")]
    TooLong(usize),

    #[error("transport failure reading UID: {0}")]
    Transport(#[from] TransportError),
}

/// Scanner lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// [`Scanner::start`](crate::Scanner::start) was already called.
    #[error("scanner already started")]
    AlreadyStarted,

    /// No reader descriptor contains the contactless marker.
    #[error("no contactless reader matching {marker:?}")]
    NoReaders { marker: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl ScanError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::NoProtocolAvailable {
            reader: "ACS PICC 0".to_string(),
        };
        assert_eq!(err.to_string(), "no link protocol accepted by reader ACS PICC 0");

        let err = AuthError::UnexpectedStatus {
            stage: AuthStage::KeyA,
            status: StatusWord::new(0x69, 0x82),
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 69 82 during key A authentication"
        );

        assert_eq!(DecodeError::TooLong(17).to_string(), "UID of 17 bytes does not fit");
    }

    #[test]
    fn test_card_absent_classification() {
        let absent = TransportError::from(HardwareError::no_card("r"));
        assert!(absent.is_card_absent());

        let refused = TransportError::NoProtocolAvailable {
            reader: "r".to_string(),
        };
        assert!(!refused.is_card_absent());
    }

    #[test]
    fn test_scan_error_from_transport() {
        let err = ScanError::from(TransportError::from(HardwareError::timeout(2000)));
        assert!(matches!(err, ScanError::Transport(_)));
        assert_eq!(ScanError::config("zero").to_string(), "invalid configuration: zero");
    }
}
