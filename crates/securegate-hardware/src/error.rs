//! Reader and card access failures.
//!
//! Two of these are not faults from the scanner's point of view:
//! [`HardwareError::NoCard`] and [`HardwareError::ReaderUnavailable`] are
//! how an empty field or an unplugged reader shows up, and
//! [`HardwareError::is_card_absent`] groups them.

pub type Result<T> = std::result::Result<T, HardwareError>;

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The reader is unplugged or the service no longer knows it.
    #[error("reader {reader} is unavailable")]
    ReaderUnavailable { reader: String },

    /// The field is empty, or the card left during the session.
    #[error("no card on {reader}")]
    NoCard { reader: String },

    #[error("reader call timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },

    /// Something this reader or backend cannot do, such as a link protocol.
    #[error("{feature} is not supported")]
    Unsupported { feature: String },

    /// The reader or card failed the exchange.
    #[error("link failure: {message}")]
    Link { message: String },

    /// The reader answered with something that cannot be interpreted.
    #[error("malformed reader response: {message}")]
    Malformed { message: String },

    /// The smart-card service could not be reached.
    #[error("smart-card service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[cfg(feature = "hardware-pcsc")]
    #[error("PC/SC: {0}")]
    Pcsc(#[from] pcsc::Error),
}

impl HardwareError {
    pub fn reader_unavailable(reader: impl Into<String>) -> Self {
        Self::ReaderUnavailable {
            reader: reader.into(),
        }
    }

    pub fn no_card(reader: impl Into<String>) -> Self {
        Self::NoCard {
            reader: reader.into(),
        }
    }

    pub fn timeout(after_ms: u64) -> Self {
        Self::Timeout { after_ms }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        Self::Unsupported {
            feature: feature.into(),
        }
    }

    pub fn link(message: impl Into<String>) -> Self {
        Self::Link {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: message.into(),
        }
    }

    /// Nothing is on the reader right now: no card, or no reader.
    ///
    /// The presence monitor reads these as removal, not as faults.
    pub fn is_card_absent(&self) -> bool {
        matches!(self, Self::NoCard { .. } | Self::ReaderUnavailable { .. })
    }
}

impl From<securegate_core::Error> for HardwareError {
    fn from(error: securegate_core::Error) -> Self {
        Self::malformed(error.to_string())
    }
}
