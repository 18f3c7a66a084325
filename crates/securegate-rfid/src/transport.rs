//! Reader enumeration and APDU transport.
//!
//! Connections are opened with link-protocol fallback: each protocol in
//! [`PROTOCOL_FALLBACK`] is tried in order and the first one the reader
//! accepts is used. Failures after a connection is open are reported to the
//! caller unchanged; retry policy belongs to the layers above.

use crate::apdu::Command;
use crate::error::TransportError;
use securegate_hardware::{
    CardConnection, CardReader, PROTOCOL_FALLBACK, ReaderBackend, Response, ShareMode,
};
use tracing::{debug, warn};

/// List the descriptors of readers whose name contains `marker`.
///
/// An enumeration failure or an empty result is logged and yields an empty
/// list; the caller decides whether that is fatal.
///
/// # Examples
///
/// ```
/// use securegate_hardware::mock::MockBackend;
/// use securegate_rfid::transport::enumerate_contactless;
///
/// #[tokio::main]
/// async fn main() {
///     let backend = MockBackend::new();
///     backend.add_reader("ACS ACR1252 1S CL Reader PICC 0");
///     backend.add_reader("ACS ACR1252 1S CL Reader SAM 0");
///
///     let readers = enumerate_contactless(&backend, "PICC").await;
///     assert_eq!(readers, vec!["ACS ACR1252 1S CL Reader PICC 0"]);
/// }
/// ```
pub async fn enumerate_contactless<B: ReaderBackend>(backend: &B, marker: &str) -> Vec<String> {
    let names = match backend.list_readers().await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "reader enumeration failed");
            return Vec::new();
        }
    };

    let matching: Vec<String> = names
        .into_iter()
        .filter(|name| name.contains(marker))
        .collect();

    if matching.is_empty() {
        warn!(marker, "no contactless readers found");
    } else {
        debug!(count = matching.len(), "contactless readers found");
    }
    matching
}

/// Open a connection, trying each link protocol in fallback order.
///
/// # Errors
///
/// Returns [`TransportError::NoProtocolAvailable`] when every protocol is
/// refused, or the hardware error as soon as an attempt reports that the
/// card or reader is gone.
pub async fn open_with_fallback<R: CardReader>(
    reader: &R,
    mode: ShareMode,
) -> Result<R::Connection, TransportError> {
    for protocol in PROTOCOL_FALLBACK {
        match reader.connect(mode, protocol).await {
            Ok(conn) => {
                debug!(reader = reader.name(), %protocol, ?mode, "connected");
                return Ok(conn);
            }
            // No card or no reader: every other protocol fails the same way.
            Err(e) if e.is_card_absent() => return Err(TransportError::Hardware(e)),
            Err(e) => {
                debug!(reader = reader.name(), %protocol, error = %e, "protocol refused");
            }
        }
    }

    Err(TransportError::NoProtocolAvailable {
        reader: reader.name().to_string(),
    })
}

/// Send one command over an open session.
///
/// # Errors
///
/// Returns the hardware error if the transmit fails.
pub async fn transmit<C: CardConnection>(
    conn: &mut C,
    command: &Command,
) -> Result<Response, TransportError> {
    let response = conn.transmit(command.frame()).await?;
    debug!(
        %command,
        status = %response.status,
        len = response.data.len(),
        "transmit"
    );
    Ok(response)
}

/// Open a direct session, send one reader-level command and close.
///
/// Direct share mode succeeds without a card in the field, which is what
/// buzzer, LED and firmware commands need.
///
/// # Errors
///
/// Returns an error if no protocol is accepted or the transmit fails.
pub async fn connect_and_transmit<R: CardReader>(
    reader: &R,
    command: &Command,
) -> Result<Response, TransportError> {
    let mut conn = open_with_fallback(reader, ShareMode::Direct).await?;
    let response = transmit(&mut conn, command).await;

    if let Err(e) = conn.disconnect().await {
        debug!(reader = reader.name(), error = %e, "disconnect failed");
    }
    response
}
