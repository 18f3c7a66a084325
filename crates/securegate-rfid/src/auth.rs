//! Authenticate-and-read engine.
//!
//! Provisioned cards keep the badge identifier in [`DATA_BLOCK`], readable
//! after authenticating with the key loaded in the reader's key slot. The
//! key is tried as key A first and, when the card answers `63 00`, as key B:
//!
//! ```text
//! AwaitKeyA --90 00--> Success
//! AwaitKeyA --63 00--> AwaitKeyB
//! AwaitKeyA --other--> Error
//! AwaitKeyB --90 00--> Success
//! AwaitKeyB --63 00--> Fail
//! AwaitKeyB --other--> Error
//! ```
//!
//! A successful authentication is followed by one read-binary of the block.
//!
//! [`DATA_BLOCK`]: securegate_core::constants::DATA_BLOCK

use crate::apdu::Command;
use crate::error::{AuthError, AuthStage};
use crate::retry::{Attempt, RetryPolicy, retry};
use crate::transport::transmit;
use securegate_core::{AuthResult, CardPayload, StatusWord};
use securegate_hardware::CardConnection;
use tracing::{debug, warn};

/// Outcome of one authentication stage.
enum Stage {
    Authenticated,
    TryNext,
}

async fn run_stage<C: CardConnection>(
    conn: &mut C,
    stage: AuthStage,
) -> Result<Stage, AuthError> {
    let command = match stage {
        AuthStage::KeyA => Command::AuthenticateKeyA,
        AuthStage::KeyB => Command::AuthenticateKeyB,
    };

    let response = transmit(conn, &command).await?;
    match response.status {
        StatusWord::SUCCESS => Ok(Stage::Authenticated),
        StatusWord::AUTH_RETRY => Ok(Stage::TryNext),
        status => Err(AuthError::UnexpectedStatus { stage, status }),
    }
}

async fn authenticate_stages<C: CardConnection>(conn: &mut C) -> Result<AuthResult, AuthError> {
    if let Stage::Authenticated = run_stage(conn, AuthStage::KeyA).await? {
        return Ok(AuthResult::Success);
    }

    debug!("key A rejected, trying key B");
    match run_stage(conn, AuthStage::KeyB).await? {
        Stage::Authenticated => Ok(AuthResult::Success),
        Stage::TryNext => Ok(AuthResult::Fail),
    }
}

/// Run the two-stage authentication for the data block.
///
/// An unexpected status word or a transport failure on either stage yields
/// [`AuthResult::Error`]; stage 2 is never attempted after an error on
/// stage 1.
pub async fn authenticate<C: CardConnection>(conn: &mut C) -> AuthResult {
    match authenticate_stages(conn).await {
        Ok(AuthResult::Fail) => {
            warn!("card rejected both keys");
            AuthResult::Fail
        }
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "authentication aborted");
            AuthResult::Error
        }
    }
}

/// Decode a data block; `None` when there is nothing to report.
///
/// Printable ASCII (bytes 32 to 126) decodes to trimmed text, anything
/// else to binary.
pub fn decode_payload(block: &[u8]) -> Option<CardPayload> {
    CardPayload::decode(block)
}

/// Authenticate, then read and decode the data block.
///
/// Returns `None` when authentication does not succeed, the read is
/// rejected, or the block holds no data.
pub async fn read_block<C: CardConnection>(conn: &mut C) -> Option<CardPayload> {
    let auth = authenticate(conn).await;
    if auth != AuthResult::Success {
        debug!(?auth, "skipping block read");
        return None;
    }

    let response = match transmit(conn, &Command::ReadDataBlock).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "block read failed");
            return None;
        }
    };
    if !response.is_success() {
        warn!(status = %response.status, "block read rejected");
        return None;
    }

    decode_payload(&response.data)
}

/// One authenticate-and-read pass, as a retryable attempt.
struct BlockRead<'a, C> {
    conn: &'a mut C,
}

impl<C: CardConnection> Attempt for BlockRead<'_, C> {
    type Output = Option<CardPayload>;

    async fn run(&mut self, attempt: u32) -> Option<CardPayload> {
        debug!(attempt, "reading data block");
        read_block(&mut *self.conn).await
    }
}

/// [`read_block`] with up to `attempts` attempts.
///
/// Stops at the first attempt that yields data. Running out of attempts is
/// logged and yields `None`.
pub async fn read_block_with_retry<C: CardConnection>(
    conn: &mut C,
    attempts: u32,
) -> Option<CardPayload> {
    let mut op = BlockRead { conn };
    let outcome = retry(RetryPolicy::new(attempts), Option::is_none, &mut op).await;

    if outcome.exhausted {
        warn!(attempts = outcome.attempts, "max retries reached, no data read");
    }
    outcome.value
}
