//! Mock contactless reader for testing and development.
//!
//! The mock answers the ACR1252U pseudo-APDUs the scanner uses (get UID,
//! load-key authentication, read binary, buzzer and LED control, firmware
//! query) from an in-memory card, and lets tests script exact responses,
//! refuse link protocols, unplug the reader or fail every transmit.

use crate::{
    HardwareError, Result,
    traits::{CardConnection, CardReader, LinkProtocol, ReaderBackend, Response, ShareMode},
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// ATR reported by a MIFARE Classic 1K card on a PC/SC reader.
pub const CLASSIC_1K_ATR: [u8; 20] = [
    0x3B, 0x8F, 0x80, 0x01, 0x80, 0x4F, 0x0C, 0xA0, 0x00, 0x00, 0x03, 0x06, 0x03, 0x00, 0x01, 0x00,
    0x00, 0x00, 0x00, 0x6A,
];

const SW_OK: [u8; 2] = [0x90, 0x00];
const SW_FAILED: [u8; 2] = [0x63, 0x00];
const SW_INS_NOT_SUPPORTED: [u8; 2] = [0x6A, 0x81];
const SW_CLA_NOT_SUPPORTED: [u8; 2] = [0x6E, 0x00];

/// A simulated card.
///
/// # Examples
///
/// ```
/// use securegate_hardware::mock::MockCard;
///
/// let card = MockCard::new([0x04, 0xA1, 0xB2, 0xC3])
///     .with_block(b"BADGE-0042      ".to_vec());
/// assert_eq!(card.uid(), &[0x04, 0xA1, 0xB2, 0xC3]);
/// ```
#[derive(Debug, Clone)]
pub struct MockCard {
    uid: Vec<u8>,
    atr: Vec<u8>,
    block: Vec<u8>,

    /// Raw responses (data + SW) returned, in order, for an exact frame.
    scripted: HashMap<Vec<u8>, VecDeque<Vec<u8>>>,
}

impl MockCard {
    /// Create a MIFARE Classic 1K card with the given UID and an empty block.
    pub fn new(uid: impl Into<Vec<u8>>) -> Self {
        Self {
            uid: uid.into(),
            atr: CLASSIC_1K_ATR.to_vec(),
            block: Vec::new(),
            scripted: HashMap::new(),
        }
    }

    /// Set the Answer-To-Reset.
    pub fn with_atr(mut self, atr: impl Into<Vec<u8>>) -> Self {
        self.atr = atr.into();
        self
    }

    /// Set the data block returned by read-binary.
    pub fn with_block(mut self, block: impl Into<Vec<u8>>) -> Self {
        self.block = block.into();
        self
    }

    /// Script raw responses (data followed by SW1 SW2) for an exact frame.
    ///
    /// Responses are consumed in order; once exhausted the card falls back
    /// to its default behavior for that frame.
    pub fn with_responses<I>(mut self, frame: &[u8], responses: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        self.scripted
            .entry(frame.to_vec())
            .or_default()
            .extend(responses);
        self
    }

    /// Card UID as stored on the chip.
    pub fn uid(&self) -> &[u8] {
        &self.uid
    }

    fn respond(&mut self, frame: &[u8]) -> Vec<u8> {
        if let Some(raw) = self.scripted.get_mut(frame).and_then(VecDeque::pop_front) {
            return raw;
        }
        match frame {
            [0xFF, 0xCA, ..] => with_status(&self.uid, SW_OK),
            [0xFF, 0xB0, ..] => with_status(&self.block, SW_OK),
            [0xFF, 0x86, ..] => SW_OK.to_vec(),
            [0xFF, ..] => SW_INS_NOT_SUPPORTED.to_vec(),
            _ => SW_CLA_NOT_SUPPORTED.to_vec(),
        }
    }
}

fn with_status(data: &[u8], status: [u8; 2]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(data.len() + 2);
    raw.extend_from_slice(data);
    raw.extend_from_slice(&status);
    raw
}

#[derive(Debug)]
struct ReaderState {
    card: Option<MockCard>,

    /// Bumped on every insertion and removal; sessions opened under an
    /// older epoch see the card as gone.
    card_epoch: u64,

    unplugged: bool,
    refused: Vec<LinkProtocol>,
    transmit_fault: bool,
    atr_fault: bool,
    firmware: String,
    log: Vec<Vec<u8>>,
    connects: usize,
}

impl Default for ReaderState {
    fn default() -> Self {
        Self {
            card: None,
            card_epoch: 0,
            unplugged: false,
            refused: Vec::new(),
            transmit_fault: false,
            atr_fault: false,
            firmware: "ACR1252U_V2.05".to_string(),
            log: Vec::new(),
            connects: 0,
        }
    }
}

impl ReaderState {
    /// Reader-level pseudo-APDUs answered without a card.
    fn respond_reader_command(&self, frame: &[u8]) -> Option<Vec<u8>> {
        match frame {
            [0xFF, 0x00, 0x48, ..] => Some(with_status(self.firmware.as_bytes(), SW_OK)),
            [0xFF, 0x00, 0x52, ..] | [0xFF, 0x00, 0x40, ..] => Some(SW_OK.to_vec()),
            _ => None,
        }
    }
}

/// Mock contactless reader.
///
/// Cloning a `MockReader` yields another handle onto the same simulated
/// device, which is how [`MockBackend::open_reader`] hands it out.
///
/// # Examples
///
/// ```
/// use securegate_hardware::mock::{MockCard, MockReader};
/// use securegate_hardware::traits::{CardConnection, CardReader, LinkProtocol, ShareMode};
///
/// #[tokio::main]
/// async fn main() -> securegate_hardware::Result<()> {
///     let (reader, handle) = MockReader::new("Mock Reader PICC 0");
///     handle.insert_card(MockCard::new([0x04, 0xA1, 0xB2, 0xC3]));
///
///     let mut conn = reader.connect(ShareMode::Shared, LinkProtocol::T1).await?;
///     let response = conn.transmit(&[0xFF, 0xCA, 0x00, 0x00, 0x00]).await?;
///     assert!(response.is_success());
///     assert_eq!(response.data.as_ref(), &[0x04, 0xA1, 0xB2, 0xC3]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockReader {
    name: String,
    state: Arc<Mutex<ReaderState>>,
}

impl MockReader {
    /// Create a new mock reader with an empty field.
    ///
    /// Returns a tuple of (MockReader, MockReaderHandle) where the handle
    /// controls the simulated card and faults.
    pub fn new(name: impl Into<String>) -> (Self, MockReaderHandle) {
        let name = name.into();
        let state = Arc::new(Mutex::new(ReaderState::default()));

        let reader = Self {
            name: name.clone(),
            state: Arc::clone(&state),
        };
        let handle = MockReaderHandle { name, state };

        (reader, handle)
    }
}

impl CardReader for MockReader {
    type Connection = MockConnection;

    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self, mode: ShareMode, protocol: LinkProtocol) -> Result<MockConnection> {
        let mut state = self.state.lock();
        state.connects += 1;

        if state.unplugged {
            return Err(HardwareError::reader_unavailable(&self.name));
        }
        if state.refused.contains(&protocol) {
            return Err(HardwareError::link(format!(
                "protocol {protocol} refused by {}",
                self.name
            )));
        }
        if mode == ShareMode::Shared && state.card.is_none() {
            return Err(HardwareError::no_card(&self.name));
        }

        Ok(MockConnection {
            reader: self.name.clone(),
            state: Arc::clone(&self.state),
            mode,
            protocol,
            epoch: state.card_epoch,
        })
    }
}

/// Open session on a [`MockReader`].
#[derive(Debug)]
pub struct MockConnection {
    reader: String,
    state: Arc<Mutex<ReaderState>>,
    mode: ShareMode,
    protocol: LinkProtocol,
    epoch: u64,
}

impl MockConnection {
    fn card_gone(&self, state: &ReaderState) -> bool {
        state.card.is_none() || state.card_epoch != self.epoch
    }
}

impl CardConnection for MockConnection {
    fn protocol(&self) -> LinkProtocol {
        self.protocol
    }

    async fn atr(&mut self) -> Result<Vec<u8>> {
        let state = self.state.lock();
        if state.unplugged {
            return Err(HardwareError::reader_unavailable(&self.reader));
        }
        if self.card_gone(&state) {
            return Err(HardwareError::no_card(&self.reader));
        }
        if state.atr_fault {
            return Err(HardwareError::link("injected ATR fault"));
        }
        Ok(state
            .card
            .as_ref()
            .map(|card| card.atr.clone())
            .unwrap_or_default())
    }

    async fn transmit(&mut self, frame: &[u8]) -> Result<Response> {
        let mut state = self.state.lock();
        if state.unplugged {
            return Err(HardwareError::reader_unavailable(&self.reader));
        }
        state.log.push(frame.to_vec());

        if state.transmit_fault {
            return Err(HardwareError::link("injected transmit fault"));
        }
        if let Some(raw) = state.respond_reader_command(frame) {
            return Response::from_raw(&raw);
        }

        let card_gone = self.card_gone(&state);
        let raw = match state.card.as_mut() {
            Some(card) if !card_gone => card.respond(frame),
            _ if self.mode == ShareMode::Shared => {
                return Err(HardwareError::no_card(&self.reader));
            }
            _ => SW_FAILED.to_vec(),
        };
        Response::from_raw(&raw)
    }

    async fn disconnect(self) -> Result<()> {
        Ok(())
    }
}

/// Handle for controlling a mock reader.
///
/// # Examples
///
/// ```
/// use securegate_hardware::mock::{MockCard, MockReader};
///
/// let (_reader, handle) = MockReader::new("Mock Reader PICC 0");
/// assert!(!handle.has_card());
///
/// handle.insert_card(MockCard::new([0x01, 0x02, 0x03, 0x04]));
/// assert!(handle.has_card());
///
/// handle.remove_card();
/// assert!(!handle.has_card());
/// ```
#[derive(Debug, Clone)]
pub struct MockReaderHandle {
    name: String,
    state: Arc<Mutex<ReaderState>>,
}

impl MockReaderHandle {
    /// Place a card in the reader field, replacing any previous card.
    pub fn insert_card(&self, card: MockCard) {
        let mut state = self.state.lock();
        state.card = Some(card);
        state.card_epoch += 1;
    }

    /// Take the card out of the reader field.
    pub fn remove_card(&self) {
        let mut state = self.state.lock();
        if state.card.take().is_some() {
            state.card_epoch += 1;
        }
    }

    /// Check if a card is currently in the field.
    pub fn has_card(&self) -> bool {
        self.state.lock().card.is_some()
    }

    /// Queue raw responses for an exact frame on the current card.
    ///
    /// Does nothing when no card is in the field.
    pub fn queue_responses<I>(&self, frame: &[u8], responses: I)
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        if let Some(card) = self.state.lock().card.as_mut() {
            card.scripted
                .entry(frame.to_vec())
                .or_default()
                .extend(responses);
        }
    }

    /// Simulate unplugging (or re-plugging) the reader.
    pub fn set_unplugged(&self, unplugged: bool) {
        self.state.lock().unplugged = unplugged;
    }

    /// Make the reader refuse connections under `protocol`.
    pub fn refuse_protocol(&self, protocol: LinkProtocol) {
        self.state.lock().refused.push(protocol);
    }

    /// Make every transmit fail with a communication error.
    pub fn fail_transmits(&self, fail: bool) {
        self.state.lock().transmit_fault = fail;
    }

    /// Make every ATR query fail with a communication error.
    pub fn fail_atr(&self, fail: bool) {
        self.state.lock().atr_fault = fail;
    }

    /// Set the string returned by the firmware version query.
    pub fn set_firmware(&self, firmware: impl Into<String>) {
        self.state.lock().firmware = firmware.into();
    }

    /// Every frame transmitted so far, in order.
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.state.lock().log.clone()
    }

    /// Number of transmitted frames equal to `frame`.
    pub fn transmit_count(&self, frame: &[u8]) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|sent| sent.as_slice() == frame)
            .count()
    }

    /// Number of connect attempts, successful or not.
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Reader descriptor.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Backend listing a fixed set of mock readers.
///
/// # Examples
///
/// ```
/// use securegate_hardware::mock::MockBackend;
/// use securegate_hardware::traits::ReaderBackend;
///
/// #[tokio::main]
/// async fn main() -> securegate_hardware::Result<()> {
///     let backend = MockBackend::new();
///     let _picc = backend.add_reader("ACS ACR1252 1S CL Reader PICC 0");
///     let _sam = backend.add_reader("ACS ACR1252 1S CL Reader SAM 0");
///
///     assert_eq!(backend.list_readers().await?.len(), 2);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    readers: Arc<Mutex<Vec<MockReader>>>,
}

impl MockBackend {
    /// Create a backend with no readers attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new reader and return its control handle.
    pub fn add_reader(&self, name: impl Into<String>) -> MockReaderHandle {
        let (reader, handle) = MockReader::new(name);
        self.readers.lock().push(reader);
        handle
    }

    /// Detach the reader with the given descriptor.
    pub fn remove_reader(&self, name: &str) {
        self.readers.lock().retain(|reader| reader.name != name);
    }
}

impl ReaderBackend for MockBackend {
    type Reader = MockReader;

    async fn list_readers(&self) -> Result<Vec<String>> {
        Ok(self
            .readers
            .lock()
            .iter()
            .map(|reader| reader.name.clone())
            .collect())
    }

    fn open_reader(&self, name: &str) -> Result<MockReader> {
        self.readers
            .lock()
            .iter()
            .find(|reader| reader.name == name)
            .cloned()
            .ok_or_else(|| HardwareError::reader_unavailable(name))
    }
}
