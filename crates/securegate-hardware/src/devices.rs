//! Enum wrappers for backend dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn ReaderBackend>`
//! is unavailable. The scanner is instead written against [`AnyBackend`],
//! which dispatches to the mock backend or, with the `hardware-pcsc`
//! feature, to the system PC/SC service.
//!
//! # Examples
//!
//! ```
//! use securegate_hardware::devices::AnyBackend;
//! use securegate_hardware::mock::MockBackend;
//!
//! let mock = MockBackend::new();
//! let _handle = mock.add_reader("Mock Reader PICC 0");
//! let backend = AnyBackend::from(mock);
//! assert!(matches!(backend, AnyBackend::Mock(_)));
//! ```

use crate::Result;
use crate::mock::{MockBackend, MockConnection, MockReader};
#[cfg(feature = "hardware-pcsc")]
use crate::pcsc_backend::{PcscBackend, PcscConnection, PcscReader};
use crate::traits::{CardConnection, CardReader, LinkProtocol, ReaderBackend, Response, ShareMode};

/// Any supported reader backend.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyBackend {
    /// Simulated readers.
    Mock(MockBackend),

    /// System PC/SC service.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscBackend),
}

impl From<MockBackend> for AnyBackend {
    fn from(backend: MockBackend) -> Self {
        Self::Mock(backend)
    }
}

#[cfg(feature = "hardware-pcsc")]
impl From<PcscBackend> for AnyBackend {
    fn from(backend: PcscBackend) -> Self {
        Self::Pcsc(backend)
    }
}

impl ReaderBackend for AnyBackend {
    type Reader = AnyReader;

    async fn list_readers(&self) -> Result<Vec<String>> {
        match self {
            Self::Mock(backend) => backend.list_readers().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(backend) => backend.list_readers().await,
        }
    }

    fn open_reader(&self, name: &str) -> Result<AnyReader> {
        match self {
            Self::Mock(backend) => backend.open_reader(name).map(AnyReader::Mock),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(backend) => backend.open_reader(name).map(AnyReader::Pcsc),
        }
    }
}

/// Reader handle produced by [`AnyBackend`].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyReader {
    /// Simulated reader.
    Mock(MockReader),

    /// PC/SC reader.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscReader),
}

impl CardReader for AnyReader {
    type Connection = AnyConnection;

    fn name(&self) -> &str {
        match self {
            Self::Mock(reader) => reader.name(),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(reader) => reader.name(),
        }
    }

    async fn connect(&self, mode: ShareMode, protocol: LinkProtocol) -> Result<AnyConnection> {
        match self {
            Self::Mock(reader) => reader.connect(mode, protocol).await.map(AnyConnection::Mock),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(reader) => reader.connect(mode, protocol).await.map(AnyConnection::Pcsc),
        }
    }
}

/// Session produced by [`AnyReader`].
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyConnection {
    /// Session on a simulated reader.
    Mock(MockConnection),

    /// Session on a PC/SC reader.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscConnection),
}

impl CardConnection for AnyConnection {
    fn protocol(&self) -> LinkProtocol {
        match self {
            Self::Mock(conn) => conn.protocol(),
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(conn) => conn.protocol(),
        }
    }

    async fn atr(&mut self) -> Result<Vec<u8>> {
        match self {
            Self::Mock(conn) => conn.atr().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(conn) => conn.atr().await,
        }
    }

    async fn transmit(&mut self, frame: &[u8]) -> Result<Response> {
        match self {
            Self::Mock(conn) => conn.transmit(frame).await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(conn) => conn.transmit(frame).await,
        }
    }

    async fn disconnect(self) -> Result<()> {
        match self {
            Self::Mock(conn) => conn.disconnect().await,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc(conn) => conn.disconnect().await,
        }
    }
}
