//! Device manager for PC/SC operations

use std::fmt;

use pcsc::{Context, Scope};
use tapcard_core::event::DeviceId;
use tapcard_core::transport::{TransportError, TransportFactory};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::monitor::PcscMonitor;
use crate::transport::PcscTransport;

/// Manager for PC/SC device operations
///
/// Owns the PC/SC context, enumerates readers as [`DeviceId`]s and
/// acts as the [`TransportFactory`] for the device lifecycle.
pub struct PcscDeviceManager {
    /// PC/SC context
    context: Context,
    /// Configuration applied to opened transports
    config: PcscConfig,
}

impl fmt::Debug for PcscDeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscDeviceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PcscDeviceManager {
    /// Create a new manager with the default configuration
    pub fn new() -> Result<Self, PcscError> {
        Self::with_config(PcscConfig::default())
    }

    /// Create a new manager with a custom configuration
    pub fn with_config(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context, config })
    }

    /// List the currently attached readers
    ///
    /// An empty system is not an error here; the lifecycle treats an
    /// empty list as "keep watching for attachments".
    pub fn list_devices(&self) -> Result<Vec<DeviceId>, PcscError> {
        match self.context.list_readers_owned() {
            Ok(readers) => Ok(readers
                .iter()
                .map(|name| DeviceId::new(name.to_string_lossy().into_owned()))
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Open a connection to a specific reader
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        PcscTransport::new(self.context.clone(), reader_name, self.config.clone())
    }

    /// Create a monitor feeding the lifecycle event queue
    ///
    /// The monitor gets its own context so a long blocking status
    /// wait cannot interfere with transmissions.
    pub fn monitor(&self) -> Result<PcscMonitor, PcscError> {
        PcscMonitor::create()
    }
}

impl TransportFactory for PcscDeviceManager {
    type Transport = PcscTransport;

    fn open(&self, device: &DeviceId) -> Result<PcscTransport, TransportError> {
        self.open_reader(device.name()).map_err(TransportError::from)
    }
}
