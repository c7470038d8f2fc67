//! PC/SC backend for the tapcard reader lifecycle
//!
//! Implements the `tapcard-core` transport and monitoring contracts
//! on top of the PC/SC API: reader enumeration is device discovery,
//! reader arrival and departure are attach/detach events, and card
//! presence flips drive the card session.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use tapcard_core::{DeviceLifecycle, TracingNotifier, event_channel, permission::AutoGrant, runner};
//! use tapcard_transport_pcsc::PcscDeviceManager;
//!
//! let (events, queue) = event_channel();
//!
//! let manager = PcscDeviceManager::new()?;
//! let monitor = manager.monitor()?;
//! monitor.watch(events.clone());
//!
//! // Seed with whatever is already attached, then run the loop.
//! let devices = manager.list_devices()?;
//! let gate = AutoGrant::new(events);
//! let mut lifecycle = DeviceLifecycle::new(manager, gate, TracingNotifier);
//! lifecycle.discover(&devices);
//! runner::run(&queue, &mut lifecycle);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

// Core modules
mod config;
mod error;
mod manager;
mod monitor;
mod transport;

// Public exports
pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use monitor::PcscMonitor;
pub use transport::PcscTransport;
