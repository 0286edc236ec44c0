//! This crate provides an interface for monitoring and controlling the DPS series of
//! programmable power supplies.
//!
//! It supports `no_std` environments by disabling the default `std` feature. Without it
//! you supply your own [`clock::Clock`] and transport.
//!
//! PSU models with known register scaling:
//! * DPS3005
//! * DPS5005
//! * DPS5015
//! * DPS5020
//! * DPS8005
//!
//! It speaks the Modbus RTU subset the PSU understands (read holding registers and write
//! single register) and works over any byte channel, such as a UART, USB serial adapter
//! or the Bluetooth SPP link of the communication module.
//!
//! The serial port used for PSU comms should be configured like so:
//! * Default baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: None
//!
//! ```no_run
//! # fn demo<S>(port: S) -> Result<(), dps_psu::error::Error<S::Error>>
//! # where S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady {
//! use dps_psu::{clock::StdClock, psu::Dps};
//!
//! let mut psu = Dps::new(StdClock::new());
//! psu.connect(port)?;
//! psu.set_voltage(5.0)?;
//! psu.set_power_state(true)?;
//! println!("{} V at {} A", psu.voltage_out(), psu.current_out());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod checksum;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod psu;
pub mod registers;
pub mod scaling;
pub mod types;

#[cfg(test)]
mod mock_serial;

pub use config::Config;
pub use error::Error;
pub use psu::Dps;
pub use types::{Freshness, Snapshot, State};
