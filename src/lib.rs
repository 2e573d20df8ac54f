#![cfg_attr(not(test), no_std)]

//! Charge-management driver for the Fairchild FAN5404x family of switching
//! battery chargers.
//!
//! The chip is controlled over I²C through named 8-bit registers. This crate
//! layers four pieces on top of a raw [`embedded_hal_async::i2c::I2c`] bus:
//! serialized register transactions with masked read-modify-write, floor
//! quantization of physical limits onto the chip's register steps, the
//! charge start/stop sequencing, and pure decoding of status, fault, charge
//! type and battery health. Above them a dispatcher task consumes typed
//! events (STAT interrupt edges, upstream power changes, property writes)
//! and republishes battery state, with a 60 s heartbeat standing in for the
//! chip's disabled watchdog timer.
//!
//! The device handle lives in a single `embassy_sync` mutex; every register
//! access from every task goes through it.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod decode;
pub mod device;
pub mod dispatch;
pub mod power_supply;
pub mod regs;
pub mod shared_state;
pub mod tables;
pub mod types;

pub use device::Fan5404x;
pub use dispatch::SharedFan5404x;
pub use shared_state::{BatteryReadings, ChargerEvent, GaugeReadings};
pub use types::{BattHealth, ChargeFault, ChargeStatus, ChargeType, Error, PartNumber, Technology};
