//! This is a platform-agnostic Rust driver for the DFRobot SEN0322 (Gravity I2C oxygen sensor)
//! electrochemical oxygen sensor using the [`embedded-hal`] or [`embedded-hal-async`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal
//! [`embedded-hal-async`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal-async
//!
//! This driver allows you to:
//! - Read the oxygen concentration, smoothed over up to 100 readings.
//! - Read the uncalibrated probe current.
//! - Calibrate against a known concentration, with or without the probe voltage.
//! - Read the stored calibration key.
//! - Query the probe lifespan status (current firmware only).
//! - Read the firmware version.
//! - Retry failed bus transfers with exponential backoff and observe every failure.
//! - blocking API support.
//! - async API support.
//!
//! ## Features
//!
//! - `async`: Enables async API ([`Sen0322Async`]).
//! - `blocking`: Enables blocking API ([`Sen0322`]).
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: SEN0322
//!
//! The sensor answers on one of four I²C addresses (0x70-0x73) chosen with the A0/A1 dial
//! switch.  Two firmware generations exist: legacy firmware reports version 0xFF, stores an 8-bit
//! calibration key and has no probe lifespan register; current firmware reports 0x01.
//!
//! To use this driver, import this crate and an `embedded_hal` or `embedded_hal_async`
//! implementation, then instantiate the device.
//!
//! ## Blocking Example:
//!
//! ```ignore
//! use sen0322::{I2cAddr, ProbeLifeStatus, Sen0322};
//!
//! // Platform-specific
//! let i2c = /* embedded_hal::i2c::I2c instance */;
//! let delay = /* embedded_hal::delay::DelayNs instance */;
//!
//! let mut sensor = Sen0322::new(i2c, delay, I2cAddr::Addr11).unwrap();
//! loop {
//!     println!("{:.2} %vol", sensor.oxygen_concentration(10).unwrap());
//!     if sensor.probe_life_status().unwrap() == ProbeLifeStatus::Exhausted {
//!         println!("replace the probe");
//!     }
//!     sleep_secs(1);
//! }
//! ```
//!
//! ## Async Example:
//!
//! ```ignore
//! use sen0322::{I2cAddr, RetryPolicy, Sen0322Async, TransportFailure};
//!
//! // Platform-specific
//! let i2c = /* embedded_hal_async::i2c::I2c instance */;
//! let delay = /* embedded_hal_async::delay::DelayNs instance */;
//!
//! let mut sensor = Sen0322Async::with_policy(
//!     i2c,
//!     delay,
//!     I2cAddr::Addr11,
//!     RetryPolicy::default().with_max_attempts(5),
//!     |failure: TransportFailure| println!("bus error: {failure:?}"),
//! ).await.unwrap();
//!
//! // calibrate in clean air: 20.9 %vol
//! sensor.calibrate(20.9, 0.0).await.unwrap();
//! println!("{:.2} %vol", sensor.oxygen_concentration(20).await.unwrap());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(not(any(feature = "async", feature = "blocking")))]
compile_error!("At least one of \"async\" and \"blocking\" features must be enabled");

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

mod fmt;
#[cfg(feature = "async")]
mod device_impl;
#[cfg(feature = "blocking")]
mod device_impl_blocking;
mod hw_def;
mod types;

pub use crate::{hw_def::*, types::*};
