#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! # Tinyclock Core
//!
//! Control core for a two-button handheld offering a countdown timer, a
//! stopwatch and a clock with alarm. Covers button classification, the mode
//! state machine, sleep management and the DS3231 clock protocol; display,
//! buzzer, bus and sleep hardware sit behind the traits in [`hal`].

pub mod types;
pub mod hal;
pub mod button;
pub mod rtc;
pub mod fsm;
pub mod power;
pub mod ui;
pub mod device;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use types::*;
pub use button::ButtonClassifier;
pub use fsm::*;
pub use power::*;
pub use rtc::{RealTimeClock, RtcClient};
pub use device::{Device, Peripherals};
pub use hal::{*, Instant, Duration};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timing for the reference hardware
pub fn default_config() -> DeviceConfig {
    DeviceConfig::default()
}
