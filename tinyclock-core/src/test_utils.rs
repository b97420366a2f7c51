//! Test utilities: a virtual-time rig around a fully mocked device

use crate::device::{Device, Peripherals};
use crate::hal::mock::{MockButton, MockBuzzer, MockDisplay, MockRtc, MockSleep};
use crate::hal::Instant;
use crate::power::WakeFlag;
use crate::types::{ButtonId, DeviceConfig};

/// Device wired to mock collaborators
pub type MockDevice<'w> = Device<'w, MockButton, MockButton, MockRtc, MockDisplay, MockBuzzer, MockSleep>;

/// Virtual control-loop period
pub const STEP_MS: u64 = 10;

/// Hold time of a scripted Short press
pub const SHORT_HOLD_MS: u64 = 100;

pub fn mock_peripherals(rtc: MockRtc) -> Peripherals<MockButton, MockButton, MockRtc, MockDisplay, MockBuzzer, MockSleep> {
    Peripherals {
        button_a: MockButton::new(),
        button_b: MockButton::new(),
        rtc,
        display: MockDisplay::new(),
        buzzer: MockBuzzer::new(),
        sleep: MockSleep::new(),
    }
}

/// Drives a [`MockDevice`] through virtual time, one step every [`STEP_MS`]
pub struct Rig<'w> {
    pub device: MockDevice<'w>,
    config: DeviceConfig,
    now_ms: u64,
}

impl<'w> Rig<'w> {
    /// Booted device with default configuration and a blank RTC
    pub fn new(wake: &'w WakeFlag) -> Self {
        Self::with(wake, DeviceConfig::default(), MockRtc::new())
    }

    /// Booted device with a prepared RTC
    pub fn with_rtc(wake: &'w WakeFlag, rtc: MockRtc) -> Self {
        Self::with(wake, DeviceConfig::default(), rtc)
    }

    pub fn with(wake: &'w WakeFlag, config: DeviceConfig, rtc: MockRtc) -> Self {
        let mut device = Device::new(config, mock_peripherals(rtc), wake);
        device.boot(Instant::from_millis(0));
        Self { device, config, now_ms: 0 }
    }

    pub fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms)
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Run the control loop for `ms` of virtual time
    pub fn advance(&mut self, ms: u64) {
        let end = self.now_ms + ms;
        while self.now_ms < end {
            self.now_ms += STEP_MS;
            self.device.step(Instant::from_millis(self.now_ms));
        }
    }

    pub fn set_button(&mut self, button: ButtonId, pressed: bool) {
        let io = self.device.io_mut();
        match button {
            ButtonId::A => io.button_a.set_pressed(pressed),
            ButtonId::B => io.button_b.set_pressed(pressed),
        }
    }

    /// Press and release well inside the Short window
    pub fn short_press(&mut self, button: ButtonId) {
        self.set_button(button, true);
        self.advance(SHORT_HOLD_MS);
        self.set_button(button, false);
        self.advance(2 * STEP_MS);
    }

    /// Hold past the long-press threshold, then release
    pub fn long_press(&mut self, button: ButtonId) {
        self.set_button(button, true);
        self.advance(self.config.long_press_ms + SHORT_HOLD_MS);
        self.set_button(button, false);
        self.advance(2 * STEP_MS);
    }

    pub fn short_presses(&mut self, button: ButtonId, count: usize) {
        for _ in 0..count {
            self.short_press(button);
        }
    }

    pub fn rtc(&mut self) -> &mut MockRtc {
        &mut self.device.io_mut().rtc
    }

    pub fn display(&self) -> &MockDisplay {
        &self.device.io().display
    }

    pub fn buzzer(&self) -> &MockBuzzer {
        &self.device.io().buzzer
    }

    pub fn sleep(&self) -> &MockSleep {
        &self.device.io().sleep
    }
}
