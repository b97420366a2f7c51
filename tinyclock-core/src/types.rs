//! Core data types for the handheld control core

use crate::hal::Duration;

/// Largest countdown target (99 minutes)
pub const TIMER_MAX_SECS: u16 = 5940;

/// Countdown target adjustment per Short press
pub const TIMER_STEP_SECS: u16 = 60;

/// Physical button identification
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    /// Button A (mode / increment)
    A,
    /// Button B (start / decrement / confirm)
    B,
}

/// Classified button event for one control-loop iteration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// Nothing happened this iteration
    #[default]
    None,
    /// Press released before the long-press threshold
    Short,
    /// Press held past the long-press threshold
    Long,
}

impl ButtonEvent {
    /// Returns true for Short or Long
    pub const fn is_some(&self) -> bool {
        !matches!(self, ButtonEvent::None)
    }
}

/// Top-level device modes
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Countdown timer
    Timer,
    /// Stopwatch with lap snapshot
    Stopwatch,
    /// Wall clock with alarm
    Clock,
}

impl Mode {
    /// Next mode in the cycle Timer → Stopwatch → Clock → Timer
    pub const fn next(&self) -> Mode {
        match self {
            Mode::Timer => Mode::Stopwatch,
            Mode::Stopwatch => Mode::Clock,
            Mode::Clock => Mode::Timer,
        }
    }

    /// Short label shown in the title row
    pub const fn label(&self) -> &'static str {
        match self {
            Mode::Timer => "TIMER",
            Mode::Stopwatch => "STOPWATCH",
            Mode::Clock => "CLOCK",
        }
    }
}

/// Secondary state within a mode
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubState {
    /// Nothing in progress
    Idle,
    /// Adjusting a value (timer target, clock time or alarm)
    Setting,
    /// Counting
    Running,
    /// Finished, alert repeating until dismissed
    Done,
}

impl SubState {
    /// Returns true if this substate forbids entering any sleep state
    pub const fn vetoes_sleep(&self) -> bool {
        match self {
            SubState::Idle => false,
            SubState::Setting | SubState::Running | SubState::Done => true,
        }
    }
}

/// Field being edited in the clock/alarm editor
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingField {
    Hour,
    Minute,
}

/// Audible feedback requests
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sound {
    /// Short confirmation tick
    Tick,
    /// Timer expiry / alarm alert
    Alert,
}

/// Wall-clock time of day as kept by the RTC
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self { hour, minute, second }
    }
}

/// Alarm-1 configuration as stored in the RTC
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AlarmConfig {
    pub hour: u8,
    pub minute: u8,
    pub enabled: bool,
}

impl AlarmConfig {
    /// Returns true if the alarm is enabled and matches the given time
    pub fn matches(&self, time: &TimeOfDay) -> bool {
        self.enabled && self.hour == time.hour && self.minute == time.minute
    }
}

/// Device timing configuration
#[derive(Copy, Clone, Debug)]
pub struct DeviceConfig {
    /// Minimum stable-active time before a press is trusted
    pub debounce_ms: u64,
    /// Hold time that turns a press into a Long event
    pub long_press_ms: u64,
    /// Inactivity before a sleep state may be entered
    pub inactivity_ms: u64,
    /// Duration of the confirmation tick
    pub tick_beep_ms: u64,
    /// Duration of one alert beep
    pub alert_beep_ms: u64,
    /// Interval between repeated alerts while Done
    pub alert_repeat_ms: u64,
    /// Countdown tick, stopwatch redraw and clock refresh period
    pub refresh_ms: u64,
    /// Period of the hardware timer wake during low-power clock refresh
    pub periodic_wake_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 30,
            long_press_ms: 800,
            inactivity_ms: 15_000,
            tick_beep_ms: 20,
            alert_beep_ms: 300,
            alert_repeat_ms: 2_000,
            refresh_ms: 1_000,
            periodic_wake_ms: 1_000,
        }
    }
}

impl DeviceConfig {
    /// Create a new configuration with validation; beep and refresh timings
    /// keep their defaults
    pub fn new(debounce_ms: u64, long_press_ms: u64, inactivity_ms: u64) -> Result<Self, &'static str> {
        if debounce_ms == 0 || debounce_ms > 100 {
            return Err("Debounce must be between 1 and 100ms");
        }
        if long_press_ms <= debounce_ms {
            return Err("Long press must be longer than debounce");
        }
        if inactivity_ms < 1_000 {
            return Err("Inactivity timeout must be at least 1s");
        }

        Ok(Self {
            debounce_ms,
            long_press_ms,
            inactivity_ms,
            ..Self::default()
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn inactivity(&self) -> Duration {
        Duration::from_millis(self.inactivity_ms)
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn alert_repeat(&self) -> Duration {
        Duration::from_millis(self.alert_repeat_ms)
    }

    pub fn periodic_wake(&self) -> Duration {
        Duration::from_millis(self.periodic_wake_ms)
    }

    /// Buzzer hold time for a sound
    pub fn sound_duration(&self, sound: Sound) -> Duration {
        match sound {
            Sound::Tick => Duration::from_millis(self.tick_beep_ms),
            Sound::Alert => Duration::from_millis(self.alert_beep_ms),
        }
    }
}
