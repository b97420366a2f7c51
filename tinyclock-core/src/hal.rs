//! Hardware Abstraction Layer for the handheld control core

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::mock_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod mock_time {
    /// Millisecond instant for builds without embassy-time
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct Instant(u64);

    impl Instant {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub fn duration_since(&self, earlier: Instant) -> Duration {
            Duration(self.0 - earlier.0)
        }

        pub fn saturating_duration_since(&self, earlier: Instant) -> Duration {
            Duration(self.0.saturating_sub(earlier.0))
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    /// Millisecond duration
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub struct Duration(u64);

    impl Duration {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add<Duration> for Instant {
        type Output = Instant;

        fn add(self, rhs: Duration) -> Instant {
            Instant(self.0 + rhs.0)
        }
    }

    impl core::ops::AddAssign<Duration> for Instant {
        fn add_assign(&mut self, rhs: Duration) {
            self.0 += rhs.0;
        }
    }

    impl core::ops::Add for Duration {
        type Output = Duration;

        fn add(self, rhs: Duration) -> Duration {
            Duration(self.0 + rhs.0)
        }
    }
}

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Two-wire bus transfer failed
    BusError,
    /// Display command failed
    DisplayError,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::BusError => write!(f, "Bus transfer failed"),
            HalError::DisplayError => write!(f, "Display command failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Raw button level source
pub trait ButtonInput {
    type Error: From<HalError>;

    /// Raw level, true while the button is held
    fn is_active(&mut self) -> Result<bool, Self::Error>;
}

/// Character display collaborator
pub trait Display {
    type Error: From<HalError>;

    /// Clear the drawing buffer
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Move the text cursor to a character cell
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Self::Error>;

    /// Print text at the cursor, advancing it
    fn print(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Switch the panel on or off
    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Present the drawing buffer
    fn switch_frame(&mut self) -> Result<(), Self::Error>;
}

/// Audible-alert actuator
pub trait Buzzer {
    type Error: From<HalError>;

    /// Assert the buzzer for a fixed duration, blocking until done
    fn beep(&mut self, duration: Duration) -> Result<(), Self::Error>;
}

/// Processor suspend and wake-source control
///
/// Interrupt handlers behind the wake sources must do nothing except
/// [`crate::power::WakeFlag::signal`].
pub trait SleepControl {
    /// Arm the level-change interrupt on both button inputs
    fn arm_input_wake(&mut self);

    /// Arm the periodic hardware timer wake
    fn arm_periodic_wake(&mut self, period: Duration);

    /// Stop the periodic hardware timer wake
    fn disarm_periodic_wake(&mut self);

    /// Halt the processor until any armed wake source fires
    fn suspend(&mut self);

    /// Bring bus and display peripherals back after a suspend
    fn restore(&mut self);
}

/// Button on a pulled-up input pin (pressed = low)
pub struct EmbeddedHalButton<P> {
    pin: P,
}

impl<P> EmbeddedHalButton<P>
where
    P: InputPin,
{
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> ButtonInput for EmbeddedHalButton<P>
where
    P: InputPin,
{
    type Error = HalError;

    fn is_active(&mut self) -> Result<bool, Self::Error> {
        // Active low (pulled up, grounded when pressed)
        self.pin.is_low().map_err(|_| HalError::GpioError)
    }
}

/// Buzzer on an output pin, held for the beep duration by a blocking delay
pub struct EmbeddedHalBuzzer<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> EmbeddedHalBuzzer<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }
}

impl<P, D> Buzzer for EmbeddedHalBuzzer<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    type Error = HalError;

    fn beep(&mut self, duration: Duration) -> Result<(), Self::Error> {
        self.pin.set_high().map_err(|_| HalError::GpioError)?;
        self.delay.delay_ms(duration.as_millis() as u32);
        self.pin.set_low().map_err(|_| HalError::GpioError)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use crate::rtc::RealTimeClock;
    use crate::types::{AlarmConfig, TimeOfDay};

    /// Display grid of the mock panel
    pub const MOCK_COLS: usize = 16;
    pub const MOCK_ROWS: usize = 4;

    #[derive(Debug, Default)]
    pub struct MockButton {
        pressed: bool,
    }

    impl MockButton {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_pressed(&mut self, pressed: bool) {
            self.pressed = pressed;
        }

        pub fn is_pressed(&self) -> bool {
            self.pressed
        }
    }

    impl ButtonInput for MockButton {
        type Error = HalError;

        fn is_active(&mut self) -> Result<bool, Self::Error> {
            Ok(self.pressed)
        }
    }

    /// Character-grid display that keeps the last presented frame
    #[derive(Debug)]
    pub struct MockDisplay {
        back: [[char; MOCK_COLS]; MOCK_ROWS],
        front: [[char; MOCK_COLS]; MOCK_ROWS],
        col: usize,
        row: usize,
        pub powered: bool,
        pub frames: usize,
        pub clears: usize,
    }

    impl Default for MockDisplay {
        fn default() -> Self {
            Self {
                back: [[' '; MOCK_COLS]; MOCK_ROWS],
                front: [[' '; MOCK_COLS]; MOCK_ROWS],
                col: 0,
                row: 0,
                powered: false,
                frames: 0,
                clears: 0,
            }
        }
    }

    impl MockDisplay {
        pub fn new() -> Self {
            Self::default()
        }

        /// Text of one presented row, trailing blanks trimmed
        pub fn row(&self, row: usize) -> String {
            self.front[row].iter().collect::<String>().trim_end().to_string()
        }

        /// Returns true if any presented row contains the text
        pub fn shows(&self, text: &str) -> bool {
            (0..MOCK_ROWS).any(|row| self.row(row).contains(text))
        }
    }

    impl Display for MockDisplay {
        type Error = HalError;

        fn clear(&mut self) -> Result<(), Self::Error> {
            self.back = [[' '; MOCK_COLS]; MOCK_ROWS];
            self.col = 0;
            self.row = 0;
            self.clears += 1;
            Ok(())
        }

        fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), Self::Error> {
            if row as usize >= MOCK_ROWS {
                return Err(HalError::DisplayError);
            }
            self.col = col as usize;
            self.row = row as usize;
            Ok(())
        }

        fn print(&mut self, text: &str) -> Result<(), Self::Error> {
            for ch in text.chars() {
                if self.col < MOCK_COLS {
                    self.back[self.row][self.col] = ch;
                }
                self.col += 1;
            }
            Ok(())
        }

        fn set_power(&mut self, on: bool) -> Result<(), Self::Error> {
            self.powered = on;
            Ok(())
        }

        fn switch_frame(&mut self) -> Result<(), Self::Error> {
            self.front = self.back;
            self.frames += 1;
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MockBuzzer {
        /// Duration of every beep, in milliseconds
        pub beeps: Vec<u64>,
    }

    impl MockBuzzer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count(&self, duration_ms: u64) -> usize {
            self.beeps.iter().filter(|&&d| d == duration_ms).count()
        }
    }

    impl Buzzer for MockBuzzer {
        type Error = HalError;

        fn beep(&mut self, duration: Duration) -> Result<(), Self::Error> {
            self.beeps.push(duration.as_millis());
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct MockSleep {
        pub input_armed: bool,
        pub periodic_period: Option<u64>,
        pub suspends: usize,
        pub restores: usize,
    }

    impl MockSleep {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl SleepControl for MockSleep {
        fn arm_input_wake(&mut self) {
            self.input_armed = true;
        }

        fn arm_periodic_wake(&mut self, period: Duration) {
            self.periodic_period = Some(period.as_millis());
        }

        fn disarm_periodic_wake(&mut self) {
            self.periodic_period = None;
        }

        fn suspend(&mut self) {
            self.suspends += 1;
        }

        fn restore(&mut self) {
            self.input_armed = false;
            self.restores += 1;
        }
    }

    /// In-memory clock device
    #[derive(Debug, Default)]
    pub struct MockRtc {
        pub time: TimeOfDay,
        pub alarm: AlarmConfig,
        pub pending: bool,
        /// When set every operation fails with a bus error
        pub failing: bool,
        pub time_writes: usize,
        pub pending_clears: usize,
    }

    impl MockRtc {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_time(&mut self, hour: u8, minute: u8, second: u8) {
            self.time = TimeOfDay::new(hour, minute, second);
        }

        fn check(&self) -> Result<(), HalError> {
            if self.failing {
                Err(HalError::BusError)
            } else {
                Ok(())
            }
        }
    }

    impl RealTimeClock for MockRtc {
        type Error = HalError;

        fn read_time(&mut self) -> Result<TimeOfDay, Self::Error> {
            self.check()?;
            Ok(self.time)
        }

        fn write_time(&mut self, hour: u8, minute: u8) -> Result<(), Self::Error> {
            self.check()?;
            self.time = TimeOfDay::new(hour, minute, 0);
            self.time_writes += 1;
            Ok(())
        }

        fn set_alarm(&mut self, hour: u8, minute: u8) -> Result<(), Self::Error> {
            self.check()?;
            self.alarm = AlarmConfig { hour, minute, enabled: true };
            self.clear_alarm()
        }

        fn read_alarm(&mut self) -> Result<AlarmConfig, Self::Error> {
            self.check()?;
            Ok(self.alarm)
        }

        fn disable_alarm(&mut self) -> Result<(), Self::Error> {
            self.check()?;
            self.alarm.enabled = false;
            self.clear_alarm()
        }

        fn alarm_pending(&mut self) -> Result<bool, Self::Error> {
            self.check()?;
            Ok(self.pending)
        }

        fn clear_alarm(&mut self) -> Result<(), Self::Error> {
            self.check()?;
            self.pending = false;
            self.pending_clears += 1;
            Ok(())
        }
    }
}
