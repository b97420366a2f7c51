//! DS3231 real-time clock protocol: time, alarm-1 and its pending flag
//!
//! All numeric registers are packed decimal (tens in the high nibble, units in
//! the low nibble). Status bits sharing the seconds/minutes/hours bytes are
//! masked off before decoding and written as zero.

use embedded_hal::i2c::I2c;

use crate::hal::HalError;
use crate::types::{AlarmConfig, TimeOfDay};

/// 7-bit bus address of the clock device
pub const RTC_ADDRESS: u8 = 0x68;

/// Register map
pub mod reg {
    pub const SECONDS: u8 = 0x00;
    pub const ALARM1_SECONDS: u8 = 0x07;
    pub const ALARM1_MINUTES: u8 = 0x08;
    pub const CONTROL: u8 = 0x0E;
    pub const STATUS: u8 = 0x0F;
}

/// Register bits
pub mod bits {
    /// Control: route alarms to the interrupt output
    pub const INTCN: u8 = 0x04;
    /// Control: alarm-1 interrupt enable
    pub const A1IE: u8 = 0x01;
    /// Status: alarm-1 matched
    pub const A1F: u8 = 0x01;
    /// Alarm-1 day/date byte: don't care
    pub const A1M4: u8 = 0x80;
}

const SECONDS_MASK: u8 = 0x7F;
const MINUTES_MASK: u8 = 0x7F;
const HOURS_MASK: u8 = 0x3F;

/// Decode a packed-decimal byte (status bits already masked)
pub const fn bcd_decode(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

/// Encode 0..=99 as a packed-decimal byte
pub const fn bcd_encode(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Wall-clock and alarm operations the mode controller relies on
pub trait RealTimeClock {
    type Error;

    /// Read hours, minutes and seconds
    fn read_time(&mut self) -> Result<TimeOfDay, Self::Error>;

    /// Set hours and minutes; seconds are always zeroed
    fn write_time(&mut self, hour: u8, minute: u8) -> Result<(), Self::Error>;

    /// Program alarm-1 to match hour:minute:00 daily and enable it
    fn set_alarm(&mut self, hour: u8, minute: u8) -> Result<(), Self::Error>;

    /// Read back the alarm-1 match time and enable bit
    fn read_alarm(&mut self) -> Result<AlarmConfig, Self::Error>;

    /// Disable alarm-1, keeping the interrupt output routed to alarms
    fn disable_alarm(&mut self) -> Result<(), Self::Error>;

    /// Returns true if alarm-1 has matched and not been cleared
    fn alarm_pending(&mut self) -> Result<bool, Self::Error>;

    /// Clear the alarm-1 pending flag, releasing the interrupt line
    fn clear_alarm(&mut self) -> Result<(), Self::Error>;
}

/// DS3231 client over an `embedded-hal` I²C bus
///
/// No bus-error retry and no presence detection: whatever bytes an absent
/// device leaves on the bus are decoded as if valid.
pub struct RtcClient<I2C> {
    i2c: I2C,
}

impl<I2C> RtcClient<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn into_inner(self) -> I2C {
        self.i2c
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), HalError> {
        self.i2c.write(RTC_ADDRESS, bytes).map_err(|_| HalError::BusError)
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<(), HalError> {
        self.i2c
            .write_read(RTC_ADDRESS, &[register], buf)
            .map_err(|_| HalError::BusError)
    }
}

impl<I2C> RealTimeClock for RtcClient<I2C>
where
    I2C: I2c,
{
    type Error = HalError;

    fn read_time(&mut self) -> Result<TimeOfDay, Self::Error> {
        let mut buf = [0u8; 3];
        self.read(reg::SECONDS, &mut buf)?;
        Ok(TimeOfDay {
            second: bcd_decode(buf[0] & SECONDS_MASK),
            minute: bcd_decode(buf[1] & MINUTES_MASK),
            hour: bcd_decode(buf[2] & HOURS_MASK),
        })
    }

    fn write_time(&mut self, hour: u8, minute: u8) -> Result<(), Self::Error> {
        self.write(&[reg::SECONDS, bcd_encode(0), bcd_encode(minute), bcd_encode(hour)])
    }

    fn set_alarm(&mut self, hour: u8, minute: u8) -> Result<(), Self::Error> {
        // Match seconds=00, minutes and hours; ignore day/date
        self.write(&[
            reg::ALARM1_SECONDS,
            bcd_encode(0),
            bcd_encode(minute),
            bcd_encode(hour),
            bits::A1M4,
        ])?;
        self.write(&[reg::CONTROL, bits::INTCN | bits::A1IE])?;
        self.clear_alarm()
    }

    fn read_alarm(&mut self) -> Result<AlarmConfig, Self::Error> {
        let mut buf = [0u8; 2];
        self.read(reg::ALARM1_MINUTES, &mut buf)?;
        let mut control = [0u8; 1];
        self.read(reg::CONTROL, &mut control)?;
        Ok(AlarmConfig {
            minute: bcd_decode(buf[0] & MINUTES_MASK),
            hour: bcd_decode(buf[1] & HOURS_MASK),
            enabled: control[0] & bits::A1IE != 0,
        })
    }

    fn disable_alarm(&mut self) -> Result<(), Self::Error> {
        self.write(&[reg::CONTROL, bits::INTCN])?;
        self.clear_alarm()
    }

    fn alarm_pending(&mut self) -> Result<bool, Self::Error> {
        let mut status = [0u8; 1];
        self.read(reg::STATUS, &mut status)?;
        Ok(status[0] & bits::A1F != 0)
    }

    fn clear_alarm(&mut self) -> Result<(), Self::Error> {
        let mut status = [0u8; 1];
        self.read(reg::STATUS, &mut status)?;
        self.write(&[reg::STATUS, status[0] & !bits::A1F])
    }
}
