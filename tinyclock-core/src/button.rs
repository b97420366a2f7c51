//! Button debounce and short/long press classification

use crate::hal::{Duration, Instant};
use crate::types::{ButtonEvent, ButtonId, DeviceConfig};

/// Per-button classifier turning raw level samples into press events
///
/// Thresholds are measured on the wall clock, so classification latency does
/// not depend on how fast the control loop spins.
#[derive(Debug, Clone)]
pub struct ButtonClassifier {
    id: ButtonId,
    last_raw: bool,
    pressed: bool,
    handled: bool,
    press_start: Instant,
    debounce: Duration,
    long_press: Duration,
}

impl ButtonClassifier {
    /// Create a released classifier for one button
    pub fn new(id: ButtonId, config: &DeviceConfig) -> Self {
        Self {
            id,
            last_raw: false,
            pressed: false,
            handled: false,
            press_start: Instant::from_millis(0),
            debounce: config.debounce(),
            long_press: config.long_press(),
        }
    }

    /// Feed one raw sample (true = active) and return the resulting event
    pub fn update(&mut self, raw_active: bool, now: Instant) -> ButtonEvent {
        let mut event = ButtonEvent::None;

        if raw_active {
            if !self.pressed {
                if !self.last_raw {
                    // Rising edge arms the debounce window
                    self.press_start = now;
                } else if self.held_for(now) >= self.debounce {
                    self.pressed = true;
                    self.handled = false;
                }
            }

            if self.pressed && !self.handled && self.held_for(now) >= self.long_press {
                event = ButtonEvent::Long;
                self.handled = true;
            }
        } else if self.pressed {
            if !self.handled && self.held_for(now) >= self.debounce {
                event = ButtonEvent::Short;
            }
            self.pressed = false;
        }

        self.last_raw = raw_active;

        #[cfg(feature = "defmt")]
        if event.is_some() {
            defmt::debug!("Button {:?}: {:?}", self.id, event);
        }

        event
    }

    /// Re-seed after a wake so the press that woke the device yields no event
    ///
    /// A level that is still active is taken as an already-handled press and
    /// is swallowed until release.
    pub fn reset(&mut self, raw_active: bool) {
        self.last_raw = raw_active;
        self.pressed = raw_active;
        self.handled = raw_active;
    }

    /// Button this classifier belongs to
    pub fn id(&self) -> ButtonId {
        self.id
    }

    /// Debounce-confirmed press in progress
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn held_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.press_start)
    }
}
