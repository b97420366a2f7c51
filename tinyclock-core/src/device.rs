//! Device context and the single cooperative control-loop iteration

use crate::button::ButtonClassifier;
use crate::fsm::ModeController;
use crate::hal::{ButtonInput, Buzzer, Display, Instant, SleepControl};
use crate::power::{PowerManager, PowerState, SleepKind, WakeFlag};
use crate::rtc::RealTimeClock;
use crate::types::{ButtonId, DeviceConfig};
use crate::ui;

/// External collaborators, each owned exclusively by the control loop
pub struct Peripherals<A, B, R, D, Z, S> {
    pub button_a: A,
    pub button_b: B,
    pub rtc: R,
    pub display: D,
    pub buzzer: Z,
    pub sleep: S,
}

/// All device state plus its collaborators
///
/// Firmware creates one at boot and calls [`Device::step`] forever. The only
/// state shared with interrupt context is the borrowed [`WakeFlag`].
pub struct Device<'w, A, B, R, D, Z, S> {
    io: Peripherals<A, B, R, D, Z, S>,
    wake: &'w WakeFlag,
    button_a: ButtonClassifier,
    button_b: ButtonClassifier,
    controller: ModeController,
    power: PowerManager,
}

impl<'w, A, B, R, D, Z, S> Device<'w, A, B, R, D, Z, S>
where
    A: ButtonInput,
    B: ButtonInput,
    R: RealTimeClock,
    D: Display,
    Z: Buzzer,
    S: SleepControl,
{
    pub fn new(config: DeviceConfig, io: Peripherals<A, B, R, D, Z, S>, wake: &'w WakeFlag) -> Self {
        Self {
            io,
            wake,
            button_a: ButtonClassifier::new(ButtonId::A, &config),
            button_b: ButtonClassifier::new(ButtonId::B, &config),
            controller: ModeController::new(config),
            power: PowerManager::new(&config),
        }
    }

    /// Power up the display, import RTC state and draw the first frame
    pub fn boot(&mut self, now: Instant) {
        #[cfg(feature = "defmt")]
        defmt::info!("🔧 Booting");

        self.wake.take();
        self.io.display.set_power(true).ok();
        self.controller.boot(now, &mut self.io.rtc, &mut self.io.buzzer);
        self.power.touch(now);
        self.redraw(now);
    }

    /// One control-loop iteration
    pub fn step(&mut self, now: Instant) {
        // The wake flag is consulted exactly once, here
        let woke = self.wake.take();

        match self.power.state() {
            PowerState::Awake => {}
            PowerState::Sleeping | PowerState::LowPowerRefresh if woke => {
                self.wake_fully(now);
                return;
            }
            PowerState::LowPowerRefresh => {
                self.periodic_refresh();
                return;
            }
            PowerState::Sleeping => {
                self.power.resume(&mut self.io.sleep);
                return;
            }
        }

        let a = self.button_a.update(Self::level(&mut self.io.button_a), now);
        let b = self.button_b.update(Self::level(&mut self.io.button_b), now);

        if self.controller.handle(a, b, now, &mut self.io.rtc, &mut self.io.buzzer) {
            self.power.touch(now);
        }
        self.controller.tick(now, &mut self.io.rtc, &mut self.io.buzzer);

        if self.controller.take_redraw() {
            self.redraw(now);
        }

        if let Some(kind) = self.power.evaluate(now, self.controller.mode(), self.controller.sub_state()) {
            self.enter_sleep(kind);
        }
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn power(&self) -> &PowerManager {
        &self.power
    }

    pub fn io(&self) -> &Peripherals<A, B, R, D, Z, S> {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut Peripherals<A, B, R, D, Z, S> {
        &mut self.io
    }

    fn level<P: ButtonInput>(pin: &mut P) -> bool {
        pin.is_active().unwrap_or(false)
    }

    fn redraw(&mut self, now: Instant) {
        self.controller.take_redraw();
        ui::draw(&mut self.io.display, &self.controller, now).ok();
    }

    fn enter_sleep(&mut self, kind: SleepKind) {
        match kind {
            SleepKind::PeriodicRefresh => {
                ui::draw_sleep_frame(&mut self.io.display, self.controller.time()).ok();
            }
            SleepKind::Indefinite => {
                self.io.display.set_power(false).ok();
            }
        }
        self.power.enter(kind, &mut self.io.sleep);
    }

    /// Periodic-only wake: digits follow the RTC, the device stays asleep
    fn periodic_refresh(&mut self) {
        self.controller.sync_time(&mut self.io.rtc);
        ui::update_sleep_digits(&mut self.io.display, self.controller.time()).ok();
        self.power.resume(&mut self.io.sleep);
    }

    /// Input wake: full restore, the waking press itself is discarded
    fn wake_fully(&mut self, now: Instant) {
        self.power.exit(now, &mut self.io.sleep);
        self.io.display.set_power(true).ok();

        let a = Self::level(&mut self.io.button_a);
        let b = Self::level(&mut self.io.button_b);
        self.button_a.reset(a);
        self.button_b.reset(b);

        self.controller.refresh_time(now, &mut self.io.rtc, &mut self.io.buzzer);
        self.redraw(now);
    }
}
