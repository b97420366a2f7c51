//! Inactivity tracking, sleep strategy selection and the interrupt wake flag

use portable_atomic::{AtomicBool, Ordering};

use crate::hal::{Duration, Instant, SleepControl};
use crate::types::{DeviceConfig, Mode, SubState};

/// One-bit signal from interrupt context to the control loop
///
/// Interrupt handlers only call [`WakeFlag::signal`]; the loop calls
/// [`WakeFlag::take`] once per iteration, so any number of interrupts during a
/// suspend or an alert coalesce into a single wake decision.
pub struct WakeFlag {
    pending: AtomicBool,
}

impl WakeFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Mark an input wake (called from interrupt handler)
    pub fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the flag, returning whether it was set
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Default for WakeFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Power states; exactly one holds at any time
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerState {
    /// Normal operation
    Awake,
    /// Indefinite suspend, input wake only
    Sleeping,
    /// Suspend with a periodic timer wake that keeps the clock digits current
    LowPowerRefresh,
}

/// Sleep strategy chosen by [`PowerManager::evaluate`]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepKind {
    Indefinite,
    PeriodicRefresh,
}

/// Decides when and how the processor sleeps
#[derive(Debug)]
pub struct PowerManager {
    state: PowerState,
    last_activity: Instant,
    inactivity: Duration,
    periodic_wake: Duration,
}

impl PowerManager {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            state: PowerState::Awake,
            last_activity: Instant::from_millis(0),
            inactivity: config.inactivity(),
            periodic_wake: config.periodic_wake(),
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn is_awake(&self) -> bool {
        self.state == PowerState::Awake
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    /// Record user activity
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Sleep policy, evaluated once per awake iteration
    ///
    /// Running, Done and Setting veto sleep; Clock mode keeps its display
    /// alive with periodic refresh, every other mode sleeps indefinitely.
    pub fn evaluate(&self, now: Instant, mode: Mode, sub: SubState) -> Option<SleepKind> {
        if !self.is_awake() || sub.vetoes_sleep() {
            return None;
        }
        if now.saturating_duration_since(self.last_activity) <= self.inactivity {
            return None;
        }
        match mode {
            Mode::Clock => Some(SleepKind::PeriodicRefresh),
            Mode::Timer | Mode::Stopwatch => Some(SleepKind::Indefinite),
        }
    }

    /// Arm the wake sources for `kind` and suspend
    pub fn enter<S: SleepControl>(&mut self, kind: SleepKind, sleep: &mut S) {
        #[cfg(feature = "defmt")]
        defmt::info!("💤 Sleep: {:?}", kind);

        sleep.arm_input_wake();
        self.state = match kind {
            SleepKind::Indefinite => PowerState::Sleeping,
            SleepKind::PeriodicRefresh => {
                sleep.arm_periodic_wake(self.periodic_wake);
                PowerState::LowPowerRefresh
            }
        };
        sleep.suspend();
    }

    /// Suspend again without leaving the current sleep state
    pub fn resume<S: SleepControl>(&mut self, sleep: &mut S) {
        if self.state == PowerState::LowPowerRefresh {
            sleep.arm_periodic_wake(self.periodic_wake);
        }
        sleep.suspend();
    }

    /// Leave any sleep state and restore peripherals
    pub fn exit<S: SleepControl>(&mut self, now: Instant, sleep: &mut S) {
        if self.state == PowerState::LowPowerRefresh {
            sleep.disarm_periodic_wake();
        }
        self.state = PowerState::Awake;
        sleep.restore();
        self.touch(now);

        #[cfg(feature = "defmt")]
        defmt::info!("☀️ Wake at {=u64}ms", now.as_millis());
    }
}
