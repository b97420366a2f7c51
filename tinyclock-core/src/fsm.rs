//! Mode controller: mode cycling and the Timer / Stopwatch / Clock sub-machines

use crate::hal::{Buzzer, Instant};
use crate::rtc::RealTimeClock;
use crate::types::{
    AlarmConfig, ButtonEvent, ButtonId, DeviceConfig, Mode, SettingField, Sound, SubState, TimeOfDay,
    TIMER_MAX_SECS, TIMER_STEP_SECS,
};

/// Countdown timer payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimerState {
    pub sub: SubState,
    pub target_secs: u16,
    pub current_secs: u16,
    last_tick: Instant,
    last_alert: Instant,
}

/// Stopwatch payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StopwatchState {
    pub sub: SubState,
    pub accumulated_ms: u64,
    pub lap_secs: u32,
    pub lap_visible: bool,
    run_start: Instant,
    last_redraw: Instant,
}

/// Edit buffer shared by the clock-time and alarm-time editors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockEdit {
    pub hour: u8,
    pub minute: u8,
    pub field: SettingField,
    pub is_alarm: bool,
}

/// Clock payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClockState {
    pub sub: SubState,
    pub edit: ClockEdit,
    alarm_latch: bool,
    last_refresh: Instant,
    last_alert: Instant,
}

/// Active mode with its own data
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ModeState {
    Timer(TimerState),
    Stopwatch(StopwatchState),
    Clock(ClockState),
}

/// Follow-up work a sub-machine asks of the controller
#[derive(Copy, Clone, Debug, Default)]
struct Reaction {
    redraw: bool,
    sound: Option<Sound>,
    refresh: bool,
}

impl Reaction {
    fn redraw() -> Self {
        Self { redraw: true, ..Self::default() }
    }

    fn sound(sound: Sound) -> Self {
        Self { redraw: true, sound: Some(sound), refresh: false }
    }

    fn refresh() -> Self {
        Self { redraw: true, sound: None, refresh: true }
    }
}

const EPOCH: Instant = Instant::from_millis(0);

/// Repeat the Done alert every `alert_repeat`
fn repeat_alert(last_alert: &mut Instant, now: Instant, config: &DeviceConfig) -> Reaction {
    if now.saturating_duration_since(*last_alert) >= config.alert_repeat() {
        *last_alert = now;
        Reaction::sound(Sound::Alert)
    } else {
        Reaction::default()
    }
}

impl TimerState {
    pub fn new() -> Self {
        Self {
            sub: SubState::Idle,
            target_secs: 0,
            current_secs: 0,
            last_tick: EPOCH,
            last_alert: EPOCH,
        }
    }

    fn on_event(&mut self, button: ButtonId, event: ButtonEvent, now: Instant) -> Reaction {
        match (self.sub, button, event) {
            (SubState::Idle | SubState::Setting, ButtonId::A, ButtonEvent::Short) => {
                self.target_secs = (self.target_secs + TIMER_STEP_SECS).min(TIMER_MAX_SECS);
                self.sub = SubState::Setting;
                Reaction::redraw()
            }
            (SubState::Idle | SubState::Setting, ButtonId::B, ButtonEvent::Short) => {
                // Setting vetoes sleep and mode cycling even at a zero target;
                // leaving it takes a start (needs target > 0) and an abort
                self.target_secs = self.target_secs.saturating_sub(TIMER_STEP_SECS);
                self.sub = SubState::Setting;
                Reaction::redraw()
            }
            (SubState::Idle | SubState::Setting, ButtonId::B, ButtonEvent::Long) if self.target_secs > 0 => {
                self.current_secs = self.target_secs;
                self.last_tick = now;
                self.sub = SubState::Running;
                Reaction::sound(Sound::Tick)
            }
            (SubState::Running, ButtonId::B, ButtonEvent::Long) => {
                self.current_secs = 0;
                self.sub = SubState::Idle;
                Reaction::redraw()
            }
            _ => Reaction::default(),
        }
    }

    fn on_tick(&mut self, now: Instant, config: &DeviceConfig) -> Reaction {
        match self.sub {
            SubState::Running => {
                let period = config.refresh_period();
                let mut reaction = Reaction::default();
                // Whole periods since the last tick; drift-free under slow loops
                while now.saturating_duration_since(self.last_tick) >= period {
                    self.last_tick += period;
                    self.current_secs = self.current_secs.saturating_sub(1);
                    reaction.redraw = true;
                    if self.current_secs == 0 {
                        self.sub = SubState::Done;
                        self.last_alert = now;
                        reaction.sound = Some(Sound::Alert);
                        break;
                    }
                }
                reaction
            }
            SubState::Done => repeat_alert(&mut self.last_alert, now, config),
            SubState::Idle | SubState::Setting => Reaction::default(),
        }
    }
}

impl StopwatchState {
    pub fn new() -> Self {
        Self {
            sub: SubState::Idle,
            accumulated_ms: 0,
            lap_secs: 0,
            lap_visible: false,
            run_start: EPOCH,
            last_redraw: EPOCH,
        }
    }

    /// Total measured time including the interval still running
    pub fn elapsed_ms(&self, now: Instant) -> u64 {
        match self.sub {
            SubState::Running => {
                self.accumulated_ms + now.saturating_duration_since(self.run_start).as_millis()
            }
            _ => self.accumulated_ms,
        }
    }

    fn on_event(&mut self, button: ButtonId, event: ButtonEvent, now: Instant) -> Reaction {
        match (button, event) {
            (ButtonId::B, ButtonEvent::Short) => {
                if self.sub == SubState::Running {
                    self.accumulated_ms = self.elapsed_ms(now);
                    self.sub = SubState::Idle;
                } else {
                    self.run_start = now;
                    self.last_redraw = now;
                    self.sub = SubState::Running;
                }
                Reaction::redraw()
            }
            (ButtonId::A, ButtonEvent::Short) => {
                if self.sub == SubState::Running {
                    self.lap_secs = (self.elapsed_ms(now) / 1000) as u32;
                    self.lap_visible = true;
                } else {
                    self.accumulated_ms = 0;
                    self.lap_secs = 0;
                    self.lap_visible = false;
                }
                Reaction::redraw()
            }
            _ => Reaction::default(),
        }
    }

    fn on_tick(&mut self, now: Instant, config: &DeviceConfig) -> Reaction {
        // Display cadence only; the accumulator is always computed from deltas
        if self.sub == SubState::Running
            && now.saturating_duration_since(self.last_redraw) >= config.refresh_period()
        {
            self.last_redraw = now;
            Reaction::redraw()
        } else {
            Reaction::default()
        }
    }
}

impl ClockEdit {
    fn seeded(hour: u8, minute: u8, is_alarm: bool) -> Self {
        Self { hour, minute, field: SettingField::Hour, is_alarm }
    }

    /// Step the active field by one with wraparound
    fn step(&mut self, up: bool) {
        match (self.field, up) {
            (SettingField::Hour, true) => self.hour = (self.hour + 1) % 24,
            (SettingField::Hour, false) => self.hour = (self.hour + 23) % 24,
            (SettingField::Minute, true) => self.minute = (self.minute + 1) % 60,
            (SettingField::Minute, false) => self.minute = (self.minute + 59) % 60,
        }
    }
}

impl ClockState {
    pub fn new() -> Self {
        Self {
            sub: SubState::Idle,
            edit: ClockEdit::seeded(0, 0, false),
            alarm_latch: false,
            last_refresh: EPOCH,
            last_alert: EPOCH,
        }
    }

    fn on_event<R: RealTimeClock>(
        &mut self,
        button: ButtonId,
        event: ButtonEvent,
        time: &TimeOfDay,
        alarm: &mut AlarmConfig,
        rtc: &mut R,
    ) -> Reaction {
        match self.sub {
            SubState::Idle => match (button, event) {
                (ButtonId::A, ButtonEvent::Short) => {
                    self.edit = ClockEdit::seeded(time.hour, time.minute, false);
                    self.sub = SubState::Setting;
                    Reaction::redraw()
                }
                (ButtonId::B, ButtonEvent::Short) if alarm.enabled => {
                    match rtc.disable_alarm() {
                        Ok(()) => alarm.enabled = false,
                        Err(_) => {
                            #[cfg(feature = "defmt")]
                            defmt::warn!("RTC: alarm disable failed");
                        }
                    }
                    Reaction::redraw()
                }
                (ButtonId::B, ButtonEvent::Short) => {
                    self.edit = ClockEdit::seeded(alarm.hour, alarm.minute, true);
                    self.sub = SubState::Setting;
                    Reaction::redraw()
                }
                _ => Reaction::default(),
            },
            SubState::Setting => match (button, event) {
                (ButtonId::A, ButtonEvent::Short) => {
                    self.edit.step(true);
                    Reaction::redraw()
                }
                (ButtonId::B, ButtonEvent::Short) => {
                    self.edit.step(false);
                    Reaction::redraw()
                }
                (ButtonId::A, ButtonEvent::Long) => {
                    self.sub = SubState::Idle;
                    Reaction::refresh()
                }
                (ButtonId::B, ButtonEvent::Long) => match self.edit.field {
                    SettingField::Hour => {
                        self.edit.field = SettingField::Minute;
                        Reaction::sound(Sound::Tick)
                    }
                    SettingField::Minute => {
                        self.commit(alarm, rtc);
                        self.sub = SubState::Idle;
                        Reaction::refresh()
                    }
                },
                _ => Reaction::default(),
            },
            SubState::Running | SubState::Done => Reaction::default(),
        }
    }

    fn commit<R: RealTimeClock>(&self, alarm: &mut AlarmConfig, rtc: &mut R) {
        let ClockEdit { hour, minute, is_alarm, .. } = self.edit;
        if is_alarm {
            match rtc.set_alarm(hour, minute) {
                Ok(()) => {
                    *alarm = AlarmConfig { hour, minute, enabled: true };
                    #[cfg(feature = "defmt")]
                    defmt::info!("⏰ Alarm set {=u8}:{=u8}", hour, minute);
                }
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("RTC: alarm write failed");
                }
            }
        } else if rtc.write_time(hour, minute).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("RTC: time write failed");
        }
    }

    fn on_tick(&mut self, now: Instant, config: &DeviceConfig) -> Reaction {
        match self.sub {
            SubState::Idle if now.saturating_duration_since(self.last_refresh) >= config.refresh_period() => {
                Reaction::refresh()
            }
            SubState::Done => repeat_alert(&mut self.last_alert, now, config),
            _ => Reaction::default(),
        }
    }

    /// Evaluate the alarm against a fresh time; true when it fires
    ///
    /// The latch holds for the whole matching minute so the once-per-second
    /// evaluation fires exactly once.
    fn check_alarm(&mut self, time: &TimeOfDay, alarm: &AlarmConfig, now: Instant) -> bool {
        if !alarm.matches(time) {
            self.alarm_latch = false;
            return false;
        }
        if self.alarm_latch {
            return false;
        }
        self.alarm_latch = true;
        self.last_alert = now;
        self.sub = SubState::Done;
        true
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for StopwatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeState {
    /// Boot-default payload for a mode
    pub fn fresh(mode: Mode) -> Self {
        match mode {
            Mode::Timer => ModeState::Timer(TimerState::new()),
            Mode::Stopwatch => ModeState::Stopwatch(StopwatchState::new()),
            Mode::Clock => ModeState::Clock(ClockState::new()),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            ModeState::Timer(_) => Mode::Timer,
            ModeState::Stopwatch(_) => Mode::Stopwatch,
            ModeState::Clock(_) => Mode::Clock,
        }
    }

    pub fn sub_state(&self) -> SubState {
        match self {
            ModeState::Timer(timer) => timer.sub,
            ModeState::Stopwatch(stopwatch) => stopwatch.sub,
            ModeState::Clock(clock) => clock.sub,
        }
    }
}

/// Top-level mode controller
///
/// Owns the active mode payload plus the RTC-resident data (cached time and
/// alarm configuration) that outlives mode changes.
#[derive(Debug)]
pub struct ModeController {
    state: ModeState,
    time: TimeOfDay,
    alarm: AlarmConfig,
    config: DeviceConfig,
    redraw: bool,
    last_flag_check: Instant,
}

impl ModeController {
    /// Create controller in the boot state: Timer, Idle, counters zero
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            state: ModeState::fresh(Mode::Timer),
            time: TimeOfDay::default(),
            alarm: AlarmConfig::default(),
            config,
            redraw: true,
            last_flag_check: EPOCH,
        }
    }

    /// Import the alarm configuration surviving in the RTC and read the time
    pub fn boot<R: RealTimeClock, Z: Buzzer>(&mut self, now: Instant, rtc: &mut R, buzzer: &mut Z) {
        match rtc.read_alarm() {
            Ok(alarm) => self.alarm = alarm,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("RTC: alarm import failed");
            }
        }
        self.refresh_time(now, rtc, buzzer);
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn sub_state(&self) -> SubState {
        self.state.sub_state()
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    /// Cached time from the last successful RTC read
    pub fn time(&self) -> &TimeOfDay {
        &self.time
    }

    pub fn alarm(&self) -> &AlarmConfig {
        &self.alarm
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Returns and clears the pending redraw request
    pub fn take_redraw(&mut self) -> bool {
        core::mem::replace(&mut self.redraw, false)
    }

    pub fn request_redraw(&mut self) {
        self.redraw = true;
    }

    /// Consume the events of one loop iteration; true if any event arrived
    pub fn handle<R: RealTimeClock, Z: Buzzer>(
        &mut self,
        a: ButtonEvent,
        b: ButtonEvent,
        now: Instant,
        rtc: &mut R,
        buzzer: &mut Z,
    ) -> bool {
        if !a.is_some() && !b.is_some() {
            return false;
        }
        self.redraw = true;

        if self.sub_state() == SubState::Done {
            self.dismiss(now, rtc, buzzer);
            return true;
        }

        for (button, event) in [(ButtonId::A, a), (ButtonId::B, b)] {
            // A mode change consumes the rest of the iteration's events
            if event.is_some() && self.dispatch(button, event, now, rtc, buzzer) {
                break;
            }
        }
        true
    }

    /// Time-driven work: countdown, stopwatch cadence, clock refresh, alerts
    pub fn tick<R: RealTimeClock, Z: Buzzer>(&mut self, now: Instant, rtc: &mut R, buzzer: &mut Z) {
        let reaction = match &mut self.state {
            ModeState::Timer(timer) => timer.on_tick(now, &self.config),
            ModeState::Stopwatch(stopwatch) => stopwatch.on_tick(now, &self.config),
            ModeState::Clock(clock) => clock.on_tick(now, &self.config),
        };
        self.apply(reaction, now, rtc, buzzer);

        // Clock Idle checks the flag on every refresh; elsewhere nothing would
        let clock_idle = self.mode() == Mode::Clock && self.sub_state() == SubState::Idle;
        if !clock_idle && now.saturating_duration_since(self.last_flag_check) >= self.config.refresh_period() {
            self.last_flag_check = now;
            self.release_alarm_line(rtc);
        }
    }

    /// Force a time read; in Clock Idle this also runs alarm matching
    pub fn refresh_time<R: RealTimeClock, Z: Buzzer>(&mut self, now: Instant, rtc: &mut R, buzzer: &mut Z) {
        self.sync_time(rtc);
        self.redraw = true;

        let fired = match &mut self.state {
            ModeState::Clock(clock) => {
                clock.last_refresh = now;
                clock.sub == SubState::Idle && clock.check_alarm(&self.time, &self.alarm, now)
            }
            _ => false,
        };

        if fired {
            #[cfg(feature = "defmt")]
            defmt::info!("⏰ Alarm {=u8}:{=u8} fired", self.alarm.hour, self.alarm.minute);
            // The alarm output shares a button line; release it right away
            rtc.clear_alarm().ok();
            self.play(Sound::Alert, buzzer);
        } else {
            self.last_flag_check = now;
            self.release_alarm_line(rtc);
        }
    }

    /// Clear a pending alarm flag that no match took ownership of
    ///
    /// The flag rises at the matching minute in every mode and power state;
    /// left set it holds the shared button line active.
    fn release_alarm_line<R: RealTimeClock>(&self, rtc: &mut R) {
        if let Ok(true) = rtc.alarm_pending() {
            #[cfg(feature = "defmt")]
            defmt::debug!("RTC: releasing stale alarm flag");
            rtc.clear_alarm().ok();
        }
    }

    /// Read the RTC into the cached time without any other side effect
    ///
    /// A failed read leaves the cached time unchanged.
    pub fn sync_time<R: RealTimeClock>(&mut self, rtc: &mut R) -> bool {
        match rtc.read_time() {
            Ok(time) => {
                self.time = time;
                true
            }
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("RTC: time read failed");
                false
            }
        }
    }

    /// Route one event; true when it cycled the mode
    fn dispatch<R: RealTimeClock, Z: Buzzer>(
        &mut self,
        button: ButtonId,
        event: ButtonEvent,
        now: Instant,
        rtc: &mut R,
        buzzer: &mut Z,
    ) -> bool {
        if button == ButtonId::A && event == ButtonEvent::Long && self.sub_state() == SubState::Idle {
            self.cycle_mode(now, rtc, buzzer);
            return true;
        }

        let reaction = match &mut self.state {
            ModeState::Timer(timer) => timer.on_event(button, event, now),
            ModeState::Stopwatch(stopwatch) => stopwatch.on_event(button, event, now),
            ModeState::Clock(clock) => clock.on_event(button, event, &self.time, &mut self.alarm, rtc),
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("{:?} {:?} -> {:?}", button, event, self.sub_state());

        self.apply(reaction, now, rtc, buzzer);
        false
    }

    fn cycle_mode<R: RealTimeClock, Z: Buzzer>(&mut self, now: Instant, rtc: &mut R, buzzer: &mut Z) {
        let next = self.mode().next();
        self.state = ModeState::fresh(next);

        #[cfg(feature = "defmt")]
        defmt::info!("Mode: {:?}", next);

        self.play(Sound::Tick, buzzer);
        if next == Mode::Clock {
            self.refresh_time(now, rtc, buzzer);
        }
    }

    fn dismiss<R: RealTimeClock, Z: Buzzer>(&mut self, now: Instant, rtc: &mut R, buzzer: &mut Z) {
        match &mut self.state {
            ModeState::Timer(timer) => timer.sub = SubState::Idle,
            ModeState::Clock(clock) => clock.sub = SubState::Idle,
            ModeState::Stopwatch(_) => {}
        }
        if self.mode() == Mode::Clock {
            self.refresh_time(now, rtc, buzzer);
        }
    }

    fn apply<R: RealTimeClock, Z: Buzzer>(&mut self, reaction: Reaction, now: Instant, rtc: &mut R, buzzer: &mut Z) {
        self.redraw |= reaction.redraw;
        if let Some(sound) = reaction.sound {
            self.play(sound, buzzer);
        }
        if reaction.refresh {
            self.refresh_time(now, rtc, buzzer);
        }
    }

    fn play<Z: Buzzer>(&self, sound: Sound, buzzer: &mut Z) {
        buzzer.beep(self.config.sound_duration(sound)).ok();
    }
}
