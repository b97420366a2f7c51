//! End-to-end behavior of the device driven through virtual time

use rstest::rstest;

use tinyclock_core::fsm::{ModeState, StopwatchState, TimerState};
use tinyclock_core::hal::mock::MockRtc;
use tinyclock_core::power::{PowerState, WakeFlag};
use tinyclock_core::test_utils::Rig;
use tinyclock_core::types::{AlarmConfig, ButtonId, Mode, SettingField, SubState, TimeOfDay};

const TICK_MS: u64 = 20;
const ALERT_MS: u64 = 300;

fn timer(rig: &Rig) -> TimerState {
    match rig.device.controller().state() {
        ModeState::Timer(timer) => *timer,
        other => panic!("expected Timer, got {:?}", other),
    }
}

fn stopwatch(rig: &Rig) -> StopwatchState {
    match rig.device.controller().state() {
        ModeState::Stopwatch(stopwatch) => *stopwatch,
        other => panic!("expected Stopwatch, got {:?}", other),
    }
}

fn enter_mode(rig: &mut Rig, mode: Mode) {
    while rig.device.controller().mode() != mode {
        rig.long_press(ButtonId::A);
    }
}

#[test]
fn test_timer_countdown_to_alert() {
    println!("\n=== Timer: set 3 minutes, run, expire, dismiss ===");
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.short_presses(ButtonId::A, 3);
    assert_eq!(timer(&rig).target_secs, 180);
    assert_eq!(timer(&rig).sub, SubState::Setting);
    assert!(rig.display().shows("03:00"));

    rig.long_press(ButtonId::B);
    assert_eq!(timer(&rig).sub, SubState::Running);
    assert_eq!(timer(&rig).current_secs, 180);
    assert_eq!(rig.buzzer().count(TICK_MS), 1);

    // Long fired 110ms before the helper returned; one second short of expiry
    rig.advance(179_800);
    assert_eq!(timer(&rig).sub, SubState::Running);
    assert_eq!(timer(&rig).current_secs, 1);
    assert_eq!(rig.device.power().state(), PowerState::Awake);

    rig.advance(200);
    assert_eq!(timer(&rig).sub, SubState::Done);
    assert_eq!(timer(&rig).current_secs, 0);
    assert_eq!(rig.buzzer().count(ALERT_MS), 1);
    assert!(rig.display().shows("DONE"));
    println!("✓ Expired after 180 one-second ticks");

    rig.advance(4_000);
    assert_eq!(rig.buzzer().count(ALERT_MS), 3);

    rig.short_press(ButtonId::A);
    assert_eq!(timer(&rig).sub, SubState::Idle);
    assert_eq!(rig.buzzer().count(ALERT_MS), 3);
    println!("✓ Any press dismisses the alert");
}

#[test]
fn test_timer_abort_returns_to_idle() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.short_press(ButtonId::A);
    rig.long_press(ButtonId::B);
    rig.advance(10_000);
    assert_eq!(timer(&rig).sub, SubState::Running);

    rig.long_press(ButtonId::B);
    assert_eq!(timer(&rig).sub, SubState::Idle);
    assert_eq!(timer(&rig).current_secs, 0);
    assert_eq!(timer(&rig).target_secs, 60);
}

#[test]
fn test_timer_start_ignored_at_zero() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.long_press(ButtonId::B);
    assert_eq!(timer(&rig).sub, SubState::Idle);
    assert!(rig.buzzer().beeps.is_empty());
}

#[test]
fn test_stopwatch_lap_and_stop() {
    println!("\n=== Stopwatch: start, lap at 5s, stop at 8s ===");
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);
    enter_mode(&mut rig, Mode::Stopwatch);

    // Each Short lands 10ms after its release; the helper returns 10ms later
    rig.short_press(ButtonId::B);
    assert_eq!(stopwatch(&rig).sub, SubState::Running);

    rig.advance(4_880);
    rig.short_press(ButtonId::A);
    assert_eq!(stopwatch(&rig).lap_secs, 5);
    assert!(stopwatch(&rig).lap_visible);
    assert_eq!(stopwatch(&rig).sub, SubState::Running);

    rig.advance(2_880);
    rig.short_press(ButtonId::B);
    let state = stopwatch(&rig);
    assert_eq!(state.sub, SubState::Idle);
    assert!((7_900..=8_100).contains(&state.accumulated_ms), "accumulated {}", state.accumulated_ms);
    assert!(rig.display().shows("00:08"));
    assert!(rig.display().shows("LAP 00:05"));
    println!("✓ Accumulated {}ms", state.accumulated_ms);

    // Reset while stopped
    rig.short_press(ButtonId::A);
    let state = stopwatch(&rig);
    assert_eq!(state.accumulated_ms, 0);
    assert!(!state.lap_visible);
}

#[test]
fn test_stopwatch_resume_accumulates() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);
    enter_mode(&mut rig, Mode::Stopwatch);

    rig.short_press(ButtonId::B);
    rig.advance(1_880);
    rig.short_press(ButtonId::B);
    let first = stopwatch(&rig).accumulated_ms;
    assert_eq!(first, 2_000);

    // Stopped time is not counted
    rig.advance(5_000);
    rig.short_press(ButtonId::B);
    rig.advance(880);
    rig.short_press(ButtonId::B);
    assert_eq!(stopwatch(&rig).accumulated_ms, 3_000);
}

#[test]
fn test_clock_alarm_setting() {
    println!("\n=== Clock: set alarm to 07:30 ===");
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);
    enter_mode(&mut rig, Mode::Clock);
    assert!(!rig.device.controller().alarm().enabled);

    rig.short_press(ButtonId::B);
    assert_eq!(rig.device.controller().sub_state(), SubState::Setting);
    assert!(rig.display().shows("SET ALARM"));

    rig.short_presses(ButtonId::A, 7);
    rig.long_press(ButtonId::B);
    match rig.device.controller().state() {
        ModeState::Clock(clock) => {
            assert_eq!(clock.edit.hour, 7);
            assert_eq!(clock.edit.field, SettingField::Minute);
            assert!(clock.edit.is_alarm);
        }
        other => panic!("expected Clock, got {:?}", other),
    }

    rig.short_presses(ButtonId::A, 30);
    rig.long_press(ButtonId::B);

    let expected = AlarmConfig { hour: 7, minute: 30, enabled: true };
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert_eq!(*rig.device.controller().alarm(), expected);
    assert_eq!(rig.rtc().alarm, expected);
    assert!(rig.display().shows("AL 07:30"));
    println!("✓ Alarm programmed into the RTC");

    // B Short with the alarm enabled disables it in place
    rig.short_press(ButtonId::B);
    assert!(!rig.device.controller().alarm().enabled);
    assert!(!rig.rtc().alarm.enabled);
    assert!(rig.display().shows("AL OFF"));
}

#[test]
fn test_clock_time_setting_wraps_and_commits() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(23, 58, 42);
    let mut rig = Rig::with_rtc(&wake, rtc);
    enter_mode(&mut rig, Mode::Clock);

    rig.short_press(ButtonId::A);
    assert!(rig.display().shows("SET TIME"));
    rig.short_press(ButtonId::A);
    rig.long_press(ButtonId::B);
    rig.short_presses(ButtonId::B, 59);
    rig.long_press(ButtonId::B);

    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert_eq!(rig.rtc().time, TimeOfDay::new(0, 59, 0));
    assert_eq!(*rig.device.controller().time(), TimeOfDay::new(0, 59, 0));
}

#[test]
fn test_clock_setting_cancel_discards_edit() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(10, 15, 0);
    let mut rig = Rig::with_rtc(&wake, rtc);
    enter_mode(&mut rig, Mode::Clock);

    rig.short_press(ButtonId::A);
    rig.short_presses(ButtonId::A, 3);
    rig.long_press(ButtonId::A);

    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert_eq!(rig.device.controller().mode(), Mode::Clock);
    assert_eq!(rig.rtc().time_writes, 0);
    assert!(rig.display().shows("10:15:00"));
}

#[test]
fn test_alarm_fires_once_per_minute() {
    println!("\n=== Clock: alarm match, latch, dismiss ===");
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(7, 30, 0);
    rtc.alarm = AlarmConfig { hour: 7, minute: 30, enabled: true };
    rtc.pending = true;
    let mut rig = Rig::with_rtc(&wake, rtc);

    enter_mode(&mut rig, Mode::Clock);
    assert_eq!(rig.device.controller().sub_state(), SubState::Done);
    assert!(!rig.rtc().pending);
    assert!(rig.display().shows("ALARM!"));
    assert_eq!(rig.buzzer().count(ALERT_MS), 1);

    rig.short_press(ButtonId::B);
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);

    // Same minute: the latch holds
    rig.advance(3_000);
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert_eq!(rig.buzzer().count(ALERT_MS), 1);

    // Next minute re-arms the latch without firing
    rig.rtc().set_time(7, 31, 0);
    rig.advance(1_000);
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    println!("✓ Alarm fired exactly once");
}

#[test]
fn test_stale_alarm_flag_released_after_boot() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(8, 0, 0);
    rtc.alarm = AlarmConfig { hour: 7, minute: 0, enabled: true };
    rtc.pending = true;
    let mut rig = Rig::with_rtc(&wake, rtc);
    assert!(!rig.rtc().pending);

    enter_mode(&mut rig, Mode::Clock);
    rig.advance(10_000);
    assert!(!rig.rtc().pending);
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert_eq!(rig.buzzer().count(ALERT_MS), 0);
}

#[test]
fn test_alarm_flag_raised_during_setting_is_released() {
    println!("\n=== Clock: alarm minute passes while editing ===");
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(6, 59, 50);
    rtc.alarm = AlarmConfig { hour: 7, minute: 0, enabled: true };
    let mut rig = Rig::with_rtc(&wake, rtc);
    enter_mode(&mut rig, Mode::Clock);

    rig.short_press(ButtonId::A);
    assert_eq!(rig.device.controller().sub_state(), SubState::Setting);

    rig.rtc().set_time(7, 0, 0);
    rig.rtc().pending = true;
    rig.advance(1_100);
    assert!(!rig.rtc().pending);
    assert_eq!(rig.device.controller().sub_state(), SubState::Setting);

    rig.rtc().set_time(7, 1, 0);
    rig.long_press(ButtonId::A);
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert!(!rig.rtc().pending);
    assert_eq!(rig.buzzer().count(ALERT_MS), 0);
    println!("✓ Flag released, no late alert");
}

#[test]
fn test_alarm_still_fires_after_cancel_within_minute() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(6, 59, 50);
    rtc.alarm = AlarmConfig { hour: 7, minute: 0, enabled: true };
    let mut rig = Rig::with_rtc(&wake, rtc);
    enter_mode(&mut rig, Mode::Clock);

    rig.short_press(ButtonId::A);
    rig.rtc().set_time(7, 0, 0);
    rig.rtc().pending = true;
    rig.advance(1_100);

    rig.rtc().set_time(7, 0, 30);
    rig.long_press(ButtonId::A);
    assert_eq!(rig.device.controller().sub_state(), SubState::Done);
    assert_eq!(rig.buzzer().count(ALERT_MS), 1);
}

#[test]
fn test_alarm_flag_released_on_wake_outside_clock() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.alarm = AlarmConfig { hour: 7, minute: 0, enabled: true };
    let mut rig = Rig::with_rtc(&wake, rtc);

    rig.advance(15_100);
    assert_eq!(rig.device.power().state(), PowerState::Sleeping);

    // Match while the Timer sleeps pulls the shared line low
    rig.rtc().set_time(7, 0, 0);
    rig.rtc().pending = true;
    wake.signal();
    rig.advance(10);

    assert!(rig.device.power().is_awake());
    assert!(!rig.rtc().pending);
    assert_eq!(rig.device.controller().mode(), Mode::Timer);
}

#[test]
fn test_failed_rtc_read_keeps_cached_time() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(10, 0, 0);
    let mut rig = Rig::with_rtc(&wake, rtc);

    rig.rtc().failing = true;
    enter_mode(&mut rig, Mode::Clock);
    rig.advance(2_000);

    assert_eq!(*rig.device.controller().time(), TimeOfDay::new(10, 0, 0));
    assert!(rig.display().shows("10:00:00"));
}

#[rstest]
#[case(0, Mode::Timer)]
#[case(1, Mode::Stopwatch)]
#[case(2, Mode::Clock)]
#[case(3, Mode::Timer)]
fn test_mode_cycle(#[case] presses: usize, #[case] expected: Mode) {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    for _ in 0..presses {
        rig.long_press(ButtonId::A);
    }

    assert_eq!(rig.device.controller().mode(), expected);
    assert_eq!(rig.device.controller().sub_state(), SubState::Idle);
    assert_eq!(rig.buzzer().count(TICK_MS), presses);
    assert!(rig.display().shows(expected.label()));
}

#[test]
fn test_mode_change_resets_payload() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.short_presses(ButtonId::A, 2);
    // Setting only leaves through start, then abort back to Idle
    rig.long_press(ButtonId::B);
    rig.long_press(ButtonId::B);
    enter_mode(&mut rig, Mode::Stopwatch);
    enter_mode(&mut rig, Mode::Timer);

    assert_eq!(timer(&rig).target_secs, 0);
}

#[test]
fn test_running_vetoes_sleep() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.short_press(ButtonId::A);
    rig.long_press(ButtonId::B);
    rig.advance(30_000);
    assert_eq!(rig.device.power().state(), PowerState::Awake);

    // Done vetoes too
    rig.advance(40_000);
    assert_eq!(timer(&rig).sub, SubState::Done);
    assert_eq!(rig.device.power().state(), PowerState::Awake);
}

#[test]
fn test_setting_vetoes_sleep() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.short_press(ButtonId::A);
    rig.advance(60_000);
    assert_eq!(timer(&rig).sub, SubState::Setting);
    assert_eq!(rig.device.power().state(), PowerState::Awake);
}

#[test]
fn test_clock_low_power_refresh() {
    println!("\n=== Clock: periodic refresh while asleep ===");
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(9, 40, 30);
    let mut rig = Rig::with_rtc(&wake, rtc);
    enter_mode(&mut rig, Mode::Clock);

    rig.advance(16_000);
    assert_eq!(rig.device.power().state(), PowerState::LowPowerRefresh);
    assert!(rig.display().powered);
    assert_eq!(rig.display().row(1), "09:40");
    assert_eq!(rig.sleep().periodic_period, Some(1_000));

    // Periodic wakes follow the RTC and stay asleep
    rig.rtc().set_time(9, 41, 0);
    rig.advance(10);
    assert_eq!(rig.display().row(1), "09:41");
    assert_eq!(rig.device.power().state(), PowerState::LowPowerRefresh);

    // An input wake always wins over a periodic one
    wake.signal();
    rig.advance(10);
    assert!(rig.device.power().is_awake());
    assert_eq!(rig.sleep().periodic_period, None);
    assert!(rig.display().shows("09:41:00"));
    assert_eq!(rig.device.controller().mode(), Mode::Clock);
    println!("✓ Full wake restores the Clock frame");
}

#[test]
fn test_alarm_line_wakes_into_alert() {
    let wake = WakeFlag::new();
    let mut rtc = MockRtc::new();
    rtc.set_time(6, 59, 0);
    rtc.alarm = AlarmConfig { hour: 7, minute: 0, enabled: true };
    let mut rig = Rig::with_rtc(&wake, rtc);
    enter_mode(&mut rig, Mode::Clock);

    rig.advance(16_000);
    assert_eq!(rig.device.power().state(), PowerState::LowPowerRefresh);

    // The RTC pulls the shared button line low at the match
    rig.rtc().set_time(7, 0, 0);
    rig.rtc().pending = true;
    wake.signal();
    rig.advance(10);

    assert!(rig.device.power().is_awake());
    assert_eq!(rig.device.controller().sub_state(), SubState::Done);
    assert!(!rig.rtc().pending);
    assert!(rig.buzzer().count(ALERT_MS) >= 1);
}

#[test]
fn test_timer_sleeps_indefinitely() {
    let wake = WakeFlag::new();
    let mut rig = Rig::new(&wake);

    rig.advance(15_100);
    assert_eq!(rig.device.power().state(), PowerState::Sleeping);
    assert!(!rig.display().powered);
    assert_eq!(rig.sleep().periodic_period, None);

    wake.signal();
    rig.advance(10);
    assert!(rig.device.power().is_awake());
    assert!(rig.display().powered);
    assert!(rig.display().shows("TIMER"));

    // Inactivity restarts from the wake
    rig.advance(14_000);
    assert!(rig.device.power().is_awake());
}
