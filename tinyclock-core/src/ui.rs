//! Frame composition onto the text display
//!
//! Row layout on the 4-row panel: title on row 0, main value on row 2,
//! status/lap/alarm on row 3. The sleep frame shows the time on row 1 only.

use core::fmt::Write;

use heapless::String;

use crate::fsm::{ModeController, ModeState};
use crate::hal::{Display, Instant};
use crate::types::{SettingField, SubState, TimeOfDay};

const TITLE_ROW: u8 = 0;
const SLEEP_ROW: u8 = 1;
const VALUE_ROW: u8 = 2;
const STATUS_ROW: u8 = 3;

type Text = String<16>;

fn mm_ss(total_secs: u64) -> Text {
    let mut text = Text::new();
    write!(text, "{:02}:{:02}", total_secs / 60, total_secs % 60).ok();
    text
}

fn hh_mm(hour: u8, minute: u8) -> Text {
    let mut text = Text::new();
    write!(text, "{:02}:{:02}", hour, minute).ok();
    text
}

fn hh_mm_ss(time: &TimeOfDay) -> Text {
    let mut text = Text::new();
    write!(text, "{:02}:{:02}:{:02}", time.hour, time.minute, time.second).ok();
    text
}

fn line<D: Display>(display: &mut D, row: u8, text: &str) -> Result<(), D::Error> {
    display.set_cursor(0, row)?;
    display.print(text)
}

/// Draw and present the full frame for the active mode
pub fn draw<D: Display>(display: &mut D, controller: &ModeController, now: Instant) -> Result<(), D::Error> {
    display.clear()?;

    match controller.state() {
        ModeState::Timer(timer) => {
            line(display, TITLE_ROW, controller.mode().label())?;
            let secs = match timer.sub {
                SubState::Running | SubState::Done => timer.current_secs,
                SubState::Idle | SubState::Setting => timer.target_secs,
            };
            line(display, VALUE_ROW, &mm_ss(secs as u64))?;
            let status = match timer.sub {
                SubState::Idle => "",
                SubState::Setting => "SET",
                SubState::Running => "RUN",
                SubState::Done => "DONE",
            };
            line(display, STATUS_ROW, status)?;
        }
        ModeState::Stopwatch(stopwatch) => {
            line(display, TITLE_ROW, controller.mode().label())?;
            line(display, VALUE_ROW, &mm_ss(stopwatch.elapsed_ms(now) / 1000))?;
            if stopwatch.lap_visible {
                let mut lap = Text::new();
                write!(lap, "LAP {}", mm_ss(stopwatch.lap_secs as u64)).ok();
                line(display, STATUS_ROW, &lap)?;
            }
        }
        ModeState::Clock(clock) if clock.sub == SubState::Setting => {
            let title = if clock.edit.is_alarm { "SET ALARM" } else { "SET TIME" };
            line(display, TITLE_ROW, title)?;
            line(display, VALUE_ROW, &hh_mm(clock.edit.hour, clock.edit.minute))?;
            let col = match clock.edit.field {
                SettingField::Hour => 0,
                SettingField::Minute => 3,
            };
            display.set_cursor(col, STATUS_ROW)?;
            display.print("^^")?;
        }
        ModeState::Clock(clock) => {
            line(display, TITLE_ROW, controller.mode().label())?;
            line(display, VALUE_ROW, &hh_mm_ss(controller.time()))?;
            let alarm = controller.alarm();
            if clock.sub == SubState::Done {
                line(display, STATUS_ROW, "ALARM!")?;
            } else if alarm.enabled {
                let mut text = Text::new();
                write!(text, "AL {}", hh_mm(alarm.hour, alarm.minute)).ok();
                line(display, STATUS_ROW, &text)?;
            } else {
                line(display, STATUS_ROW, "AL OFF")?;
            }
        }
    }

    display.switch_frame()
}

/// Minimal time-only frame shown during low-power clock refresh
pub fn draw_sleep_frame<D: Display>(display: &mut D, time: &TimeOfDay) -> Result<(), D::Error> {
    display.clear()?;
    update_sleep_digits(display, time)
}

/// Rewrite only the digits of the sleep frame
pub fn update_sleep_digits<D: Display>(display: &mut D, time: &TimeOfDay) -> Result<(), D::Error> {
    line(display, SLEEP_ROW, &hh_mm(time.hour, time.minute))?;
    display.switch_frame()
}
