use std::sync::mpsc as std_mpsc;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use nexstar_protocol::TrackingMode;
use nexstar_protocol::command::{Axis, Coordinates};

use super::message::{DeviceInfo, MountCommand, MountEvent, MountState};

/// Which goto field is being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// RA or azimuth.
    First,
    /// Dec or altitude.
    Second,
}

impl Field {
    fn toggle(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }
}

/// Current input mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing(Field),
}

/// Fixed slew rate selected at startup.
const DEFAULT_SLEW_RATE: i32 = 5;

/// Oldest entries are dropped past this many.
const ERROR_LOG_LIMIT: usize = 100;

/// Goto target being typed in, in decimal degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GotoEdit {
    pub coordinates: Coordinates,
    pub first: String,
    pub second: String,
}

impl GotoEdit {
    fn field_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::First => &mut self.first,
            Field::Second => &mut self.second,
        }
    }

    /// Parse both fields, naming the first one that is not a number.
    pub fn parse(&self) -> Result<(f64, f64), String> {
        let (first_name, second_name) = match self.coordinates {
            Coordinates::RaDec => ("RA", "Dec"),
            Coordinates::AzmAlt => ("Azm", "Alt"),
        };
        let first = self
            .first
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{first_name} '{}' is not a number", self.first))?;
        let second = self
            .second
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{second_name} '{}' is not a number", self.second))?;
        Ok((first, second))
    }
}

/// Application state.
pub struct App {
    pub mount_state: MountState,
    pub device_info: DeviceInfo,
    pub input_mode: InputMode,
    pub connected: bool,
    pub error_log: Vec<(Instant, String)>,
    pub should_quit: bool,
    pub baud_rate: u32,
    /// Fixed slew rate used by the arrow keys (1–9).
    pub slew_rate: i32,
    /// Axis rates last commanded from the keyboard.
    pub slewing: (i32, i32),
    pub goto_edit: GotoEdit,

    cmd_tx: std_mpsc::Sender<MountCommand>,
}

impl App {
    pub fn new(cmd_tx: std_mpsc::Sender<MountCommand>, baud_rate: u32) -> Self {
        Self {
            mount_state: MountState::default(),
            device_info: DeviceInfo::default(),
            input_mode: InputMode::Normal,
            connected: false,
            error_log: Vec::new(),
            should_quit: false,
            baud_rate,
            slew_rate: DEFAULT_SLEW_RATE,
            slewing: (0, 0),
            goto_edit: GotoEdit {
                coordinates: Coordinates::RaDec,
                first: String::new(),
                second: String::new(),
            },
            cmd_tx,
        }
    }

    /// Handle an event from the mount task.
    pub fn handle_mount_event(&mut self, event: MountEvent) {
        match event {
            MountEvent::StateUpdate(state) => {
                self.mount_state = state;
            }
            MountEvent::DeviceInfo(info) => {
                self.device_info = info;
            }
            MountEvent::Time(time) => {
                self.device_info.time = Some(time);
            }
            MountEvent::Error(msg) => {
                self.log_error(msg);
            }
            MountEvent::Connected => {
                self.connected = true;
            }
            MountEvent::Disconnected => {
                self.connected = false;
            }
        }
    }

    fn log_error(&mut self, msg: String) {
        self.error_log.push((Instant::now(), msg));
        if self.error_log.len() > ERROR_LOG_LIMIT {
            let excess = self.error_log.len() - ERROR_LOG_LIMIT;
            self.error_log.drain(..excess);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        // Ctrl+C always quits.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Editing(field) => self.handle_edit_key(key, field),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.quit(),
            KeyCode::Left => self.slew(Axis::Azimuth, -self.slew_rate),
            KeyCode::Right => self.slew(Axis::Azimuth, self.slew_rate),
            KeyCode::Up => self.slew(Axis::Altitude, self.slew_rate),
            KeyCode::Down => self.slew(Axis::Altitude, -self.slew_rate),
            KeyCode::Char(c @ '1'..='9') => {
                self.slew_rate = (c as u8 - b'0') as i32;
            }
            KeyCode::Char(' ') => {
                self.slewing = (0, 0);
                self.send(MountCommand::SlewStop);
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                let mode = self
                    .mount_state
                    .tracking_mode
                    .map(TrackingMode::next)
                    .unwrap_or(TrackingMode::Off);
                self.send(MountCommand::SetTrackingMode(mode));
            }
            KeyCode::Char('c') | KeyCode::Char('C') => self.send(MountCommand::CancelGoto),
            KeyCode::Char('k') | KeyCode::Char('K') => self.send(MountCommand::SyncClock),
            KeyCode::Char('g') | KeyCode::Char('G') => self.enter_edit(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent, field: Field) {
        match key.code {
            // Same hotkey that opened the editor cancels it.
            KeyCode::Esc | KeyCode::Char('g') | KeyCode::Char('G') => {
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => self.confirm_edit(),
            KeyCode::Tab => {
                self.goto_edit.coordinates = match self.goto_edit.coordinates {
                    Coordinates::RaDec => Coordinates::AzmAlt,
                    Coordinates::AzmAlt => Coordinates::RaDec,
                };
                self.prefill_goto();
                self.input_mode = InputMode::Editing(Field::First);
            }
            KeyCode::Up | KeyCode::Down | KeyCode::BackTab => {
                self.input_mode = InputMode::Editing(field.toggle());
            }
            KeyCode::Backspace => {
                self.goto_edit.field_mut(field).pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => {
                self.goto_edit.field_mut(field).push(c);
            }
            _ => {}
        }
    }

    fn enter_edit(&mut self) {
        self.prefill_goto();
        self.input_mode = InputMode::Editing(Field::First);
    }

    /// Start the editor from the current position in the selected frame.
    fn prefill_goto(&mut self) {
        let current = match self.goto_edit.coordinates {
            Coordinates::RaDec => self.mount_state.ra_dec,
            Coordinates::AzmAlt => self.mount_state.azm_alt,
        };
        let (first, second) = match current {
            Some((a, b)) => (format!("{a:.4}"), format!("{:.4}", signed_degrees(b))),
            None => (String::new(), String::new()),
        };
        self.goto_edit.first = first;
        self.goto_edit.second = second;
    }

    fn confirm_edit(&mut self) {
        match self.goto_edit.parse() {
            Ok((first, second)) => {
                self.send(MountCommand::Goto(self.goto_edit.coordinates, first, second));
                self.input_mode = InputMode::Normal;
            }
            Err(msg) => self.log_error(msg),
        }
    }

    fn slew(&mut self, axis: Axis, rate: i32) {
        match axis {
            Axis::Azimuth => self.slewing.0 = rate,
            Axis::Altitude => self.slewing.1 = rate,
        }
        self.send(MountCommand::Slew(axis, rate));
    }

    fn send(&mut self, cmd: MountCommand) {
        if self.cmd_tx.send(cmd).is_err() {
            self.log_error("mount task is not running".to_string());
        }
    }

    fn quit(&mut self) {
        // The mount task stops any slew before closing the port.
        let _ = self.cmd_tx.send(MountCommand::Quit);
        self.should_quit = true;
    }
}

/// Map an angle in `[0, 360)` to `(-180, 180]`.
pub fn signed_degrees(degrees: f64) -> f64 {
    if degrees > 180.0 { degrees - 360.0 } else { degrees }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> (App, std_mpsc::Receiver<MountCommand>) {
        let (tx, rx) = std_mpsc::channel();
        (App::new(tx, 9600), rx)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_arrow_keys_slew_at_selected_rate() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Up);
        assert_eq!(rx.try_recv().unwrap(), MountCommand::Slew(Axis::Azimuth, -3));
        assert_eq!(rx.try_recv().unwrap(), MountCommand::Slew(Axis::Altitude, 3));
        assert_eq!(app.slewing, (-3, 3));

        press(&mut app, KeyCode::Char(' '));
        assert_eq!(rx.try_recv().unwrap(), MountCommand::SlewStop);
        assert_eq!(app.slewing, (0, 0));
    }

    #[test]
    fn test_default_rate() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Down);
        assert_eq!(rx.try_recv().unwrap(), MountCommand::Slew(Axis::Altitude, -5));
    }

    #[test]
    fn test_tracking_mode_cycles_from_current() {
        let (mut app, rx) = app();
        app.mount_state.tracking_mode = Some(TrackingMode::EqNorth);
        press(&mut app, KeyCode::Char('t'));
        assert_eq!(
            rx.try_recv().unwrap(),
            MountCommand::SetTrackingMode(TrackingMode::EqSouth)
        );
    }

    #[test]
    fn test_cancel_and_clock_sync() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(rx.try_recv().unwrap(), MountCommand::CancelGoto);
        assert_eq!(rx.try_recv().unwrap(), MountCommand::SyncClock);
    }

    #[test]
    fn test_goto_editor() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.input_mode, InputMode::Editing(Field::First));

        type_text(&mut app, "83.82");
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "-5.39");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(
            rx.try_recv().unwrap(),
            MountCommand::Goto(Coordinates::RaDec, 83.82, -5.39)
        );
    }

    #[test]
    fn test_goto_editor_prefills_and_toggles_frame() {
        let (mut app, rx) = app();
        app.mount_state.ra_dec = Some((90.0, 350.0));
        app.mount_state.azm_alt = Some((180.0, 45.0));

        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.goto_edit.first, "90.0000");
        assert_eq!(app.goto_edit.second, "-10.0000");

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.goto_edit.coordinates, Coordinates::AzmAlt);
        assert_eq!(app.goto_edit.first, "180.0000");

        press(&mut app, KeyCode::Backspace);
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            rx.try_recv().unwrap(),
            MountCommand::Goto(Coordinates::AzmAlt, 180.0, 45.0)
        );
    }

    #[test]
    fn test_goto_editor_rejects_garbage() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Char('g'));
        type_text(&mut app, "1.2.3");
        press(&mut app, KeyCode::Enter);

        assert!(rx.try_recv().is_err());
        assert_eq!(app.input_mode, InputMode::Editing(Field::First));
        assert_eq!(app.error_log.len(), 1);
        assert!(app.error_log[0].1.starts_with("RA"));
    }

    #[test]
    fn test_goto_editor_cancel() {
        let (mut app, rx) = app();
        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_quit() {
        let (mut app, rx) = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
        assert_eq!(rx.try_recv().unwrap(), MountCommand::Quit);
    }

    #[test]
    fn test_mount_events() {
        let (mut app, _rx) = app();
        app.handle_mount_event(MountEvent::Connected);
        assert!(app.connected);
        app.handle_mount_event(MountEvent::Error("boom".to_string()));
        assert_eq!(app.error_log.len(), 1);
        app.handle_mount_event(MountEvent::Disconnected);
        assert!(!app.connected);
    }

    #[test]
    fn test_error_log_is_bounded() {
        let (mut app, _rx) = app();
        for i in 0..ERROR_LOG_LIMIT + 5 {
            app.handle_mount_event(MountEvent::Error(format!("error {i}")));
        }
        assert_eq!(app.error_log.len(), ERROR_LOG_LIMIT);
        assert_eq!(app.error_log[0].1, "error 5");
    }

    #[test]
    fn test_signed_degrees() {
        assert_eq!(signed_degrees(350.0), -10.0);
        assert_eq!(signed_degrees(180.0), 180.0);
        assert_eq!(signed_degrees(45.0), 45.0);
    }
}
