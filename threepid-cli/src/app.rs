//! Core application state and input handling.
//!
//! The [`App`] struct owns all UI state. Every key press, worker event, or
//! tick is dispatched through a single method so that state transitions remain
//! deterministic and easy to test. Nothing here touches a flow directly:
//! actions leave as [`Cmd`]s and results come back as [`Event`]s.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use threepid::{DisplayMode, OutboxMessage, ThreePid, ViewAction, ViewState};

use crate::event::{Cmd, CmdTx, Event};

// ── Enums ────────────────────────────────────────────────────────────────────

/// Top-level interaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Browsing identifiers.
    Normal,
    /// Typing the code received by SMS.
    EnterCode,
    /// Showing the help overlay.
    Help,
}

/// One sidebar row: an identifier and the last state its flow published.
#[derive(Debug, Clone)]
pub struct Entry {
    pub three_pid: ThreePid,
    pub state: Option<ViewState>,
}

// ── App ──────────────────────────────────────────────────────────────────────

/// Central application state.
pub struct App {
    /// Set to `true` when the application should exit.
    pub quit: bool,
    /// Profile name shown in the header.
    pub profile: String,

    pub entries: Vec<Entry>,
    /// Selected sidebar index.
    pub selected: usize,
    pub mode: Mode,
    /// Everything the simulated server has sent, oldest first.
    pub outbox: Vec<OutboxMessage>,

    // -- Input state (Unicode-aware, operates on `char` indices) --
    pub input: String,
    /// Cursor position in *characters* (not bytes).
    pub input_cursor: usize,

    /// Status line shown at the bottom.
    pub status: String,
    /// Remaining ticks before the status line reverts to the default hint.
    status_ttl: u16,

    cmd_tx: CmdTx,
}

// ── Constants ────────────────────────────────────────────────────────────────

const STATUS_DEFAULT: &str = " j/k:nav  Enter:primary action  l:reload  ?:help  q:quit";
const STATUS_CODE: &str = " Type the SMS code  ·  Enter:submit  Esc:cancel";
const STATUS_TTL: u16 = 60; // ~3 s at 50 ms tick

impl App {
    pub fn new(profile: String, three_pids: Vec<ThreePid>, cmd_tx: CmdTx) -> Self {
        Self {
            quit: false,
            profile,
            entries: three_pids
                .into_iter()
                .map(|three_pid| Entry {
                    three_pid,
                    state: None,
                })
                .collect(),
            selected: 0,
            mode: Mode::Normal,
            outbox: Vec::new(),
            input: String::new(),
            input_cursor: 0,
            status: STATUS_DEFAULT.into(),
            status_ttl: 0,
            cmd_tx,
        }
    }

    /// The selected identifier, if any.
    pub fn current(&self) -> Option<&Entry> {
        self.entries.get(self.selected)
    }

    fn current_mode(&self) -> Option<DisplayMode> {
        self.current()
            .and_then(|e| e.state.as_ref())
            .and_then(ViewState::display_mode)
    }

    // ── Tick ──────────────────────────────────────────────────────────────────

    /// Called on every tick event; drives timed state transitions.
    pub fn tick(&mut self) {
        if self.status_ttl > 0 {
            self.status_ttl -= 1;
            if self.status_ttl == 0 {
                self.restore_default_status();
            }
        }
    }

    // ── Worker events ────────────────────────────────────────────────────────

    /// Apply a non-input event from the worker.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::State { index, state } => {
                let leaves_code_entry =
                    index == self.selected && state != ViewState::Loaded(DisplayMode::EnterSmsCode);
                if let ViewState::Error(e) = &state {
                    self.flash_status(&format!("{}: {e}", self.label(index)));
                }
                if let Some(entry) = self.entries.get_mut(index) {
                    entry.state = Some(state);
                }
                if leaves_code_entry && self.mode == Mode::EnterCode {
                    self.leave_input();
                }
            }
            Event::Outbox(msgs) => self.outbox = msgs,
            Event::Flash(msg) => self.flash_status(&msg),
            Event::Key(_) | Event::Resize | Event::Tick => {}
        }
    }

    fn label(&self, index: usize) -> String {
        self.entries
            .get(index)
            .map(|e| e.three_pid.display_address())
            .unwrap_or_default()
    }

    // ── Key dispatch ─────────────────────────────────────────────────────────

    /// Top-level key handler. Routes to mode-specific handlers.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        match self.mode {
            Mode::Help => self.handle_key_help(key),
            Mode::EnterCode => self.handle_key_code(key),
            Mode::Normal => self.handle_key_normal(key),
        }
    }

    fn handle_key_help(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Char('q' | '?') | KeyCode::Enter
        ) {
            self.mode = Mode::Normal;
            self.restore_default_status();
        }
    }

    fn handle_key_normal(&mut self, key: KeyEvent) {
        let n = self.entries.len();
        match key.code {
            KeyCode::Char('q') => self.quit = true,
            KeyCode::Char('?') => self.mode = Mode::Help,
            KeyCode::Char('j') | KeyCode::Down if n > 0 => self.selected = (self.selected + 1) % n,
            KeyCode::Char('k') | KeyCode::Up if n > 0 => {
                self.selected = self.selected.checked_sub(1).unwrap_or(n - 1);
            }
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => self.selected = n.saturating_sub(1),
            KeyCode::Enter => self.primary_action(),
            KeyCode::Char('l') => self.send_action(ViewAction::Load),
            KeyCode::Char('s') => self.when(DisplayMode::Share, |a| a.send_action(ViewAction::Share)),
            KeyCode::Char('r') => {
                self.when(DisplayMode::Revoke, |a| a.send_action(ViewAction::Revoke));
            }
            KeyCode::Char('c') => self.when(DisplayMode::CancelEmailValidation, |a| {
                a.send_action(ViewAction::CancelEmailValidation);
            }),
            KeyCode::Char('v') => self.when(DisplayMode::CancelEmailValidation, |a| {
                a.send(Cmd::FollowLink(a.selected));
            }),
            KeyCode::Char('e') => self.when(DisplayMode::EnterSmsCode, Self::enter_code_mode),
            _ => {}
        }
    }

    fn handle_key_code(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.leave_input(),
            KeyCode::Enter => {
                let code = self.input.trim().to_owned();
                if code.is_empty() {
                    return;
                }
                self.send_action(ViewAction::EnterSmsCode(code));
                self.leave_input();
            }
            KeyCode::Backspace => self.input_backspace(),
            KeyCode::Delete => self.input_delete(),
            KeyCode::Left => self.input_cursor = self.input_cursor.saturating_sub(1),
            KeyCode::Right => {
                if self.input_cursor < self.input.chars().count() {
                    self.input_cursor += 1;
                }
            }
            KeyCode::Home => self.input_cursor = 0,
            KeyCode::End => self.input_cursor = self.input.chars().count(),
            KeyCode::Char(c) => self.input_insert(c),
            _ => {}
        }
    }

    // ── Actions ──────────────────────────────────────────────────────────────

    /// What Enter does depends on what the details pane offers.
    fn primary_action(&mut self) {
        match self.current().and_then(|e| e.state.as_ref()) {
            Some(ViewState::Loaded(DisplayMode::Share)) => self.send_action(ViewAction::Share),
            Some(ViewState::Loaded(DisplayMode::Revoke)) => self.send_action(ViewAction::Revoke),
            Some(ViewState::Loaded(DisplayMode::CancelEmailValidation)) => {
                self.send_action(ViewAction::CancelEmailValidation);
            }
            Some(ViewState::Loaded(DisplayMode::EnterSmsCode)) => self.enter_code_mode(),
            Some(ViewState::Error(_)) | None => self.send_action(ViewAction::Load),
            Some(ViewState::Loading) => self.flash_status("Busy"),
        }
    }

    /// Run `f` only if the selected identifier currently shows `mode`.
    fn when(&mut self, mode: DisplayMode, f: impl FnOnce(&mut Self)) {
        if self.current_mode() == Some(mode) {
            f(self);
        } else {
            self.flash_status("Not available now");
        }
    }

    fn enter_code_mode(&mut self) {
        self.mode = Mode::EnterCode;
        self.input.clear();
        self.input_cursor = 0;
        self.status = STATUS_CODE.into();
    }

    fn leave_input(&mut self) {
        self.mode = Mode::Normal;
        self.input.clear();
        self.input_cursor = 0;
        self.restore_default_status();
    }

    fn send_action(&mut self, action: ViewAction) {
        if self.entries.is_empty() {
            return;
        }
        self.send(Cmd::Action {
            index: self.selected,
            action,
        });
    }

    fn send(&mut self, cmd: Cmd) {
        if self.cmd_tx.send(cmd).is_err() {
            self.flash_status("Worker stopped");
        }
    }

    // ── Unicode-aware input helpers ──────────────────────────────────────────

    fn input_insert(&mut self, ch: char) {
        let byte_idx = char_to_byte(&self.input, self.input_cursor);
        self.input.insert(byte_idx, ch);
        self.input_cursor += 1;
    }

    fn input_backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_idx = char_to_byte(&self.input, self.input_cursor);
            self.input.remove(byte_idx);
        }
    }

    fn input_delete(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_idx = char_to_byte(&self.input, self.input_cursor);
            self.input.remove(byte_idx);
        }
    }

    // ── Status helpers ───────────────────────────────────────────────────────

    /// Show a temporary status message that auto-reverts.
    fn flash_status(&mut self, msg: &str) {
        self.status = format!(" {msg}");
        self.status_ttl = STATUS_TTL;
    }

    fn restore_default_status(&mut self) {
        self.status = match self.mode {
            Mode::EnterCode => STATUS_CODE,
            Mode::Normal | Mode::Help => STATUS_DEFAULT,
        }
        .into();
        self.status_ttl = 0;
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Convert a char-index to a byte-index in a UTF-8 string.
fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Short label for a published state (sidebar badge, `info` output).
pub fn state_label(state: Option<&ViewState>) -> String {
    match state {
        None => "not loaded".into(),
        Some(ViewState::Loading) => "loading…".into(),
        Some(ViewState::Loaded(DisplayMode::Share)) => "private".into(),
        Some(ViewState::Loaded(DisplayMode::Revoke)) => "discoverable".into(),
        Some(ViewState::Loaded(DisplayMode::CancelEmailValidation)) => "check your email".into(),
        Some(ViewState::Loaded(DisplayMode::EnterSmsCode)) => "enter SMS code".into(),
        Some(ViewState::Error(e)) => format!("error: {e}"),
    }
}

/// Truncate a string to `max` chars, appending `…` if needed.
pub fn truncate_str(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        let mut t: String = s.chars().take(max).collect();
        t.push('…');
        t
    }
}
