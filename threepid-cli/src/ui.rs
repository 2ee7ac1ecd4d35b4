//! TUI rendering: header, identifier sidebar, details, outbox, code input,
//! status, help.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use threepid::{DisplayMode, Medium, OutboxMessage, ViewState};

use crate::app::{App, Entry, Mode, state_label, truncate_str};

// ── Palette ──────────────────────────────────────────────────────────────────

const ACCENT: Color = Color::Cyan;
const DIM: Color = Color::DarkGray;
const PUBLIC: Color = Color::Green;
const WAITING: Color = Color::Yellow;
const FAILED: Color = Color::Red;

// ── Root ─────────────────────────────────────────────────────────────────────

/// Render the full application UI.
pub fn render(app: &App, frame: &mut Frame<'_>) {
    let area = frame.area();

    // Vertical split: header(1) | body(fill) | status(1)
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(app, frame, rows[0]);
    draw_body(app, frame, rows[1]);
    draw_status(app, frame, rows[2]);

    if app.mode == Mode::Help {
        draw_help_overlay(frame, area);
    }
}

fn draw_header(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" 3PID ", Style::default().fg(Color::Black).bg(ACCENT)),
        Span::raw("  "),
        Span::styled(&app.profile, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            format!("  ·  {} identifiers", app.entries.len()),
            Style::default().fg(DIM),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

// ── Body (sidebar + main) ───────────────────────────────────────────────────

fn draw_body(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(34), Constraint::Min(30)])
        .split(area);

    draw_sidebar(app, frame, cols[0]);

    // Main column: details(fill) | input(3, code entry only) | outbox(8)
    let input_h = if app.mode == Mode::EnterCode { 3 } else { 0 };
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),
            Constraint::Length(input_h),
            Constraint::Length(8),
        ])
        .split(cols[1]);

    draw_details(app, frame, main[0]);
    if app.mode == Mode::EnterCode {
        draw_input(app, frame, main[1]);
    }
    draw_outbox(app, frame, main[2]);
}

fn state_color(state: Option<&ViewState>) -> Color {
    match state {
        Some(ViewState::Loaded(DisplayMode::Revoke)) => PUBLIC,
        Some(ViewState::Loaded(m)) if m.awaits_validation() => WAITING,
        Some(ViewState::Error(_)) => FAILED,
        _ => DIM,
    }
}

fn draw_sidebar(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
        .title(" Identifiers ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.mode == Mode::Normal {
            ACCENT
        } else {
            DIM
        }));

    if app.entries.is_empty() {
        let hint = Paragraph::new("\n  No identifiers\n\n  Add some with\n  threepid new")
            .style(Style::default().fg(DIM))
            .block(block);
        frame.render_widget(hint, area);
        return;
    }

    let items: Vec<ListItem<'_>> = app
        .entries
        .iter()
        .map(|e| {
            let icon = match e.three_pid.medium {
                Medium::Email => "✉ ",
                Medium::Msisdn => "☏ ",
            };
            let row1 = Line::from(vec![
                Span::styled(icon, Style::default().fg(ACCENT)),
                Span::styled(
                    truncate_str(&e.three_pid.display_address(), 26),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]);
            let row2 = Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    truncate_str(&state_label(e.state.as_ref()), 28),
                    Style::default().fg(state_color(e.state.as_ref())),
                ),
            ]);
            ListItem::new(vec![row1, row2])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("▸ ");

    let mut state = ListState::default().with_selected(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

// ── Details ──────────────────────────────────────────────────────────────────

fn draw_details(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
        .title(" Discoverability ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM));

    let Some(entry) = app.current() else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let mut lines = vec![
        Line::default(),
        Line::from(vec![
            Span::styled(format!("  {}  ", entry.three_pid.medium), Style::default().fg(DIM)),
            Span::styled(
                entry.three_pid.display_address(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::default(),
    ];
    lines.extend(details_text(entry));

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn details_text(entry: &Entry) -> Vec<Line<'static>> {
    let who = match entry.three_pid.medium {
        Medium::Email => "this email address",
        Medium::Msisdn => "this phone number",
    };
    let (text, keys): (String, &[(&str, &str)]) = match &entry.state {
        None | Some(ViewState::Loading) => ("  Checking…".into(), &[]),
        Some(ViewState::Loaded(DisplayMode::Share)) => (
            format!("  Others cannot find you by {who}."),
            &[("s / Enter", "Share")],
        ),
        Some(ViewState::Loaded(DisplayMode::Revoke)) => (
            format!("  Others can find you by {who}."),
            &[("r / Enter", "Revoke")],
        ),
        Some(ViewState::Loaded(DisplayMode::CancelEmailValidation)) => (
            "  We sent you a confirmation email. Follow its link to finish.".into(),
            &[("v", "Follow the link"), ("c / Enter", "Cancel")],
        ),
        Some(ViewState::Loaded(DisplayMode::EnterSmsCode)) => (
            "  We sent you a text message. Enter the code it contains.".into(),
            &[("e / Enter", "Enter code")],
        ),
        Some(ViewState::Error(e)) => (format!("  Something went wrong: {e}"), &[("l / Enter", "Retry")]),
    };

    let mut lines = vec![Line::from(Span::styled(
        text,
        Style::default().fg(state_color(entry.state.as_ref())),
    ))];
    if !keys.is_empty() {
        lines.push(Line::default());
        lines.extend(keys.iter().map(|(k, d)| help_line(k, d)));
    }
    lines
}

// ── Code input ───────────────────────────────────────────────────────────────

fn draw_input(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
        .title(" SMS code ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let prompt = "code> ";
    let display = format!("{prompt}{}", app.input);
    frame.render_widget(Paragraph::new(display).block(block), area);

    // Cursor positioning (Unicode-width-aware).
    let prefix_before_cursor: String = app.input.chars().take(app.input_cursor).collect();
    let visual_offset = UnicodeWidthStr::width(prefix_before_cursor.as_str());
    #[allow(clippy::cast_possible_truncation)]
    let x = area.x + 1 + prompt.len() as u16 + visual_offset as u16;
    frame.set_cursor_position((x, area.y + 1));
}

// ── Outbox ───────────────────────────────────────────────────────────────────

fn draw_outbox(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let block = Block::default()
        .title(" Outbox (simulated) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM));
    let view_h = block.inner(area).height as usize;

    let lines: Vec<Line<'_>> = app
        .outbox
        .iter()
        .rev()
        .take(view_h)
        .map(|m| match m {
            OutboxMessage::Email { to, sid, .. } => Line::from(vec![
                Span::styled("  email  ", Style::default().fg(ACCENT)),
                Span::raw(truncate_str(to, 28)),
                Span::styled(format!("  link for session {sid}"), Style::default().fg(DIM)),
            ]),
            OutboxMessage::Sms { to, code } => Line::from(vec![
                Span::styled("  sms    ", Style::default().fg(ACCENT)),
                Span::raw(to.clone()),
                Span::styled("  code ", Style::default().fg(DIM)),
                Span::styled(code.clone(), Style::default().add_modifier(Modifier::BOLD)),
            ]),
        })
        .collect();

    frame.render_widget(Paragraph::new(Text::from(lines)).block(block), area);
}

// ── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(app: &App, frame: &mut Frame<'_>, area: Rect) {
    let line = Line::from(Span::styled(&app.status, Style::default().fg(DIM)));
    frame.render_widget(Paragraph::new(line), area);
}

// ── Help overlay ─────────────────────────────────────────────────────────────

fn draw_help_overlay(frame: &mut Frame<'_>, area: Rect) {
    let w = 46.min(area.width.saturating_sub(4));
    let h = 18.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(w)) / 2;
    let y = (area.height.saturating_sub(h)) / 2;
    let popup = Rect::new(x, y, w, h);

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT));

    let help_text = Text::from(vec![
        Line::default(),
        help_line("j / k", "Navigate identifiers"),
        help_line("g / G", "Jump to first / last"),
        help_line("Enter", "Primary action"),
        help_line("l", "Reload discoverability"),
        help_line("s", "Share"),
        help_line("r", "Revoke"),
        help_line("v", "Follow email link"),
        help_line("c", "Cancel email validation"),
        help_line("e", "Enter SMS code"),
        help_line("Esc", "Cancel / back"),
        help_line("q", "Quit"),
        help_line("Ctrl-C", "Force quit"),
        Line::default(),
        Line::from(Span::styled(
            "  Press Esc to close",
            Style::default().fg(DIM),
        )),
    ]);

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(help_text).block(block), popup);
}

fn help_line(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {key:>12}  "), Style::default().fg(ACCENT)),
        Span::raw(desc.to_owned()),
    ])
}
