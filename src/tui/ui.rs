use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use nexstar_protocol::command::Coordinates;
use nexstar_protocol::to_dms;

use super::app::{App, Field, InputMode, signed_degrees};

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let status = if app.connected {
        "Connected"
    } else {
        "Disconnected"
    };
    let block = Block::default()
        .title(" NexStar Hand Control ")
        .title_bottom(format!(" {status} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.connected {
            Color::Green
        } else {
            Color::Red
        }));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // RA/Dec
            Constraint::Length(1), // Azm/Alt
            Constraint::Length(1), // tracking, alignment, goto
            Constraint::Length(1), // model and firmware
            Constraint::Length(1), // site and clock
            Constraint::Length(1), // goto editor
            Constraint::Min(0),    // error log
            Constraint::Length(1), // help bar
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(render_ra_dec(app)), chunks[0]);
    frame.render_widget(Paragraph::new(render_azm_alt(app)), chunks[1]);
    frame.render_widget(Paragraph::new(render_status(app)), chunks[2]);
    frame.render_widget(Paragraph::new(render_device(app)), chunks[3]);
    frame.render_widget(Paragraph::new(render_site(app)), chunks[4]);
    frame.render_widget(Paragraph::new(render_goto(app)), chunks[5]);

    render_error_log(frame, app, chunks[6]);

    // Help text on the left, link stats on the right.
    let help_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(62)])
        .split(chunks[7]);

    frame.render_widget(Paragraph::new(render_help(app)), help_chunks[0]);
    frame.render_widget(Paragraph::new(render_stats(app)), help_chunks[1]);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(
        format!(" {text:<8}"),
        Style::default().add_modifier(Modifier::BOLD),
    )
}

fn dim(text: impl Into<String>) -> Span<'static> {
    Span::styled(text.into(), Style::default().fg(Color::DarkGray))
}

fn render_ra_dec(app: &App) -> Line<'static> {
    let (ra, dec) = match app.mount_state.ra_dec {
        Some((ra, dec)) => (format_ra(ra), format_signed_dms(dec)),
        None => ("--h --m --s".to_string(), "---° --' --\"".to_string()),
    };
    Line::from(vec![
        label("RA/Dec"),
        Span::styled(format!("{ra:<14}"), Style::default().fg(Color::Cyan)),
        Span::styled(dec, Style::default().fg(Color::Cyan)),
    ])
}

fn render_azm_alt(app: &App) -> Line<'static> {
    let (azm, alt) = match app.mount_state.azm_alt {
        Some((azm, alt)) => (format_dms(azm), format_signed_dms(alt)),
        None => ("---° --' --\"".to_string(), "---° --' --\"".to_string()),
    };
    Line::from(vec![
        label("Azm/Alt"),
        Span::styled(format!("{azm:<14}"), Style::default().fg(Color::Yellow)),
        Span::styled(alt, Style::default().fg(Color::Yellow)),
    ])
}

fn render_status(app: &App) -> Line<'static> {
    let state = &app.mount_state;
    let tracking = state
        .tracking_mode
        .map(|m| m.to_string())
        .unwrap_or_else(|| "---".to_string());

    let (aligned, aligned_color) = match state.aligned {
        Some(true) => ("Aligned", Color::Green),
        Some(false) => ("Not aligned", Color::Red),
        None => ("---", Color::White),
    };
    let (goto, goto_color) = match state.goto_in_progress {
        Some(true) => ("Slewing", Color::Yellow),
        Some(false) => ("Idle", Color::White),
        None => ("---", Color::White),
    };

    let (azm_rate, alt_rate) = app.slewing;
    Line::from(vec![
        label("Track"),
        Span::raw(format!("{tracking:<10}")),
        Span::styled(format!("{aligned:<13}"), Style::default().fg(aligned_color)),
        dim("Goto "),
        Span::styled(format!("{goto:<9}"), Style::default().fg(goto_color)),
        dim("Rate "),
        Span::raw(format!("{}  ", app.slew_rate)),
        dim(format!("Azm {azm_rate:+} Alt {alt_rate:+}")),
    ])
}

fn render_device(app: &App) -> Line<'static> {
    let info = &app.device_info;
    let model = info
        .model
        .map(|m| m.to_string())
        .unwrap_or_else(|| "---".to_string());
    Line::from(vec![
        label("Model"),
        Span::raw(format!("{model:<16}")),
        dim("AZM/RA "),
        Span::raw(format!("{:<7}", format_version(info.azm_version))),
        dim("ALT/DEC "),
        Span::raw(format_version(info.alt_version)),
    ])
}

fn render_site(app: &App) -> Line<'static> {
    let info = &app.device_info;
    let site = match &info.location {
        Some((lat, lon)) => format!("{lat}  {lon}"),
        None => "---".to_string(),
    };
    let clock = info
        .time
        .map(|t| t.to_string())
        .unwrap_or_else(|| "---".to_string());
    Line::from(vec![
        label("Site"),
        Span::raw(format!("{site:<32}")),
        dim("Clock "),
        Span::raw(clock),
    ])
}

fn render_goto(app: &App) -> Line<'static> {
    let editing = match app.input_mode {
        InputMode::Editing(field) => Some(field),
        InputMode::Normal => None,
    };
    let Some(focus) = editing else {
        return Line::from(vec![label("Goto"), dim("press G to enter a target")]);
    };

    let edit = &app.goto_edit;
    let (first_name, second_name) = match edit.coordinates {
        Coordinates::RaDec => ("RA", "Dec"),
        Coordinates::AzmAlt => ("Azm", "Alt"),
    };
    let field_style = |field: Field| {
        if field == focus {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Yellow)
        }
    };

    Line::from(vec![
        label("Goto"),
        Span::raw(format!("{first_name} ")),
        Span::styled(format!("{:<10}", edit.first), field_style(Field::First)),
        Span::raw(format!("  {second_name} ")),
        Span::styled(format!("{:<10}", edit.second), field_style(Field::Second)),
        dim("  degrees"),
    ])
}

/// Right ascension in degrees as hours, minutes, seconds.
fn format_ra(degrees: f64) -> String {
    let (h, m, s) = to_dms(degrees / 15.0);
    format!("{h:02}h {m:02}m {s:02}s")
}

fn format_dms(degrees: f64) -> String {
    let (d, m, s) = to_dms(degrees);
    format!("{d:>3}° {m:02}' {s:02}\"")
}

/// Dec and Alt are reported in `[0, 360)`; show them as signed angles.
fn format_signed_dms(degrees: f64) -> String {
    let signed = signed_degrees(degrees);
    let sign = if signed < 0.0 { '-' } else { '+' };
    let (d, m, s) = to_dms(signed);
    format!("{sign}{d:02}° {m:02}' {s:02}\"")
}

fn format_version(version: Option<(u8, u8)>) -> String {
    match version {
        Some((major, minor)) => format!("{major}.{minor}"),
        None => "---".to_string(),
    }
}

fn render_error_log(frame: &mut Frame, app: &App, area: Rect) {
    if app.error_log.is_empty() || area.height == 0 {
        return;
    }

    let visible = area.height as usize;
    let start = app.error_log.len().saturating_sub(visible);
    let lines: Vec<Line<'static>> = app.error_log[start..]
        .iter()
        .map(|(timestamp, msg)| {
            let elapsed = timestamp.elapsed().as_secs();
            let mins = elapsed / 60;
            let secs = elapsed % 60;
            Line::from(Span::styled(
                format!("  [{mins:>3}:{secs:02}] {msg}"),
                Style::default().fg(Color::Red),
            ))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_help(app: &App) -> Line<'static> {
    let help_text = match app.input_mode {
        InputMode::Normal => {
            "  [Q]uit  \u{2190}\u{2192}\u{2191}\u{2193} slew  1-9 rate  Space stop  [G]oto  [C]ancel  [T]rack  [K] sync clock"
        }
        InputMode::Editing(_) => {
            "  0-9 . - type  \u{2191}\u{2193} field  Tab RA/Dec\u{2194}Azm/Alt  Enter go  Esc cancel"
        }
    };

    Line::from(Span::styled(
        help_text.to_string(),
        Style::default().fg(Color::Magenta),
    ))
}

fn render_stats(app: &App) -> Line<'static> {
    let baud = app.baud_rate;
    let tx = app.mount_state.tx_bits_per_sec;
    let rx = app.mount_state.rx_bits_per_sec;
    let percent = |bits: u32| if baud > 0 { bits * 100 / baud } else { 0 };

    Line::from(vec![
        Span::raw(format!("Baud {baud} ({:>3}%)  ", percent(tx + rx))),
        Span::styled(
            format!("Tx: {tx:>5} bits ({:>2}%)", percent(tx)),
            Style::default().fg(Color::Red),
        ),
        Span::raw("  "),
        Span::styled(
            format!("Rx: {rx:>5} bits ({:>2}%)", percent(rx)),
            Style::default().fg(Color::Green),
        ),
    ])
}
