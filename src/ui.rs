pub mod progress;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph, Widget},
    Frame,
};

use crate::{
    app::{App, HELP_CONFIGURING, HELP_RUNNING},
    session::{SessionOutcome, SessionView},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const SETTINGS_LINES: u16 = 4;
const DIAL_HEIGHT: u16 = 12;
const LABEL_WIDTH: usize = 12;

pub fn draw(app: &App, f: &mut Frame) {
    let view = app.view();
    f.render_widget(&view, f.area());
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

fn settings_line<'a>(label: &'a str, value: String, key_hint: &'a str, hint_style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:>width$}  ", label, width = LABEL_WIDTH), Style::default().fg(Color::Gray)),
        Span::raw(value),
        Span::styled(format!("  ({})", key_hint), hint_style),
    ])
}

fn settings_lines(view: &SessionView, hint_style: Style) -> Vec<Line<'static>> {
    let prefs = &view.preferences;
    vec![
        settings_line("Durée", view.duration_label.clone(), "+/-", hint_style),
        settings_line(
            "Gong",
            if prefs.gong_enabled { "on ♪".to_string() } else { "off".to_string() },
            "g",
            hint_style,
        ),
        settings_line(
            "Affichage",
            format!(
                "{} Progression  {} Temps restant",
                checkbox(prefs.show_progress),
                checkbox(prefs.show_remaining_time)
            ),
            "p/t",
            hint_style,
        ),
        settings_line(
            "Écran noir",
            if prefs.dim_screen { "Activé".to_string() } else { "Désactivé".to_string() },
            "d",
            hint_style,
        ),
    ]
}

fn outcome_text(outcome: Option<SessionOutcome>) -> &'static str {
    match outcome {
        Some(SessionOutcome::Completed) => "Séance terminée",
        Some(SessionOutcome::Stopped) => "Séance interrompue",
        None => "",
    }
}

impl Widget for &SessionView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.dimmed {
            Clear.render(area, buf);
            Block::default().style(Style::default().bg(Color::Black)).render(area, buf);
            return;
        }

        // styles
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let faded_style = Style::default().fg(Color::DarkGray);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC).fg(Color::Gray);

        let upper_height = if self.is_running() {
            if self.show_progress {
                DIAL_HEIGHT
            } else {
                0
            }
        } else {
            SETTINGS_LINES
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(0),               // padding
                Constraint::Length(upper_height), // settings or dial
                Constraint::Length(1),            // padding
                Constraint::Length(1),            // time
                Constraint::Length(1),            // start/stop hint
                Constraint::Length(1),            // last outcome
                Constraint::Min(0),               // padding
                Constraint::Length(1),            // footer
            ])
            .split(area);

        if self.is_running() {
            if self.show_progress {
                progress::dial(self.completion).render(progress::dial_area(chunks[1]), buf);
            }
        } else {
            Paragraph::new(settings_lines(self, faded_style))
                .alignment(Alignment::Center)
                .render(chunks[1], buf);
        }

        if self.show_time {
            Paragraph::new(Span::styled(self.remaining_label.clone(), bold_style))
                .alignment(Alignment::Center)
                .render(chunks[3], buf);
        }

        let hint = if self.is_running() {
            Span::styled("■ arrêter", faded_style)
        } else {
            Span::styled("▶ commencer", bold_style)
        };
        Paragraph::new(hint).alignment(Alignment::Center).render(chunks[4], buf);

        if !self.is_running() {
            Paragraph::new(Span::styled(outcome_text(self.last_outcome), italic_style))
                .alignment(Alignment::Center)
                .render(chunks[5], buf);
        }

        let footer = if self.is_running() {
            Line::from(Span::styled(HELP_RUNNING, faded_style))
        } else {
            Line::from(vec![
                Span::styled(HELP_CONFIGURING, faded_style),
                Span::styled(format!("   v{}", env!("CARGO_PKG_VERSION")), faded_style),
            ])
        };
        Paragraph::new(footer).alignment(Alignment::Center).render(chunks[7], buf);
    }
}
