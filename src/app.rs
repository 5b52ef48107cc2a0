use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::session::{Direction, DisplayOptions, SessionController, SessionView};

/// Key bindings shown in the footer.
pub const HELP_CONFIGURING: &str = "espace ▶ · +/- durée · g gong · p/t affichage · d écran noir · q quitter";
pub const HELP_RUNNING: &str = "espace ■ · g gong · q quitter";

/// What a key press asked for, independent of the session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StartStop,
    Longer,
    Shorter,
    ToggleGong,
    ToggleProgress,
    ToggleRemainingTime,
    ToggleDimScreen,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Action::Quit);
        }
        match key.code {
            KeyCode::Char(' ') | KeyCode::Enter => Some(Action::StartStop),
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up | KeyCode::Right => Some(Action::Longer),
            KeyCode::Char('-') | KeyCode::Down | KeyCode::Left => Some(Action::Shorter),
            KeyCode::Char('g') => Some(Action::ToggleGong),
            KeyCode::Char('p') => Some(Action::ToggleProgress),
            KeyCode::Char('t') => Some(Action::ToggleRemainingTime),
            KeyCode::Char('d') => Some(Action::ToggleDimScreen),
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            _ => None,
        }
    }
}

pub struct App {
    pub session: SessionController,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: SessionController) -> Self {
        Self {
            session,
            should_quit: false,
        }
    }

    pub fn view(&self) -> SessionView {
        self.session.view()
    }

    pub fn on_tick(&mut self) {
        self.session.advance();
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        let action = Action::from_key(key);
        // A black screen swallows the first key and only wakes up, except quit.
        if self.session.view().dimmed && action != Some(Action::Quit) {
            self.session.reactivate_screen_temporarily();
            return;
        }
        match action {
            Some(action) => self.apply(action),
            None => self.session.reactivate_screen_temporarily(),
        }
    }

    pub fn apply(&mut self, action: Action) {
        let prefs = self.session.preferences();
        match action {
            Action::StartStop => {
                if self.session.is_running() {
                    self.session.stop();
                } else {
                    self.session.start();
                }
            }
            Action::Longer => self.session.adjust_duration(Direction::Increase),
            Action::Shorter => self.session.adjust_duration(Direction::Decrease),
            Action::ToggleGong => self.session.toggle_gong(),
            Action::ToggleProgress => self.session.set_display_options(DisplayOptions {
                show_progress: Some(!prefs.show_progress),
                ..DisplayOptions::default()
            }),
            Action::ToggleRemainingTime => self.session.set_display_options(DisplayOptions {
                show_remaining_time: Some(!prefs.show_remaining_time),
                ..DisplayOptions::default()
            }),
            Action::ToggleDimScreen => self.session.set_display_options(DisplayOptions {
                dim_screen: Some(!prefs.dim_screen),
                ..DisplayOptions::default()
            }),
            Action::Quit => {
                self.session.stop();
                self.should_quit = true;
            }
        }
    }
}
