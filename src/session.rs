//! The meditation session state machine.
//!
//! `Configuring → Running → Finished → Configuring`, plus `Running →
//! Configuring` on stop. Finished only lives for the tick that completes the
//! countdown: its side effects fire, then the controller falls back to
//! Configuring with the timer reset.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::AudioCue;
use crate::duration::{decremented_duration, format_seconds, incremented_duration};
use crate::preferences::{PreferenceStore, Preferences, Setting, MAX_DURATION_MINUTES};
use crate::presentation::{PresentationMode, WakeLock};
use crate::schedule::{Clock, Deadline, Interval};

pub const DURATION_STEP_MINUTES: u32 = 5;
pub const TICK_PERIOD: Duration = Duration::from_secs(1);
/// Screen stays visible this long after start before dimming.
pub const REVEAL_AFTER_START: Duration = Duration::from_millis(2500);
/// Screen stays visible this long after a reactivation before dimming again.
pub const REVEAL_ON_REACTIVATE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Configuring,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub phase: Phase,
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimState {
    pub dimmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

/// How the last session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed,
    Stopped,
}

/// Partial update of the display preferences; `None` leaves a field alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_progress: Option<bool>,
    pub show_remaining_time: Option<bool>,
    pub dim_screen: Option<bool>,
}

/// The start and finish gongs. Two instances so the finish one can be primed
/// while the start one plays.
pub struct Cues {
    pub start: Box<dyn AudioCue>,
    pub finish: Box<dyn AudioCue>,
}

/// Snapshot the UI renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub preferences: Preferences,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub remaining_label: String,
    pub duration_label: String,
    /// Elapsed share of the session in `0.0..=1.0`.
    pub completion: f64,
    pub show_time: bool,
    pub show_progress: bool,
    pub dimmed: bool,
    pub last_outcome: Option<SessionOutcome>,
}

impl SessionView {
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }
}

fn cue_volume(gong_enabled: bool) -> f32 {
    if gong_enabled {
        1.0
    } else {
        0.0
    }
}

fn minutes_to_seconds(minutes: u32) -> u32 {
    minutes.min(MAX_DURATION_MINUTES) * 60
}

pub struct SessionController {
    prefs: Preferences,
    state: SessionState,
    dim: DimState,
    /// `dim_screen` as it was when the running session started.
    dim_latched: bool,
    ticker: Option<Interval>,
    redim: Option<Deadline>,
    wake_lock: Option<WakeLock>,
    last_outcome: Option<SessionOutcome>,
    cues: Cues,
    presentation: Box<dyn PresentationMode>,
    store: Box<dyn PreferenceStore>,
    clock: Box<dyn Clock>,
}

impl SessionController {
    pub fn new(
        store: Box<dyn PreferenceStore>,
        presentation: Box<dyn PresentationMode>,
        mut cues: Cues,
        clock: Box<dyn Clock>,
    ) -> Self {
        let prefs = Preferences::load(store.as_ref());
        let volume = cue_volume(prefs.gong_enabled);
        cues.start.set_volume(volume);
        cues.finish.set_volume(volume);

        Self {
            state: SessionState {
                phase: Phase::Configuring,
                remaining_seconds: minutes_to_seconds(prefs.duration_minutes),
            },
            prefs,
            dim: DimState::default(),
            dim_latched: false,
            ticker: None,
            redim: None,
            wake_lock: None,
            last_outcome: None,
            cues,
            presentation,
            store,
            clock,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    pub fn dim_state(&self) -> DimState {
        self.dim
    }

    pub fn is_running(&self) -> bool {
        self.state.phase == Phase::Running
    }

    pub fn has_pending_redim(&self) -> bool {
        self.redim.is_some()
    }

    fn total_seconds(&self) -> u32 {
        minutes_to_seconds(self.prefs.duration_minutes)
    }

    fn persist(&mut self, setting: Setting) {
        if let Err(e) = self.prefs.save_setting(setting, self.store.as_mut()) {
            warn!(setting = %setting, error = %e, "failed to persist preference");
        }
    }

    fn apply_duration(&mut self, minutes: u32) {
        let minutes = minutes.clamp(1, MAX_DURATION_MINUTES);
        if minutes == self.prefs.duration_minutes {
            return;
        }
        self.prefs.duration_minutes = minutes;
        self.persist(Setting::DurationMinutes);
        self.state.remaining_seconds = self.total_seconds();
        debug!(minutes, "duration changed");
    }

    /// Steps the duration up or down. Only while Configuring.
    pub fn adjust_duration(&mut self, direction: Direction) {
        if self.state.phase != Phase::Configuring {
            debug!(phase = %self.state.phase, "ignoring duration change");
            return;
        }
        let current = self.prefs.duration_minutes;
        let next = match direction {
            Direction::Increase => incremented_duration(current, DURATION_STEP_MINUTES),
            Direction::Decrease => decremented_duration(current, DURATION_STEP_MINUTES),
        };
        self.apply_duration(next);
    }

    /// Sets the duration directly. Only while Configuring.
    pub fn set_duration_minutes(&mut self, minutes: u32) {
        if self.state.phase != Phase::Configuring {
            debug!(phase = %self.state.phase, "ignoring duration change");
            return;
        }
        self.apply_duration(minutes);
    }

    /// Flips the gong and applies the new volume to both cues right away,
    /// including one that is already playing.
    pub fn toggle_gong(&mut self) {
        self.prefs.gong_enabled = !self.prefs.gong_enabled;
        self.persist(Setting::GongEnabled);

        let volume = cue_volume(self.prefs.gong_enabled);
        self.cues.start.set_volume(volume);
        self.cues.finish.set_volume(volume);
        debug!(enabled = self.prefs.gong_enabled, "gong toggled");
    }

    /// Updates display preferences. A `dim_screen` change takes effect at the
    /// next start.
    pub fn set_display_options(&mut self, options: DisplayOptions) {
        if let Some(show) = options.show_progress {
            if show != self.prefs.show_progress {
                self.prefs.show_progress = show;
                self.persist(Setting::ShowProgress);
            }
        }
        if let Some(show) = options.show_remaining_time {
            if show != self.prefs.show_remaining_time {
                self.prefs.show_remaining_time = show;
                self.persist(Setting::ShowRemainingTime);
            }
        }
        if let Some(dim) = options.dim_screen {
            if dim != self.prefs.dim_screen {
                self.prefs.dim_screen = dim;
                self.persist(Setting::DimScreen);
            }
        }
    }

    pub fn start(&mut self) {
        if self.state.phase != Phase::Configuring {
            debug!(phase = %self.state.phase, "ignoring start");
            return;
        }
        let now = self.clock.now();

        self.state = SessionState {
            phase: Phase::Running,
            remaining_seconds: self.total_seconds(),
        };
        self.dim = DimState::default();
        self.dim_latched = self.prefs.dim_screen;
        self.last_outcome = None;

        if let Err(e) = self.presentation.enter_immersive() {
            warn!(error = %e, "continuing without immersive mode");
        }

        let volume = cue_volume(self.prefs.gong_enabled);
        self.cues.start.set_volume(volume);
        if let Err(e) = self.cues.start.play(true) {
            warn!(error = %e, "start gong failed");
        }
        // Ready before the finish so it plays without a fresh keypress.
        if let Err(e) = self.cues.finish.prime() {
            warn!(error = %e, "finish gong could not be primed");
        }

        match self.presentation.acquire_wake_lock() {
            Ok(lock) => self.wake_lock = Some(lock),
            Err(e) => warn!(error = %e, "continuing without wake lock"),
        }

        self.ticker = Some(Interval::new(now, TICK_PERIOD));
        self.redim = self
            .dim_latched
            .then(|| Deadline::after(now, REVEAL_AFTER_START));

        info!(
            minutes = self.prefs.duration_minutes,
            dim = self.dim_latched,
            "session started"
        );
    }

    pub fn stop(&mut self) {
        if self.state.phase != Phase::Running {
            debug!(phase = %self.state.phase, "ignoring stop");
            return;
        }
        self.leave_running();

        if let Err(e) = self.presentation.exit_immersive() {
            warn!(error = %e, "failed to leave immersive mode");
        }
        self.release_wake_lock();
        self.cues.finish.pause();
        self.cues.start.pause();

        self.state = SessionState {
            phase: Phase::Configuring,
            remaining_seconds: self.total_seconds(),
        };
        self.last_outcome = Some(SessionOutcome::Stopped);
        info!("session stopped");
    }

    /// Un-dims the screen and re-dims it after [`REVEAL_ON_REACTIVATE`],
    /// replacing any pending re-dim. Only while a dimmed session runs.
    pub fn reactivate_screen_temporarily(&mut self) {
        if self.state.phase != Phase::Running || !self.dim_latched {
            return;
        }
        self.dim.dimmed = false;
        self.redim = Some(Deadline::after(self.clock.now(), REVEAL_ON_REACTIVATE));
        debug!("screen revealed");
    }

    /// Drives the countdown and the dim schedule. Call from the event loop.
    pub fn advance(&mut self) {
        if self.state.phase != Phase::Running {
            return;
        }
        let now = self.clock.now();

        if self.redim.is_some_and(|deadline| deadline.is_due(now)) {
            self.redim = None;
            self.dim.dimmed = true;
            debug!("screen dimmed");
        }

        let elapsed = self.ticker.as_mut().map_or(0, |ticker| ticker.poll(now));
        for _ in 0..elapsed {
            self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
            if self.state.remaining_seconds == 0 {
                self.finish();
                break;
            }
        }
    }

    fn finish(&mut self) {
        self.state.phase = Phase::Finished;
        self.leave_running();

        self.release_wake_lock();
        if let Err(e) = self.presentation.exit_immersive() {
            warn!(error = %e, "failed to leave immersive mode");
        }
        if let Err(e) = self.cues.finish.play(true) {
            warn!(error = %e, "finish gong failed");
        }
        self.last_outcome = Some(SessionOutcome::Completed);
        info!(minutes = self.prefs.duration_minutes, "session completed");

        self.state = SessionState {
            phase: Phase::Configuring,
            remaining_seconds: self.total_seconds(),
        };
    }

    fn leave_running(&mut self) {
        self.ticker = None;
        self.redim = None;
        self.dim = DimState::default();
        self.dim_latched = false;
    }

    fn release_wake_lock(&mut self) {
        if let Some(lock) = self.wake_lock.take() {
            if let Err(e) = self.presentation.release_wake_lock(lock) {
                warn!(error = %e, "failed to release wake lock");
            }
        }
    }

    pub fn view(&self) -> SessionView {
        let total = self.total_seconds();
        let running = self.is_running();
        let completion = if total == 0 {
            0.0
        } else {
            f64::from(total - self.state.remaining_seconds.min(total)) / f64::from(total)
        };

        SessionView {
            phase: self.state.phase,
            preferences: self.prefs,
            remaining_seconds: self.state.remaining_seconds,
            total_seconds: total,
            remaining_label: format_seconds(u64::from(self.state.remaining_seconds)),
            duration_label: format_seconds(u64::from(total)),
            completion,
            show_time: self.prefs.show_remaining_time || !running,
            show_progress: self.prefs.show_progress && running,
            dimmed: running && self.dim.dimmed,
            last_outcome: self.last_outcome,
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.is_running() {
            self.leave_running();
            if let Err(e) = self.presentation.exit_immersive() {
                warn!(error = %e, "failed to leave immersive mode");
            }
            self.cues.start.pause();
            self.cues.finish.pause();
        }
        self.release_wake_lock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{CueCall, RecordingCue};
    use crate::preferences::{keys, MemoryPreferenceStore};
    use crate::presentation::{PresentationCall, RecordingPresentation};
    use crate::schedule::ManualClock;

    struct Harness {
        controller: SessionController,
        store: MemoryPreferenceStore,
        presentation: RecordingPresentation,
        start_cue: RecordingCue,
        finish_cue: RecordingCue,
        clock: ManualClock,
    }

    impl Harness {
        fn new(store: MemoryPreferenceStore) -> Self {
            Self::with_parts(store, RecordingPresentation::new(), RecordingCue::new())
        }

        fn with_parts(
            store: MemoryPreferenceStore,
            presentation: RecordingPresentation,
            start_cue: RecordingCue,
        ) -> Self {
            let finish_cue = RecordingCue::new();
            let clock = ManualClock::new();
            let controller = SessionController::new(
                Box::new(store.clone()),
                Box::new(presentation.clone()),
                Cues {
                    start: Box::new(start_cue.clone()),
                    finish: Box::new(finish_cue.clone()),
                },
                Box::new(clock.clone()),
            );
            Self {
                controller,
                store,
                presentation,
                start_cue,
                finish_cue,
                clock,
            }
        }

        fn elapse(&mut self, by: Duration) {
            self.clock.advance(by);
            self.controller.advance();
        }

        fn tick_seconds(&mut self, seconds: u32) {
            for _ in 0..seconds {
                self.elapse(TICK_PERIOD);
            }
        }
    }

    fn dimming_store() -> MemoryPreferenceStore {
        MemoryPreferenceStore::with_entries([(keys::BLACK_SCREEN, "true")])
    }

    #[test]
    fn starts_configuring_with_persisted_duration() {
        let h = Harness::new(MemoryPreferenceStore::with_entries([(keys::DURATION_MINUTES, "12")]));
        assert_eq!(
            h.controller.state(),
            SessionState {
                phase: Phase::Configuring,
                remaining_seconds: 720
            }
        );
    }

    #[test]
    fn initial_volume_follows_gong_preference() {
        let h = Harness::new(MemoryPreferenceStore::with_entries([(keys::GONG_ENABLED, "false")]));
        assert_eq!(h.start_cue.volume(), 0.0);
        assert_eq!(h.finish_cue.volume(), 0.0);
    }

    #[test]
    fn adjust_duration_steps_and_persists() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.adjust_duration(Direction::Increase);
        assert_eq!(h.controller.preferences().duration_minutes, 25);
        assert_eq!(h.controller.state().remaining_seconds, 1500);
        assert_eq!(h.store.get(keys::DURATION_MINUTES).as_deref(), Some("25"));

        h.controller.adjust_duration(Direction::Decrease);
        h.controller.adjust_duration(Direction::Decrease);
        assert_eq!(h.controller.preferences().duration_minutes, 15);
        h.controller.adjust_duration(Direction::Decrease);
        assert_eq!(h.controller.preferences().duration_minutes, 14);
        assert_eq!(h.controller.state().remaining_seconds, 840);
    }

    #[test]
    fn adjust_duration_clamps_at_one_minute() {
        let mut h = Harness::new(MemoryPreferenceStore::with_entries([(keys::DURATION_MINUTES, "2")]));
        h.controller.adjust_duration(Direction::Decrease);
        h.controller.adjust_duration(Direction::Decrease);
        h.controller.adjust_duration(Direction::Decrease);
        assert_eq!(h.controller.preferences().duration_minutes, 1);
        assert_eq!(h.controller.state().remaining_seconds, 60);
    }

    #[test]
    fn adjust_duration_ignored_while_running() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.start();
        h.controller.adjust_duration(Direction::Increase);
        h.controller.set_duration_minutes(40);
        assert_eq!(h.controller.preferences().duration_minutes, 20);
        assert_eq!(h.controller.state().remaining_seconds, 1200);
    }

    #[test]
    fn set_duration_minutes_floors_at_one() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.set_duration_minutes(0);
        assert_eq!(h.controller.preferences().duration_minutes, 1);
        assert_eq!(h.store.get(keys::DURATION_MINUTES).as_deref(), Some("1"));
    }

    #[test]
    fn set_duration_minutes_caps_at_one_day() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.set_duration_minutes(u32::MAX);
        assert_eq!(h.controller.preferences().duration_minutes, MAX_DURATION_MINUTES);
        assert_eq!(h.controller.state().remaining_seconds, 86_400);
        assert_eq!(h.store.get(keys::DURATION_MINUTES).as_deref(), Some("1440"));

        h.controller.adjust_duration(Direction::Increase);
        assert_eq!(h.controller.preferences().duration_minutes, MAX_DURATION_MINUTES);
    }

    #[test]
    fn oversized_stored_duration_starts_with_default() {
        let h = Harness::new(MemoryPreferenceStore::with_entries([(
            keys::DURATION_MINUTES,
            "100000000",
        )]));
        assert_eq!(h.controller.preferences().duration_minutes, 20);
        assert_eq!(h.controller.state().remaining_seconds, 1200);
    }

    #[test]
    fn start_fires_side_effects_in_order() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.start_cue.clear();
        h.finish_cue.clear();
        h.controller.start();

        assert_eq!(
            h.controller.state(),
            SessionState {
                phase: Phase::Running,
                remaining_seconds: 1200
            }
        );
        assert_eq!(
            h.presentation.calls(),
            vec![PresentationCall::EnterImmersive, PresentationCall::AcquireWakeLock]
        );
        assert_eq!(
            h.start_cue.calls(),
            vec![CueCall::SetVolume(1.0), CueCall::Play { from_start: true }]
        );
        assert_eq!(h.finish_cue.calls(), vec![CueCall::Prime]);
        assert!(h.presentation.holds_wake_lock());
    }

    #[test]
    fn start_while_running_is_noop() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.start();
        h.tick_seconds(10);
        h.presentation.clear();
        h.start_cue.clear();

        h.controller.start();
        assert_eq!(h.controller.state().remaining_seconds, 1190);
        assert!(h.presentation.calls().is_empty());
        assert!(h.start_cue.calls().is_empty());
    }

    #[test]
    fn stop_while_configuring_is_noop() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        let before = h.controller.state();
        h.controller.stop();
        assert_eq!(h.controller.state(), before);
        assert!(h.presentation.calls().is_empty());
        assert_eq!(h.controller.view().last_outcome, None);
    }

    #[test]
    fn stop_resets_and_releases_everything() {
        let mut h = Harness::new(dimming_store());
        h.controller.start();
        h.tick_seconds(30);
        assert!(h.controller.dim_state().dimmed);
        h.presentation.clear();

        h.controller.stop();
        assert_eq!(
            h.controller.state(),
            SessionState {
                phase: Phase::Configuring,
                remaining_seconds: 1200
            }
        );
        assert_eq!(
            h.presentation.calls(),
            vec![PresentationCall::ExitImmersive, PresentationCall::ReleaseWakeLock(1)]
        );
        assert!(!h.presentation.holds_wake_lock());
        assert!(!h.start_cue.is_playing());
        assert_eq!(h.finish_cue.calls().last(), Some(&CueCall::Pause));
        assert!(!h.controller.dim_state().dimmed);
        assert!(!h.controller.has_pending_redim());
        assert_eq!(h.controller.view().last_outcome, Some(SessionOutcome::Stopped));
    }

    #[test]
    fn stopped_session_leaves_no_ticking_timer() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.start();
        h.tick_seconds(5);
        h.controller.stop();
        h.elapse(Duration::from_secs(60));
        assert_eq!(h.controller.state().remaining_seconds, 1200);

        // a new session starts from a fresh interval
        h.controller.start();
        h.elapse(Duration::from_millis(999));
        assert_eq!(h.controller.state().remaining_seconds, 1200);
        h.elapse(Duration::from_millis(1));
        assert_eq!(h.controller.state().remaining_seconds, 1199);
    }

    #[test]
    fn twenty_minute_session_completes_after_1200_ticks() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.start();
        assert_eq!(h.controller.state().remaining_seconds, 1200);

        h.tick_seconds(1199);
        assert_eq!(h.controller.state().remaining_seconds, 1);
        assert!(h.controller.is_running());
        assert!(!h.finish_cue.calls().contains(&CueCall::Play { from_start: true }));

        h.tick_seconds(1);
        assert_eq!(
            h.controller.state(),
            SessionState {
                phase: Phase::Configuring,
                remaining_seconds: 1200
            }
        );
        assert!(!h.controller.view().is_running());
        assert_eq!(h.finish_cue.calls().last(), Some(&CueCall::Play { from_start: true }));
        assert!(!h.presentation.holds_wake_lock());
        assert!(!h.presentation.is_immersive());
        assert_eq!(h.controller.view().last_outcome, Some(SessionOutcome::Completed));
    }

    #[test]
    fn late_tick_catches_up_and_finishes_once() {
        let mut h = Harness::new(MemoryPreferenceStore::with_entries([(keys::DURATION_MINUTES, "1")]));
        h.controller.start();
        h.finish_cue.clear();

        h.elapse(Duration::from_secs(90));
        assert_eq!(h.controller.state().phase, Phase::Configuring);
        assert_eq!(h.controller.state().remaining_seconds, 60);
        assert_eq!(h.finish_cue.calls(), vec![CueCall::Play { from_start: true }]);

        h.elapse(Duration::from_secs(90));
        assert_eq!(h.finish_cue.calls().len(), 1);
    }

    #[test]
    fn toggle_gong_mid_session_only_changes_volume() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.start();
        h.tick_seconds(2);
        h.start_cue.clear();
        h.finish_cue.clear();

        h.controller.toggle_gong();
        assert_eq!(h.start_cue.calls(), vec![CueCall::SetVolume(0.0)]);
        assert_eq!(h.finish_cue.calls(), vec![CueCall::SetVolume(0.0)]);
        assert!(h.start_cue.is_playing());
        assert_eq!(h.store.get(keys::GONG_ENABLED).as_deref(), Some("false"));

        h.controller.toggle_gong();
        assert_eq!(h.finish_cue.volume(), 1.0);
        assert_eq!(h.store.get(keys::GONG_ENABLED).as_deref(), Some("true"));
    }

    #[test]
    fn display_options_persist_only_changed_fields() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.set_display_options(DisplayOptions {
            show_progress: Some(false),
            show_remaining_time: Some(true),
            ..DisplayOptions::default()
        });
        assert!(!h.controller.preferences().show_progress);
        assert_eq!(h.store.get(keys::SHOW_PROGRESS).as_deref(), Some("false"));
        assert_eq!(h.store.get(keys::SHOW_REMAINING_TIME), None);
    }

    #[test]
    fn dim_preference_is_latched_at_start() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.start();
        h.controller.set_display_options(DisplayOptions {
            dim_screen: Some(true),
            ..DisplayOptions::default()
        });
        h.tick_seconds(10);
        assert!(!h.controller.dim_state().dimmed);
        assert_eq!(h.store.get(keys::BLACK_SCREEN).as_deref(), Some("true"));

        h.controller.stop();
        h.controller.start();
        h.tick_seconds(3);
        assert!(h.controller.dim_state().dimmed);
    }

    #[test]
    fn dims_after_reveal_window() {
        let mut h = Harness::new(dimming_store());
        h.controller.start();
        assert!(!h.controller.view().dimmed);

        h.elapse(Duration::from_millis(2400));
        assert!(!h.controller.view().dimmed);
        h.elapse(Duration::from_millis(100));
        assert!(h.controller.view().dimmed);
        assert!(!h.controller.has_pending_redim());
    }

    #[test]
    fn reactivation_replaces_pending_redim() {
        let mut h = Harness::new(dimming_store());
        h.controller.start();
        h.elapse(Duration::from_secs(3));
        assert!(h.controller.dim_state().dimmed);

        h.controller.reactivate_screen_temporarily();
        assert!(!h.controller.dim_state().dimmed);
        h.elapse(Duration::from_secs(2));
        h.controller.reactivate_screen_temporarily();

        // first re-dim would have fired here
        h.elapse(Duration::from_secs(3));
        assert!(!h.controller.dim_state().dimmed);
        h.elapse(Duration::from_millis(1999));
        assert!(!h.controller.dim_state().dimmed);
        h.elapse(Duration::from_millis(1));
        assert!(h.controller.dim_state().dimmed);
    }

    #[test]
    fn reactivation_ignored_without_dim_schedule() {
        let mut h = Harness::new(MemoryPreferenceStore::new());
        h.controller.reactivate_screen_temporarily();
        assert!(!h.controller.has_pending_redim());

        h.controller.start();
        h.controller.reactivate_screen_temporarily();
        assert!(!h.controller.has_pending_redim());
    }

    #[test]
    fn view_hides_time_only_while_running() {
        let mut h = Harness::new(MemoryPreferenceStore::with_entries([
            (keys::SHOW_REMAINING_TIME, "false"),
            (keys::SHOW_PROGRESS, "true"),
        ]));
        let view = h.controller.view();
        assert!(view.show_time);
        assert!(!view.show_progress);
        assert_eq!(view.remaining_label, "20:00");

        h.controller.start();
        h.tick_seconds(300);
        let view = h.controller.view();
        assert!(!view.show_time);
        assert!(view.show_progress);
        assert_eq!(view.remaining_label, "15:00");
        assert!((view.completion - 0.25).abs() < 1e-9);
    }

    #[test]
    fn capability_failures_do_not_block_session() {
        let mut h = Harness::with_parts(
            MemoryPreferenceStore::with_entries([(keys::DURATION_MINUTES, "1")]),
            RecordingPresentation::unavailable(),
            RecordingCue::failing(),
        );
        h.controller.start();
        assert!(h.controller.is_running());
        h.tick_seconds(60);
        assert_eq!(h.controller.state().phase, Phase::Configuring);
        assert_eq!(h.controller.view().last_outcome, Some(SessionOutcome::Completed));
    }

    #[test]
    fn drop_releases_wake_lock() {
        let h = Harness::new(MemoryPreferenceStore::new());
        let presentation = h.presentation.clone();
        let Harness { mut controller, .. } = h;
        controller.start();
        assert!(presentation.holds_wake_lock());

        drop(controller);
        assert!(!presentation.holds_wake_lock());
        assert!(!presentation.is_immersive());
    }
}
