//! Application context: the one owner of the study data, the timer engine,
//! the store and the periodic drivers. Front ends hold an [`App`] and call
//! into it; nothing here is global.

use crate::autosave::{flush, SaveReport};
use crate::config::Config;
use crate::error::Error;
use crate::models::StudySession;
use crate::planner::Planner;
use crate::pomodoro::{Durations, Mode, Pomodoro};
use crate::quotes::QuoteRotation;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub durations: Durations,
    pub autosave_interval: Duration,
    pub quote_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            durations: Durations::default(),
            autosave_interval: Duration::from_secs(60),
            quote_interval: Duration::from_secs(60),
        }
    }
}

impl Settings {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            durations: config.durations()?,
            autosave_interval: config.autosave_interval()?,
            quote_interval: config.quote_interval()?,
        })
    }
}

#[derive(Debug)]
pub enum AppEvent {
    IntervalComplete {
        finished: Mode,
        next: Mode,
        session: Option<StudySession>,
    },
    AutoSaved(SaveReport),
    QuoteRotated(&'static str),
}

#[derive(Debug)]
pub enum CloseOutcome {
    /// The user declined; state and timers are untouched.
    Aborted,
    Closed(SaveReport),
}

pub struct App {
    planner: Planner,
    pomodoro: Pomodoro,
    storage: Storage,
    scheduler: Scheduler,
    countdown: Option<TimerId>,
    pomodoro_course: Option<String>,
    quotes: QuoteRotation,
}

impl App {
    pub fn new(planner: Planner, storage: Storage, settings: Settings) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.register(TimerKind::AutoSave, settings.autosave_interval);
        scheduler.register(TimerKind::QuoteRotation, settings.quote_interval);

        Self {
            planner,
            pomodoro: Pomodoro::new(settings.durations),
            storage,
            scheduler,
            countdown: None,
            pomodoro_course: None,
            quotes: QuoteRotation::seeded(Utc::now().timestamp().unsigned_abs()),
        }
    }

    /// Load every record from `storage`. Records that could not be read are
    /// reported alongside the app, which starts with empty data for them.
    pub fn open(mut storage: Storage, settings: Settings, now: DateTime<Utc>) -> (Self, Vec<Error>) {
        let (planner, problems) = storage.load_planner(now);
        (Self::new(planner, storage, settings), problems)
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut Planner {
        &mut self.planner
    }

    pub fn pomodoro(&self) -> &Pomodoro {
        &self.pomodoro
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn quote(&self) -> &'static str {
        self.quotes.current()
    }

    pub fn pomodoro_course(&self) -> Option<&str> {
        self.pomodoro_course.as_deref()
    }

    /// Attribute completed work intervals to `course` (or to none).
    pub fn bind_pomodoro(&mut self, course: Option<String>) {
        self.pomodoro_course = course;
    }

    pub fn start_pomodoro(&mut self, now: DateTime<Utc>) {
        if self.pomodoro.start(now) {
            self.countdown = Some(self.scheduler.register(TimerKind::Countdown, TICK));
        }
    }

    pub fn pause_pomodoro(&mut self) {
        if self.pomodoro.pause() {
            self.stop_countdown();
        }
    }

    pub fn toggle_pomodoro(&mut self, now: DateTime<Utc>) {
        if self.pomodoro.is_running() {
            self.pause_pomodoro();
        } else {
            self.start_pomodoro(now);
        }
    }

    pub fn reset_pomodoro(&mut self, mode: Option<Mode>) {
        self.stop_countdown();
        self.pomodoro.reset(mode);
    }

    fn stop_countdown(&mut self) {
        if let Some(id) = self.countdown.take() {
            self.scheduler.cancel(id);
        }
    }

    /// Let `by` of time pass, running every timer that falls due.
    pub fn advance(&mut self, by: Duration, now: DateTime<Utc>) -> Vec<AppEvent> {
        let until = self.scheduler.elapsed() + by;
        let mut events = Vec::new();
        while let Some((_, kind)) = self.scheduler.pop_due(until) {
            if let Some(event) = self.dispatch(kind, now) {
                events.push(event);
            }
        }
        self.scheduler.settle(until);
        events
    }

    fn dispatch(&mut self, kind: TimerKind, now: DateTime<Utc>) -> Option<AppEvent> {
        match kind {
            TimerKind::Countdown => {
                let done = self.pomodoro.tick(now)?;
                self.stop_countdown();
                let session = done.session.map(|mut session| {
                    session.course = self.pomodoro_course.clone();
                    self.planner.record_study_session(session.clone());
                    session
                });
                Some(AppEvent::IntervalComplete {
                    finished: done.finished,
                    next: done.next,
                    session,
                })
            }
            TimerKind::AutoSave => Some(AppEvent::AutoSaved(flush(
                &mut self.planner,
                &self.storage,
                false,
            ))),
            TimerKind::QuoteRotation => Some(AppEvent::QuoteRotated(self.quotes.advance())),
        }
    }

    /// Save every record now, dirty or not.
    pub fn save_all(&mut self) -> SaveReport {
        flush(&mut self.planner, &self.storage, true)
    }

    /// Save requested by the user. This also overwrites files that were
    /// unreadable at open and could not be moved aside.
    pub fn save_now(&mut self) -> SaveReport {
        self.storage.release_all();
        self.save_all()
    }

    pub fn save_dirty(&mut self) -> SaveReport {
        flush(&mut self.planner, &self.storage, false)
    }

    pub fn export(&self, path: &Path, now: DateTime<Utc>) -> io::Result<()> {
        self.storage.export(&self.planner, path, now)?;
        info!(path = %path.display(), "data exported");
        Ok(())
    }

    /// Close request. While the timer runs, `confirm` decides; declining
    /// leaves everything as it was. Otherwise all drivers are cancelled and
    /// every record is saved unconditionally.
    pub fn request_close(&mut self, confirm: impl FnOnce() -> bool) -> CloseOutcome {
        if self.pomodoro.is_running() && !confirm() {
            info!("close aborted");
            return CloseOutcome::Aborted;
        }

        self.scheduler.cancel_all();
        self.countdown = None;
        self.pomodoro.pause();
        let report = self.save_all();
        info!(ok = report.is_ok(), "closed");
        CloseOutcome::Closed(report)
    }
}
