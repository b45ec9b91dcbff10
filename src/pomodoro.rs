//! Pomodoro timer state machine.
//!
//! The engine never touches a clock or a timer itself. The host starts a
//! once-per-second driver when [`Pomodoro::start`] reports a change, stops it
//! on pause or reset, and feeds each elapsed second to [`Pomodoro::tick`].

use crate::models::StudySession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Mode label written to the study-session log for completed work intervals.
pub const SESSION_MODE: &str = "Pomodoro";

/// Every this many completed work intervals, the break is a long one.
pub const LONG_BREAK_EVERY: u32 = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mode::Work => "Work",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        };
        f.write_str(label)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "work" => Ok(Mode::Work),
            "short" | "shortbreak" => Ok(Mode::ShortBreak),
            "long" | "longbreak" => Ok(Mode::LongBreak),
            other => Err(format!("unknown mode '{other}' (expected work, short or long)")),
        }
    }
}

/// Length of each mode, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Durations {
    pub work: u64,
    pub short_break: u64,
    pub long_break: u64,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            work: 25 * 60,
            short_break: 5 * 60,
            long_break: 15 * 60,
        }
    }
}

impl Durations {
    pub fn of(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Work => self.work,
            Mode::ShortBreak => self.short_break,
            Mode::LongBreak => self.long_break,
        }
    }
}

/// Emitted by the tick that finishes an interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub finished: Mode,
    /// Present when a started work interval ran to the end.
    pub session: Option<StudySession>,
    pub next: Mode,
}

#[derive(Debug, Clone)]
pub struct Pomodoro {
    durations: Durations,
    mode: Mode,
    time_left: u64,
    running: bool,
    completed_work: u32,
    session_start: Option<DateTime<Utc>>,
}

impl Pomodoro {
    pub fn new(durations: Durations) -> Self {
        Self {
            durations,
            mode: Mode::Work,
            time_left: durations.work,
            running: false,
            completed_work: 0,
            session_start: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn time_left(&self) -> u64 {
        self.time_left
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work(&self) -> u32 {
        self.completed_work
    }

    pub fn session_start(&self) -> Option<DateTime<Utc>> {
        self.session_start
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    /// Returns `true` when the timer went from stopped to running, i.e. the
    /// host must start its countdown driver.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        if self.session_start.is_none() {
            self.session_start = Some(now);
        }
        info!(mode = %self.mode, time_left = self.time_left, "pomodoro started");
        true
    }

    /// Returns `true` when a running timer was halted. Remaining time is kept.
    pub fn pause(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        info!(mode = %self.mode, time_left = self.time_left, "pomodoro paused");
        true
    }

    /// Stop and switch to `mode` (work when `None`) with its full duration.
    /// This is the only place durations are (re)applied.
    pub fn reset(&mut self, mode: Option<Mode>) {
        self.running = false;
        self.session_start = None;
        self.mode = mode.unwrap_or_default();
        self.time_left = self.durations.of(self.mode);
        debug!(mode = %self.mode, "pomodoro reset");
    }

    /// Advance by one elapsed second.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Completion> {
        if !self.running {
            return None;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            return None;
        }
        Some(self.complete(now))
    }

    fn complete(&mut self, now: DateTime<Utc>) -> Completion {
        let finished = self.mode;
        self.running = false;

        let session = match (finished, self.session_start) {
            (Mode::Work, Some(_)) => {
                self.completed_work += 1;
                Some(StudySession {
                    date: now,
                    duration: self.durations.work,
                    mode: SESSION_MODE.to_string(),
                    course: None,
                })
            }
            _ => None,
        };

        let next = match finished {
            Mode::Work if self.completed_work % LONG_BREAK_EVERY == 0 => Mode::LongBreak,
            Mode::Work => Mode::ShortBreak,
            Mode::ShortBreak | Mode::LongBreak => Mode::Work,
        };
        info!(
            finished = %finished,
            next = %next,
            completed_work = self.completed_work,
            "pomodoro interval complete"
        );

        self.reset(Some(next));
        Completion {
            finished,
            session,
            next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 14, 0, 0).unwrap()
    }

    fn short() -> Durations {
        Durations {
            work: 3,
            short_break: 2,
            long_break: 4,
        }
    }

    fn run_to_completion(pomodoro: &mut Pomodoro) -> Completion {
        pomodoro.start(now());
        loop {
            if let Some(done) = pomodoro.tick(now()) {
                return done;
            }
        }
    }

    #[test]
    fn test_defaults() {
        let pomodoro = Pomodoro::new(Durations::default());
        assert_eq!(pomodoro.mode(), Mode::Work);
        assert_eq!(pomodoro.time_left(), 1500);
        assert!(!pomodoro.is_running());
        assert_eq!(pomodoro.session_start(), None);
    }

    #[test]
    fn test_start_pause_preserves_time() {
        let mut pomodoro = Pomodoro::new(Durations::default());
        assert!(pomodoro.start(now()));
        assert!(!pomodoro.start(now()));
        for _ in 0..5 {
            assert!(pomodoro.tick(now()).is_none());
        }
        assert!(pomodoro.pause());
        assert_eq!(pomodoro.time_left(), 1495);

        // Ticks while paused do nothing
        assert!(pomodoro.tick(now()).is_none());
        assert_eq!(pomodoro.time_left(), 1495);

        pomodoro.start(now());
        pomodoro.tick(now());
        assert_eq!(pomodoro.time_left(), 1494);
        assert_eq!(pomodoro.session_start(), Some(now()));
    }

    #[test]
    fn test_reset() {
        let mut pomodoro = Pomodoro::new(Durations::default());
        pomodoro.start(now());
        pomodoro.tick(now());
        pomodoro.reset(Some(Mode::LongBreak));
        assert_eq!(pomodoro.mode(), Mode::LongBreak);
        assert_eq!(pomodoro.time_left(), 900);
        assert!(!pomodoro.is_running());
        assert_eq!(pomodoro.session_start(), None);

        pomodoro.reset(None);
        assert_eq!(pomodoro.mode(), Mode::Work);
        assert_eq!(pomodoro.time_left(), 1500);
    }

    #[test]
    fn test_work_completion_records_session() {
        let mut pomodoro = Pomodoro::new(short());
        let done = run_to_completion(&mut pomodoro);

        assert_eq!(done.finished, Mode::Work);
        assert_eq!(done.next, Mode::ShortBreak);
        let session = done.session.unwrap();
        assert_eq!(session.duration, 3);
        assert_eq!(session.mode, SESSION_MODE);
        assert_eq!(pomodoro.completed_work(), 1);

        // Auto-advanced through reset
        assert_eq!(pomodoro.mode(), Mode::ShortBreak);
        assert_eq!(pomodoro.time_left(), 2);
        assert!(!pomodoro.is_running());
        assert_eq!(pomodoro.session_start(), None);

        // Nothing more happens until started again
        assert!(pomodoro.tick(now()).is_none());
        assert_eq!(pomodoro.completed_work(), 1);
    }

    #[test]
    fn test_break_completion_returns_to_work() {
        let mut pomodoro = Pomodoro::new(short());
        pomodoro.reset(Some(Mode::ShortBreak));
        let done = run_to_completion(&mut pomodoro);
        assert_eq!(done.finished, Mode::ShortBreak);
        assert_eq!(done.next, Mode::Work);
        assert!(done.session.is_none());
        assert_eq!(pomodoro.completed_work(), 0);
    }

    #[test]
    fn test_long_break_cadence() {
        let mut pomodoro = Pomodoro::new(short());
        let mut next_modes = Vec::new();
        for _ in 0..4 {
            let work = run_to_completion(&mut pomodoro);
            assert_eq!(work.finished, Mode::Work);
            next_modes.push(work.next);
            let rest = run_to_completion(&mut pomodoro);
            assert_eq!(rest.next, Mode::Work);
        }
        assert_eq!(
            next_modes,
            vec![
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::ShortBreak,
                Mode::LongBreak
            ]
        );
        assert_eq!(pomodoro.completed_work(), 4);
    }

    #[test]
    fn test_cadence_survives_manual_resets() {
        let mut pomodoro = Pomodoro::new(short());
        for _ in 0..3 {
            run_to_completion(&mut pomodoro);
            pomodoro.reset(None);
        }
        let fourth = run_to_completion(&mut pomodoro);
        assert_eq!(fourth.next, Mode::LongBreak);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("work".parse::<Mode>(), Ok(Mode::Work));
        assert_eq!("Short Break".parse::<Mode>(), Ok(Mode::ShortBreak));
        assert_eq!("long-break".parse::<Mode>(), Ok(Mode::LongBreak));
        assert!("nap".parse::<Mode>().is_err());
    }
}
