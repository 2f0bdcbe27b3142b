//! Elapsed-time measurement and local wall-clock queries.
//!
//! A [`Clock`] measures seconds since it was created from a pluggable
//! [`TimeSource`], and hands out [`Stopwatch`]es for timing sections of work.
//! Local time and date always come from the system wall clock.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{Datelike, Local, Timelike, Weekday};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A monotonic source of time.
pub trait TimeSource: Send + Sync {
    /// Time elapsed since an arbitrary, fixed epoch.
    fn now(&self) -> Duration;
}

/// Default [`TimeSource`], backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSource {
    epoch: Instant,
}

impl Default for MonotonicSource {
    fn default() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl TimeSource for MonotonicSource {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Local time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Hours, 0–23.
    pub hours: u32,
    /// Minutes, 0–59.
    pub minutes: u32,
    /// Seconds, 0–59.
    pub seconds: u32,
    /// Milliseconds, 0–999.
    pub milliseconds: u32,
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}.{}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

/// Local calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    /// Month, 1–12.
    pub month: u32,
    /// Day of the month, 1–31.
    pub day: u32,
    /// Year.
    pub year: i32,
    /// Day of the week.
    pub weekday: Weekday,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let month = self
            .month
            .checked_sub(1)
            .and_then(|index| MONTHS.get(index as usize))
            .copied()
            .unwrap_or("???");
        write!(f, "{}, {} {}, {}", self.weekday, month, self.day, self.year)
    }
}

/// Measures time elapsed since its creation.
pub struct Clock {
    source: Box<dyn TimeSource>,
    start: Duration,
}

impl Clock {
    /// A clock backed by [`MonotonicSource`].
    pub fn new() -> Self {
        Self::with_source(MonotonicSource::default())
    }

    /// A clock backed by `source`, starting now.
    pub fn with_source(source: impl TimeSource + 'static) -> Self {
        let start = source.now();
        Self {
            source: Box::new(source),
            start,
        }
    }

    /// Seconds since the clock was created.
    pub fn get_time(&self) -> f64 {
        self.source.now().saturating_sub(self.start).as_secs_f64()
    }

    /// Current local time of day.
    pub fn get_local_time(&self) -> Time {
        let now = Local::now();
        Time {
            hours: now.hour(),
            minutes: now.minute(),
            seconds: now.second(),
            // Leap seconds report nanoseconds past 1e9.
            milliseconds: (now.nanosecond() / 1_000_000).min(999),
        }
    }

    /// Current local date.
    pub fn get_local_date(&self) -> Date {
        let today = Local::now().date_naive();
        Date {
            month: today.month(),
            day: today.day(),
            year: today.year(),
            weekday: today.weekday(),
        }
    }

    /// A stopped stopwatch bound to this clock.
    pub fn make_stopwatch(&self) -> Stopwatch<'_> {
        Stopwatch::new(self)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("elapsed", &self.get_time())
            .finish_non_exhaustive()
    }
}

/// Times a span of work against a [`Clock`].
#[derive(Debug)]
pub struct Stopwatch<'a> {
    clock: &'a Clock,
    start_time: f64,
    started: bool,
}

impl<'a> Stopwatch<'a> {
    /// A stopped stopwatch bound to `clock`.
    pub fn new(clock: &'a Clock) -> Self {
        Self {
            clock,
            start_time: 0.0,
            started: false,
        }
    }

    /// Start (or restart) timing from now.
    pub fn start(&mut self) {
        self.started = true;
        self.start_time = self.clock.get_time();
    }

    /// Seconds since [`start`](Self::start), or 0 if stopped.
    pub fn get_time(&self) -> f64 {
        if self.started {
            self.clock.get_time() - self.start_time
        } else {
            0.0
        }
    }

    /// Stop timing and return the elapsed seconds (0 if already stopped).
    pub fn stop(&mut self) -> f64 {
        let elapsed = self.get_time();
        self.started = false;
        elapsed
    }

    /// Whether the stopwatch is running.
    pub fn started(&self) -> bool {
        self.started
    }
}

/// A clone is a fresh, stopped stopwatch on the same clock.
impl Clone for Stopwatch<'_> {
    fn clone(&self) -> Self {
        Self::new(self.clock)
    }
}
