//! The provider's recurring weekly working-hours schedule.
//!
//! A [`WeeklySchedule`] holds exactly seven [`DaySchedule`]s in a fixed array
//! indexed Monday-first, so lookup by weekday is O(1) and iteration order is
//! always Monday through Sunday.
//!
//! Window start times are wall-clock times in the provider's time zone. A window
//! may run past local midnight; the part after midnight belongs to the next
//! day's working periods (see [`WeeklySchedule::periods_on`]).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::ScheduleLimits;
use crate::dst;
use crate::error::{EngineError, Result};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Weekdays in presentation order.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Monday-first index of a weekday (Monday = 0, Sunday = 6).
pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

/// Full English weekday name ("Monday").
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One contiguous working-hours block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Wall-clock start in the provider's time zone.
    pub start: NaiveTime,
    pub duration_minutes: u32,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, duration_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
        }
    }

    /// Minutes after local midnight at which the window opens.
    pub fn start_minute(&self) -> u32 {
        self.start.num_seconds_from_midnight() / 60
    }

    /// Minutes after local midnight at which the window closes; may exceed 1440.
    pub fn end_minute(&self) -> u32 {
        self.start_minute() + self.duration_minutes
    }

    /// Minutes of the window that fall on the following day.
    pub fn spill_minutes(&self) -> u32 {
        self.end_minute().saturating_sub(MINUTES_PER_DAY)
    }

    /// Absolute `[start, end)` of this window when it opens on `date` in `tz`.
    pub fn bounds_on(&self, tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = dst::at(tz, date, self.start);
        (start, start + Duration::minutes(i64::from(self.duration_minutes)))
    }
}

/// One weekday's availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub weekday: Weekday,
    pub unavailable: bool,
    pub windows: Vec<TimeWindow>,
}

impl DaySchedule {
    pub fn unavailable(weekday: Weekday) -> Self {
        Self {
            weekday,
            unavailable: true,
            windows: Vec::new(),
        }
    }

    pub fn available(weekday: Weekday, windows: Vec<TimeWindow>) -> Self {
        let mut day = Self {
            weekday,
            unavailable: false,
            windows,
        };
        day.sort_windows();
        day
    }

    pub fn sort_windows(&mut self) {
        self.windows.sort_by_key(|w| w.start);
    }

    /// Windows that count as working time (none when the day is unavailable).
    pub fn active_windows(&self) -> &[TimeWindow] {
        if self.unavailable {
            &[]
        } else {
            &self.windows
        }
    }

    /// Check this day on its own: non-empty when available, within limits, and
    /// no window starting before the previous one ends.
    pub fn is_valid(&self, limits: &ScheduleLimits) -> bool {
        if self.unavailable {
            return true;
        }
        if self.windows.is_empty() || self.windows.len() > limits.max_windows_per_day {
            return false;
        }
        if self
            .windows
            .iter()
            .any(|w| w.duration_minutes == 0 || !limits.accepts_duration(w.duration_minutes))
        {
            return false;
        }

        let mut sorted = self.windows.clone();
        sorted.sort_by_key(|w| w.start);
        sorted
            .windows(2)
            .all(|pair| pair[1].start_minute() >= pair[0].end_minute())
    }

    /// Spill-over of the latest-ending window into the next day, in minutes.
    fn spill_minutes(&self) -> u32 {
        self.active_windows()
            .iter()
            .map(TimeWindow::spill_minutes)
            .max()
            .unwrap_or(0)
    }
}

/// An absolute working interval on a specific date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WorkPeriod {
    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start <= start && start <= end && end <= self.end
    }

    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Seven day schedules, one per weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DaySchedule>", into = "Vec<DaySchedule>")]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl Default for WeeklySchedule {
    /// Every day unavailable.
    fn default() -> Self {
        Self {
            days: WEEKDAYS.map(DaySchedule::unavailable),
        }
    }
}

impl WeeklySchedule {
    /// Build a schedule from day entries in any order. Weekdays that are not
    /// given stay unavailable; a weekday given twice is rejected.
    pub fn from_days<I>(days: I) -> std::result::Result<Self, String>
    where
        I: IntoIterator<Item = DaySchedule>,
    {
        let mut schedule = Self::default();
        let mut seen = [false; 7];
        for day in days {
            let idx = weekday_index(day.weekday);
            if seen[idx] {
                return Err(format!("duplicate weekday: {}", weekday_name(day.weekday)));
            }
            seen[idx] = true;
            schedule.days[idx] = day;
        }
        Ok(schedule)
    }

    /// The schedule a provider starts with: one identical window on every day
    /// not listed in `unavailable_days`.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidDays` if the window violates `limits`.
    pub fn onboarding(
        start: NaiveTime,
        duration_minutes: u32,
        unavailable_days: &[Weekday],
        limits: &ScheduleLimits,
    ) -> Result<Self> {
        let days = WEEKDAYS.map(|weekday| {
            if unavailable_days.contains(&weekday) {
                DaySchedule::unavailable(weekday)
            } else {
                DaySchedule::available(weekday, vec![TimeWindow::new(start, duration_minutes)])
            }
        });
        let schedule = Self { days };
        let invalid = schedule.validate_with(limits);
        if !invalid.is_empty() {
            return Err(EngineError::InvalidDays(invalid));
        }
        Ok(schedule)
    }

    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        &self.days[weekday_index(weekday)]
    }

    pub fn day_mut(&mut self, weekday: Weekday) -> &mut DaySchedule {
        &mut self.days[weekday_index(weekday)]
    }

    /// Days in Monday-first order.
    pub fn days(&self) -> &[DaySchedule; 7] {
        &self.days
    }

    /// True when the weekday has no working windows.
    pub fn is_unavailable(&self, weekday: Weekday) -> bool {
        self.day(weekday).active_windows().is_empty()
    }

    /// Validate with the default limits. Returns Monday-first indices of invalid days.
    pub fn validate(&self) -> Vec<usize> {
        self.validate_with(&ScheduleLimits::default())
    }

    /// Validate every day against `limits`, plus each day's spill-over past
    /// midnight against the first window of the following day.
    ///
    /// Returns the Monday-first indices of invalid days, ascending.
    pub fn validate_with(&self, limits: &ScheduleLimits) -> Vec<usize> {
        let mut invalid = [false; 7];
        for (idx, day) in self.days.iter().enumerate() {
            if !day.is_valid(limits) {
                invalid[idx] = true;
            }
        }

        for (idx, day) in self.days.iter().enumerate() {
            let spill = day.spill_minutes();
            if spill == 0 {
                continue;
            }
            let next = (idx + 1) % 7;
            let first_start = self.days[next]
                .active_windows()
                .iter()
                .map(TimeWindow::start_minute)
                .min();
            if first_start.is_some_and(|start| start < spill) {
                invalid[next] = true;
            }
        }

        invalid
            .iter()
            .enumerate()
            .filter_map(|(idx, bad)| bad.then_some(idx))
            .collect()
    }

    /// Absolute working periods on `date` in `tz`, sorted by start: the
    /// previous day's spill-over (clipped to local midnight) followed by the
    /// day's own windows, each cut at the next local midnight. Every working
    /// instant belongs to exactly one date.
    pub fn periods_on(&self, tz: Tz, date: NaiveDate) -> Vec<WorkPeriod> {
        self.collect_periods(tz, date, true)
    }

    /// Like [`periods_on`](Self::periods_on), but the day's own windows keep
    /// their full length past midnight. A slot that starts on `date` fits
    /// working hours if it lies inside one of these.
    pub fn spans_on(&self, tz: Tz, date: NaiveDate) -> Vec<WorkPeriod> {
        self.collect_periods(tz, date, false)
    }

    fn collect_periods(&self, tz: Tz, date: NaiveDate, cut_at_midnight: bool) -> Vec<WorkPeriod> {
        let mut periods = Vec::new();

        if let Some(prev_date) = date.pred_opt() {
            let midnight = dst::start_of_day(tz, date);
            for window in self.day(prev_date.weekday()).active_windows() {
                if window.spill_minutes() == 0 {
                    continue;
                }
                let (_, end) = window.bounds_on(tz, prev_date);
                if end > midnight {
                    periods.push(WorkPeriod {
                        start: midnight,
                        end,
                    });
                }
            }
        }

        let day_end = date
            .succ_opt()
            .filter(|_| cut_at_midnight)
            .map(|next| dst::start_of_day(tz, next));
        for window in self.day(date.weekday()).active_windows() {
            let (start, end) = window.bounds_on(tz, date);
            let end = day_end.map_or(end, |day_end| end.min(day_end));
            if start < end {
                periods.push(WorkPeriod { start, end });
            }
        }

        periods.sort_by_key(|p| (p.start, p.end));
        periods
    }

    /// Earliest start and latest end of the working periods on `date`.
    pub fn boundary_on(&self, tz: Tz, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        envelope(&self.periods_on(tz, date))
    }

    /// Total working minutes on `date`.
    pub fn working_minutes_on(&self, tz: Tz, date: NaiveDate) -> i64 {
        self.periods_on(tz, date).iter().map(WorkPeriod::minutes).sum()
    }

    /// Re-express every window, currently wall-clock in `from`, as wall-clock in
    /// `to`, using `reference`'s date for the offsets. Windows whose new start
    /// lands on a different local date move to the adjacent weekday.
    ///
    /// `self` is never modified; the adjusted schedule is returned only if it
    /// validates.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidDays` (Monday-first indices) if re-bucketing
    /// produces overlapping windows or too many windows on a day.
    pub fn adjust(&self, reference: DateTime<Utc>, from: Tz, to: Tz) -> Result<WeeklySchedule> {
        self.adjust_with(reference, from, to, &ScheduleLimits::default())
    }

    pub fn adjust_with(
        &self,
        reference: DateTime<Utc>,
        from: Tz,
        to: Tz,
        limits: &ScheduleLimits,
    ) -> Result<WeeklySchedule> {
        let ref_date = dst::local_date(from, reference);

        let mut adjusted = Self {
            days: self.days.clone().map(|day| DaySchedule {
                windows: Vec::new(),
                ..day
            }),
        };
        let mut touched = [false; 7];

        for (idx, day) in self.days.iter().enumerate() {
            for window in day.active_windows() {
                let instant = dst::at(from, ref_date, window.start);
                let local = instant.with_timezone(&to);
                let shift = (local.date_naive() - ref_date).num_days();
                let target = (idx as i64 + shift).rem_euclid(7) as usize;

                let start = local
                    .time()
                    .with_second(0)
                    .and_then(|t| t.with_nanosecond(0))
                    .unwrap_or(local.time());
                adjusted.days[target]
                    .windows
                    .push(TimeWindow::new(start, window.duration_minutes));

                if target != idx {
                    touched[idx] = true;
                    touched[target] = true;
                }
            }
        }

        for (idx, day) in adjusted.days.iter_mut().enumerate() {
            day.sort_windows();
            if touched[idx] {
                day.unavailable = day.windows.is_empty();
            }
        }

        let invalid = adjusted.validate_with(limits);
        if !invalid.is_empty() {
            return Err(EngineError::InvalidDays(invalid));
        }
        Ok(adjusted)
    }
}

/// Earliest start and latest end across `periods`.
pub fn envelope(periods: &[WorkPeriod]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let from = periods.iter().map(|p| p.start).min()?;
    let to = periods.iter().map(|p| p.end).max()?;
    Some((from, to))
}

impl TryFrom<Vec<DaySchedule>> for WeeklySchedule {
    type Error = String;

    fn try_from(days: Vec<DaySchedule>) -> std::result::Result<Self, Self::Error> {
        if days.len() != 7 {
            return Err(format!("expected 7 day schedules, got {}", days.len()));
        }
        Self::from_days(days)
    }
}

impl From<WeeklySchedule> for Vec<DaySchedule> {
    fn from(schedule: WeeklySchedule) -> Self {
        schedule.days.into()
    }
}
