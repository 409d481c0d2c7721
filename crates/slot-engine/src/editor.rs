//! Parse, validate, render and persist operator-edited weekly schedules.
//!
//! The caller-facing form is an ordered list of seven day entries. Errors are
//! reported as indices into that list, so the caller can highlight the exact
//! rows that failed. Validation is all-or-nothing: a candidate schedule is
//! built in full and only handed back (or persisted) when every day passes.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::ScheduleLimits;
use crate::conflict::ProviderStore;
use crate::dst;
use crate::error::{EngineError, Result};
use crate::provider::Provider;
use crate::schedule::{weekday_index, weekday_name, DaySchedule, TimeWindow, WeeklySchedule};

/// Canonical rendering of a window start ("9:00 AM").
const TIME_FORMAT: &str = "%-I:%M %p";

/// Accepted input layouts, tried in order.
const TIME_INPUT_FORMATS: [&str; 3] = ["%I:%M %p", "%I:%M%p", "%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowForm {
    #[serde(alias = "from", skip_serializing_if = "Option::is_none")]
    pub start_local_time: Option<String>,
    #[serde(alias = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntryForm {
    #[serde(alias = "day", skip_serializing_if = "Option::is_none")]
    pub weekday: Option<String>,
    #[serde(alias = "availability", skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(alias = "working_hours", default)]
    pub windows: Vec<WindowForm>,
}

/// Seven day entries in caller order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleForm(pub Vec<DayEntryForm>);

impl ScheduleForm {
    /// # Errors
    /// Returns `EngineError::MalformedInput` if `json` is not a list of day entries.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::MalformedInput(e.to_string()))
    }
}

pub fn parse_local_time(input: &str) -> Option<NaiveTime> {
    let normalized = input.trim().to_uppercase();
    TIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&normalized, fmt).ok())
}

pub fn format_local_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse and validate a submitted schedule with the default limits.
pub fn parse_and_validate(form: &ScheduleForm, now: DateTime<Utc>, time_zone: &str) -> Result<WeeklySchedule> {
    parse_and_validate_with(form, now, time_zone, &ScheduleLimits::default())
}

/// Parse and validate a submitted schedule.
///
/// Each window's local start is anchored on `now`'s date in `time_zone`;
/// windows are sorted by that anchor and must not overlap.
///
/// # Errors
/// - `EngineError::InvalidTimezone` if `time_zone` is unknown.
/// - `EngineError::MalformedInput` if the form does not have seven entries.
/// - `EngineError::InvalidDays` with the indices (into `form`) of every entry
///   that failed; nothing is returned for the other entries.
pub fn parse_and_validate_with(
    form: &ScheduleForm,
    now: DateTime<Utc>,
    time_zone: &str,
    limits: &ScheduleLimits,
) -> Result<WeeklySchedule> {
    let tz = dst::parse_timezone(time_zone)?;
    if form.0.len() != 7 {
        return Err(EngineError::MalformedInput(format!(
            "expected 7 day entries, got {}",
            form.0.len()
        )));
    }

    let reference = dst::local_date(tz, now);
    let mut invalid = Vec::new();
    let mut days = Vec::with_capacity(7);
    let mut positions = [None; 7];

    for (idx, entry) in form.0.iter().enumerate() {
        let Some(day) = parse_entry(entry, tz, reference, limits) else {
            tracing::warn!(index = idx, weekday = ?entry.weekday, "rejected schedule day");
            invalid.push(idx);
            continue;
        };
        let slot = &mut positions[weekday_index(day.weekday)];
        if slot.is_some() {
            tracing::warn!(index = idx, weekday = weekday_name(day.weekday), "duplicate schedule day");
            invalid.push(idx);
            continue;
        }
        *slot = Some(idx);
        days.push(day);
    }
    if !invalid.is_empty() {
        return Err(EngineError::InvalidDays(invalid));
    }

    let schedule = WeeklySchedule::from_days(days).map_err(EngineError::MalformedInput)?;

    // Cross-day checks (spill-over past midnight) report weekday indices; map
    // them back to the caller's rows.
    let mut invalid: Vec<usize> = schedule
        .validate_with(limits)
        .into_iter()
        .filter_map(|weekday_idx| positions[weekday_idx])
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        tracing::warn!(indices = ?invalid, "schedule spills over into the next day");
        return Err(EngineError::InvalidDays(invalid));
    }
    Ok(schedule)
}

fn parse_entry(
    entry: &DayEntryForm,
    tz: Tz,
    reference: chrono::NaiveDate,
    limits: &ScheduleLimits,
) -> Option<DaySchedule> {
    let weekday = Weekday::from_str(entry.weekday.as_deref()?.trim()).ok()?;
    let available = entry.available?;
    if entry.windows.len() > limits.max_windows_per_day {
        return None;
    }
    if !available {
        return Some(DaySchedule::unavailable(weekday));
    }
    if entry.windows.is_empty() {
        return None;
    }

    let mut anchored = Vec::with_capacity(entry.windows.len());
    for form in &entry.windows {
        let start = parse_local_time(form.start_local_time.as_deref()?)?;
        let duration = u32::try_from(form.duration_minutes?).ok()?;
        if duration == 0 || !limits.accepts_duration(duration) {
            return None;
        }
        let window = TimeWindow::new(start, duration);
        let (from, to) = window.bounds_on(tz, reference);
        anchored.push((from, to, window));
    }

    anchored.sort_by_key(|(from, _, _)| *from);
    let overlapping = anchored
        .windows(2)
        .any(|pair| pair[1].0 < pair[0].1);
    if overlapping {
        return None;
    }

    Some(DaySchedule::available(
        weekday,
        anchored.into_iter().map(|(_, _, w)| w).collect(),
    ))
}

/// Render a schedule as the caller-facing form, Monday first.
///
/// Takes no time zone: window starts are already wall-clock times in the
/// provider's zone and are printed as stored. A schedule meant for another
/// zone must go through [`WeeklySchedule::adjust`] first.
pub fn render(schedule: &WeeklySchedule) -> ScheduleForm {
    let entries = schedule
        .days()
        .iter()
        .map(|day| DayEntryForm {
            weekday: Some(weekday_name(day.weekday).to_string()),
            available: Some(!day.unavailable),
            windows: day
                .active_windows()
                .iter()
                .map(|w| WindowForm {
                    start_local_time: Some(format_local_time(w.start)),
                    duration_minutes: Some(i64::from(w.duration_minutes)),
                })
                .collect(),
        })
        .collect();
    ScheduleForm(entries)
}

/// Applies schedule edits to a provider, persisting before replacing.
pub struct ScheduleEditor {
    store: Arc<dyn ProviderStore>,
    limits: ScheduleLimits,
}

impl ScheduleEditor {
    pub fn new(store: Arc<dyn ProviderStore>, limits: ScheduleLimits) -> Self {
        Self { store, limits }
    }

    /// Validate `form` in the provider's zone, persist it, then replace the
    /// provider's schedule. On any error the provider is left untouched.
    ///
    /// # Errors
    /// Validation errors as in [`parse_and_validate_with`], or
    /// `EngineError::Store` if persisting fails.
    pub async fn update_schedule(
        &self,
        provider: &mut Provider,
        form: &ScheduleForm,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let schedule = parse_and_validate_with(form, now, provider.time_zone.name(), &self.limits)?;
        self.store.save_weekly_schedule(provider.id, &schedule).await?;
        provider.schedule = schedule;
        tracing::info!(provider = %provider.id, "weekly schedule updated");
        Ok(())
    }

    /// Move the provider to `time_zone`, re-expressing every window so it keeps
    /// denoting the same instants as of `now`.
    ///
    /// # Errors
    /// `EngineError::InvalidTimezone`, `EngineError::InvalidDays` (Monday-first
    /// weekday indices) if the shifted schedule is inconsistent, or
    /// `EngineError::Store`.
    pub async fn change_time_zone(
        &self,
        provider: &mut Provider,
        time_zone: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let to = dst::parse_timezone(time_zone)?;
        let schedule = provider
            .schedule
            .adjust_with(now, provider.time_zone, to, &self.limits)?;
        self.store.save_weekly_schedule(provider.id, &schedule).await?;
        tracing::info!(
            provider = %provider.id,
            from = provider.time_zone.name(),
            to = to.name(),
            "weekly schedule moved to new time zone"
        );
        provider.schedule = schedule;
        provider.time_zone = to;
        Ok(())
    }
}
