//! The provider aggregate that owns a weekly schedule.

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::dst;
use crate::schedule::{WeeklySchedule, WorkPeriod};

pub type ProviderId = Ulid;
pub type StaffId = Ulid;

/// Stored credential for a linked external calendar.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for CalendarCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarCredential")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    /// The account that owns the provider.
    pub owner: StaffId,
    /// Staff member this view is scoped to, if any.
    pub staff: Option<StaffId>,
    pub time_zone: Tz,
    pub schedule: WeeklySchedule,
    pub calendar: Option<CalendarCredential>,
}

impl Provider {
    pub fn new(owner: StaffId, time_zone: Tz, schedule: WeeklySchedule) -> Self {
        Self {
            id: Ulid::new(),
            owner,
            staff: None,
            time_zone,
            schedule,
            calendar: None,
        }
    }

    /// Staff member whose bookings count as conflicts. The client view always
    /// filters, falling back to the owner when no staff member is assigned.
    pub fn staff_filter(&self, client_view: bool) -> Option<StaffId> {
        match self.staff {
            Some(staff) => Some(staff),
            None if client_view => Some(self.owner),
            None => None,
        }
    }

    pub fn is_unavailable(&self, weekday: Weekday) -> bool {
        self.schedule.is_unavailable(weekday)
    }

    /// Unavailable weekdays numbered 0 = Sunday through 6 = Saturday, as date
    /// pickers expect.
    pub fn unavailable_weekdays(&self) -> Vec<u32> {
        [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ]
        .into_iter()
        .filter(|wd| self.is_unavailable(*wd))
        .map(|wd| wd.num_days_from_sunday())
        .collect()
    }

    pub fn periods_on(&self, date: NaiveDate) -> Vec<WorkPeriod> {
        self.schedule.periods_on(self.time_zone, date)
    }

    pub fn spans_on(&self, date: NaiveDate) -> Vec<WorkPeriod> {
        self.schedule.spans_on(self.time_zone, date)
    }

    pub fn working_minutes(&self, date: NaiveDate) -> i64 {
        self.schedule.working_minutes_on(self.time_zone, date)
    }

    /// True if `[start, end]` lies inside one working window of the local day
    /// `start` falls on. The window is taken whole, so `end` may pass midnight.
    pub fn is_valid_work_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        let date = dst::local_date(self.time_zone, start);
        self.spans_on(date).iter().any(|p| p.contains(start, end))
    }

    /// True if `[start, end]` is in the future and inside working hours.
    pub fn check_valid_time(&self, now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start >= now && self.is_valid_work_period(start, end)
    }
}
