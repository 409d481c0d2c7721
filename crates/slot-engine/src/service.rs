//! Bookable services and their cadence / lead-time rules.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::provider::Provider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Booked for a fixed duration at a specific start time.
    Appointment,
    /// Requested for a start time only; slots have no length.
    OnDemand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadTimeUnit {
    Hours,
    Days,
}

/// Minimum notice a client must give before a booking starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadTime {
    pub amount: u32,
    pub unit: LeadTimeUnit,
}

impl LeadTime {
    pub fn duration(&self) -> Duration {
        let amount = i64::from(self.amount);
        match self.unit {
            LeadTimeUnit::Hours => Duration::hours(amount),
            LeadTimeUnit::Days => Duration::days(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: Ulid,
    pub kind: ServiceKind,
    pub duration_minutes: u32,
    /// Minutes between consecutive slot starts; `None` uses the engine default.
    pub interval_minutes: Option<u32>,
    pub lead_time: Option<LeadTime>,
}

impl Service {
    pub fn appointment(duration_minutes: u32, interval_minutes: u32) -> Self {
        Self {
            id: Ulid::new(),
            kind: ServiceKind::Appointment,
            duration_minutes,
            interval_minutes: Some(interval_minutes),
            lead_time: None,
        }
    }

    pub fn on_demand(interval_minutes: u32) -> Self {
        Self {
            id: Ulid::new(),
            kind: ServiceKind::OnDemand,
            duration_minutes: 0,
            interval_minutes: Some(interval_minutes),
            lead_time: None,
        }
    }

    pub fn with_lead_time(mut self, lead_time: LeadTime) -> Self {
        self.lead_time = Some(lead_time);
        self
    }

    pub fn is_appointment(&self) -> bool {
        self.kind == ServiceKind::Appointment
    }

    /// Slot cadence in minutes, never zero.
    pub fn interval_minutes_or(&self, default_minutes: u32) -> u32 {
        self.interval_minutes
            .filter(|m| *m > 0)
            .unwrap_or(default_minutes)
            .max(1)
    }

    /// Length of each generated slot; zero for on-demand services.
    pub fn slot_length(&self) -> Duration {
        if self.is_appointment() {
            Duration::minutes(i64::from(self.duration_minutes))
        } else {
            Duration::zero()
        }
    }

    /// Earliest instant a client may book: `now` plus the lead time, rounded up
    /// to the next interval boundary within the hour, then advanced one interval
    /// at a time until it lies in the provider's working hours. Gives up after a
    /// week of probing and returns the last probe.
    pub fn min_start(
        &self,
        now: DateTime<Utc>,
        provider: &Provider,
        default_interval_minutes: u32,
    ) -> DateTime<Utc> {
        let interval_minutes = self.interval_minutes_or(default_interval_minutes);
        let interval = Duration::minutes(i64::from(interval_minutes));
        let earliest = now + self.lead_time.map_or(Duration::zero(), |l| l.duration());

        let local = earliest.with_timezone(&provider.time_zone);
        let mut minute = local.minute();
        if local.second() > 0 || local.nanosecond() > 0 {
            minute += 1;
        }
        let rounded = minute.div_ceil(interval_minutes) * interval_minutes;
        let hour_start = earliest
            - Duration::minutes(i64::from(local.minute()))
            - Duration::seconds(i64::from(local.second()))
            - Duration::nanoseconds(i64::from(local.nanosecond()));
        let mut candidate = hour_start + Duration::minutes(i64::from(rounded));

        let probes = (7 * 24 * 60u32).div_ceil(interval_minutes);
        for _ in 0..probes {
            if provider.is_valid_work_period(candidate, candidate) {
                break;
            }
            candidate += interval;
        }
        candidate
    }
}
