//! Multi-day availability search.
//!
//! Walks forward one calendar date at a time from an anchor date, loading
//! conflicts and generating slots for each, until a bookable slot turns up or
//! [`SEARCH_HORIZON_DAYS`] dates have been examined.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::{EngineConfig, SEARCH_HORIZON_DAYS};
use crate::conflict::{ConflictAggregator, Conflicts};
use crate::dst;
use crate::error::{CalendarError, EngineError, Result};
use crate::generator::{generate_slots, DaySlots, SlotRequest};
use crate::provider::{CalendarCredential, Provider};
use crate::schedule::envelope;
use crate::service::Service;
use crate::slot::Slot;

/// Result of a multi-day search.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    /// The date whose slots are returned: the first date with a bookable slot,
    /// or the last date examined.
    pub date: NaiveDate,
    /// Earliest instant a client may book this service.
    pub min_start: DateTime<Utc>,
    #[serde(rename = "first_available_slot_start")]
    pub first_available: Option<DateTime<Utc>>,
    pub slots: Vec<Slot>,
    pub dates_examined: usize,
    #[serde(skip)]
    pub refreshed_credential: Option<CalendarCredential>,
    #[serde(skip)]
    pub calendar_error: Option<CalendarError>,
}

/// Entry point tying conflict loading to slot generation.
pub struct SlotEngine {
    aggregator: ConflictAggregator,
    config: EngineConfig,
}

impl SlotEngine {
    pub fn new(aggregator: ConflictAggregator, config: EngineConfig) -> Self {
        Self { aggregator, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Earliest instant a client may book `service` with `provider`.
    pub fn min_start(&self, provider: &Provider, service: &Service, now: DateTime<Utc>) -> DateTime<Utc> {
        service.min_start(now, provider, self.config.default_interval_minutes)
    }

    /// Load conflicts for `date`'s working windows and generate its slots.
    ///
    /// Windows are taken whole, so bookings after midnight that a late slot
    /// runs into are loaded too.
    ///
    /// # Errors
    /// Propagates booking store and credential persistence failures.
    pub async fn day_slots(
        &self,
        provider: &Provider,
        service: &Service,
        date: NaiveDate,
        now: DateTime<Utc>,
        min_start: DateTime<Utc>,
        client_view: bool,
    ) -> Result<(DaySlots, Conflicts)> {
        let conflicts = match envelope(&provider.spans_on(date)) {
            Some((from, to)) => {
                self.aggregator
                    .load_conflicts(provider, service, from, to, client_view)
                    .await?
            }
            None => Conflicts::default(),
        };

        let mut request = SlotRequest::new(date, provider, service, now)
            .bookings(&conflicts.bookings)
            .busy_blocks(&conflicts.busy_blocks)
            .default_interval(self.config.default_interval_minutes);
        if client_view {
            request = request.client_view(min_start);
        }
        let day = generate_slots(&request);
        Ok((day, conflicts))
    }

    /// Find the first date, starting at `anchor`, with a bookable slot.
    ///
    /// `anchor` defaults to the local date of the service's minimum start. At
    /// most [`SEARCH_HORIZON_DAYS`] dates are examined; if none has a bookable
    /// slot the last date's slots are returned with no first available start.
    ///
    /// # Errors
    /// Returns `EngineError::DateBeforeMinimum` when a client asks for a date
    /// before the minimum start's date, and propagates store failures.
    pub async fn find_availability(
        &self,
        provider: &Provider,
        service: &Service,
        anchor: Option<NaiveDate>,
        now: DateTime<Utc>,
        client_view: bool,
    ) -> Result<Availability> {
        let tz = provider.time_zone;
        let min_start = self.min_start(provider, service, now);
        let earliest = dst::local_date(tz, min_start);

        let mut date = anchor.unwrap_or(earliest);
        if client_view && date < earliest {
            return Err(EngineError::DateBeforeMinimum { date, earliest });
        }

        let mut result = Availability {
            date,
            min_start,
            first_available: None,
            slots: Vec::new(),
            dates_examined: 0,
            refreshed_credential: None,
            calendar_error: None,
        };

        // Later dates must use a credential refreshed on an earlier one.
        let mut current = std::borrow::Cow::Borrowed(provider);

        for _ in 0..SEARCH_HORIZON_DAYS {
            let (day, conflicts) = self
                .day_slots(&current, service, date, now, min_start, client_view)
                .await?;

            result.date = date;
            result.dates_examined += 1;
            result.first_available = day.first_available;
            result.slots = day.slots;
            if let Some(error) = conflicts.calendar_error {
                result.calendar_error = Some(error);
            }
            if let Some(credential) = conflicts.refreshed_credential {
                current.to_mut().calendar = Some(credential.clone());
                result.refreshed_credential = Some(credential);
            }

            if result.first_available.is_some() {
                break;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        tracing::debug!(
            provider = %provider.id,
            date = %result.date,
            dates_examined = result.dates_examined,
            first_available = ?result.first_available,
            "availability search finished"
        );
        Ok(result)
    }
}
