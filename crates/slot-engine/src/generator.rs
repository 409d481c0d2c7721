//! Enumerate and classify the fixed-cadence slots of one calendar date.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::config::DEFAULT_INTERVAL_MINUTES;
use crate::provider::Provider;
use crate::schedule::{envelope, WorkPeriod};
use crate::service::Service;
use crate::slot::{Booking, BusyBlock, Slot, SlotStatus, UnavailableReason};

/// Everything needed to generate one date's slots.
///
/// Built with [`SlotRequest::new`]; bookings, busy blocks, the client view and
/// the default interval are optional.
#[derive(Debug, Clone)]
pub struct SlotRequest<'a> {
    /// Calendar date in the provider's time zone.
    pub date: NaiveDate,
    pub provider: &'a Provider,
    pub service: &'a Service,
    pub bookings: &'a [Booking],
    pub busy_blocks: &'a [BusyBlock],
    pub now: DateTime<Utc>,
    /// Earliest start a client may book; only enforced in the client view.
    pub min_start: DateTime<Utc>,
    pub client_view: bool,
    pub default_interval_minutes: u32,
}

impl<'a> SlotRequest<'a> {
    pub fn new(date: NaiveDate, provider: &'a Provider, service: &'a Service, now: DateTime<Utc>) -> Self {
        Self {
            date,
            provider,
            service,
            bookings: &[],
            busy_blocks: &[],
            now,
            min_start: now,
            client_view: false,
            default_interval_minutes: DEFAULT_INTERVAL_MINUTES,
        }
    }

    pub fn bookings(mut self, bookings: &'a [Booking]) -> Self {
        self.bookings = bookings;
        self
    }

    pub fn busy_blocks(mut self, busy_blocks: &'a [BusyBlock]) -> Self {
        self.busy_blocks = busy_blocks;
        self
    }

    /// Generate for a client: slots starting before `min_start` are unavailable.
    pub fn client_view(mut self, min_start: DateTime<Utc>) -> Self {
        self.client_view = true;
        self.min_start = min_start;
        self
    }

    pub fn default_interval(mut self, minutes: u32) -> Self {
        self.default_interval_minutes = minutes;
        self
    }
}

/// The classified slots of one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DaySlots {
    /// Start of the first bookable slot, if any.
    #[serde(rename = "first_available_slot_start")]
    pub first_available: Option<DateTime<Utc>>,
    pub slots: Vec<Slot>,
}

impl DaySlots {
    pub fn has_available(&self) -> bool {
        self.first_available.is_some()
    }
}

/// Generate and classify every slot on `request.date`.
///
/// The day's boundary is the envelope of its working periods, which end at the
/// next local midnight, so no slot in the list starts on a later date. Slots
/// start at `boundary.start + i * interval` for `i` in
/// `0..ceil(boundary / interval)`.
/// Each slot is classified in strict precedence:
///
/// 1. client view and starting before the minimum start: unavailable
/// 2. not fully inside a working window: hidden (a window is taken whole, so
///    a slot near the end of the day may run past midnight)
/// 3. overlapping a padded booking: unavailable
/// 4. overlapping an external busy block: unavailable
/// 5. starting before `now`: unavailable
/// 6. otherwise bookable
///
/// A date without working periods yields no slots.
pub fn generate_slots(request: &SlotRequest<'_>) -> DaySlots {
    let Some((from, to)) = envelope(&request.provider.periods_on(request.date)) else {
        return DaySlots::default();
    };

    let interval_minutes = i64::from(
        request
            .service
            .interval_minutes_or(request.default_interval_minutes),
    );
    let interval = Duration::minutes(interval_minutes);
    let spans = request.provider.spans_on(request.date);
    let slot_length = request.service.slot_length();

    let total_minutes = (to - from).num_minutes().max(0);
    let count = (total_minutes + interval_minutes - 1) / interval_minutes;

    let mut first_available = None;
    let mut slots = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = from + interval * (i as i32);
        let mut slot = Slot::new(start, start + slot_length);
        slot.status = classify(request, &spans, &slot);

        if first_available.is_none() && slot.is_bookable() {
            first_available = Some(slot.start);
        }
        slots.push(slot);
    }

    tracing::debug!(
        date = %request.date,
        slots = slots.len(),
        first_available = ?first_available,
        "generated slots"
    );

    DaySlots {
        first_available,
        slots,
    }
}

fn classify(request: &SlotRequest<'_>, spans: &[WorkPeriod], slot: &Slot) -> SlotStatus {
    if request.client_view && slot.start < request.min_start {
        return SlotStatus::Unavailable(UnavailableReason::BeforeMinimumStart);
    }
    if !spans.iter().any(|p| p.contains(slot.start, slot.end)) {
        return SlotStatus::Hidden;
    }
    if slot.conflicts_with(request.bookings) {
        return SlotStatus::Unavailable(UnavailableReason::Booking);
    }
    if slot.conflicts_with(request.busy_blocks) {
        return SlotStatus::Unavailable(UnavailableReason::BusyBlock);
    }
    if slot.start < request.now {
        return SlotStatus::Unavailable(UnavailableReason::Past);
    }
    SlotStatus::Available
}
