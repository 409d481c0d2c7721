//! Candidate slots, busy intervals, and the half-open overlap predicate.
//!
//! Adjacent intervals (where one ends exactly when another starts) do NOT
//! overlap. A zero-length slot is a single instant and only conflicts with an
//! interval that strictly contains it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Two intervals `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && s2 < e1
}

/// Anything that occupies a span of time a slot must not intersect.
pub trait BusyInterval {
    fn busy_start(&self) -> DateTime<Utc>;
    fn busy_end(&self) -> DateTime<Utc>;
}

/// An existing booking. The padded bounds already include the service's
/// buffer time and are never recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub from_padded: DateTime<Utc>,
    pub to_padded: DateTime<Utc>,
}

impl BusyInterval for Booking {
    fn busy_start(&self) -> DateTime<Utc> {
        self.from_padded
    }
    fn busy_end(&self) -> DateTime<Utc> {
        self.to_padded
    }
}

/// A busy period imported from an external calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusyBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval for BusyBlock {
    fn busy_start(&self) -> DateTime<Utc> {
        self.start
    }
    fn busy_end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Why a slot inside working hours cannot be booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Starts before the service's minimum lead time (client view only).
    BeforeMinimumStart,
    Booking,
    BusyBlock,
    Past,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    /// Outside every working period of the day.
    Hidden,
    Unavailable(UnavailableReason),
}

/// A candidate interval generated at a fixed cadence.
///
/// Serializes as `{start, end, hidden, unavailable}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "SlotRecord")]
pub struct Slot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: SlotStatus,
}

impl Slot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            status: SlotStatus::Available,
        }
    }

    pub fn overlaps<B: BusyInterval + ?Sized>(&self, busy: &B) -> bool {
        overlaps(self.start, self.end, busy.busy_start(), busy.busy_end())
    }

    /// True if any of `intervals` overlaps this slot.
    pub fn conflicts_with<B: BusyInterval>(&self, intervals: &[B]) -> bool {
        intervals.iter().any(|b| self.overlaps(b))
    }

    pub fn is_hidden(&self) -> bool {
        self.status == SlotStatus::Hidden
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, SlotStatus::Unavailable(_))
    }

    pub fn is_bookable(&self) -> bool {
        self.status == SlotStatus::Available
    }
}

#[derive(Serialize)]
struct SlotRecord {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    hidden: bool,
    unavailable: bool,
}

impl From<Slot> for SlotRecord {
    fn from(slot: Slot) -> Self {
        Self {
            hidden: slot.is_hidden(),
            unavailable: slot.is_unavailable(),
            start: slot.start,
            end: slot.end,
        }
    }
}
