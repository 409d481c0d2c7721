//! # slot-engine
//!
//! Availability and scheduling engine for appointment booking.
//!
//! A provider keeps a recurring weekly schedule of working windows in its own
//! time zone. Given a date, the engine turns that schedule into fixed-cadence
//! candidate slots and classifies each one against existing bookings, external
//! calendar busy time, the service's lead time and the current time. A bounded
//! multi-day search finds the first date with a bookable slot, and the schedule
//! editor validates operator edits and time-zone changes.
//!
//! ## Modules
//!
//! - [`schedule`]: weekly schedule model, validation, time-zone adjustment
//! - [`slot`]: slots, busy intervals and the half-open overlap predicate
//! - [`generator`]: slot enumeration and classification for one date
//! - [`conflict`]: booking / external-calendar ports and conflict loading
//! - [`search`]: multi-day search over a fixed horizon
//! - [`editor`]: schedule form parsing, rendering and persistence
//! - [`service`], [`provider`]: the service and provider aggregates
//! - [`dst`]: wall-clock to instant conversion with DST policies
//! - [`config`], [`error`]: engine configuration and error types

pub mod config;
pub mod conflict;
pub mod dst;
pub mod editor;
pub mod error;
pub mod generator;
pub mod provider;
pub mod schedule;
pub mod search;
pub mod service;
pub mod slot;

pub use config::{EngineConfig, ScheduleLimits, SEARCH_HORIZON_DAYS};
pub use conflict::{BookingStore, CalendarAdapter, ConflictAggregator, Conflicts, ProviderStore};
pub use editor::{parse_and_validate, render, ScheduleEditor, ScheduleForm};
pub use error::{CalendarError, EngineError, StoreError};
pub use generator::{generate_slots, DaySlots, SlotRequest};
pub use provider::{CalendarCredential, Provider};
pub use schedule::{DaySchedule, TimeWindow, WeeklySchedule};
pub use search::{Availability, SlotEngine};
pub use service::{LeadTime, LeadTimeUnit, Service, ServiceKind};
pub use slot::{overlaps, Booking, BusyBlock, Slot, SlotStatus, UnavailableReason};
