//! Collect busy time for a provider from its two independent sources.
//!
//! Internal bookings and external-calendar busy blocks are fetched
//! concurrently. The booking store is authoritative: its failure aborts the
//! load. The external calendar is best-effort: a failed fetch or credential
//! refresh degrades to "no external busy data" and the error is handed back to
//! the caller for logging.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::error::{CalendarError, Result, StoreError};
use crate::provider::{CalendarCredential, Provider, ProviderId, StaffId};
use crate::schedule::WeeklySchedule;
use crate::service::{Service, ServiceKind};
use crate::slot::{Booking, BusyBlock};

// ── Ports ───────────────────────────────────────────────────────────────────

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Bookings of `provider` intersecting `[from, to)`, optionally limited to
    /// one staff member. Bounds are returned padded.
    async fn list_bookings_in_range(
        &self,
        provider: ProviderId,
        staff: Option<StaffId>,
        kind: ServiceKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> std::result::Result<Vec<Booking>, StoreError>;
}

/// Outcome of one external busy query. A refreshed credential may accompany
/// either a success or a failure.
#[derive(Debug, Clone)]
pub struct BusyFetch {
    pub refreshed: Option<CalendarCredential>,
    pub busy: std::result::Result<Vec<BusyBlock>, CalendarError>,
}

#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    async fn list_busy_blocks(
        &self,
        credential: &CalendarCredential,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BusyFetch;
}

#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn save_weekly_schedule(
        &self,
        provider: ProviderId,
        schedule: &WeeklySchedule,
    ) -> std::result::Result<(), StoreError>;

    async fn save_refreshed_credential(
        &self,
        provider: ProviderId,
        credential: &CalendarCredential,
    ) -> std::result::Result<(), StoreError>;
}

// ── Aggregation ─────────────────────────────────────────────────────────────

/// Busy time for one date range.
#[derive(Debug, Clone, Default)]
pub struct Conflicts {
    pub bookings: Vec<Booking>,
    pub busy_blocks: Vec<BusyBlock>,
    /// Credential refreshed (and already persisted) during this load; the
    /// caller should swap it into its copy of the provider.
    pub refreshed_credential: Option<CalendarCredential>,
    /// Set when external busy data was unavailable.
    pub calendar_error: Option<CalendarError>,
}

#[derive(Debug, Default)]
struct ExternalBusy {
    busy_blocks: Vec<BusyBlock>,
    refreshed: Option<CalendarCredential>,
    error: Option<CalendarError>,
}

/// The last refresh performed for a provider: the credential that was
/// refreshed and what it was replaced with.
#[derive(Debug, Default)]
struct RefreshState {
    replaced: Option<(CalendarCredential, CalendarCredential)>,
}

pub struct ConflictAggregator {
    bookings: Arc<dyn BookingStore>,
    providers: Arc<dyn ProviderStore>,
    calendar: Option<Arc<dyn CalendarAdapter>>,
    /// One lock per provider so only one request refreshes a credential at a
    /// time. Idle entries without a remembered refresh are removed.
    refresh: DashMap<ProviderId, Arc<Mutex<RefreshState>>>,
}

impl ConflictAggregator {
    pub fn new(bookings: Arc<dyn BookingStore>, providers: Arc<dyn ProviderStore>) -> Self {
        Self {
            bookings,
            providers,
            calendar: None,
            refresh: DashMap::new(),
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarAdapter>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Load bookings and external busy blocks for `[from, to)`.
    ///
    /// Only appointment services have conflicts; other services get an empty
    /// result without touching either source.
    ///
    /// # Errors
    /// Returns `EngineError::Store` if the booking store fails or a refreshed
    /// credential cannot be persisted.
    pub async fn load_conflicts(
        &self,
        provider: &Provider,
        service: &Service,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        client_view: bool,
    ) -> Result<Conflicts> {
        if !service.is_appointment() {
            return Ok(Conflicts::default());
        }

        let staff = provider.staff_filter(client_view);
        let (bookings, external) = tokio::join!(
            self.bookings
                .list_bookings_in_range(provider.id, staff, service.kind, from, to),
            self.load_external(provider, from, to),
        );
        let bookings = bookings?;
        let external = external?;

        Ok(Conflicts {
            bookings,
            busy_blocks: external.busy_blocks,
            refreshed_credential: external.refreshed,
            calendar_error: external.error,
        })
    }

    async fn load_external(
        &self,
        provider: &Provider,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ExternalBusy> {
        let (Some(calendar), Some(stored)) = (self.calendar.as_ref(), provider.calendar.as_ref())
        else {
            return Ok(ExternalBusy::default());
        };

        let lock = self.refresh.entry(provider.id).or_default().clone();
        let mut state = lock.lock().await;

        // A concurrent request may already have refreshed the credential this
        // provider snapshot still carries; use the replacement instead.
        let credential = match &state.replaced {
            Some((old, new)) if old == stored => new.clone(),
            _ => stored.clone(),
        };

        let fetch = calendar.list_busy_blocks(&credential, from, to).await;

        let saved = match &fetch.refreshed {
            Some(refreshed) => {
                let saved = self
                    .providers
                    .save_refreshed_credential(provider.id, refreshed)
                    .await;
                if saved.is_ok() {
                    tracing::info!(provider = %provider.id, "persisted refreshed calendar credential");
                    state.replaced = Some((stored.clone(), refreshed.clone()));
                }
                saved
            }
            None => Ok(()),
        };
        drop(state);
        drop(lock);
        self.release(provider.id);
        saved?;

        let mut external = ExternalBusy {
            refreshed: fetch.refreshed,
            ..ExternalBusy::default()
        };
        match fetch.busy {
            Ok(blocks) => external.busy_blocks = blocks,
            Err(e) => {
                tracing::warn!(
                    provider = %provider.id,
                    error = %e,
                    "external calendar unavailable, continuing without busy blocks"
                );
                external.error = Some(e);
            }
        }
        Ok(external)
    }

    /// Drop a provider's lock once no request holds it and it remembers no
    /// refresh. Entries that do remember one stay, one per provider whose
    /// credential was refreshed.
    fn release(&self, provider: ProviderId) {
        self.refresh.remove_if(&provider, |_, lock| {
            Arc::strong_count(lock) == 1
                && lock
                    .try_lock()
                    .is_ok_and(|state| state.replaced.is_none())
        });
    }

    /// Providers currently holding a refresh lock or a remembered refresh.
    pub fn tracked_providers(&self) -> usize {
        self.refresh.len()
    }
}
