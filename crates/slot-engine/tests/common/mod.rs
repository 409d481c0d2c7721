//! In-memory stand-ins for the booking store, provider store and external
//! calendar, shared by the async integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use slot_engine::provider::{ProviderId, StaffId};
use slot_engine::service::ServiceKind;
use slot_engine::conflict::BusyFetch;
use slot_engine::{
    overlaps, Booking, BookingStore, BusyBlock, CalendarAdapter, CalendarCredential,
    CalendarError, Provider, ProviderStore, ScheduleLimits, StoreError, WeeklySchedule,
};
use ulid::Ulid;

/// Route engine logs to the test harness; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn credential(token: &str) -> CalendarCredential {
    CalendarCredential {
        access_token: token.to_string(),
        refresh_token: Some("refresh".to_string()),
        expires_at: None,
    }
}

/// Monday to Friday, 09:00 to 17:00 UTC.
pub fn nine_to_five() -> Provider {
    let schedule = WeeklySchedule::onboarding(
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        480,
        &[Weekday::Sat, Weekday::Sun],
        &ScheduleLimits::default(),
    )
    .unwrap();
    Provider::new(Ulid::new(), Tz::UTC, schedule)
}

pub fn booking(from: DateTime<Utc>, to: DateTime<Utc>) -> Booking {
    Booking {
        id: Ulid::new(),
        from_padded: from,
        to_padded: to,
    }
}

// ── Booking store ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryBookings {
    bookings: Vec<(Option<StaffId>, Booking)>,
    fail: bool,
    /// Staff filter of every query, in order.
    pub queries: Mutex<Vec<Option<StaffId>>>,
}

impl MemoryBookings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, staff: Option<StaffId>, booking: Booking) -> Self {
        self.bookings.push((staff, booking));
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingStore for MemoryBookings {
    async fn list_bookings_in_range(
        &self,
        _provider: ProviderId,
        staff: Option<StaffId>,
        _kind: ServiceKind,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        self.queries.lock().unwrap().push(staff);
        if self.fail {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        Ok(self
            .bookings
            .iter()
            .filter(|(owner, _)| staff.is_none() || *owner == staff)
            .filter(|(_, b)| overlaps(b.from_padded, b.to_padded, from, to))
            .map(|(_, b)| b.clone())
            .collect())
    }
}

// ── Provider store ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryProviders {
    fail: bool,
    pub schedules: Mutex<Vec<WeeklySchedule>>,
    pub credentials: Mutex<Vec<CalendarCredential>>,
}

impl MemoryProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved_schedules(&self) -> usize {
        self.schedules.lock().unwrap().len()
    }

    pub fn saved_credentials(&self) -> Vec<CalendarCredential> {
        self.credentials.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderStore for MemoryProviders {
    async fn save_weekly_schedule(
        &self,
        _provider: ProviderId,
        schedule: &WeeklySchedule,
    ) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Backend("read-only replica".to_string()));
        }
        self.schedules.lock().unwrap().push(schedule.clone());
        Ok(())
    }

    async fn save_refreshed_credential(
        &self,
        _provider: ProviderId,
        credential: &CalendarCredential,
    ) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Backend("read-only replica".to_string()));
        }
        self.credentials.lock().unwrap().push(credential.clone());
        Ok(())
    }
}

// ── External calendar ───────────────────────────────────────────────────────

/// A calendar that treats the access token "old" as expired and refreshes it
/// to "new" before answering.
#[derive(Default)]
pub struct MemoryCalendar {
    busy: Vec<BusyBlock>,
    busy_whole_range: bool,
    error: Option<CalendarError>,
    /// Access token used for every query, in order.
    pub tokens: Mutex<Vec<String>>,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_busy(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.busy.push(BusyBlock { start, end });
        self
    }

    /// Report the whole queried range as busy.
    pub fn always_busy() -> Self {
        Self {
            busy_whole_range: true,
            ..Self::default()
        }
    }

    pub fn failing(error: CalendarError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarAdapter for MemoryCalendar {
    async fn list_busy_blocks(
        &self,
        current: &CalendarCredential,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BusyFetch {
        self.tokens
            .lock()
            .unwrap()
            .push(current.access_token.clone());
        tokio::task::yield_now().await;

        let refreshed = (current.access_token == "old").then(|| credential("new"));
        let busy = match &self.error {
            Some(e) => Err(e.clone()),
            None if self.busy_whole_range => Ok(vec![BusyBlock { start: from, end: to }]),
            None => Ok(self
                .busy
                .iter()
                .filter(|b| overlaps(b.start, b.end, from, to))
                .cloned()
                .collect()),
        };
        BusyFetch { refreshed, busy }
    }
}
