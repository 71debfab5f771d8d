//! Picture-of-the-day store: the single owner of selection state.
//!
//! # Design
//! State lives behind one mutex and is only changed by the named operations
//! below. Each mutation builds a complete `Snapshot`, releases the lock, then
//! hands that snapshot to every observer, so observers never see a
//! half-applied change and may call back into the store.
//!
//! Loads are split in two. `begin_*` records the intent (loading flag,
//! cleared error, new selected date) and returns a `LoadTicket` carrying the
//! request to execute; `complete_load` applies the outcome. Whoever executes
//! the request is free to do it on another thread or another language
//! entirely. `StoreDriver` is the in-process executor.
//!
//! Every ticket carries a sequence number. A completion older than the most
//! recently issued ticket is stale and is dropped without touching state, so
//! a slow earlier request can never overwrite a newer selection. Tickets
//! also carry the id of the store that issued them and are refused by any
//! other store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::client::ApodClient;
use crate::date::{CalendarDate, Clock, DateBounds};
use crate::error::{FailureKind, FetchError, SelectError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::types::PictureRecord;

/// Where the store is in its load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No load has been started yet.
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Immutable copy of the store's state at one instant.
///
/// `record` is the last successfully loaded picture. It is kept while a new
/// load runs and after a failed one, so a presentation layer can show stale
/// content behind a spinner or an error banner. Use `content()` for the
/// strict view that only yields a record in the `Loaded` phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub selected_date: CalendarDate,
    pub phase: Phase,
    pub loading: bool,
    pub record: Option<Arc<PictureRecord>>,
    /// User-facing message for the most recent failed load.
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// Bumped on every publish; lets observers on other threads discard a
    /// snapshot older than one they already rendered.
    pub version: u64,
}

impl Snapshot {
    fn initial(selected_date: CalendarDate) -> Self {
        Self {
            selected_date,
            phase: Phase::Idle,
            loading: false,
            record: None,
            error: None,
            failure: None,
            version: 0,
        }
    }

    /// The record, only when the latest load for `selected_date` succeeded.
    pub fn content(&self) -> Option<&PictureRecord> {
        match self.phase {
            Phase::Loaded => self.record.as_deref(),
            _ => None,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn from_u64(raw: u64) -> Self {
        Self(raw)
    }
}

type Observer = Arc<dyn Fn(&Snapshot) + Send + Sync>;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// A started load awaiting its outcome.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    store_id: u64,
    sequence: u64,
    date: CalendarDate,
    request: HttpRequest,
}

impl LoadTicket {
    /// Id of the store that issued this ticket.
    pub fn store_id(&self) -> u64 {
        self.store_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn date(&self) -> CalendarDate {
        self.date
    }

    /// The request the executor must perform.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }
}

struct Inner {
    state: Snapshot,
    latest_sequence: u64,
    next_subscription: u64,
    observers: Vec<(SubscriptionId, Observer)>,
}

pub struct PictureStore {
    id: u64,
    client: ApodClient,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for PictureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PictureStore")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("state", &self.lock().state)
            .finish()
    }
}

impl PictureStore {
    /// A store in the `Idle` phase with today selected. No request is made;
    /// see `StoreDriver::start` for the variant that loads immediately.
    pub fn new(client: ApodClient, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            client,
            clock,
            inner: Mutex::new(Inner {
                state: Snapshot::initial(today),
                latest_sequence: 0,
                next_subscription: 1,
                observers: Vec::new(),
            }),
        }
    }

    /// Process-unique id, also carried by every ticket this store issues.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn client(&self) -> &ApodClient {
        &self.client
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().state.clone()
    }

    /// Selectable range, re-evaluated against the clock on every call.
    pub fn bounds(&self) -> DateBounds {
        DateBounds::current(self.clock.as_ref())
    }

    /// Register an observer. It is called synchronously after every state
    /// change, on whichever thread made the change.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.observers.push((id, Arc::new(observer)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.observers.len();
        inner.observers.retain(|(sid, _)| *sid != id);
        inner.observers.len() != before
    }

    /// Start a load. With `Some(date)` the selection moves to `date` first;
    /// with `None` the current selection is reloaded. The date is not
    /// range-checked here; `begin_select_date` is the validated entry point.
    pub fn begin_load(&self, date: Option<CalendarDate>) -> LoadTicket {
        let (ticket, snapshot, observers) = {
            let mut inner = self.lock();
            self.begin_load_locked(&mut inner, date)
        };
        announce(&ticket, &snapshot, &observers);
        ticket
    }

    /// Select `date` and load it. Same date as the current selection is a
    /// no-op: no request, no notification.
    pub fn begin_select_date(
        &self,
        date: CalendarDate,
    ) -> Result<Option<LoadTicket>, SelectError> {
        // The clock is read before locking; the check and the mutation
        // happen under one guard.
        let bounds = self.bounds();
        let (ticket, snapshot, observers) = {
            let mut inner = self.lock();
            if inner.state.selected_date == date {
                debug!(%date, "date already selected");
                return Ok(None);
            }
            if !bounds.contains(date) {
                return Err(SelectError::OutOfRange { date, bounds });
            }
            self.begin_load_locked(&mut inner, Some(date))
        };
        announce(&ticket, &snapshot, &observers);
        Ok(Some(ticket))
    }

    /// Reload the current selection.
    pub fn begin_retry(&self) -> LoadTicket {
        self.begin_load(None)
    }

    /// Select the clock's current day and load it.
    pub fn begin_load_today(&self) -> LoadTicket {
        self.begin_load(Some(self.clock.today()))
    }

    /// Apply the raw outcome of executing `ticket.request()`.
    ///
    /// Returns `false` when the completion was stale or foreign and ignored.
    pub fn complete_load(
        &self,
        ticket: LoadTicket,
        outcome: Result<HttpResponse, TransportError>,
    ) -> bool {
        let result = outcome
            .map_err(FetchError::from)
            .and_then(|response| self.client.parse_fetch(response));
        self.complete_with(ticket, result)
    }

    /// Apply an already parsed outcome.
    ///
    /// Returns `false` when the ticket is stale or was issued by another store.
    pub fn complete_with(
        &self,
        ticket: LoadTicket,
        result: Result<PictureRecord, FetchError>,
    ) -> bool {
        if ticket.store_id != self.id {
            warn!(
                store = self.id,
                ticket_store = ticket.store_id,
                sequence = ticket.sequence,
                "ignoring ticket issued by another store"
            );
            return false;
        }

        let bounds = self.bounds();
        let result = result.and_then(|record| {
            if bounds.contains(record.date) {
                Ok(record)
            } else {
                Err(FetchError::Decode(format!(
                    "record date {} is outside {} to {}",
                    record.date, bounds.min, bounds.max
                )))
            }
        });

        let (snapshot, observers) = {
            let mut inner = self.lock();
            if ticket.sequence < inner.latest_sequence {
                debug!(
                    sequence = ticket.sequence,
                    latest = inner.latest_sequence,
                    date = %ticket.date,
                    "discarding stale completion"
                );
                return false;
            }

            match result {
                Ok(record) => {
                    debug!(date = %record.date, title = %record.title, "picture loaded");
                    inner.state.record = Some(Arc::new(record));
                    inner.state.error = None;
                    inner.state.failure = None;
                    inner.state.phase = Phase::Loaded;
                }
                Err(err) => {
                    warn!(date = %ticket.date, error = %err, "picture load failed");
                    inner.state.error = Some(err.user_message());
                    inner.state.failure = Some(err.kind());
                    inner.state.phase = Phase::Failed;
                }
            }
            inner.state.loading = false;
            inner.state.version += 1;
            (inner.state.clone(), observers_of(&inner))
        };
        publish(&snapshot, &observers);
        true
    }

    fn begin_load_locked(
        &self,
        inner: &mut Inner,
        date: Option<CalendarDate>,
    ) -> (LoadTicket, Snapshot, Vec<Observer>) {
        if let Some(date) = date {
            inner.state.selected_date = date;
        }
        inner.latest_sequence += 1;
        inner.state.phase = Phase::Loading;
        inner.state.loading = true;
        inner.state.error = None;
        inner.state.failure = None;
        inner.state.version += 1;

        let date = inner.state.selected_date;
        let ticket = LoadTicket {
            store_id: self.id,
            sequence: inner.latest_sequence,
            date,
            request: self.client.build_fetch(Some(date)),
        };
        (ticket, inner.state.clone(), observers_of(inner))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Observers run outside the lock, so poisoning can only come from a
        // panic inside this module; the state is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn observers_of(inner: &Inner) -> Vec<Observer> {
    inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
}

fn announce(ticket: &LoadTicket, snapshot: &Snapshot, observers: &[Observer]) {
    info!(date = %ticket.date, sequence = ticket.sequence, "loading picture");
    publish(snapshot, observers);
}

fn publish(snapshot: &Snapshot, observers: &[Observer]) {
    for observer in observers {
        observer(snapshot);
    }
}
