//! C-ABI wrapper around `apod-core`'s picture store.
//!
//! # Overview
//! Lets a native presentation layer own the screen while Rust owns the
//! state. The host creates a store, subscribes a callback, and starts loads;
//! each load yields a ticket whose HTTP request the host executes with its
//! own networking stack before handing the response back.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Tickets are consumed by `apod_store_complete_load` /
//!   `apod_store_fail_load`; abandoned tickets must be released with
//!   `apod_ticket_free`.
//! - The C caller owns every returned pointer except the request borrowed
//!   through `apod_ticket_request`, and must release it with the matching
//!   `apod_free_*` function.

pub mod types;

use std::ffi::{c_void, CStr};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use apod_core::{
    ApodClient, ApodConfig, CalendarDate, Clock, FixedClock, HttpResponse, PictureStore,
    SelectError, SubscriptionId, SystemClock, TransportError,
};

use types::*;

/// `catch_unwind` for entry points that touch the store. The store's state
/// sits behind a mutex and stays consistent if a panic is caught mid-call.
fn guard<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    catch_unwind(AssertUnwindSafe(f))
}

/// Borrow a C string as `&str`. `None` for null or non-UTF-8 input.
///
/// # Safety
/// `s` must be null or point to a NUL-terminated string.
unsafe fn borrow_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

fn new_store(
    base_url: *const c_char,
    api_key: *const c_char,
    clock: Arc<dyn Clock>,
    out_ticket: *mut *mut FfiLoadTicket,
) -> *mut FfiApodStore {
    if out_ticket.is_null() {
        return std::ptr::null_mut();
    }
    unsafe { *out_ticket = std::ptr::null_mut() };
    let (Some(url), Some(key)) = (unsafe { borrow_str(base_url) }, unsafe { borrow_str(api_key) })
    else {
        return std::ptr::null_mut();
    };
    let Ok(config) = ApodConfig::with_base_url(key, url) else {
        return std::ptr::null_mut();
    };
    let store = PictureStore::new(ApodClient::from_config(&config), clock);
    let startup = store.begin_load_today();
    unsafe { *out_ticket = FfiLoadTicket::from_core(startup) };
    Box::into_raw(Box::new(FfiApodStore { inner: store }))
}

// ---------------------------------------------------------------------------
// Store lifecycle
// ---------------------------------------------------------------------------

/// Create a store on the system's local calendar and start loading today.
///
/// `*out_ticket` receives the startup load's ticket, to be executed and
/// completed like any other. Returns null (and leaves `*out_ticket` null) if
/// any pointer is null, the key is blank, or the URL is not http(s). Free
/// with `apod_store_free`.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_new(
    base_url: *const c_char,
    api_key: *const c_char,
    out_ticket: *mut *mut FfiLoadTicket,
) -> *mut FfiApodStore {
    guard(|| new_store(base_url, api_key, Arc::new(SystemClock), out_ticket))
        .unwrap_or(std::ptr::null_mut())
}

/// Create a store whose "today" is fixed at `today` (`YYYY-MM-DD`) and start
/// loading it. Same contract as `apod_store_new`.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_new_with_today(
    base_url: *const c_char,
    api_key: *const c_char,
    today: *const c_char,
    out_ticket: *mut *mut FfiLoadTicket,
) -> *mut FfiApodStore {
    guard(|| {
        let today = unsafe { borrow_str(today) }.and_then(|s| s.parse::<CalendarDate>().ok());
        let Some(today) = today else {
            if !out_ticket.is_null() {
                unsafe { *out_ticket = std::ptr::null_mut() };
            }
            return std::ptr::null_mut();
        };
        new_store(base_url, api_key, Arc::new(FixedClock::new(today)), out_ticket)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a store. Safe to call with null. Subscribed callbacks are dropped
/// with it.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_free(store: *mut FfiApodStore) {
    if !store.is_null() {
        let _ = guard(|| {
            drop(unsafe { Box::from_raw(store) });
        });
    }
}

// ---------------------------------------------------------------------------
// Reading and observing
// ---------------------------------------------------------------------------

/// Copy of the current state. Returns null if `store` is null.
/// Free with `apod_free_snapshot`.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_snapshot(store: *const FfiApodStore) -> *mut FfiSnapshot {
    guard(|| {
        if store.is_null() {
            return std::ptr::null_mut();
        }
        let store = unsafe { &*store };
        FfiSnapshot::from_core(&store.inner.snapshot())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Register `callback` to receive every new snapshot. Returns a nonzero
/// subscription id, or 0 if `store` is null.
///
/// The callback runs on the thread that changed the state, i.e. the thread
/// that called `begin_*` or `complete_*`.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_subscribe(
    store: *const FfiApodStore,
    callback: FfiSnapshotCallback,
    user_data: *mut c_void,
) -> u64 {
    let target = CallbackTarget::new(callback, user_data);
    guard(|| {
        if store.is_null() {
            return 0;
        }
        let store = unsafe { &*store };
        store
            .inner
            .subscribe(move |snap| target.invoke(snap))
            .as_u64()
    })
    .unwrap_or(0)
}

/// Returns `false` if `store` is null or `id` was not subscribed.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_unsubscribe(store: *const FfiApodStore, id: u64) -> bool {
    guard(|| {
        if store.is_null() {
            return false;
        }
        let store = unsafe { &*store };
        store.inner.unsubscribe(SubscriptionId::from_u64(id))
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Starting loads
// ---------------------------------------------------------------------------

/// Select today and start loading it. Returns null if `store` is null.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_begin_load_today(store: *const FfiApodStore) -> *mut FfiLoadTicket {
    guard(|| {
        if store.is_null() {
            return std::ptr::null_mut();
        }
        let store = unsafe { &*store };
        FfiLoadTicket::from_core(store.inner.begin_load_today())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Reload the current selection. Returns null if `store` is null.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_begin_retry(store: *const FfiApodStore) -> *mut FfiLoadTicket {
    guard(|| {
        if store.is_null() {
            return std::ptr::null_mut();
        }
        let store = unsafe { &*store };
        FfiLoadTicket::from_core(store.inner.begin_retry())
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Select `date` (`YYYY-MM-DD`) and start loading it.
///
/// On `Started`, `*out_ticket` receives the ticket; on every other status it
/// is set to null (when `out_ticket` itself is non-null).
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_begin_select_date(
    store: *const FfiApodStore,
    date: *const c_char,
    out_ticket: *mut *mut FfiLoadTicket,
) -> FfiSelectStatus {
    guard(|| {
        if store.is_null() || out_ticket.is_null() {
            return FfiSelectStatus::NullArg;
        }
        unsafe { *out_ticket = std::ptr::null_mut() };
        let store = unsafe { &*store };
        let Some(raw) = (unsafe { borrow_str(date) }) else {
            return FfiSelectStatus::NullArg;
        };
        let Ok(date) = raw.parse::<CalendarDate>() else {
            return FfiSelectStatus::InvalidDate;
        };
        match store.inner.begin_select_date(date) {
            Ok(Some(ticket)) => {
                unsafe { *out_ticket = FfiLoadTicket::from_core(ticket) };
                FfiSelectStatus::Started
            }
            Ok(None) => FfiSelectStatus::Unchanged,
            Err(SelectError::OutOfRange { .. }) => FfiSelectStatus::OutOfRange,
        }
    })
    .unwrap_or(FfiSelectStatus::Panic)
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// The request to execute for `ticket`. Borrowed: valid until the ticket is
/// consumed or freed. Returns null if `ticket` is null.
#[unsafe(no_mangle)]
pub extern "C" fn apod_ticket_request(ticket: *const FfiLoadTicket) -> *const FfiHttpRequest {
    if ticket.is_null() {
        return std::ptr::null();
    }
    unsafe { (*ticket).request }
}

/// Sequence number of `ticket`; 0 if null.
#[unsafe(no_mangle)]
pub extern "C" fn apod_ticket_sequence(ticket: *const FfiLoadTicket) -> u64 {
    if ticket.is_null() {
        return 0;
    }
    unsafe { (*ticket).inner.sequence() }
}

/// Release a ticket without completing it. Safe to call with null. The
/// store stays in `Loading` until a newer load completes.
#[unsafe(no_mangle)]
pub extern "C" fn apod_ticket_free(ticket: *mut FfiLoadTicket) {
    if !ticket.is_null() {
        let _ = guard(|| {
            drop(unsafe { FfiLoadTicket::into_core(ticket) });
        });
    }
}

// ---------------------------------------------------------------------------
// Completing loads
// ---------------------------------------------------------------------------

/// Hand back the HTTP response for `ticket`. Consumes `ticket`.
///
/// Returns `true` if the outcome was applied, `false` if the ticket was
/// stale (a newer load was started), was issued by a different store, or an
/// argument was null. A null `response` still releases the ticket.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_complete_load(
    store: *const FfiApodStore,
    ticket: *mut FfiLoadTicket,
    response: *const FfiHttpResponse,
) -> bool {
    guard(|| {
        if ticket.is_null() {
            return false;
        }
        let core_ticket = unsafe { FfiLoadTicket::into_core(ticket) };
        if store.is_null() || response.is_null() {
            return false;
        }
        let store = unsafe { &*store };
        let resp = unsafe { &*response };
        let body = unsafe { borrow_str(resp.body) }.unwrap_or("");
        store
            .inner
            .complete_load(core_ticket, Ok(HttpResponse::new(resp.status, body)))
    })
    .unwrap_or(false)
}

/// Report that `ticket`'s request never produced a response (offline,
/// timeout, ...). `message` may be null. Consumes `ticket`.
#[unsafe(no_mangle)]
pub extern "C" fn apod_store_fail_load(
    store: *const FfiApodStore,
    ticket: *mut FfiLoadTicket,
    message: *const c_char,
) -> bool {
    guard(|| {
        if ticket.is_null() {
            return false;
        }
        let core_ticket = unsafe { FfiLoadTicket::into_core(ticket) };
        if store.is_null() {
            return false;
        }
        let store = unsafe { &*store };
        let message = unsafe { borrow_str(message) }.unwrap_or("transport failure");
        store
            .inner
            .complete_load(core_ticket, Err(TransportError(message.to_string())))
    })
    .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free a snapshot from `apod_store_snapshot`. Safe to call with null.
/// Snapshots passed to callbacks are owned by the library; do not free them.
#[unsafe(no_mangle)]
pub extern "C" fn apod_free_snapshot(snapshot: *mut FfiSnapshot) {
    let _ = guard(|| unsafe { FfiSnapshot::free(snapshot) });
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BODY: &str = r#"{"date":"2024-03-01","explanation":"Y","media_type":"image","service_version":"v1","title":"X","url":"http://x/img.jpg"}"#;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn cstr<'a>(p: *const c_char) -> &'a str {
        unsafe { CStr::from_ptr(p) }.to_str().unwrap()
    }

    /// A store fixed at 2024-03-01 plus its startup ticket.
    fn store() -> (*mut FfiApodStore, *mut FfiLoadTicket) {
        let url = c("http://localhost:3000/planetary/apod");
        let key = c("KEY");
        let today = c("2024-03-01");
        let mut startup: *mut FfiLoadTicket = std::ptr::null_mut();
        let store =
            apod_store_new_with_today(url.as_ptr(), key.as_ptr(), today.as_ptr(), &mut startup);
        assert!(!store.is_null());
        assert!(!startup.is_null());
        (store, startup)
    }

    fn respond(
        store: *mut FfiApodStore,
        ticket: *mut FfiLoadTicket,
        status: u16,
        body: &str,
    ) -> bool {
        let body = c(body);
        let resp = FfiHttpResponse {
            status,
            body: body.as_ptr(),
        };
        apod_store_complete_load(store, ticket, &resp)
    }

    #[test]
    fn store_new_and_free() {
        let url = c("https://api.nasa.gov/planetary/apod");
        let key = c("KEY");
        let mut startup: *mut FfiLoadTicket = std::ptr::null_mut();
        let store = apod_store_new(url.as_ptr(), key.as_ptr(), &mut startup);
        assert!(!store.is_null());
        assert!(!startup.is_null());
        apod_ticket_free(startup);
        apod_store_free(store);
    }

    #[test]
    fn store_new_rejects_invalid_arguments() {
        let url = c("https://api.nasa.gov/planetary/apod");
        let key = c("KEY");
        let mut startup: *mut FfiLoadTicket = std::ptr::null_mut();

        assert!(apod_store_new(url.as_ptr(), std::ptr::null(), &mut startup).is_null());
        assert!(startup.is_null());
        let blank = c("");
        assert!(apod_store_new(url.as_ptr(), blank.as_ptr(), &mut startup).is_null());
        assert!(startup.is_null());
        assert!(apod_store_new(url.as_ptr(), key.as_ptr(), std::ptr::null_mut()).is_null());

        let bad_today = c("someday");
        let store =
            apod_store_new_with_today(url.as_ptr(), key.as_ptr(), bad_today.as_ptr(), &mut startup);
        assert!(store.is_null());
        assert!(startup.is_null());
    }

    #[test]
    fn store_free_null_is_safe() {
        apod_store_free(std::ptr::null_mut());
        apod_ticket_free(std::ptr::null_mut());
        apod_free_snapshot(std::ptr::null_mut());
    }

    #[test]
    fn new_store_is_already_loading_today() {
        let (store, startup) = store();
        let snap = apod_store_snapshot(store);
        let s = unsafe { &*snap };
        assert_eq!(s.phase, FfiPhase::Loading);
        assert!(s.loading);
        assert_eq!(cstr(s.selected_date), "2024-03-01");
        assert!(s.record.is_null());
        assert!(s.error_message.is_null());
        apod_free_snapshot(snap);
        apod_ticket_free(startup);
        apod_store_free(store);
    }

    #[test]
    fn startup_ticket_carries_request() {
        let (store, startup) = store();
        assert_eq!(apod_ticket_sequence(startup), 1);

        let req = unsafe { &*apod_ticket_request(startup) };
        assert_eq!(
            cstr(req.url),
            "http://localhost:3000/planetary/apod?api_key=KEY&date=2024-03-01"
        );
        assert_eq!(req.headers_len, 1);

        let retry = apod_store_begin_retry(store);
        assert_eq!(apod_ticket_sequence(retry), 2);

        apod_ticket_free(retry);
        apod_ticket_free(startup);
        apod_store_free(store);
    }

    #[test]
    fn complete_load_publishes_record() {
        let (store, startup) = store();
        assert!(respond(store, startup, 200, BODY));

        let snap = apod_store_snapshot(store);
        let s = unsafe { &*snap };
        assert_eq!(s.phase, FfiPhase::Loaded);
        assert!(!s.loading);
        let rec = unsafe { &*s.record };
        assert_eq!(cstr(rec.title), "X");
        assert_eq!(cstr(rec.media_url), "http://x/img.jpg");
        assert!(rec.hd_url.is_null());
        assert_eq!(rec.media_type, FfiMediaType::Image);
        assert_eq!(cstr(rec.media_type_raw), "image");
        apod_free_snapshot(snap);
        apod_store_free(store);
    }

    #[test]
    fn unknown_media_type_is_loaded_as_unsupported() {
        let (store, startup) = store();
        let body = BODY.replace(r#""media_type":"image""#, r#""media_type":"other""#);
        assert!(respond(store, startup, 200, &body));

        let snap = apod_store_snapshot(store);
        let s = unsafe { &*snap };
        assert_eq!(s.phase, FfiPhase::Loaded);
        assert!(s.error_message.is_null());
        let rec = unsafe { &*s.record };
        assert_eq!(rec.media_type, FfiMediaType::Unsupported);
        assert_eq!(cstr(rec.media_type_raw), "other");
        assert_eq!(cstr(rec.title), "X");
        apod_free_snapshot(snap);
        apod_store_free(store);
    }

    #[test]
    fn http_failure_reports_status() {
        let (store, startup) = store();
        assert!(respond(store, startup, 429, ""));

        let snap = apod_store_snapshot(store);
        let s = unsafe { &*snap };
        assert_eq!(s.phase, FfiPhase::Failed);
        assert_eq!(s.failure, FfiFailureKind::Http);
        assert_eq!(s.http_status, 429);
        assert!(cstr(s.error_message).contains("rate limit"));
        apod_free_snapshot(snap);
        apod_store_free(store);
    }

    #[test]
    fn fail_load_is_transport_failure() {
        let (store, startup) = store();
        let msg = c("offline");
        assert!(apod_store_fail_load(store, startup, msg.as_ptr()));

        let snap = apod_store_snapshot(store);
        assert_eq!(unsafe { &*snap }.failure, FfiFailureKind::Transport);
        apod_free_snapshot(snap);
        apod_store_free(store);
    }

    #[test]
    fn select_date_statuses() {
        let (store, startup) = store();
        apod_ticket_free(startup);
        let mut ticket: *mut FfiLoadTicket = std::ptr::null_mut();

        let same = c("2024-03-01");
        assert_eq!(
            apod_store_begin_select_date(store, same.as_ptr(), &mut ticket),
            FfiSelectStatus::Unchanged
        );
        assert!(ticket.is_null());

        let future = c("2024-03-02");
        assert_eq!(
            apod_store_begin_select_date(store, future.as_ptr(), &mut ticket),
            FfiSelectStatus::OutOfRange
        );

        let garbage = c("03/01/2024");
        assert_eq!(
            apod_store_begin_select_date(store, garbage.as_ptr(), &mut ticket),
            FfiSelectStatus::InvalidDate
        );

        let epoch = c("1995-06-16");
        assert_eq!(
            apod_store_begin_select_date(store, epoch.as_ptr(), &mut ticket),
            FfiSelectStatus::Started
        );
        assert!(!ticket.is_null());
        apod_ticket_free(ticket);

        assert_eq!(
            apod_store_begin_select_date(std::ptr::null(), epoch.as_ptr(), &mut ticket),
            FfiSelectStatus::NullArg
        );
        apod_store_free(store);
    }

    #[test]
    fn stale_ticket_is_not_applied() {
        let (store, startup) = store();
        let newer = apod_store_begin_retry(store);
        assert!(!respond(store, startup, 200, BODY));
        assert!(respond(store, newer, 500, ""));

        let snap = apod_store_snapshot(store);
        assert_eq!(unsafe { &*snap }.phase, FfiPhase::Failed);
        apod_free_snapshot(snap);
        apod_store_free(store);
    }

    #[test]
    fn ticket_from_another_store_is_refused() {
        let (first, first_startup) = store();
        let (second, second_startup) = store();

        // Same sequence number on both stores; only the issuing store may apply it.
        assert!(!respond(second, first_startup, 200, BODY));

        let snap = apod_store_snapshot(second);
        let s = unsafe { &*snap };
        assert_eq!(s.phase, FfiPhase::Loading);
        assert!(s.record.is_null());
        apod_free_snapshot(snap);

        assert!(respond(second, second_startup, 200, BODY));
        apod_store_free(first);
        apod_store_free(second);
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn count_loading(snapshot: *const FfiSnapshot, user_data: *mut c_void) {
        let s = unsafe { &*snapshot };
        let loading_seen = unsafe { &*(user_data as *const AtomicUsize) };
        if s.loading {
            loading_seen.fetch_add(1, Ordering::SeqCst);
        }
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn subscribe_and_unsubscribe() {
        let (store, startup) = store();
        apod_ticket_free(startup);
        let loading_seen = AtomicUsize::new(0);
        let id = apod_store_subscribe(
            store,
            count_loading,
            &loading_seen as *const AtomicUsize as *mut c_void,
        );
        assert_ne!(id, 0);

        let before = CALLS.load(Ordering::SeqCst);
        let ticket = apod_store_begin_retry(store);
        respond(store, ticket, 200, BODY);
        assert_eq!(CALLS.load(Ordering::SeqCst) - before, 2);
        assert_eq!(loading_seen.load(Ordering::SeqCst), 1);

        assert!(apod_store_unsubscribe(store, id));
        assert!(!apod_store_unsubscribe(store, id));
        apod_ticket_free(apod_store_begin_retry(store));
        assert_eq!(loading_seen.load(Ordering::SeqCst), 1);

        apod_store_free(store);
    }
}
