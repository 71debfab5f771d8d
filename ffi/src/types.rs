//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`/`Option`,
//! and enums with explicit discriminants. Conversions and the matching
//! deallocation live here to keep `lib.rs` focused on the `extern "C"`
//! surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use apod_core::{
    FailureKind, HttpRequest, LoadTicket, MediaType, Phase, PictureRecord, PictureStore, Snapshot,
};

/// Opaque handle to a `PictureStore`.
pub struct FfiApodStore {
    pub(crate) inner: PictureStore,
}

/// Opaque handle to a started load. The host executes the request returned
/// by `apod_ticket_request` and hands the ticket back to
/// `apod_store_complete_load` or `apod_store_fail_load`.
pub struct FfiLoadTicket {
    pub(crate) inner: LoadTicket,
    pub(crate) request: *mut FfiHttpRequest,
}

impl FfiLoadTicket {
    pub(crate) fn from_core(ticket: LoadTicket) -> *mut Self {
        let request = FfiHttpRequest::from_core(ticket.request());
        Box::into_raw(Box::new(FfiLoadTicket {
            inner: ticket,
            request,
        }))
    }

    /// Reclaim a ticket, releasing its request, and return the core ticket.
    ///
    /// # Safety
    /// `ptr` must come from `from_core` and not have been freed.
    pub(crate) unsafe fn into_core(ptr: *mut Self) -> LoadTicket {
        let ticket = unsafe { Box::from_raw(ptr) };
        unsafe { FfiHttpRequest::free(ticket.request) };
        ticket.inner
    }
}

/// Copy a Rust string into a caller-owned C string. Interior NULs are
/// dropped rather than failing the whole conversion.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

pub(crate) fn opt_c_string(s: Option<&str>) -> *mut c_char {
    s.map_or(std::ptr::null_mut(), to_c_string)
}

/// # Safety
/// `s` must be null or come from `to_c_string`.
pub(crate) unsafe fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// A GET request for the host to execute.
#[repr(C)]
pub struct FfiHttpRequest {
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
}

impl FfiHttpRequest {
    pub(crate) fn from_core(req: &HttpRequest) -> *mut Self {
        let headers_len = req.headers.len() as u32;
        let headers = if req.headers.is_empty() {
            std::ptr::null_mut()
        } else {
            let ffi_headers: Box<[FfiHeader]> = req
                .headers
                .iter()
                .map(|(k, v)| FfiHeader {
                    key: to_c_string(k),
                    value: to_c_string(v),
                })
                .collect();
            Box::into_raw(ffi_headers) as *mut FfiHeader
        };
        Box::into_raw(Box::new(FfiHttpRequest {
            url: to_c_string(&req.url),
            headers,
            headers_len,
        }))
    }

    /// # Safety
    /// `ptr` must be null or come from `from_core`.
    pub(crate) unsafe fn free(ptr: *mut Self) {
        if ptr.is_null() {
            return;
        }
        let req = unsafe { Box::from_raw(ptr) };
        unsafe { free_c_string(req.url) };
        if !req.headers.is_null() && req.headers_len > 0 {
            let slice = std::ptr::slice_from_raw_parts_mut(req.headers, req.headers_len as usize);
            let headers = unsafe { Box::from_raw(slice) };
            for h in headers.iter() {
                unsafe {
                    free_c_string(h.key);
                    free_c_string(h.value);
                }
            }
        }
    }
}

/// An HTTP response supplied by the host. Read, never freed, by this library.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiPhase {
    Idle = 0,
    Loading = 1,
    Loaded = 2,
    Failed = 3,
}

impl From<Phase> for FfiPhase {
    fn from(p: Phase) -> Self {
        match p {
            Phase::Idle => FfiPhase::Idle,
            Phase::Loading => FfiPhase::Loading,
            Phase::Loaded => FfiPhase::Loaded,
            Phase::Failed => FfiPhase::Failed,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiFailureKind {
    None = 0,
    Transport = 1,
    Http = 2,
    Decode = 3,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiMediaType {
    Image = 0,
    Video = 1,
    Unsupported = 2,
}

/// A picture record exposed to C. `hd_url` may be null.
#[repr(C)]
pub struct FfiRecord {
    pub date: *mut c_char,
    pub title: *mut c_char,
    pub explanation: *mut c_char,
    pub media_url: *mut c_char,
    pub hd_url: *mut c_char,
    pub media_type: FfiMediaType,
    /// The feed's media type string, useful when `media_type` is `Unsupported`.
    pub media_type_raw: *mut c_char,
    pub service_version: *mut c_char,
}

impl FfiRecord {
    fn from_core(rec: &PictureRecord) -> *mut Self {
        let media_type = match rec.media_type {
            MediaType::Image => FfiMediaType::Image,
            MediaType::Video => FfiMediaType::Video,
            MediaType::Unsupported(_) => FfiMediaType::Unsupported,
        };
        Box::into_raw(Box::new(FfiRecord {
            date: to_c_string(&rec.date.to_string()),
            title: to_c_string(&rec.title),
            explanation: to_c_string(&rec.explanation),
            media_url: to_c_string(&rec.media_url),
            hd_url: opt_c_string(rec.hd_url.as_deref()),
            media_type,
            media_type_raw: to_c_string(rec.media_type.as_str()),
            service_version: to_c_string(&rec.service_version),
        }))
    }

    unsafe fn free(ptr: *mut Self) {
        if ptr.is_null() {
            return;
        }
        let rec = unsafe { Box::from_raw(ptr) };
        for s in [
            rec.date,
            rec.title,
            rec.explanation,
            rec.media_url,
            rec.hd_url,
            rec.media_type_raw,
            rec.service_version,
        ] {
            unsafe { free_c_string(s) };
        }
    }
}

/// Store state exposed to C.
///
/// `record` is null until a load has succeeded; `error_message` is null
/// unless the latest load failed. `http_status` is set only when `failure`
/// is `Http`.
#[repr(C)]
pub struct FfiSnapshot {
    pub selected_date: *mut c_char,
    pub phase: FfiPhase,
    pub loading: bool,
    pub record: *mut FfiRecord,
    pub error_message: *mut c_char,
    pub failure: FfiFailureKind,
    pub http_status: u16,
    pub version: u64,
}

impl FfiSnapshot {
    pub(crate) fn from_core(snap: &Snapshot) -> *mut Self {
        let (failure, http_status) = match snap.failure {
            None => (FfiFailureKind::None, 0),
            Some(FailureKind::Transport) => (FfiFailureKind::Transport, 0),
            Some(FailureKind::Http(status)) => (FfiFailureKind::Http, status),
            Some(FailureKind::Decode) => (FfiFailureKind::Decode, 0),
        };
        let record = snap
            .record
            .as_deref()
            .map_or(std::ptr::null_mut(), FfiRecord::from_core);
        Box::into_raw(Box::new(FfiSnapshot {
            selected_date: to_c_string(&snap.selected_date.to_string()),
            phase: snap.phase.into(),
            loading: snap.loading,
            record,
            error_message: opt_c_string(snap.error.as_deref()),
            failure,
            http_status,
            version: snap.version,
        }))
    }

    /// # Safety
    /// `ptr` must be null or come from `from_core`.
    pub(crate) unsafe fn free(ptr: *mut Self) {
        if ptr.is_null() {
            return;
        }
        let snap = unsafe { Box::from_raw(ptr) };
        unsafe {
            free_c_string(snap.selected_date);
            free_c_string(snap.error_message);
            FfiRecord::free(snap.record);
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Outcome of `apod_store_begin_select_date`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiSelectStatus {
    /// A load started; `*out_ticket` holds its ticket.
    Started = 0,
    /// The date was already selected; nothing happened.
    Unchanged = 1,
    OutOfRange = 2,
    /// The date string was not `YYYY-MM-DD`.
    InvalidDate = 3,
    NullArg = 4,
    Panic = 5,
}

/// Observer callback. `snapshot` is only valid for the duration of the call.
pub type FfiSnapshotCallback =
    extern "C" fn(snapshot: *const FfiSnapshot, user_data: *mut c_void);

/// Callback plus the host's context pointer.
pub(crate) struct CallbackTarget {
    callback: FfiSnapshotCallback,
    user_data: *mut c_void,
}

// The host promises `user_data` may be used from whichever thread completes
// a load.
unsafe impl Send for CallbackTarget {}
unsafe impl Sync for CallbackTarget {}

impl CallbackTarget {
    pub(crate) fn new(callback: FfiSnapshotCallback, user_data: *mut c_void) -> Self {
        Self {
            callback,
            user_data,
        }
    }

    pub(crate) fn invoke(&self, snap: &Snapshot) {
        let ffi = FfiSnapshot::from_core(snap);
        (self.callback)(ffi, self.user_data);
        unsafe { FfiSnapshot::free(ffi) };
    }
}
