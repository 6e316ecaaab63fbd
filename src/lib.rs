//! # Himnario Core
//!
//! Local state layer of the hymnal app: settings, favorites, user lists with
//! staged reordering, and recently viewed hymns. State is persisted in LMDB
//! as JSON blobs under the keys `userSettings`, `favoritos` and
//! `visitedItems`.
//!
//! The crate is usable from Rust through [`HymnalState`] and from a mobile UI
//! through the C-compatible functions below. Every FFI function returns an
//! [`AppResponse`] serialized as JSON, e.g. `{"Ok":"[...]"}`, which must be
//! released with [`free_response`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use himnario_core::{Hymn, HymnalState, StoreConfig};
//!
//! let mut state = HymnalState::open(StoreConfig::named("himnario"))?;
//! state.add_favorite(Hymn::new(78, "Cuán grande es Él", "Adoración"))?;
//!
//! let list = state.create_list("Culto Domingo")?;
//! state.add_hymn_to_list(list.id, "78")?;
//! # Ok::<(), himnario_core::AppResponse>(())
//! ```
//!
//! ## FFI Functions
//!
//! - [`open_hymnal`], [`open_hymnal_with_config`], [`close_hymnal`]
//! - [`settings_get`], [`settings_update`]
//! - [`favorites_add`], [`favorites_remove`], [`favorites_list`],
//!   [`favorites_sort`], [`favorites_clear`]
//! - [`lists_get_all`], [`lists_create`], [`lists_rename`], [`lists_delete`],
//!   [`lists_add_hymn`], [`lists_remove_hymn`]
//! - [`draft_begin`], [`draft_enter_edit`], [`draft_move`], [`draft_confirm`],
//!   [`draft_discard`], [`draft_request_leave`], [`draft_resolve_leave`]
//! - [`visited_record`], [`visited_list`], [`visited_clear`]

pub mod app_response;
pub mod catalogue;
pub mod config;
pub mod favorites_store;
pub mod hymnal_state;
pub mod kv_store;
pub mod list_draft;
pub mod models;
pub mod ordering;
pub mod settings_store;
pub mod user_lists;
pub mod visited_store;

pub use crate::app_response::AppResponse;
pub use crate::catalogue::Catalogue;
pub use crate::config::StoreConfig;
pub use crate::hymnal_state::{HymnalState, StoreEvent};
pub use crate::list_draft::{EditState, LeaveChoice, LeaveDecision, ListDraft};
pub use crate::models::{Favorite, Hymn, SortOrder, UserList, VisitedItem};

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;

use crate::list_draft::DraftSnapshot;

/// Opens (or creates) the storage `<name>.lmdb` with default settings.
///
/// Returns a null pointer when `name` is null, not UTF-8, or the storage
/// cannot be opened. The pointer must be released with [`close_hymnal`].
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use himnario_core::open_hymnal;
///
/// let name = CString::new("himnario").unwrap();
/// let state = open_hymnal(name.as_ptr());
/// assert!(!state.is_null());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn open_hymnal(name: *const c_char) -> *mut HymnalState {
    let name = match c_ptr_to_string(name, "name") {
        Ok(name) => name,
        Err(e) => {
            warn!("open_hymnal rejected: {e}");
            return std::ptr::null_mut();
        }
    };

    open_with(StoreConfig::named(name))
}

/// Same as [`open_hymnal`] with a JSON [`StoreConfig`], e.g.
/// `{"name":"himnario","default_font_size":24}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn open_hymnal_with_config(config_json: *const c_char) -> *mut HymnalState {
    let config = match c_ptr_to_string(config_json, "config")
        .and_then(|json| StoreConfig::from_json(&json))
    {
        Ok(config) => config,
        Err(e) => {
            warn!("open_hymnal_with_config rejected: {e}");
            return std::ptr::null_mut();
        }
    };

    open_with(config)
}

fn open_with(config: StoreConfig) -> *mut HymnalState {
    info!("Attempting to open hymnal storage at: {}", config.lmdb_dir());

    match HymnalState::open(config) {
        Ok(state) => {
            info!("✅ Hymnal storage opened");
            Box::into_raw(Box::new(state))
        }
        Err(e) => {
            warn!("❌ Failed to open hymnal storage: {e}");
            std::ptr::null_mut()
        }
    }
}

/// Closes the storage and frees the state. The pointer must not be used
/// afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_hymnal(state: *mut HymnalState) -> *const c_char {
    if state.is_null() {
        let error = AppResponse::BadRequest("Null state pointer passed to close_hymnal".to_string());
        return response_to_c_string(&error);
    }

    let mut state = unsafe { Box::from_raw(state) };
    let result = state
        .close()
        .map(|_| "Hymnal storage closed successfully".to_string());
    respond(result)
}

/// Releases a string returned by any function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if !ptr.is_null() {
        drop(unsafe { CString::from_raw(ptr as *mut c_char) });
    }
}

/// Returns the JSON value of `fontSize`, `order` or `userLists`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn settings_get(state: *mut HymnalState, key: *const c_char) -> *const c_char {
    with_state(state, "settings_get", |state| {
        let key = c_ptr_to_string(key, "key")?;
        Ok(state.get_setting(&key))
    })
}

/// Merges `{key: value}` into the settings record. `value_json` is any JSON
/// value, e.g. `18` or `"asc"`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn settings_update(
    state: *mut HymnalState,
    key: *const c_char,
    value_json: *const c_char,
) -> *const c_char {
    with_state(state, "settings_update", |state| {
        let key = c_ptr_to_string(key, "key")?;
        let value = parse_json(value_json, "value")?;
        state.update_setting(&key, value)?;
        Ok(state.get_setting(&key))
    })
}

/// Adds `{"number":..,"title":..,"group":..}` to favorites. Answers `true`
/// when added, `false` when it already was a favorite.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn favorites_add(state: *mut HymnalState, hymn_json: *const c_char) -> *const c_char {
    with_state(state, "favorites_add", |state| {
        let hymn: Hymn = parse_json(hymn_json, "hymn")?;
        state.add_favorite(hymn)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn favorites_remove(state: *mut HymnalState, number: u32) -> *const c_char {
    with_state(state, "favorites_remove", |state| {
        if state.remove_favorite(number)? {
            Ok(true)
        } else {
            Err(AppResponse::NotFound(format!("Hymn {number} is not a favorite")))
        }
    })
}

/// Re-reads favorites from storage, sorted by the saved sort order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn favorites_list(state: *mut HymnalState) -> *const c_char {
    with_state(state, "favorites_list", |state| Ok(state.favorites_list()))
}

/// Sorts favorites in memory by `numAsc`, `numDesc`, `asc` or `desc`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn favorites_sort(state: *mut HymnalState, order: *const c_char) -> *const c_char {
    with_state(state, "favorites_sort", |state| {
        let order = parse_sort_order(order)?;
        Ok(state.sort_favorites(order))
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn favorites_clear(state: *mut HymnalState) -> *const c_char {
    with_state(state, "favorites_clear", |state| {
        state.clear_favorites()?;
        Ok("All favorites cleared successfully")
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn lists_get_all(state: *mut HymnalState) -> *const c_char {
    with_state(state, "lists_get_all", |state| Ok(state.user_lists().to_vec()))
}

/// Creates an empty list. Blank names answer `ValidationError`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn lists_create(state: *mut HymnalState, name: *const c_char) -> *const c_char {
    with_state(state, "lists_create", |state| {
        let name = c_ptr_to_string(name, "name")?;
        state.create_list(&name)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn lists_rename(
    state: *mut HymnalState,
    id: i64,
    name: *const c_char,
) -> *const c_char {
    with_state(state, "lists_rename", |state| {
        let name = c_ptr_to_string(name, "name")?;
        state.rename_list(id, &name)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn lists_delete(state: *mut HymnalState, id: i64) -> *const c_char {
    with_state(state, "lists_delete", |state| {
        if state.delete_list(id)? {
            Ok(format!("List {id} deleted successfully"))
        } else {
            Err(AppResponse::NotFound(format!("No list found with id: {id}")))
        }
    })
}

/// Appends a hymn number to a list. Answers `false` when already present.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn lists_add_hymn(
    state: *mut HymnalState,
    id: i64,
    number: *const c_char,
) -> *const c_char {
    with_state(state, "lists_add_hymn", |state| {
        let number = c_ptr_to_string(number, "number")?;
        state.add_hymn_to_list(id, &number)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn lists_remove_hymn(
    state: *mut HymnalState,
    id: i64,
    number: *const c_char,
) -> *const c_char {
    with_state(state, "lists_remove_hymn", |state| {
        let number = c_ptr_to_string(number, "number")?;
        state.remove_hymn_from_list(id, &number)
    })
}

/// Opens the list screen for `id` in viewing state.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_begin(state: *mut HymnalState, id: i64) -> *const c_char {
    with_state(state, "draft_begin", |state| {
        Ok(state.begin_draft(id)?.snapshot())
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_enter_edit(state: *mut HymnalState) -> *const c_char {
    with_state(state, "draft_enter_edit", |state| {
        let draft = state.draft_mut()?;
        draft.enter_edit();
        Ok(draft.snapshot())
    })
}

/// Moves the hymn at position `from` to position `to` of the candidate order.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_move(state: *mut HymnalState, from: u32, to: u32) -> *const c_char {
    with_state(state, "draft_move", |state| {
        let draft = state.draft_mut()?;
        draft.move_item(from as usize, to as usize)?;
        Ok(draft.snapshot())
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_confirm(state: *mut HymnalState) -> *const c_char {
    with_state(state, "draft_confirm", |state| {
        state.confirm_draft()?;
        current_draft(state)
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_discard(state: *mut HymnalState) -> *const c_char {
    with_state(state, "draft_discard", |state| {
        state.discard_draft()?;
        current_draft(state)
    })
}

/// Answers `"proceed"` or `"needs_confirmation"`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_request_leave(state: *mut HymnalState) -> *const c_char {
    with_state(state, "draft_request_leave", |state| Ok(state.request_leave()))
}

/// `choice` is `discard`, `save` or `cancel`. Answers whether navigation
/// may proceed.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn draft_resolve_leave(
    state: *mut HymnalState,
    choice: *const c_char,
) -> *const c_char {
    with_state(state, "draft_resolve_leave", |state| {
        let raw = c_ptr_to_string(choice, "choice")?;
        let choice = LeaveChoice::parse(&raw)
            .ok_or_else(|| AppResponse::BadRequest(format!("Unknown leave choice: {raw}")))?;
        state.resolve_leave(choice)
    })
}

/// Records a view of `{"number":..,"title":..}`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn visited_record(state: *mut HymnalState, item_json: *const c_char) -> *const c_char {
    with_state(state, "visited_record", |state| {
        let item: VisitedItem = parse_json(item_json, "item")?;
        state.record_visit(item)?;
        Ok(state.visited().to_vec())
    })
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn visited_list(state: *mut HymnalState) -> *const c_char {
    with_state(state, "visited_list", |state| Ok(state.visited().to_vec()))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn visited_clear(state: *mut HymnalState) -> *const c_char {
    with_state(state, "visited_clear", |state| {
        state.clear_visited()?;
        Ok("Visited items cleared successfully")
    })
}

fn current_draft(state: &HymnalState) -> Result<DraftSnapshot, AppResponse> {
    state
        .draft()
        .map(ListDraft::snapshot)
        .ok_or_else(|| AppResponse::BadRequest("No list is open".to_string()))
}

fn parse_sort_order(ptr: *const c_char) -> Result<SortOrder, AppResponse> {
    let raw = c_ptr_to_string(ptr, "order")?;
    SortOrder::parse(&raw).ok_or_else(|| AppResponse::BadRequest(format!("Unknown sort order: {raw}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    field_name: &str,
) -> Result<T, AppResponse> {
    let json = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&json)
        .map_err(|e| AppResponse::SerializationError(format!("Invalid JSON in {field_name}: {e}")))
}

/// Runs `op` against the state behind `state` and encodes its outcome.
fn with_state<T, F>(state: *mut HymnalState, op_name: &str, op: F) -> *const c_char
where
    T: Serialize,
    F: FnOnce(&mut HymnalState) -> Result<T, AppResponse>,
{
    match unsafe { state.as_mut() } {
        Some(state) => respond(op(state)),
        None => {
            let error = AppResponse::BadRequest(format!("Null state pointer passed to {op_name}"));
            response_to_c_string(&error)
        }
    }
}

/// Successful values are JSON-encoded into `AppResponse::Ok`.
fn respond<T: Serialize>(result: Result<T, AppResponse>) -> *const c_char {
    let response = match result {
        Ok(value) => match serde_json::to_string(&value) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        },
        Err(e) => e,
    };
    response_to_c_string(&response)
}

/// Serializes the response to a C string owned by the caller.
///
/// Returns a null pointer if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a Rust `String`, rejecting null pointers
/// and invalid UTF-8.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, AppResponse> {
    if ptr.is_null() {
        return Err(AppResponse::BadRequest(format!("Null {field_name} pointer")));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => Err(AppResponse::BadRequest(format!(
            "Invalid UTF-8 in {field_name}: {e}"
        ))),
    }
}
