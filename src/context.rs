//! Execution unit scoped storage of the current request and response.
//!
//! Inside a [`scope`] the handles live in tokio task-local storage, so they
//! follow the task across worker threads. Outside of any task scope they live
//! in a thread-local slot, populated by [`enter`] (or the raw setters) and
//! cleared when the returned guard drops. A task scope always shadows the
//! thread slot of whatever thread is polling it.

use std::{cell::RefCell, future::Future, marker::PhantomData, sync::Arc};

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

use crate::{
    error::{ScopeError, Slot},
    request::Request,
    response::Response,
};

/// Handle on the request of the current execution unit.
///
/// The mutex is not reentrant: release any guard taken on it before calling
/// the accessors, which fail with [`ScopeError::HandleBusy`] otherwise.
pub type SharedRequest = Arc<Mutex<Request>>;
/// Handle on the response of the current execution unit, see [`SharedRequest`]
pub type SharedResponse = Arc<Mutex<Response>>;

pub(crate) fn lock_request(request: &SharedRequest) -> Result<MutexGuard<'_, Request>, ScopeError> {
    request.try_lock().ok_or(ScopeError::HandleBusy(Slot::Request))
}

pub(crate) fn lock_response(response: &SharedResponse) -> Result<MutexGuard<'_, Response>, ScopeError> {
    response.try_lock().ok_or(ScopeError::HandleBusy(Slot::Response))
}

#[derive(Default)]
struct Slots {
    request: Option<SharedRequest>,
    response: Option<SharedResponse>,
}

tokio::task_local! {
    static TASK_SLOTS: RefCell<Slots>;
}

thread_local! {
    static THREAD_SLOTS: RefCell<Slots> = RefCell::new(Slots::default());
}

fn in_task_scope() -> bool {
    TASK_SLOTS.try_with(|_| ()).is_ok()
}

fn with_slots<R>(f: impl FnOnce(&mut Slots) -> R) -> R {
    if in_task_scope() {
        TASK_SLOTS.with(|slots| f(&mut *slots.borrow_mut()))
    } else {
        THREAD_SLOTS.with(|slots| f(&mut *slots.borrow_mut()))
    }
}

/// Bind `request` to the current execution unit, replacing any previous one
pub fn set_request(request: SharedRequest) {
    with_slots(|slots| slots.request = Some(request));
}

/// Bind `response` to the current execution unit, replacing any previous one
pub fn set_response(response: SharedResponse) {
    with_slots(|slots| slots.response = Some(response));
}

/// The request bound to the current execution unit
///
/// ```rust
///# use http_scope::prelude::*;
/// // No scope was entered on this thread
/// assert!(matches!(http_scope::request(), Err(ScopeError::ContextNotInitialized(Slot::Request))));
/// ```
pub fn request() -> Result<SharedRequest, ScopeError> {
    with_slots(|slots| slots.request.clone()).ok_or(ScopeError::ContextNotInitialized(Slot::Request))
}

/// The response bound to the current execution unit
pub fn response() -> Result<SharedResponse, ScopeError> {
    with_slots(|slots| slots.response.clone()).ok_or(ScopeError::ContextNotInitialized(Slot::Response))
}

/// Empty both slots of the current execution unit
pub fn clear() {
    with_slots(|slots| *slots = Slots::default());
}

/// Whether a request is bound to the current execution unit
pub fn is_bound() -> bool {
    with_slots(|slots| slots.request.is_some())
}

/// `request().attribute(key)`
pub fn attribute(key: &str) -> Result<Option<Value>, ScopeError> {
    let req = request()?;
    let value = lock_request(&req)?.attribute(key).cloned();
    Ok(value)
}

/// `request().set_attribute(key, value)`
pub fn set_attribute<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Result<(), ScopeError> {
    let req = request()?;
    lock_request(&req)?.set_attribute(key, value);
    Ok(())
}

/// `request().remove_attribute(key)`
pub fn remove_attribute(key: &str) -> Result<Option<Value>, ScopeError> {
    let req = request()?;
    let value = lock_request(&req)?.remove_attribute(key);
    Ok(value)
}

/// Restores the slots that were in place before [`enter`] when dropped.
///
/// The guard is tied to the thread that created it.
#[must_use = "the request scope is left as soon as the guard is dropped"]
pub struct ScopeGuard {
    previous: Option<Slots>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take().unwrap_or_default();
        with_slots(|slots| *slots = previous);
        trace!("Left request scope");
    }
}

/// Bind a request and a response to the current execution unit until the
/// returned guard is dropped. This is the hook for synchronous hosts.
///
/// ```rust
///# use http_scope::prelude::*;
///# use http::Request as RawRequest;
///# use std::sync::Arc;
///# use parking_lot::{Mutex, MutexGuard};
/// let req = Arc::new(Mutex::new(Request::new(RawRequest::builder().uri("/").body(Vec::new()).unwrap())));
/// let res = Arc::new(Mutex::new(Response::new()));
/// {
///     let _guard = http_scope::enter(req, res);
///     http_scope::set_attribute("k", "v").unwrap();
/// }
/// assert!(http_scope::attribute("k").is_err());
/// ```
pub fn enter(request: SharedRequest, response: SharedResponse) -> ScopeGuard {
    let previous = with_slots(|slots| {
        std::mem::replace(
            slots,
            Slots {
                request: Some(request),
                response: Some(response),
            },
        )
    });
    trace!("Entered request scope");

    ScopeGuard {
        previous: Some(previous),
        _not_send: PhantomData,
    }
}

/// Run `fut` with a request and a response bound to its task. The binding
/// disappears when `fut` completes, whatever thread it ran on.
pub async fn scope<F: Future>(request: SharedRequest, response: SharedResponse, fut: F) -> F::Output {
    let slots = Slots {
        request: Some(request),
        response: Some(response),
    };
    TASK_SLOTS.scope(RefCell::new(slots), fut).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request as RawRequest;

    fn handles(uri: &str) -> (SharedRequest, SharedResponse) {
        let raw = RawRequest::builder().uri(uri).body(Vec::new()).unwrap();
        (Arc::new(Mutex::new(Request::new(raw))), Arc::new(Mutex::new(Response::new())))
    }

    #[test]
    fn accessors_fail_without_scope() {
        assert!(matches!(request(), Err(ScopeError::ContextNotInitialized(Slot::Request))));
        assert!(matches!(response(), Err(ScopeError::ContextNotInitialized(Slot::Response))));
        assert!(matches!(attribute("k"), Err(ScopeError::ContextNotInitialized(Slot::Request))));
    }

    #[test]
    fn setters_overwrite_and_clear_empties() {
        let (first, res) = handles("/first");
        let (second, _) = handles("/second");

        set_request(first);
        set_response(res);
        set_request(second);
        assert_eq!(request().unwrap().lock().request_uri(), "/second");

        clear();
        assert!(!is_bound());
        assert!(response().is_err());
    }

    #[test]
    fn nested_guards_restore_outer_scope() {
        let (outer_req, outer_res) = handles("/outer");
        let (inner_req, inner_res) = handles("/inner");

        let outer = enter(outer_req, outer_res);
        {
            let _inner = enter(inner_req, inner_res);
            assert_eq!(request().unwrap().lock().request_uri(), "/inner");
        }
        assert_eq!(request().unwrap().lock().request_uri(), "/outer");
        drop(outer);

        assert!(request().is_err());
    }

    #[test]
    fn attributes_round_trip_through_scope() {
        let (req, res) = handles("/");
        let _guard = enter(req.clone(), res);

        set_attribute("user", "jane").unwrap();
        assert_eq!(attribute("user").unwrap(), Some(Value::from("jane")));
        assert_eq!(req.lock().attribute("user"), Some(&Value::from("jane")));
        assert_eq!(remove_attribute("user").unwrap(), Some(Value::from("jane")));
        assert_eq!(attribute("user").unwrap(), None);
    }

    #[test]
    fn accessors_fail_while_caller_holds_the_handle() {
        let (req, res) = handles("/");
        let _guard = enter(req.clone(), res);

        let held = req.lock();
        assert!(matches!(attribute("k"), Err(ScopeError::HandleBusy(Slot::Request))));
        assert!(matches!(set_attribute("k", 1), Err(ScopeError::HandleBusy(Slot::Request))));
        drop(held);

        set_attribute("k", 1).unwrap();
    }

    #[tokio::test]
    async fn task_scope_ends_with_future() {
        let (req, res) = handles("/task");

        let uri = scope(req, res, async { request().unwrap().lock().request_uri().to_string() }).await;

        assert_eq!(uri, "/task");
        assert!(request().is_err());
    }

    #[tokio::test]
    async fn task_scope_shadows_thread_slot() {
        let (thread_req, thread_res) = handles("/thread");
        let (task_req, task_res) = handles("/task");
        let _guard = enter(thread_req, thread_res);

        scope(task_req, task_res, async {
            assert_eq!(request().unwrap().lock().request_uri(), "/task");
            clear();
            assert!(request().is_err());
        })
        .await;

        assert_eq!(request().unwrap().lock().request_uri(), "/thread");
    }
}
