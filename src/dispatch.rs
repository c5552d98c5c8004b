//! Request entry and exit hook.
//!
//! Wraps one raw request into shared handles, parses its cookies, runs the
//! handler with the handles bound to the execution unit, then unbinds them and
//! converts the response back into a raw one. A failing handler is answered
//! with the status of its error.

use std::{future::Future, sync::Arc};

use http::{Request as RawRequest, Response as RawResponse};
use parking_lot::Mutex;

use crate::{
    context::{enter, scope, SharedRequest, SharedResponse},
    error::ScopeError,
    request::Request,
    response::Response,
};

fn prepare(raw: RawRequest<Vec<u8>>) -> (SharedRequest, SharedResponse) {
    trace!("Dispatching {} {}", raw.method(), raw.uri());
    let mut request = Request::new(raw);
    request.parse_cookies();
    (Arc::new(Mutex::new(request)), Arc::new(Mutex::new(Response::new())))
}

fn finish(response: SharedResponse, outcome: Result<(), ScopeError>) -> Result<RawResponse<Vec<u8>>, ScopeError> {
    let mut response = std::mem::take(&mut *response.lock());
    if let Err(e) = outcome {
        *response.status_mut() = e.status();
    }
    response.into_raw()
}

/// Handle `raw` on the current thread, `handler` reaching the request and
/// response through the accessors.
///
/// ```rust
///# use http::Request as RawRequest;
/// let raw = RawRequest::builder().uri("/ping").body(Vec::new()).unwrap();
/// let res = http_scope::dispatch_blocking(raw, || http_scope::respond_result(200, "pong")).unwrap();
/// assert_eq!(res.body().as_slice(), br#"{"code":200,"result":"pong"}"#);
/// assert!(http_scope::request().is_err());
/// ```
pub fn dispatch_blocking<F>(raw: RawRequest<Vec<u8>>, handler: F) -> Result<RawResponse<Vec<u8>>, ScopeError>
where
    F: FnOnce() -> Result<(), ScopeError>,
{
    let (request, response) = prepare(raw);
    let outcome = {
        let _guard = enter(request, response.clone());
        handler()
    };
    finish(response, outcome)
}

/// Handle `raw` within a task scope. The whole of `handler`, including the
/// code run before its future is first polled, sees the handles.
pub async fn dispatch<F, Fut>(raw: RawRequest<Vec<u8>>, handler: F) -> Result<RawResponse<Vec<u8>>, ScopeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), ScopeError>>,
{
    let (request, response) = prepare(raw);
    let outcome = scope(request, response.clone(), async move { handler().await }).await;
    finish(response, outcome)
}
