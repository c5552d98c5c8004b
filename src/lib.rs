//! ### http-scope gives any code handling a request access to that request
//! The current request and response are bound to the execution unit handling
//! them (the tokio task, or the thread for synchronous hosts), so code deep in
//! a call stack can reach them without having them passed along.
//!
//! The host binds them on request entry and unbinds them on exit, either with
//! [`dispatch`]/[`dispatch_blocking`] or with the lower level [`scope`] and
//! [`enter`]. Every accessor fails with
//! [`ScopeError::ContextNotInitialized`](error::ScopeError::ContextNotInitialized)
//! outside of such a scope.
//!
//! ## Quick setup
//! ```rust
//! use http_scope::prelude::*;
//!
//! fn handler() -> Result<(), ScopeError> {
//!     let visits = http_scope::get_cookie("visits", None)?
//!         .and_then(|v| v.parse::<u32>().ok())
//!         .unwrap_or(0);
//!     http_scope::add_cookie("visits", &(visits + 1).to_string())?;
//!     http_scope::respond_data(200, &visits)
//! }
//!
//! let raw = http::Request::builder()
//!     .uri("/home")
//!     .header("Cookie", "visits=2")
//!     .body(Vec::new())
//!     .unwrap();
//!
//! let res = http_scope::dispatch_blocking(raw, handler).unwrap();
//! assert_eq!(res.body().as_slice(), br#"{"code":200,"data":2}"#);
//! assert_eq!(res.headers()["set-cookie"], "visits=3");
//! ```

#[macro_use]
extern crate log;

/// Execution unit scoped request & response handles
pub mod context;
/// Cookie lookup, upsert & expiry over the current request
pub mod cookies;
/// Request entry & exit hook
pub mod dispatch;
/// Error definitions
pub mod error;
/// Json response envelope
pub mod json;
/// The Http Request type
pub mod request;
/// The Http Response type
pub mod response;
///
pub use cookie;
///
pub use http;

pub use context::{
    attribute, clear, enter, is_bound, remove_attribute, request, response, scope, set_attribute, set_request, set_response,
    ScopeGuard, SharedRequest, SharedResponse,
};
pub use cookies::{add_cookie, add_cookie_at, add_cookie_with, delete_cookie, get_cookie, CookieOptions, SESSION_MAX_AGE};
pub use dispatch::{dispatch, dispatch_blocking};
pub use json::{respond_data, respond_json, respond_message, respond_raw, respond_result, Envelope, JsonResponse, DEFAULT_CONTENT_TYPE};

/// Contains everything a handler needs
pub mod prelude {
    ///
    pub use crate::cookies::CookieOptions;
    ///
    pub use crate::error::ScopeError;
    ///
    pub use crate::error::Slot;
    ///
    pub use crate::json::Envelope;
    ///
    pub use crate::json::JsonResponse;
    ///
    pub use crate::request::Request;
    ///
    pub use crate::response::BodyWriter;
    ///
    pub use crate::response::Response;
    ///
    pub use cookie::Cookie;
    ///
    pub use http::header;
    ///
    pub use http::StatusCode;
}
