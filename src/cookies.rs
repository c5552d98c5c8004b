//! Cookie helpers layered over the current request's cookie list.
//!
//! Lookups are linear scans in list order. The update and delete helpers
//! match existing cookies against the path of the current request URI, while
//! [`get_cookie`] matches against the path it is given.

use cookie::Cookie;
use http::HeaderValue;
use time::Duration;

use crate::{
    context::{lock_request, lock_response, request, response},
    error::ScopeError,
};

/// Max-age meaning "no explicit expiry", the browser drops the cookie with the
/// session
pub const SESSION_MAX_AGE: i64 = -1;

/// Options of a cookie written by [`add_cookie_with`]
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CookieOptions {
    path: Option<String>,
    max_age: i64,
    http_only: bool,
}

impl CookieOptions {
    /// No path, [`SESSION_MAX_AGE`], not http-only
    #[inline]
    pub fn new() -> Self {
        CookieOptions {
            path: None,
            max_age: SESSION_MAX_AGE,
            http_only: false,
        }
    }

    #[inline]
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Max-age in seconds. Any negative value is a session cookie, `0` expires
    /// it right away.
    #[inline]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    #[inline]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    fn apply(&self, cookie: &mut Cookie<'static>) {
        if let Some(path) = &self.path {
            cookie.set_path(path.clone());
        }
        cookie.set_http_only(self.http_only);
        set_max_age(cookie, self.max_age);
    }
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Set the cookie max-age in seconds, negative values removing the attribute
pub fn set_max_age(cookie: &mut Cookie<'_>, seconds: i64) {
    if seconds < 0 {
        cookie.set_max_age(None::<Duration>);
    } else {
        cookie.set_max_age(Duration::seconds(seconds));
    }
}

/// The cookie max-age in seconds, [`SESSION_MAX_AGE`] when it has none
///
/// ```rust
///# use http_scope::cookies::{max_age_seconds, set_max_age, SESSION_MAX_AGE};
///# use http_scope::prelude::*;
/// let mut c = Cookie::new("a", "1");
/// assert_eq!(max_age_seconds(&c), SESSION_MAX_AGE);
/// set_max_age(&mut c, 0);
/// assert_eq!(max_age_seconds(&c), 0);
/// ```
pub fn max_age_seconds(cookie: &Cookie<'_>) -> i64 {
    cookie.max_age().map(|d| d.whole_seconds()).unwrap_or(SESSION_MAX_AGE)
}

fn is_root_path(path: Option<&str>) -> bool {
    matches!(path, None | Some("") | Some("/"))
}

/// Find a cookie value in `cookies`, see [`get_cookie`]
pub fn find_cookie<'a>(cookies: &'a [Cookie<'static>], name: &str, path: Option<&str>) -> Option<&'a str> {
    if is_root_path(path) {
        cookies
            .iter()
            .find(|c| c.name() == name && is_root_path(c.path()))
            .map(|c| c.value())
    } else {
        cookies
            .iter()
            .find(|c| c.name() == name && c.path() == path && !c.value().is_empty())
            .map(|c| c.value())
    }
}

/// Value of the first request cookie named `name` at `path`.
///
/// With no path (or `/`), cookies without a path or at the root match, whatever
/// their value. With any other path the cookie path must be equal and an empty
/// value counts as absent.
pub fn get_cookie(name: &str, path: Option<&str>) -> Result<Option<String>, ScopeError> {
    let req = request()?;
    let req = lock_request(&req)?;
    let value = find_cookie(req.cookies(), name, path).map(str::to_string);
    Ok(value)
}

/// `add_cookie_with(name, value, CookieOptions::new())`
pub fn add_cookie(name: &str, value: &str) -> Result<(), ScopeError> {
    add_cookie_with(name, value, CookieOptions::new())
}

/// `add_cookie_with(name, value, CookieOptions::new().path(path))`
pub fn add_cookie_at(name: &str, value: &str, path: &str) -> Result<(), ScopeError> {
    add_cookie_with(name, value, CookieOptions::new().path(path))
}

/// Upsert a cookie on the response.
///
/// If the request carries a cookie named `name` whose path is the current
/// request URI path, that cookie is updated in place and sent back. Otherwise a
/// new cookie is added to the response. A cookie that can't be sent as a
/// `Set-Cookie` header is rejected before anything is modified.
pub fn add_cookie_with(name: &str, value: &str, options: CookieOptions) -> Result<(), ScopeError> {
    let req = request()?;
    let res = response()?;

    let mut candidate = Cookie::new(name.to_string(), value.to_string());
    options.apply(&mut candidate);
    HeaderValue::from_str(&candidate.to_string())?;

    let updated = {
        let mut req = lock_request(&req)?;
        let uri = req.request_uri().to_string();
        let existing = req.cookies_mut().iter_mut().find(|c| c.name() == name && c.path() == Some(uri.as_str()));
        existing.map(|existing| {
            existing.set_value(value.to_string());
            options.apply(existing);
            existing.clone()
        })
    };

    let cookie = match updated {
        Some(cookie) => {
            trace!("Updating cookie {} at {:?}", name, cookie.path());
            cookie
        }
        None => {
            trace!("Adding cookie {} at {:?}", name, candidate.path());
            candidate
        }
    };

    lock_response(&res)?.add_cookie(cookie);
    Ok(())
}

/// Expire every request cookie named `name` whose path is the current request
/// URI path by sending it back with a max-age of 0. Cookies at other paths are
/// left alone.
pub fn delete_cookie(name: &str) -> Result<(), ScopeError> {
    let req = request()?;
    let res = response()?;

    let expired = {
        let mut req = lock_request(&req)?;
        let uri = req.request_uri().to_string();
        let expired: Vec<Cookie<'static>> = req
            .cookies_mut()
            .iter_mut()
            .filter(|c| c.name() == name && c.path() == Some(uri.as_str()))
            .map(|c| {
                set_max_age(c, 0);
                c.clone()
            })
            .collect();
        expired
    };

    if expired.is_empty() {
        debug!("No cookie named {} to delete", name);
    }

    let mut res = lock_response(&res)?;
    expired.into_iter().for_each(|c| res.add_cookie(c));
    Ok(())
}
