use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
};

use cookie::Cookie;
use http::Request as RawRequest;
use serde_json::Value;

/// Struct that wraps a raw http request + the request scoped attributes and
/// cookies
pub struct Request {
    #[doc(hidden)]
    inner: RawRequest<Vec<u8>>,
    #[doc(hidden)]
    attributes: HashMap<String, Value>,
    #[doc(hidden)]
    cookies: Vec<Cookie<'static>>,
}

impl Request {
    #[doc(hidden)]
    pub fn new(raw: RawRequest<Vec<u8>>) -> Self {
        Request {
            inner: raw,
            attributes: Default::default(),
            cookies: Default::default(),
        }
    }

    /// The request URI path, used as the "current path" by the cookie helpers
    ///
    /// ```rust
    ///# use http_scope::prelude::*;
    ///# use http::Request as RawRequest;
    /// let req = Request::new(RawRequest::builder().uri("https://www.rust-lang.org/learn?x=1").body(Vec::new()).unwrap());
    /// assert_eq!(req.request_uri(), "/learn");
    /// ```
    #[inline]
    pub fn request_uri(&self) -> &str {
        self.inner.uri().path()
    }

    /// Get the cookies sent by the browser, in the order they were received.
    ///
    /// Before accessing cookies, you will need to parse them, it is done with the
    /// [`parse_cookies`](#method.parse_cookies) method
    #[inline]
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Get the cookies sent by the browser in a mutable way
    #[inline]
    pub fn cookies_mut(&mut self) -> &mut Vec<Cookie<'static>> {
        &mut self.cookies
    }

    /// Get a request scoped attribute
    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set a request scoped attribute, returning the previous value if any
    ///
    /// ```rust
    ///# use http_scope::prelude::*;
    ///# use http::Request as RawRequest;
    ///# let mut req = Request::new(RawRequest::builder().uri("/").body(Vec::new()).unwrap());
    /// req.set_attribute("user_id", 42);
    /// assert_eq!(req.attribute("user_id"), Some(&serde_json::json!(42)));
    /// ```
    #[inline]
    pub fn set_attribute<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) -> Option<Value> {
        self.attributes.insert(key.into(), value.into())
    }

    ///
    #[inline]
    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Parse cookies from the Cookie header(s). Cookies that fail to parse are
    /// skipped.
    pub fn parse_cookies(&mut self) {
        let jar = &mut self.cookies;
        for header in self.inner.headers().get_all(http::header::COOKIE) {
            let Ok(cookies_str) = header.to_str() else {
                debug!("Skipping a non utf-8 Cookie header");
                continue;
            };

            jar.extend(
                cookies_str
                    .split(';')
                    .map(str::trim)
                    .filter(|cookie_s| !cookie_s.is_empty())
                    .filter_map(|cookie_s| Cookie::parse(cookie_s.to_string()).ok()),
            );
        }
    }
}

impl Deref for Request {
    type Target = RawRequest<Vec<u8>>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Request {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl From<RawRequest<Vec<u8>>> for Request {
    fn from(raw: RawRequest<Vec<u8>>) -> Self {
        Request::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(cookie_header: &str) -> RawRequest<Vec<u8>> {
        RawRequest::builder()
            .uri("/account/settings")
            .header("Cookie", cookie_header)
            .body(Vec::new())
            .unwrap()
    }

    #[test]
    fn parse_cookies_keeps_header_order() {
        let mut req = Request::new(raw("b=2; a=1;c=3"));
        req.parse_cookies();

        let names: Vec<_> = req.cookies().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(req.cookies()[1].value(), "1");
    }

    #[test]
    fn parse_cookies_keeps_duplicate_names() {
        let mut req = Request::new(raw("a=1; a=2"));
        req.parse_cookies();

        assert_eq!(req.cookies().len(), 2);
        assert_eq!(req.cookies()[1].value(), "2");
    }

    #[test]
    fn attributes_overwrite_and_remove() {
        let mut req = Request::new(raw(""));
        assert!(req.set_attribute("k", "v").is_none());
        assert_eq!(req.set_attribute("k", "w"), Some(Value::from("v")));
        assert_eq!(req.remove_attribute("k"), Some(Value::from("w")));
        assert!(req.attribute("k").is_none());
    }
}
