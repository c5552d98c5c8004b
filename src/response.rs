use std::{
    fmt::{Debug, Formatter},
    io::{Error as IoError, ErrorKind, Write},
    ops::{Deref, DerefMut},
};

use cookie::Cookie;
use http::{header::CONTENT_TYPE, HeaderValue, Response as RawResponse};

use crate::error::ScopeError;

/// Destination of the bytes written through a [`BodyWriter`]
enum Sink {
    Buffer(Vec<u8>),
    Stream(Box<dyn Write + Send>),
    Released,
}

/// Text output stream of a response. Closing a streaming writer drops the
/// underlying stream. Once closed, every write, flush or close fails with
/// [`ErrorKind::BrokenPipe`].
pub struct BodyWriter {
    sink: Sink,
    closed: bool,
}

impl BodyWriter {
    /// A writer keeping the body in memory until the response is converted
    /// back with [`Response::into_raw`]
    pub fn buffered() -> Self {
        BodyWriter {
            sink: Sink::Buffer(Vec::new()),
            closed: false,
        }
    }

    /// A writer forwarding every byte to `stream`, for hosts that stream the
    /// body straight to the connection
    pub fn streaming<W: Write + Send + 'static>(stream: W) -> Self {
        BodyWriter {
            sink: Sink::Stream(Box::new(stream)),
            closed: false,
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Flush and close the stream. This must happen exactly once.
    pub fn close(&mut self) -> std::io::Result<()> {
        self.ensure_open()?;
        self.flush()?;
        self.closed = true;
        if let Sink::Stream(_) = self.sink {
            self.sink = Sink::Released;
        }
        trace!("Response body writer closed");
        Ok(())
    }

    /// The buffered bytes, empty for a streaming writer
    pub fn buffer(&self) -> &[u8] {
        match &self.sink {
            Sink::Buffer(b) => b.as_slice(),
            Sink::Stream(_) | Sink::Released => &[],
        }
    }

    fn ensure_open(&self) -> std::io::Result<()> {
        if self.closed {
            Err(IoError::new(ErrorKind::BrokenPipe, "response body writer is closed"))
        } else {
            Ok(())
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self.sink {
            Sink::Buffer(b) => b,
            Sink::Stream(_) | Sink::Released => Vec::new(),
        }
    }
}

impl Write for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.ensure_open()?;
        match &mut self.sink {
            Sink::Buffer(b) => b.write(buf),
            Sink::Stream(s) => s.write(buf),
            Sink::Released => Err(IoError::new(ErrorKind::BrokenPipe, "response body stream was released")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.ensure_open()?;
        match &mut self.sink {
            Sink::Buffer(_) => Ok(()),
            Sink::Stream(s) => s.flush(),
            Sink::Released => Err(IoError::new(ErrorKind::BrokenPipe, "response body stream was released")),
        }
    }
}

impl Default for BodyWriter {
    fn default() -> Self {
        Self::buffered()
    }
}

impl Debug for BodyWriter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self.sink {
            Sink::Buffer(_) => "buffered",
            Sink::Stream(_) | Sink::Released => "streaming",
        };
        f.debug_struct("BodyWriter").field("sink", &kind).field("closed", &self.closed).finish()
    }
}

/// Struct that wraps a raw http response + the cookies added while handling
/// the request
#[derive(Default)]
pub struct Response {
    #[doc(hidden)]
    inner: RawResponse<BodyWriter>,
    #[doc(hidden)]
    cookies: Vec<Cookie<'static>>,
}

impl Response {
    /// Create a new response with an in memory body
    pub fn new() -> Self {
        Response {
            inner: RawResponse::new(BodyWriter::buffered()),
            cookies: Default::default(),
        }
    }

    /// Create a new response with the given body writer
    pub fn with_writer(writer: BodyWriter) -> Self {
        Response {
            inner: RawResponse::new(writer),
            cookies: Default::default(),
        }
    }

    /// Append a cookie. Adding the same cookie twice yields two `Set-Cookie`
    /// headers, in order.
    #[inline]
    pub fn add_cookie(&mut self, cookie: Cookie<'static>) {
        self.cookies.push(cookie);
    }

    /// Cookies added so far, in insertion order
    #[inline]
    pub fn cookies(&self) -> &[Cookie<'static>] {
        &self.cookies
    }

    /// Replace the `Content-Type` header
    ///
    /// ```rust
    ///# use http_scope::prelude::*;
    /// let mut res = Response::new();
    /// res.set_content_type("text/plain").unwrap();
    /// assert_eq!(res.headers()["content-type"], "text/plain");
    /// ```
    pub fn set_content_type(&mut self, content_type: &str) -> Result<(), ScopeError> {
        let value = HeaderValue::from_str(content_type)?;
        self.inner.headers_mut().insert(CONTENT_TYPE, value);
        Ok(())
    }

    /// The text output stream of the response
    #[inline]
    pub fn writer(&mut self) -> &mut BodyWriter {
        self.inner.body_mut()
    }

    /// Convert into the raw response, turning every added cookie into a
    /// `Set-Cookie` header
    pub fn into_raw(self) -> Result<RawResponse<Vec<u8>>, ScopeError> {
        let Response { mut inner, cookies } = self;
        for c in cookies.iter() {
            inner
                .headers_mut()
                .append(http::header::SET_COOKIE, HeaderValue::from_str(c.to_string().as_str())?);
        }

        Ok(inner.map(BodyWriter::into_bytes))
    }
}

impl Deref for Response {
    type Target = RawResponse<BodyWriter>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Response {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    };

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    struct DropFlag(Arc<AtomicBool>);

    impl Write for DropFlag {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_after_close_fails() {
        let mut w = BodyWriter::buffered();
        w.write_all(b"hello").unwrap();
        w.close().unwrap();

        let err = w.write_all(b"again").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert!(w.close().is_err());
        assert_eq!(w.buffer(), b"hello");
    }

    #[test]
    fn streaming_writer_forwards_bytes() {
        let sink = SharedSink::default();
        let mut res = Response::with_writer(BodyWriter::streaming(sink.clone()));
        res.writer().write_all(b"{}").unwrap();
        res.writer().close().unwrap();

        assert_eq!(sink.0.lock().unwrap().as_slice(), b"{}");
        assert!(res.into_raw().unwrap().body().is_empty());
    }

    #[test]
    fn close_releases_the_stream() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut res = Response::with_writer(BodyWriter::streaming(DropFlag(dropped.clone())));
        res.writer().write_all(b"{}").unwrap();
        assert!(!dropped.load(Ordering::SeqCst));

        res.writer().close().unwrap();
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(res.writer().write(b"x").unwrap_err().kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn into_raw_emits_one_set_cookie_per_cookie() {
        let mut res = Response::new();
        res.add_cookie(Cookie::new("a", "1"));
        res.add_cookie(Cookie::new("a", "2"));
        res.writer().write_all(b"body").unwrap();

        let raw = res.into_raw().unwrap();
        let set: Vec<_> = raw.headers().get_all(http::header::SET_COOKIE).iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(set, vec!["a=1", "a=2"]);
        assert_eq!(raw.body().as_slice(), b"body");
    }
}
