use http::{header::InvalidHeaderValue, Error as HttpCrateError, StatusCode};
use std::{
    fmt::{Display, Formatter},
    io::Error as IoError,
};
use thiserror::Error;

/// Which half of the request context an accessor was looking for
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Slot {
    Request,
    Response,
}

impl Display for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Request => f.write_str("request"),
            Slot::Response => f.write_str("response"),
        }
    }
}

/// Error type throughout the http-scope stack
#[derive(Debug, Error)]
pub enum ScopeError {
    /// An accessor was called on an execution unit where no request scope was
    /// entered
    #[error(
        "can't get the current {0} object, make sure the request scope hook (`dispatch`, `enter` or `scope`) is installed by \
         your web app before using the accessors"
    )]
    ContextNotInitialized(Slot),
    /// A helper needed a handle the calling code still holds locked
    #[error("the current {0} is already locked by the caller, release it before using the accessors")]
    HandleBusy(Slot),
    /// Error from serializing json data
    #[error("unable to serialize json data: {0}")]
    SerdeJson(#[from] serde_json::Error),
    /// Writing to, flushing or closing the response body failed
    #[error("unable to write the response body: {0}")]
    Io(#[from] IoError),
    ///
    #[error(transparent)]
    Http(#[from] HttpCrateError),
    ///
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),
}

impl ScopeError {
    /// Map the error onto the status a host should answer with
    pub fn status(&self) -> StatusCode {
        match self {
            ScopeError::ContextNotInitialized(slot) => {
                warn!("An accessor was used outside of a request scope, missing {} handle", slot);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScopeError::HandleBusy(slot) => {
                warn!("An accessor was used while the {} handle was locked by its caller", slot);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScopeError::SerdeJson(e) => {
                warn!("Unable to serialize json body: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScopeError::Io(e) => {
                debug!("Response body could not be written, the response is lost: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScopeError::Http(e) => {
                warn!("http-scope encountered an internal http error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScopeError::InvalidHeader(e) => {
                warn!("Unable to build a response header: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_context_names_the_hook() {
        let msg = ScopeError::ContextNotInitialized(Slot::Response).to_string();
        assert!(msg.contains("current response object"));
        assert!(msg.contains("request scope hook"));
    }

    #[test]
    fn io_errors_map_to_server_error() {
        let e = ScopeError::from(IoError::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_header_maps_to_server_error() {
        let e = ScopeError::from(http::HeaderValue::from_str("bad\nvalue").unwrap_err());
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
