//! Json response envelope, written straight to the current response.
//!
//! Every helper sets the content type, writes the whole body, then flushes and
//! closes the body writer: it must be the last write on the response.

use std::{borrow::Cow, io::Write};

use serde::Serialize;
use serde_json::Value;

use crate::{
    context::{lock_response, response},
    error::ScopeError,
    response::Response,
};

/// Content type of the envelope. Browsers render it instead of offering a
/// download, and existing clients parse the body themselves.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// The uniform api response shape: `{code, message?, result?, data?}`.
/// Absent fields are not serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<'a, T: Serialize = Value> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a T>,
}

impl<'a> Envelope<'a> {
    /// `{"code":code,"result":result}`
    ///
    /// ```rust
    ///# use http_scope::json::Envelope;
    /// let body = serde_json::to_string(&Envelope::result(200, "ok")).unwrap();
    /// assert_eq!(body, r#"{"code":200,"result":"ok"}"#);
    /// ```
    pub fn result(code: i32, result: &'a str) -> Self {
        Envelope {
            code,
            message: None,
            result: Some(result),
            data: None,
        }
    }
}

impl<'a, T: Serialize> Envelope<'a, T> {
    /// `{"code":code,"data":data}`
    pub fn data(code: i32, data: &'a T) -> Self {
        Envelope {
            code,
            message: None,
            result: None,
            data: Some(data),
        }
    }

    /// `{"code":code,"message":message,"data":data}`
    pub fn message(code: i32, message: &'a str, data: &'a T) -> Self {
        Envelope {
            code,
            message: Some(message),
            result: None,
            data: Some(data),
        }
    }
}

/// Writes json bodies on the current response
#[derive(Debug, Clone)]
pub struct JsonResponse {
    content_type: Cow<'static, str>,
}

impl JsonResponse {
    /// A writer using [`DEFAULT_CONTENT_TYPE`]
    #[inline]
    pub fn new() -> Self {
        JsonResponse {
            content_type: Cow::Borrowed(DEFAULT_CONTENT_TYPE),
        }
    }

    /// Override the content type, e.g. `application/json`
    #[inline]
    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = Cow::Owned(content_type.to_string());
        self
    }

    /// Serialize `value` and write it as the whole body
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), ScopeError> {
        let body = serde_json::to_string(value)?;
        self.raw(&body)
    }

    /// Write an already serialized body as is
    pub fn raw(&self, body: &str) -> Result<(), ScopeError> {
        let res = response()?;
        let mut res = lock_response(&res)?;
        write_body(&mut res, &self.content_type, body)
    }
}

impl Default for JsonResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Set the content type, write `body`, flush and close the writer of `res`
pub fn write_body(res: &mut Response, content_type: &str, body: &str) -> Result<(), ScopeError> {
    res.set_content_type(content_type)?;
    let writer = res.writer();
    writer.write_all(body.as_bytes())?;
    writer.flush()?;
    writer.close()?;
    debug!("Wrote a {} bytes json body", body.len());
    Ok(())
}

/// Respond with `{"code":code,"result":result}`
pub fn respond_result(code: i32, result: &str) -> Result<(), ScopeError> {
    respond_json(&Envelope::result(code, result))
}

/// Respond with `{"code":code,"data":data}`
pub fn respond_data<T: Serialize>(code: i32, data: &T) -> Result<(), ScopeError> {
    respond_json(&Envelope::data(code, data))
}

/// Respond with `{"code":code,"message":message,"data":data}`
pub fn respond_message<T: Serialize>(code: i32, message: &str, data: &T) -> Result<(), ScopeError> {
    respond_json(&Envelope::message(code, message, data))
}

/// Respond with the serialized `value`
pub fn respond_json<T: Serialize + ?Sized>(value: &T) -> Result<(), ScopeError> {
    JsonResponse::new().json(value)
}

/// Respond with `body`, which is expected to already be json
pub fn respond_raw(body: &str) -> Result<(), ScopeError> {
    JsonResponse::new().raw(body)
}
