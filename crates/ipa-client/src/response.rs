//! Loose field extraction from decoded response bodies.
//!
//! The companion emits a flat `{"KEY":"value",...}` record without escaping.
//! Fields are located by key independently of each other and of their order;
//! a missing or malformed field only makes that one field absent.

use crate::error::{ClientError, Result};
use crate::protocol::{KEY_CMD, KEY_DATA, KEY_JOB_ID, KEY_OPTIONS, KEY_STATUS};

/// Find the quoted value following `"key":` in `text`.
///
/// The value ends at the next `"`; embedded quotes are not supported.
pub fn extract_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("\"{key}\":");
    let key_pos = text.find(&pattern)?;
    let after_key = key_pos + pattern.len();

    let open = after_key + text[after_key..].find('"')?;
    let value_start = open + 1;
    let close = value_start + text[value_start..].find('"')?;
    Some(&text[value_start..close])
}

/// Parse an integer the way the companion writes them: leading whitespace is
/// accepted, anything trailing the digits is not.
fn parse_int<T: std::str::FromStr>(value: &str) -> Option<T> {
    value.trim_start().parse().ok()
}

/// Every field that could be extracted from a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFields {
    pub job_id: Option<u32>,
    pub cmd: Option<i32>,
    pub status: Option<i32>,
    pub data: Option<String>,
    pub options: Option<String>,
}

impl ResponseFields {
    pub fn parse(text: &str) -> Self {
        Self {
            job_id: extract_value(text, KEY_JOB_ID).and_then(parse_int),
            cmd: extract_value(text, KEY_CMD).and_then(parse_int),
            status: extract_value(text, KEY_STATUS).and_then(parse_int),
            data: extract_value(text, KEY_DATA).map(str::to_owned),
            options: extract_value(text, KEY_OPTIONS).map(str::to_owned),
        }
    }

    /// Promote to a [`Response`], requiring `JOB_ID`, `CMD` and `STATUS`.
    ///
    /// A missing `DATA` becomes the empty string.
    pub fn into_response(self) -> Result<Response> {
        let job_id = self
            .job_id
            .ok_or(ClientError::MalformedResponse(KEY_JOB_ID))?;
        let cmd = self.cmd.ok_or(ClientError::MalformedResponse(KEY_CMD))?;
        let status = self
            .status
            .ok_or(ClientError::MalformedResponse(KEY_STATUS))?;
        Ok(Response {
            job_id,
            cmd,
            status: status != 0,
            data: self.data.unwrap_or_default(),
        })
    }
}

/// A consistent response telegram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub job_id: u32,
    pub cmd: i32,
    pub status: bool,
    pub data: String,
}

impl Response {
    pub fn parse(text: &str) -> Result<Self> {
        ResponseFields::parse(text).into_response()
    }
}
