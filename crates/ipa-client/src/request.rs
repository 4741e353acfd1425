//! Outbound request encoding.
//!
//! A request body is a flat record of quoted string values:
//!
//! ```text
//! {"JOB_ID":"1","CMD":"0","OPTIONS":"int:path_num:100;string:path_type:setup"}
//! ```
//!
//! Values are not escaped. Option values must not contain `;`, `:` or `"`;
//! the companion splits on those characters verbatim.

use std::fmt;

use bytes::Bytes;

use crate::params::{HighlightParams, PathListParams};
use crate::protocol::{
    Command, KEY_CMD, KEY_JOB_ID, KEY_OPTIONS, OPTION_DETAILS_LEVEL, OPTION_DRAW_PATH_CONTOUR,
    OPTION_HIGHLIGHT_MODE, OPTION_IS_FLAT_ROUTING, OPTION_PATH_ELEMENTS, OPTION_PATH_NUM,
    OPTION_PATH_TYPE,
};

/// Type tag of a request option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Int,
    String,
    Bool,
}

impl OptionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKind::Int => "int",
            OptionKind::String => "string",
            OptionKind::Bool => "bool",
        }
    }
}

/// One `kind:name:value` entry of the option string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOption {
    pub kind: OptionKind,
    pub name: &'static str,
    pub value: String,
}

impl RequestOption {
    pub fn int(name: &'static str, value: i64) -> Self {
        Self {
            kind: OptionKind::Int,
            name,
            value: value.to_string(),
        }
    }

    pub fn string(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind: OptionKind::String,
            name,
            value: value.into(),
        }
    }

    /// Booleans travel as `1` / `0`.
    pub fn bool(name: &'static str, value: bool) -> Self {
        Self {
            kind: OptionKind::Bool,
            name,
            value: if value { "1" } else { "0" }.to_string(),
        }
    }
}

impl fmt::Display for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.as_str(), self.name, self.value)
    }
}

/// Join options as `kind:name:value;kind:name:value...`.
pub fn build_options_string(options: &[RequestOption]) -> String {
    options
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

/// A fully encoded request body ready for framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub job_id: u32,
    pub command: Command,
    pub body: Bytes,
    /// Always uncompressed; only responses are compressed.
    pub compressor_id: u8,
}

/// Builds request bodies and hands out job ids.
///
/// Job ids start at 1, increase monotonically and are never reused for the
/// lifetime of the builder, reconnects included.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    last_job_id: u32,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next job id.
    pub fn next_job_id(&mut self) -> u32 {
        self.last_job_id += 1;
        self.last_job_id
    }

    /// Encode a request record for `command` with a fresh job id.
    pub fn build_telegram(&mut self, command: Command, options: &str) -> OutboundRequest {
        let job_id = self.next_job_id();
        let body = format!(
            "{{\"{KEY_JOB_ID}\":\"{job_id}\",\"{KEY_CMD}\":\"{}\",\"{KEY_OPTIONS}\":\"{options}\"}}",
            command.id()
        );
        OutboundRequest {
            job_id,
            command,
            body: Bytes::from(body),
            compressor_id: ipa_telegram::NONE_COMPRESSOR_ID,
        }
    }

    /// Request the critical path report.
    pub fn path_list_request(&mut self, params: &PathListParams) -> OutboundRequest {
        let options = build_options_string(&[
            RequestOption::int(OPTION_PATH_NUM, i64::from(params.effective_path_num())),
            RequestOption::string(OPTION_PATH_TYPE, params.path_type.as_str()),
            RequestOption::string(OPTION_DETAILS_LEVEL, params.details_level.as_str()),
            RequestOption::bool(OPTION_IS_FLAT_ROUTING, params.is_flat_routing),
        ]);
        self.build_telegram(Command::GetPathList, &options)
    }

    /// Request highlighting of `path_items` in the companion's view.
    pub fn draw_path_request(
        &mut self,
        path_items: &str,
        params: &HighlightParams,
    ) -> OutboundRequest {
        let options = build_options_string(&[
            RequestOption::string(OPTION_PATH_ELEMENTS, path_items),
            RequestOption::string(OPTION_HIGHLIGHT_MODE, params.mode.as_str()),
            RequestOption::bool(OPTION_DRAW_PATH_CONTOUR, params.draw_path_contour),
        ]);
        self.build_telegram(Command::DrawPath, &options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseFields;

    #[test]
    fn job_ids_start_at_one_and_increase() {
        let mut builder = RequestBuilder::new();
        assert_eq!(builder.next_job_id(), 1);
        assert_eq!(builder.next_job_id(), 2);
        let request = builder.build_telegram(Command::GetPathList, "");
        assert_eq!(request.job_id, 3);
    }

    #[test]
    fn options_string_format() {
        let options = build_options_string(&[
            RequestOption::int("path_num", 100),
            RequestOption::string("path_type", "setup"),
            RequestOption::bool("is_flat_routing", true),
        ]);
        assert_eq!(
            options,
            "int:path_num:100;string:path_type:setup;bool:is_flat_routing:1"
        );
        assert_eq!(build_options_string(&[]), "");
    }

    #[test]
    fn telegram_body_layout() {
        let mut builder = RequestBuilder::new();
        let request = builder.build_telegram(Command::DrawPath, "string:path_elements:none");

        assert_eq!(
            request.body.as_ref(),
            br#"{"JOB_ID":"1","CMD":"1","OPTIONS":"string:path_elements:none"}"#
        );
        assert_eq!(request.compressor_id, 0);
        assert_eq!(request.command, Command::DrawPath);
    }

    #[test]
    fn path_list_request_options() {
        let mut builder = RequestBuilder::new();
        let params = PathListParams {
            path_num: 20_000,
            path_type: "hold".into(),
            details_level: "aggregated".into(),
            is_flat_routing: true,
        };
        let request = builder.path_list_request(&params);
        let text = std::str::from_utf8(&request.body).unwrap();

        assert!(text.contains(
            "\"OPTIONS\":\"int:path_num:10000;string:path_type:hold;string:details_level:aggregated;bool:is_flat_routing:1\""
        ));
    }

    #[test]
    fn draw_path_request_options() {
        let mut builder = RequestBuilder::new();
        let request = builder.draw_path_request("1#0,1,2", &HighlightParams::default());
        let fields = ResponseFields::parse(std::str::from_utf8(&request.body).unwrap());

        assert_eq!(fields.job_id, Some(1));
        assert_eq!(fields.cmd, Some(Command::DrawPath.id()));
        assert_eq!(
            fields.options.as_deref(),
            Some("string:path_elements:1#0,1,2;string:hight_light_mode:crit path flylines;bool:draw_path_contour:0")
        );
    }
}
