//! Wire-fixed keys, command ids and option names.
//!
//! These strings are part of the protocol spoken by the companion process;
//! some spellings look wrong but must not be changed.

/// Record key: job id of the request being answered.
pub const KEY_JOB_ID: &str = "JOB_ID";
/// Record key: command id.
pub const KEY_CMD: &str = "CMD";
/// Record key: request option string.
pub const KEY_OPTIONS: &str = "OPTIONS";
/// Record key: response payload.
pub const KEY_DATA: &str = "DATA";
/// Record key: response status (non-zero is success).
pub const KEY_STATUS: &str = "STATUS";

pub const OPTION_PATH_NUM: &str = "path_num";
pub const OPTION_PATH_TYPE: &str = "path_type";
pub const OPTION_DETAILS_LEVEL: &str = "details_level";
pub const OPTION_IS_FLAT_ROUTING: &str = "is_flat_routing";
pub const OPTION_PATH_ELEMENTS: &str = "path_elements";
pub const OPTION_HIGHLIGHT_MODE: &str = "hight_light_mode";
pub const OPTION_DRAW_PATH_CONTOUR: &str = "draw_path_contour";

/// Path list of setup-time critical paths.
pub const PATH_TYPE_SETUP: &str = "setup";
/// Path list of hold-time critical paths.
pub const PATH_TYPE_HOLD: &str = "hold";

/// Path item selection meaning "nothing selected".
pub const SELECTION_NONE: &str = "none";

/// Upper bound on requested paths; larger values only exhaust companion memory.
pub const PATH_NUM_THRESHOLD: u32 = 10_000;

/// Commands understood by the companion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Produce the critical path report.
    GetPathList,
    /// Highlight the given path elements in the companion's view.
    DrawPath,
}

impl Command {
    /// Numeric id carried in the `CMD` field.
    pub fn id(self) -> i32 {
        match self {
            Command::GetPathList => 0,
            Command::DrawPath => 1,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Command::GetPathList),
            1 => Some(Command::DrawPath),
            _ => None,
        }
    }

    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Command::GetPathList => "get_path_list",
            Command::DrawPath => "draw_path",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_are_wire_fixed() {
        assert_eq!(Command::GetPathList.id(), 0);
        assert_eq!(Command::DrawPath.id(), 1);
        assert_eq!(Command::from_id(1), Some(Command::DrawPath));
        assert_eq!(Command::from_id(7), None);
    }
}
