use serde::{Deserialize, Serialize};

use crate::protocol::{PATH_NUM_THRESHOLD, PATH_TYPE_SETUP};

/// Parameters of a get-path-list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathListParams {
    /// Number of critical paths to report.
    pub path_num: u32,
    /// `setup` or `hold`.
    pub path_type: String,
    /// Report detail level, e.g. `netlist`.
    pub details_level: String,
    pub is_flat_routing: bool,
}

impl PathListParams {
    /// Requested path count, clamped to what the companion can produce.
    pub fn effective_path_num(&self) -> u32 {
        self.path_num.min(PATH_NUM_THRESHOLD)
    }
}

impl Default for PathListParams {
    fn default() -> Self {
        Self {
            path_num: 100,
            path_type: PATH_TYPE_SETUP.to_string(),
            details_level: "netlist".to_string(),
            is_flat_routing: false,
        }
    }
}

/// Parameters of a draw-path (highlight) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightParams {
    pub mode: String,
    pub draw_path_contour: bool,
}

impl Default for HighlightParams {
    fn default() -> Self {
        Self {
            mode: "crit path flylines".to_string(),
            draw_path_contour: false,
        }
    }
}
