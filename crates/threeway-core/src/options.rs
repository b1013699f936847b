//! Per-session comparison/merge parameters.
//!
//! The original source kept these as process-wide globals (`g_tabSize`,
//! `g_bIgnoreWhiteSpace`, `g_bIgnoreTrivialMatches`, `g_bAutoSolve`). Here
//! they're a single explicit value threaded through every call that needs
//! it; nothing in this crate reaches for ambient/global state.

use serde::{Deserialize, Serialize};

/// Which input a merged line or range came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    A,
    B,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub tab_size: u32,
    pub ignore_white_space: bool,
    pub ignore_trivial_matches: bool,
    /// Comparison-view filter (§4.1): fold ASCII letters to upper case
    /// before comparing. The display view is unaffected.
    pub upper_case: bool,
    /// Comparison-view filter (§4.1): skip ASCII digits when comparing.
    /// The display view is unaffected.
    pub ignore_numbers: bool,
    /// Lines whose normalized-content occurrence count reaches this
    /// threshold are no longer treated as strict anchors (§9 open question:
    /// hard-coded `5` in the original, kept as the default here).
    pub trivial_match_threshold: u32,
    pub auto_solve: bool,
    pub whitespace_2_file_merge_default: Option<Source>,
    pub whitespace_3_file_merge_default: Option<Source>,
    pub preserve_carriage_returns: bool,
    pub line_ending: LineEnding,
    pub write_backup: bool,
    /// Screen-column width at which the (excluded) presenter soft-wraps a
    /// line; `None` disables the word-wrap row-layout computation in
    /// [`crate::wrap`], so every `Diff3Line` occupies exactly one screen
    /// row.
    pub wrap_column: Option<u32>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tab_size: 8,
            ignore_white_space: false,
            ignore_trivial_matches: false,
            upper_case: false,
            ignore_numbers: false,
            trivial_match_threshold: 5,
            auto_solve: true,
            whitespace_2_file_merge_default: None,
            whitespace_3_file_merge_default: None,
            preserve_carriage_returns: false,
            line_ending: LineEnding::Lf,
            write_backup: false,
            wrap_column: None,
        }
    }
}
