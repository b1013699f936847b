//! Word-wrap row-layout mapping (§3's `linesNeededForDisplay`/
//! `sumLinesNeededForDisplay`, part of the "support" budget in §2).
//!
//! A presenter that soft-wraps long lines needs to know, for a given
//! logical `Diff3Line` row, how many screen rows it occupies and which
//! screen row it starts at. This module computes and stores that
//! mapping; it does not itself break lines into wrapped segments or
//! render anything — that remains the excluded GUI layer's job (§1).

use crate::diff3::Diff3LineList;
use crate::line_data::LineData;

fn row_width(
    row_line: Option<usize>,
    lines: &[LineData],
    buf: &[u8],
    tab_size: u32,
) -> u32 {
    row_line.map_or(0, |i| lines[i].width(buf, tab_size))
}

/// Fills in `lines_needed_for_display`/`sum_lines_needed_for_display` for
/// every row. `wrap_column`, when `Some`, is the screen-column width at
/// which a line wraps; `None` means wrapping is disabled and every row
/// occupies exactly one screen row.
pub fn compute_display_layout(
    list: &mut Diff3LineList,
    lines_a: &[LineData],
    buf_a: &[u8],
    lines_b: &[LineData],
    buf_b: &[u8],
    lines_c: &[LineData],
    buf_c: &[u8],
    tab_size: u32,
    wrap_column: Option<u32>,
) {
    let mut running_sum = 0u32;
    for row in list.iter_mut() {
        let needed = match wrap_column {
            Some(col) if col > 0 => {
                let widest = row_width(row.line_a, lines_a, buf_a, tab_size)
                    .max(row_width(row.line_b, lines_b, buf_b, tab_size))
                    .max(row_width(row.line_c, lines_c, buf_c, tab_size));
                widest.div_ceil(col).max(1)
            }
            _ => 1,
        };
        row.lines_needed_for_display = needed;
        row.sum_lines_needed_for_display = running_sum;
        running_sum += needed;
    }
}
