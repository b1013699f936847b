//! Fine (character-level) differ driver (§4.7).

use crate::diff::{calc_diff, CharSeq, Diff, DiffList, MatchLevel};
use crate::diff3::{Diff3Line, Diff3LineList};
use crate::line_data::LineData;
use crate::progress::ProgressReporter;

/// Which pair of a [`Diff3Line`] to fine-diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    AB,
    BC,
    CA,
}

/// Rolls `Diff`s whose `equals` run is shorter than 4 into the surrounding
/// change, so a fine diff doesn't render as visually noisy 1-3 character
/// "islands" inside a larger change.
fn collapse_short_islands(list: DiffList) -> DiffList {
    let mut out: DiffList = Vec::with_capacity(list.len());
    for d in list {
        if d.equals < 4 && d.equals > 0 && (d.left_only > 0 || d.right_only > 0) {
            match out.last_mut() {
                Some(prev) => {
                    prev.left_only += d.equals + d.left_only;
                    prev.right_only += d.equals + d.right_only;
                }
                None => out.push(Diff {
                    equals: 0,
                    left_only: d.equals + d.left_only,
                    right_only: d.equals + d.right_only,
                }),
            }
        } else {
            out.push(d);
        }
    }
    out
}

fn fine_diff_bytes(
    bytes_left: &[u8],
    bytes_right: &[u8],
    max_search_length: usize,
    progress: &mut dyn ProgressReporter,
) -> Option<DiffList> {
    if bytes_left == bytes_right {
        return None;
    }
    let left = CharSeq { bytes: bytes_left };
    let right = CharSeq { bytes: bytes_right };
    let raw = calc_diff(&left, &right, MatchLevel::Char, max_search_length, progress).ok()?;
    Some(collapse_short_islands(raw))
}

/// Runs the fine differ for `pair` across every row of `list` where both
/// sides are present, attaching the result to the appropriate slot.
pub fn run_fine_diff(
    list: &mut Diff3LineList,
    pair: Pair,
    lines_a: &[LineData],
    buf_a: &[u8],
    lines_b: &[LineData],
    buf_b: &[u8],
    lines_c: &[LineData],
    buf_c: &[u8],
    max_search_length: usize,
    progress: &mut dyn ProgressReporter,
) {
    for row in list.iter_mut() {
        match pair {
            Pair::AB => {
                if let (Some(ia), Some(ib)) = (row.line_a, row.line_b) {
                    let result = fine_diff_bytes(
                        lines_a[ia].bytes(buf_a),
                        lines_b[ib].bytes(buf_b),
                        max_search_length,
                        progress,
                    );
                    row.fine_ab = result;
                }
            }
            Pair::BC => {
                if let (Some(ib), Some(ic)) = (row.line_b, row.line_c) {
                    let result = fine_diff_bytes(
                        lines_b[ib].bytes(buf_b),
                        lines_c[ic].bytes(buf_c),
                        max_search_length,
                        progress,
                    );
                    row.fine_bc = result;
                }
            }
            Pair::CA => {
                if let (Some(ic), Some(ia)) = (row.line_c, row.line_a) {
                    let result = fine_diff_bytes(
                        lines_c[ic].bytes(buf_c),
                        lines_a[ia].bytes(buf_a),
                        max_search_length,
                        progress,
                    );
                    row.fine_ca = result;
                }
            }
        }
    }
}

/// Total count of equal characters reported by a pair's fine diffs, a
/// by-product used to report overall textual similarity.
pub fn total_equal_chars(list: &Diff3LineList, pair: Pair) -> usize {
    list.iter()
        .filter_map(|row| match pair {
            Pair::AB => row.fine_ab.as_ref(),
            Pair::BC => row.fine_bc.as_ref(),
            Pair::CA => row.fine_ca.as_ref(),
        })
        .flat_map(|d| d.iter())
        .map(|d| d.equals)
        .sum()
}

/// Whether a row's two sides are byte-identical for `pair` (used by the
/// merge classification in §4.5 to decide presence of a fine diff).
pub fn row_has_fine_diff(row: &Diff3Line, pair: Pair) -> bool {
    match pair {
        Pair::AB => row.fine_ab.is_some(),
        Pair::BC => row.fine_bc.is_some(),
        Pair::CA => row.fine_ca.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoOpProgress;

    #[test]
    fn identical_lines_produce_no_fine_diff() {
        assert!(fine_diff_bytes(b"same", b"same", usize::MAX, &mut NoOpProgress).is_none());
    }

    #[test]
    fn differing_lines_produce_a_fine_diff() {
        let d = fine_diff_bytes(b"hello world", b"hello there", usize::MAX, &mut NoOpProgress);
        assert!(d.is_some());
    }

    #[test]
    fn short_islands_are_collapsed() {
        let list = vec![
            Diff { equals: 0, left_only: 2, right_only: 2 },
            Diff { equals: 1, left_only: 1, right_only: 1 },
            Diff { equals: 10, left_only: 0, right_only: 0 },
        ];
        let collapsed = collapse_short_islands(list);
        assert_eq!(collapsed.len(), 2);
        assert_eq!(collapsed[0].left_only, 3);
    }
}
