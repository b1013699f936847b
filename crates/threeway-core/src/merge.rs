//! Merge model builder (§4.5): classification, grouping into `MergeLine`
//! ranges, whitespace-conflict relaxation, and initial edit-line population.

use crate::diff3::{Diff3Line, Diff3LineList};
use crate::options::{Options, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDetails {
    Default,
    NoChange,
    BChanged,
    CChanged,
    BCChanged,
    BCChangedAndEqual,
    BDeleted,
    CDeleted,
    BCDeleted,
    BChangedCDeleted,
    CChangedBDeleted,
    BAdded,
    CAdded,
    BCAdded,
    BCAddedAndEqual,
}

impl MergeDetails {
    /// Short label for the CLI's diff/merge report.
    pub fn label(&self) -> &'static str {
        match self {
            MergeDetails::Default => "default",
            MergeDetails::NoChange => "no-change",
            MergeDetails::BChanged => "b-changed",
            MergeDetails::CChanged => "c-changed",
            MergeDetails::BCChanged => "bc-changed",
            MergeDetails::BCChangedAndEqual => "bc-changed-and-equal",
            MergeDetails::BDeleted => "b-deleted",
            MergeDetails::CDeleted => "c-deleted",
            MergeDetails::BCDeleted => "bc-deleted",
            MergeDetails::BChangedCDeleted => "b-changed-c-deleted",
            MergeDetails::CChangedBDeleted => "c-changed-b-deleted",
            MergeDetails::BAdded => "b-added",
            MergeDetails::CAdded => "c-added",
            MergeDetails::BCAdded => "bc-added",
            MergeDetails::BCAddedAndEqual => "bc-added-and-equal",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RowClass {
    details: MergeDetails,
    src_select: Option<Source>,
    conflict: bool,
}

/// One line in the editable merge output (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeEditLine {
    /// Content read from `src`'s line on Diff3Line row `row`.
    Sourced { src: Source, row: usize, removed: bool },
    /// User-typed content, owned independently of any source buffer.
    UserText(String),
    /// Placeholder for an unresolved conflict.
    Conflict,
    /// Known to have no content.
    Removed,
}

impl MergeEditLine {
    /// Not `Conflict` and not `Removed`.
    pub fn is_editable_text(&self) -> bool {
        !matches!(self, MergeEditLine::Conflict | MergeEditLine::Removed)
    }

    /// `UserText`, or a `Sourced`/none line known to carry no content.
    pub fn is_modified(&self) -> bool {
        matches!(self, MergeEditLine::UserText(_))
            || matches!(self, MergeEditLine::Sourced { removed: true, .. })
    }
}

/// A maximal run of consecutive Diff3Lines with the same "kind" (§4.5).
#[derive(Debug, Clone)]
pub struct MergeLine {
    pub first_row: usize,
    pub len: usize,
    pub details: MergeDetails,
    pub src_select: Option<Source>,
    pub conflict: bool,
    pub delta: bool,
    pub white_space_conflict: bool,
    pub edit_lines: Vec<MergeEditLine>,
}

fn is_removed_on_row(row: &Diff3Line, src: Source) -> bool {
    match src {
        Source::A => row.line_a.is_none(),
        Source::B => row.line_b.is_none(),
        Source::C => row.line_c.is_none(),
    }
}

/// `mergeOneLine`: classify a single Diff3Line row.
fn merge_one_line(row: &Diff3Line, has_c: bool) -> RowClass {
    if !has_c {
        return match (row.line_a, row.line_b) {
            (Some(_), Some(_)) => {
                if row.fine_ab.is_none() {
                    RowClass { details: MergeDetails::NoChange, src_select: Some(Source::A), conflict: false }
                } else {
                    RowClass { details: MergeDetails::BChanged, src_select: None, conflict: true }
                }
            }
            _ => RowClass { details: MergeDetails::BDeleted, src_select: None, conflict: true },
        };
    }

    let a = row.line_a.is_some();
    let b = row.line_b.is_some();
    let c = row.line_c.is_some();

    match (a, b, c) {
        (true, true, true) => {
            let ab_diff = row.fine_ab.is_some();
            let bc_diff = row.fine_bc.is_some();
            let ca_diff = row.fine_ca.is_some();
            match (ab_diff, bc_diff, ca_diff) {
                (false, false, false) => {
                    RowClass { details: MergeDetails::NoChange, src_select: Some(Source::A), conflict: false }
                }
                (false, true, true) => {
                    RowClass { details: MergeDetails::CChanged, src_select: Some(Source::C), conflict: false }
                }
                (true, true, false) => {
                    RowClass { details: MergeDetails::BChanged, src_select: Some(Source::B), conflict: false }
                }
                (true, false, true) => {
                    RowClass { details: MergeDetails::BCChangedAndEqual, src_select: Some(Source::C), conflict: false }
                }
                _ => RowClass { details: MergeDetails::BCChanged, src_select: None, conflict: true },
            }
        }
        (true, true, false) => {
            if row.fine_ab.is_some() {
                RowClass { details: MergeDetails::BChangedCDeleted, src_select: None, conflict: true }
            } else {
                RowClass { details: MergeDetails::CDeleted, src_select: Some(Source::C), conflict: false }
            }
        }
        (true, false, true) => {
            if row.fine_ca.is_some() {
                RowClass { details: MergeDetails::CChangedBDeleted, src_select: None, conflict: true }
            } else {
                RowClass { details: MergeDetails::BDeleted, src_select: Some(Source::B), conflict: false }
            }
        }
        (false, true, true) => {
            if row.fine_bc.is_some() {
                RowClass { details: MergeDetails::BCAdded, src_select: None, conflict: true }
            } else {
                RowClass { details: MergeDetails::BCAddedAndEqual, src_select: Some(Source::C), conflict: false }
            }
        }
        (false, false, true) => RowClass { details: MergeDetails::CAdded, src_select: Some(Source::C), conflict: false },
        (false, true, false) => RowClass { details: MergeDetails::BAdded, src_select: Some(Source::B), conflict: false },
        (true, false, false) => RowClass { details: MergeDetails::BCDeleted, src_select: Some(Source::C), conflict: false },
        (false, false, false) => unreachable!("empty Diff3Line rows are removed before classification"),
    }
}

/// `sameKindCheck`: whether two consecutive rows belong in the same
/// MergeLine.
fn same_kind(prev_row: &Diff3Line, prev: &RowClass, cur_row: &Diff3Line, cur: &RowClass) -> bool {
    let prev_delta = prev.details != MergeDetails::NoChange;
    let cur_delta = cur.details != MergeDetails::NoChange;
    if prev.conflict && cur.conflict {
        return prev_row.a_eq_b == cur_row.a_eq_b && prev_row.a_eq_c == cur_row.a_eq_c;
    }
    if !prev.conflict && !cur.conflict && prev_delta && cur_delta {
        return prev.src_select == cur.src_select;
    }
    !prev_delta && !cur_delta
}

fn populate_edit_lines(ml: &mut MergeLine, list: &Diff3LineList) {
    if ml.conflict {
        ml.edit_lines = vec![MergeEditLine::Conflict];
        return;
    }
    let src = ml.src_select.expect("non-conflict merge line always has a chosen source");
    let mut lines: Vec<MergeEditLine> = (ml.first_row..ml.first_row + ml.len)
        .map(|row| MergeEditLine::Sourced { src, row, removed: is_removed_on_row(&list[row], src) })
        .collect();

    if lines.iter().all(|l| matches!(l, MergeEditLine::Sourced { removed: true, .. })) {
        ml.edit_lines = vec![MergeEditLine::Removed];
        return;
    }
    lines.retain(|l| !matches!(l, MergeEditLine::Sourced { removed: true, .. }));
    if lines.is_empty() {
        lines.push(MergeEditLine::Removed);
    }
    ml.edit_lines = lines;
}

fn is_white_space_conflict(ml: &MergeLine, list: &Diff3LineList, has_c: bool) -> bool {
    if !ml.conflict {
        return false;
    }
    (ml.first_row..ml.first_row + ml.len).all(|i| {
        let row = &list[i];
        let base_eq = if has_c { row.a_eq_b && row.a_eq_c } else { row.a_eq_b };
        base_eq || (row.white_a && row.white_b && row.white_c)
    })
}

/// Builds the `MergeLine` list from an aligned [`Diff3LineList`].
///
/// `has_c` selects the two-input vs three-input classification rules.
/// When `options.auto_solve` is false every delta (whether or not it was
/// classified as an automatic resolution) is forced into a conflict,
/// matching `--qall`.
pub fn build_merge_lines(list: &Diff3LineList, has_c: bool, options: &Options) -> Vec<MergeLine> {
    let classes: Vec<RowClass> = list.iter().map(|row| merge_one_line(row, has_c)).collect();

    let mut merge_lines: Vec<MergeLine> = Vec::new();
    let mut i = 0usize;
    while i < list.len() {
        let mut j = i + 1;
        while j < list.len() && same_kind(&list[j - 1], &classes[j - 1], &list[j], &classes[j]) {
            j += 1;
        }
        let head = classes[i];
        let delta = head.details != MergeDetails::NoChange;
        let mut ml = MergeLine {
            first_row: i,
            len: j - i,
            details: head.details,
            src_select: head.src_select,
            conflict: head.conflict,
            delta,
            white_space_conflict: false,
            edit_lines: Vec::new(),
        };

        if !options.auto_solve && ml.delta {
            ml.conflict = true;
            ml.src_select = None;
        }

        ml.white_space_conflict = is_white_space_conflict(&ml, list, has_c);
        if ml.white_space_conflict {
            let default = if has_c {
                options.whitespace_3_file_merge_default
            } else {
                options.whitespace_2_file_merge_default
            };
            if let Some(src) = default {
                ml.src_select = Some(src);
                ml.conflict = false;
            }
        }

        populate_edit_lines(&mut ml, list);
        merge_lines.push(ml);
        i = j;
    }
    merge_lines
}

/// Count of MergeLines whose first edit line is an unresolved `Conflict`.
pub fn unresolved_conflicts(merge_lines: &[MergeLine]) -> usize {
    merge_lines
        .iter()
        .filter(|ml| matches!(ml.edit_lines.first(), Some(MergeEditLine::Conflict)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{calc_diff, LineSeq, MatchLevel};
    use crate::diff3::build_from_ab;
    use crate::fine_diff::{run_fine_diff, Pair};
    use crate::line_data::preprocess;
    use crate::progress::NoOpProgress;

    fn two_way(a: &[u8], b: &[u8], options: &Options) -> (Vec<MergeLine>, Diff3LineList) {
        let la = preprocess(a, options);
        let lb = preprocess(b, options);
        let sa = LineSeq { lines: &la, buf: a, options };
        let sb = LineSeq { lines: &lb, buf: b, options };
        let d = calc_diff(&sa, &sb, MatchLevel::Line, usize::MAX, &mut NoOpProgress).unwrap();
        let mut list = build_from_ab(&d);
        run_fine_diff(&mut list, Pair::AB, &la, a, &lb, b, &[], &[], 500, &mut NoOpProgress);
        let merge_lines = build_merge_lines(&list, false, options);
        (merge_lines, list)
    }

    #[test]
    fn pure_insertion_is_a_conflict_until_resolved() {
        // §4.5: "exactly one of A,B present" is a conflict regardless of
        // which side the line is missing from; a pure insertion only
        // reaches zero conflicts after an explicit choose (see
        // `session.rs`'s end-to-end scenario test for the chooseGlobal path).
        let options = Options::default();
        let (merge_lines, _) = two_way(b"a\nb\nc\n", b"a\nX\nb\nc\n", &options);
        assert_eq!(unresolved_conflicts(&merge_lines), 1);
        let added = merge_lines.iter().find(|m| m.details == MergeDetails::BDeleted).unwrap();
        assert!(added.conflict);
    }

    #[test]
    fn pure_deletion_is_a_conflict_until_resolved() {
        let options = Options::default();
        let (merge_lines, _) = two_way(b"a\nb\nc\n", b"a\nc\n", &options);
        assert_eq!(unresolved_conflicts(&merge_lines), 1);
        let deleted = merge_lines.iter().find(|m| m.details == MergeDetails::BDeleted).unwrap();
        assert!(deleted.conflict);
    }

    #[test]
    fn qall_forces_every_delta_to_conflict() {
        let options = Options { auto_solve: false, ..Options::default() };
        let (merge_lines, _) = two_way(b"a\nb\nc\n", b"a\nX\nb\nc\n", &options);
        assert!(unresolved_conflicts(&merge_lines) > 0);
    }
}
