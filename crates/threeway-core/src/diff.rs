//! Line equality and the pairwise matcher (`calc_diff`).
//!
//! `calc_diff` is generic over anything implementing [`MatchSeq`] so the
//! same algorithm serves both line-level and character-level matching
//! (the original templated on element type; here it's a trait instead).

use crate::line_data::LineData;
use crate::options::Options;
use crate::progress::ProgressReporter;

/// One run of a pairwise diff: `equals` matched elements, followed by
/// `left_only` elements present only on the left and/or `right_only`
/// present only on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diff {
    pub equals: usize,
    pub left_only: usize,
    pub right_only: usize,
}

pub type DiffList = Vec<Diff>;

/// Sum of `equals+left_only` across `list` (should equal the left side's
/// length; see property P2).
pub fn left_len(list: &DiffList) -> usize {
    list.iter().map(|d| d.equals + d.left_only).sum()
}

/// Sum of `equals+right_only` across `list` (should equal the right side's
/// length; see property P2).
pub fn right_len(list: &DiffList) -> usize {
    list.iter().map(|d| d.equals + d.right_only).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchLevel {
    Line,
    Char,
}

/// A sequence `calc_diff` can run over: it needs only element count and a
/// way to test two elements (possibly from different instances) for
/// equality in strict or non-strict mode.
pub trait MatchSeq {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn eq_at(&self, i: usize, other: &Self, j: usize, strict: bool) -> bool;
}

/// `equal(l1, l2, strict)` from the line-equality component: parameterized
/// by `ignore_white_space`, `ignore_trivial_matches`, and the §4.1
/// comparison-view filters `upper_case`/`ignore_numbers`.
pub fn equal_lines(l1: &LineData, buf1: &[u8], l2: &LineData, buf2: &[u8], strict: bool, options: &Options) -> bool {
    if strict
        && options.ignore_trivial_matches
        && (l1.occurrence_count >= options.trivial_match_threshold
            || l2.occurrence_count >= options.trivial_match_threshold)
    {
        return false;
    }

    if options.ignore_white_space || options.ignore_numbers {
        let b1 = l1.bytes(buf1);
        let b2 = l2.bytes(buf2);
        let mut i = 0usize;
        let mut j = 0usize;
        let mut matched = 0usize;
        loop {
            while i < b1.len() && skip_byte(b1[i], options) {
                i += 1;
            }
            while j < b2.len() && skip_byte(b2[j], options) {
                j += 1;
            }
            let end1 = i >= b1.len();
            let end2 = j >= b2.len();
            if end1 || end2 {
                if end1 != end2 {
                    return false;
                }
                break;
            }
            if normalize_byte(b1[i], options) != normalize_byte(b2[j], options) {
                return false;
            }
            i += 1;
            j += 1;
            matched += 1;
        }
        if strict && options.ignore_trivial_matches {
            matched > 2
        } else {
            true
        }
    } else if options.upper_case {
        l1.length == l2.length
            && l1
                .bytes(buf1)
                .iter()
                .zip(l2.bytes(buf2))
                .all(|(&a, &b)| a.to_ascii_uppercase() == b.to_ascii_uppercase())
    } else {
        l1.length == l2.length && l1.bytes(buf1) == l2.bytes(buf2)
    }
}

fn is_white(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r')
}

fn skip_byte(b: u8, options: &Options) -> bool {
    (options.ignore_white_space && is_white(b)) || (options.ignore_numbers && b.is_ascii_digit())
}

fn normalize_byte(b: u8, options: &Options) -> u8 {
    if options.upper_case {
        b.to_ascii_uppercase()
    } else {
        b
    }
}

/// Equality between two *optional* lines, used where a side may be absent
/// (the trim pass, merge classification). Absent on either side is never
/// equal.
pub fn equal_optional_lines(
    l1: Option<(&LineData, &[u8])>,
    l2: Option<(&LineData, &[u8])>,
    strict: bool,
    options: &Options,
) -> bool {
    match (l1, l2) {
        (Some((a, ba)), Some((b, bb))) => equal_lines(a, ba, b, bb, strict, options),
        _ => false,
    }
}

/// Adapts a `(lines, buffer)` pair to [`MatchSeq`] for line-level matching.
pub struct LineSeq<'a> {
    pub lines: &'a [LineData],
    pub buf: &'a [u8],
    pub options: &'a Options,
}

impl<'a> MatchSeq for LineSeq<'a> {
    fn len(&self) -> usize {
        self.lines.len()
    }

    fn eq_at(&self, i: usize, other: &Self, j: usize, strict: bool) -> bool {
        equal_lines(&self.lines[i], self.buf, &other.lines[j], other.buf, strict, self.options)
    }
}

/// Adapts a raw byte slice to [`MatchSeq`] for character-level matching.
/// Strictness is irrelevant at character granularity: a byte either
/// matches or it doesn't.
pub struct CharSeq<'a> {
    pub bytes: &'a [u8],
}

impl<'a> MatchSeq for CharSeq<'a> {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn eq_at(&self, i: usize, other: &Self, j: usize, _strict: bool) -> bool {
        self.bytes[i] == other.bytes[j]
    }
}

/// The pairwise matcher. Produces a [`DiffList`] aligning `a` and `b`.
///
/// `max_search_range` bounds how far ahead on the right side the anchor
/// search looks; callers pass a large value for line matching and a small
/// bounded window for the fine (character) differ (§4.7).
pub fn calc_diff<T: MatchSeq>(
    a: &T,
    b: &T,
    level: MatchLevel,
    max_search_range: usize,
    progress: &mut dyn ProgressReporter,
) -> Result<DiffList, crate::error::Cancelled> {
    let s1 = a.len();
    let s2 = b.len();
    let mut list = DiffList::new();
    let mut i1 = 0usize;
    let mut i2 = 0usize;

    loop {
        if progress.is_cancelled() {
            return Err(crate::error::Cancelled);
        }
        progress.step();

        let mut nof_equals = 0usize;
        while i1 < s1 && i2 < s2 && a.eq_at(i1, b, i2, false) {
            i1 += 1;
            i2 += 1;
            nof_equals += 1;
        }

        let remaining1 = s1 - i1;
        let remaining2 = s2 - i2;
        let mut best: Option<(usize, usize)> = None;

        'outer: for off1 in 0..=remaining1 {
            if let Some((b1, b2)) = best {
                if off1 >= b1 + b2 {
                    break 'outer;
                }
            }
            let max_off2 = remaining2.min(max_search_range);
            for off2 in 0..=max_off2 {
                if let Some((b1, b2)) = best {
                    if off1 + off2 >= b1 + b2 {
                        continue;
                    }
                }
                let p1 = i1 + off1;
                let p2 = i2 + off2;
                if p1 >= s1 || p2 >= s2 {
                    continue;
                }
                if !a.eq_at(p1, b, p2, true) {
                    continue;
                }
                let both_at_end = p1 + 1 >= s1 && p2 + 1 >= s2;
                let next_eq = p1 + 1 < s1 && p2 + 1 < s2 && a.eq_at(p1 + 1, b, p2 + 1, false);
                let context_ok = level == MatchLevel::Line
                    || (off1 as i64 - off2 as i64).abs() < 3
                    || both_at_end
                    || next_eq;
                if context_ok {
                    best = Some((off1, off2));
                }
            }
        }

        // `bEndReached` in the original: true once no further anchor could be
        // found, i.e. the rest of both sides is emitted as a single diff run.
        let mut end_reached;
        if let Some((off1, off2)) = best {
            let mut anchor1 = i1 + off1;
            let mut anchor2 = i2 + off2;
            while anchor1 > i1 && anchor2 > i2 && a.eq_at(anchor1 - 1, b, anchor2 - 1, false) {
                anchor1 -= 1;
                anchor2 -= 1;
            }
            list.push(Diff {
                equals: nof_equals,
                left_only: anchor1 - i1,
                right_only: anchor2 - i2,
            });
            i1 = anchor1;
            i2 = anchor2;
            end_reached = false;
        } else {
            list.push(Diff {
                equals: nof_equals,
                left_only: s1 - i1,
                right_only: s2 - i2,
            });
            // `p1`/`p2` stay put here (the original doesn't advance them
            // when no anchor was found); the backward rescan below walks
            // back into the equals-run just consumed, from `i1`/`i2`.
            end_reached = true;
        }

        // End re-matching pass (§4.3 step 5): the greedy anchor search above
        // sometimes picks a match that leaves actually-equal elements right
        // before it unmatched. Scan backward from the new cursor positions;
        // if non-strict equals are found, undo them from the tail of the
        // diff list just emitted (pulling from earlier diffs too, if the
        // last one is exhausted) and rewind the cursors to re-run the
        // anchor search over that stretch.
        let mut nof_unmatched = 0usize;
        let mut pu1 = i1;
        let mut pu2 = i2;
        while pu1 > 0 && pu2 > 0 && a.eq_at(pu1 - 1, b, pu2 - 1, false) {
            nof_unmatched += 1;
            pu1 -= 1;
            pu2 -= 1;
        }

        if nof_unmatched > 0 {
            let orig_back = *list.last().unwrap();
            let mut d = list.pop().unwrap();
            let mut remaining = nof_unmatched;
            while remaining > 0 {
                if d.left_only > 0 && d.right_only > 0 {
                    d.left_only -= 1;
                    d.right_only -= 1;
                    remaining -= 1;
                } else if d.equals > 0 {
                    d.equals -= 1;
                    remaining -= 1;
                } else {
                    break;
                }

                if d.equals == 0 && (d.left_only == 0 || d.right_only == 0) && remaining > 0 {
                    match list.pop() {
                        Some(prev) => {
                            d.equals += prev.equals;
                            d.left_only += prev.left_only;
                            d.right_only += prev.right_only;
                            end_reached = false;
                        }
                        None => break,
                    }
                }
            }

            if end_reached {
                list.push(orig_back);
            } else {
                i1 = pu1 + 1 + remaining;
                i2 = pu2 + 1 + remaining;
                list.push(d);
            }
        }

        if end_reached {
            break;
        }
    }

    debug_assert_eq!(left_len(&list), s1, "calc_diff left-side sum mismatch");
    debug_assert_eq!(right_len(&list), s2, "calc_diff right-side sum mismatch");
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_data::preprocess;
    use crate::progress::NoOpProgress;

    fn line_diff(a: &[u8], b: &[u8], options: &Options) -> DiffList {
        let la = preprocess(a, options);
        let lb = preprocess(b, options);
        let sa = LineSeq { lines: &la, buf: a, options };
        let sb = LineSeq { lines: &lb, buf: b, options };
        calc_diff(&sa, &sb, MatchLevel::Line, usize::MAX, &mut NoOpProgress).unwrap()
    }

    #[test]
    fn identical_inputs_are_all_equal() {
        let list = line_diff(b"a\nb\nc\n", b"a\nb\nc\n", &Options::default());
        assert_eq!(left_len(&list), 3);
        assert_eq!(right_len(&list), 3);
        assert!(list.iter().all(|d| d.left_only == 0 && d.right_only == 0));
    }

    #[test]
    fn pure_insertion() {
        let list = line_diff(b"a\nb\nc\n", b"a\nX\nb\nc\n", &Options::default());
        assert_eq!(left_len(&list), 3);
        assert_eq!(right_len(&list), 4);
    }

    #[test]
    fn pure_deletion() {
        let list = line_diff(b"a\nb\nc\n", b"a\nc\n", &Options::default());
        assert_eq!(left_len(&list), 3);
        assert_eq!(right_len(&list), 2);
    }

    #[test]
    fn empty_sides() {
        let list = line_diff(b"", b"", &Options::default());
        assert_eq!(left_len(&list), 0);
        assert_eq!(right_len(&list), 0);
    }

    #[test]
    fn upper_case_ignores_letter_case() {
        let opts = Options { upper_case: true, ..Options::default() };
        let raw_a = b"Hello\n";
        let raw_b = b"hello\n";
        let la = preprocess(raw_a, &opts);
        let lb = preprocess(raw_b, &opts);
        assert!(equal_lines(&la[0], raw_a, &lb[0], raw_b, false, &opts));

        let strict_opts = Options::default();
        assert!(!equal_lines(&la[0], raw_a, &lb[0], raw_b, false, &strict_opts));
    }

    #[test]
    fn ignore_numbers_skips_digits() {
        let opts = Options { ignore_numbers: true, ..Options::default() };
        let raw_a = b"line 1\n";
        let raw_b = b"line 2\n";
        let la = preprocess(raw_a, &opts);
        let lb = preprocess(raw_b, &opts);
        assert!(equal_lines(&la[0], raw_a, &lb[0], raw_b, false, &opts));
    }

    #[test]
    fn char_level_matching() {
        let a = CharSeq { bytes: b"hello" };
        let b = CharSeq { bytes: b"hallo" };
        let list = calc_diff(&a, &b, MatchLevel::Char, usize::MAX, &mut NoOpProgress).unwrap();
        assert_eq!(left_len(&list), 5);
        assert_eq!(right_len(&list), 5);
    }
}
