//! The editable merge session: runs the full pipeline (§2) over three
//! inputs and exposes the user-facing commands of §4.6, §4.8 and §4.9.

use tracing::{debug, warn};

use crate::diff::{calc_diff, LineSeq, MatchLevel};
use crate::diff3::{build_from_ab, mark_white_lines, merge_ac, trim as trim_diff3, Diff3LineList};
use crate::diff3::improve_using_bc;
use crate::error::{EngineError, Result};
use crate::fine_diff::{run_fine_diff, Pair};
use crate::line_data::{preprocess, Buffer, LineData};
use crate::merge::{build_merge_lines, unresolved_conflicts, MergeEditLine, MergeLine};
use crate::options::{Options, Source};
use crate::progress::{NoOpProgress, ProgressReporter};
use crate::selection::Selection;

const MAX_FINE_DIFF_SEARCH_LENGTH: usize = 500;

struct Input {
    buffer: Buffer,
    lines: Vec<LineData>,
}

impl Input {
    fn new(bytes: Vec<u8>, options: &Options) -> Self {
        let lines = preprocess(&bytes, options);
        Input { buffer: Buffer::new(bytes), lines }
    }

    fn buf(&self) -> &[u8] {
        self.buffer.as_bytes()
    }
}

/// The full comparison/merge state for one editing session. Owns the
/// inputs, the aligned three-way model, and the editable merge lines.
pub struct Merger {
    options: Options,
    a: Input,
    b: Input,
    c: Option<Input>,
    diff3: Diff3LineList,
    merge_lines: Vec<MergeLine>,
    modified: bool,
}

impl Merger {
    /// Runs the full pipeline (§2) over two or three inputs.
    pub fn new(a: Vec<u8>, b: Vec<u8>, c: Option<Vec<u8>>, options: Options) -> Result<Self> {
        Self::new_with_progress(a, b, c, options, &mut NoOpProgress)
    }

    pub fn new_with_progress(
        a: Vec<u8>,
        b: Vec<u8>,
        c: Option<Vec<u8>>,
        options: Options,
        progress: &mut dyn ProgressReporter,
    ) -> Result<Self> {
        let input_a = Input::new(a, &options);
        let input_b = Input::new(b, &options);
        let input_c = c.map(|bytes| Input::new(bytes, &options));

        debug!(lines_a = input_a.lines.len(), lines_b = input_b.lines.len(), "preprocessed inputs");

        let seq_a = LineSeq { lines: &input_a.lines, buf: input_a.buf(), options: &options };
        let seq_b = LineSeq { lines: &input_b.lines, buf: input_b.buf(), options: &options };
        let diff_ab = calc_diff(&seq_a, &seq_b, MatchLevel::Line, usize::MAX, progress)
            .map_err(|_| EngineError::Invariant("comparison cancelled"))?;

        let mut diff3 = build_from_ab(&diff_ab);

        if let Some(input_c) = &input_c {
            let seq_c = LineSeq { lines: &input_c.lines, buf: input_c.buf(), options: &options };
            let diff_ac = calc_diff(&seq_a, &seq_c, MatchLevel::Line, usize::MAX, progress)
                .map_err(|_| EngineError::Invariant("comparison cancelled"))?;
            let diff_bc = calc_diff(&seq_b, &seq_c, MatchLevel::Line, usize::MAX, progress)
                .map_err(|_| EngineError::Invariant("comparison cancelled"))?;

            merge_ac(&mut diff3, &diff_ac);
            improve_using_bc(&mut diff3, &diff_bc);
            trim_diff3(
                &mut diff3,
                &input_a.lines,
                input_a.buf(),
                &input_b.lines,
                input_b.buf(),
                &input_c.lines,
                input_c.buf(),
                &options,
            );
        }

        let empty: Vec<LineData> = Vec::new();
        let buf_c = input_c.as_ref().map(|i| i.buf()).unwrap_or(&[]);
        let lines_c = input_c.as_ref().map(|i| i.lines.as_slice()).unwrap_or(&empty);
        mark_white_lines(&mut diff3, &input_a.lines, &input_b.lines, lines_c);
        crate::wrap::compute_display_layout(
            &mut diff3,
            &input_a.lines,
            input_a.buf(),
            &input_b.lines,
            input_b.buf(),
            lines_c,
            buf_c,
            options.tab_size,
            options.wrap_column,
        );

        run_fine_diff(
            &mut diff3,
            Pair::AB,
            &input_a.lines,
            input_a.buf(),
            &input_b.lines,
            input_b.buf(),
            lines_c,
            buf_c,
            MAX_FINE_DIFF_SEARCH_LENGTH,
            progress,
        );
        if let Some(input_c) = &input_c {
            run_fine_diff(
                &mut diff3,
                Pair::BC,
                &input_a.lines,
                input_a.buf(),
                &input_b.lines,
                input_b.buf(),
                &input_c.lines,
                input_c.buf(),
                MAX_FINE_DIFF_SEARCH_LENGTH,
                progress,
            );
            run_fine_diff(
                &mut diff3,
                Pair::CA,
                &input_a.lines,
                input_a.buf(),
                &input_b.lines,
                input_b.buf(),
                &input_c.lines,
                input_c.buf(),
                MAX_FINE_DIFF_SEARCH_LENGTH,
                progress,
            );
        }

        debug_assert!(
            crate::diff3::line_coverage_ok(&diff3, Source::A, input_a.lines.len()),
            "line coverage violated for A"
        );
        debug_assert!(
            crate::diff3::line_coverage_ok(&diff3, Source::B, input_b.lines.len()),
            "line coverage violated for B"
        );
        if let Some(input_c) = &input_c {
            debug_assert!(
                crate::diff3::line_coverage_ok(&diff3, Source::C, input_c.lines.len()),
                "line coverage violated for C"
            );
        }

        let has_c = input_c.is_some();
        let merge_lines = build_merge_lines(&diff3, has_c, &options);
        let unresolved = unresolved_conflicts(&merge_lines);
        if unresolved > 0 {
            warn!(unresolved, "merge has unresolved conflicts after build");
        }

        Ok(Merger { options, a: input_a, b: input_b, c: input_c, diff3, merge_lines, modified: false })
    }

    pub fn merge_lines(&self) -> &[MergeLine] {
        &self.merge_lines
    }

    pub fn unresolved_conflicts(&self) -> usize {
        unresolved_conflicts(&self.merge_lines)
    }

    /// Human-readable diff/merge report for the CLI's no-`--output` diff
    /// view: one line per `MergeLine` naming its classification, chosen
    /// source (if any), and row range, followed by a summary count. Pure
    /// presentation; `labels` are the `-L1`/`-L2`/`-L3` display aliases.
    pub fn report(&self, labels: [&str; 3]) -> String {
        let mut out = String::new();
        for ml in &self.merge_lines {
            let marker = if ml.conflict {
                "CONFLICT"
            } else if ml.delta {
                "delta"
            } else {
                "same"
            };
            let src = ml
                .src_select
                .map(|s| match s {
                    Source::A => labels[0],
                    Source::B => labels[1],
                    Source::C => labels[2],
                })
                .unwrap_or("-");
            out.push_str(&format!(
                "{marker:<8} rows {:>5}..{:<5} {:<22} src={}\n",
                ml.first_row,
                ml.first_row + ml.len,
                ml.details.label(),
                src,
            ));
        }
        out.push_str(&format!("\n{} unresolved conflict(s)\n", self.unresolved_conflicts()));
        out
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn has_c(&self) -> bool {
        self.c.is_some()
    }

    fn buf_c(&self) -> &[u8] {
        self.c.as_ref().map(|i| i.buf()).unwrap_or(&[])
    }

    fn lines_c(&self) -> &[LineData] {
        self.c.as_ref().map(|i| i.lines.as_slice()).unwrap_or(&[])
    }

    /// `choose(selector)` on one MergeLine (§4.6). `ml_index` is the
    /// position in [`Self::merge_lines`].
    pub fn choose(&mut self, ml_index: usize, selector: Source) {
        let list = &self.diff3;
        let ml = &mut self.merge_lines[ml_index];
        let active = ml
            .edit_lines
            .iter()
            .any(|l| matches!(l, MergeEditLine::Sourced { src, .. } if *src == selector));

        if active {
            ml.edit_lines.retain(|l| !matches!(l, MergeEditLine::Sourced { src, .. } if *src == selector));
        } else {
            ml.edit_lines.retain(|l| !matches!(l, MergeEditLine::Conflict | MergeEditLine::Removed));
            for row in ml.first_row..ml.first_row + ml.len {
                let present = match selector {
                    Source::A => list[row].line_a,
                    Source::B => list[row].line_b,
                    Source::C => list[row].line_c,
                };
                if present.is_some() {
                    ml.edit_lines.push(MergeEditLine::Sourced { src: selector, row, removed: false });
                }
            }
        }

        if ml.edit_lines.is_empty() {
            ml.edit_lines.push(if active { MergeEditLine::Removed } else { MergeEditLine::Conflict });
        }
        ml.conflict = matches!(ml.edit_lines.first(), Some(MergeEditLine::Conflict));
        self.modified = true;
    }

    /// `chooseGlobal(selector, conflictsOnly, whitespaceOnly)` (§4.6).
    pub fn choose_global(&mut self, selector: Source, conflicts_only: bool, whitespace_only: bool) {
        let targets: Vec<usize> = self
            .merge_lines
            .iter()
            .enumerate()
            .filter(|(_, ml)| (!conflicts_only || ml.conflict) && (!whitespace_only || ml.white_space_conflict))
            .map(|(i, _)| i)
            .collect();
        for i in targets {
            self.choose(i, selector);
        }
    }

    /// Re-runs the merge-model builder with auto-solve enabled.
    pub fn auto_solve(&mut self) {
        let mut options = self.options.clone();
        options.auto_solve = true;
        self.merge_lines = build_merge_lines(&self.diff3, self.has_c(), &options);
        self.modified = true;
    }

    /// Re-runs the merge-model builder forcing every delta into a
    /// conflict, matching `--qall`.
    pub fn unsolve(&mut self) {
        let mut options = self.options.clone();
        options.auto_solve = false;
        self.merge_lines = build_merge_lines(&self.diff3, self.has_c(), &options);
        self.modified = true;
    }

    fn materialize(&self, el: &MergeEditLine) -> String {
        match el {
            MergeEditLine::Sourced { src, row, removed: false } => {
                let row = &self.diff3[*row];
                let bytes = match src {
                    Source::A => row.line_a.map(|i| self.a.lines[i].bytes(self.a.buf())),
                    Source::B => row.line_b.map(|i| self.b.lines[i].bytes(self.b.buf())),
                    Source::C => row.line_c.map(|i| self.lines_c()[i].bytes(self.buf_c())),
                };
                String::from_utf8_lossy(bytes.unwrap_or(&[])).into_owned()
            }
            MergeEditLine::Sourced { removed: true, .. } | MergeEditLine::Removed | MergeEditLine::Conflict => {
                String::new()
            }
            MergeEditLine::UserText(s) => s.clone(),
        }
    }

    fn ensure_editable(&mut self, ml_index: usize, el_index: usize) {
        let text = self.materialize(&self.merge_lines[ml_index].edit_lines[el_index]);
        self.merge_lines[ml_index].edit_lines[el_index] = MergeEditLine::UserText(text);
    }

    fn char_to_byte(s: &str, col: usize) -> usize {
        s.char_indices().nth(col).map(|(b, _)| b).unwrap_or(s.len())
    }

    /// Insert `ch` at character column `col` of edit line `el_index` within
    /// MergeLine `ml_index`. `overwrite` replaces the character at `col`
    /// instead of inserting before it.
    pub fn insert_char(&mut self, ml_index: usize, el_index: usize, col: usize, ch: char, overwrite: bool) {
        self.ensure_editable(ml_index, el_index);
        if let MergeEditLine::UserText(s) = &mut self.merge_lines[ml_index].edit_lines[el_index] {
            let byte = Self::char_to_byte(s, col);
            if overwrite && byte < s.len() {
                let next = Self::char_to_byte(s, col + 1);
                s.replace_range(byte..next, &ch.to_string());
            } else {
                s.insert(byte, ch);
            }
        }
        self.modified = true;
    }

    /// Backspace at column `col`. At column 0 joins with the previous edit
    /// line within the same MergeLine (joining across MergeLine boundaries
    /// is not meaningful: they represent distinct alignment ranges).
    pub fn backspace(&mut self, ml_index: usize, el_index: usize, col: usize) {
        if col == 0 {
            if el_index == 0 {
                return;
            }
            self.ensure_editable(ml_index, el_index);
            self.ensure_editable(ml_index, el_index - 1);
            let ml = &mut self.merge_lines[ml_index];
            let cur = match ml.edit_lines.remove(el_index) {
                MergeEditLine::UserText(s) => s,
                _ => String::new(),
            };
            if let MergeEditLine::UserText(prev) = &mut ml.edit_lines[el_index - 1] {
                prev.push_str(&cur);
            }
        } else {
            self.ensure_editable(ml_index, el_index);
            if let MergeEditLine::UserText(s) = &mut self.merge_lines[ml_index].edit_lines[el_index] {
                let start = Self::char_to_byte(s, col - 1);
                let end = Self::char_to_byte(s, col);
                s.replace_range(start..end, "");
            }
        }
        self.modified = true;
    }

    /// Delete-forward at column `col`. At end of line joins with the next
    /// edit line within the same MergeLine.
    pub fn delete_forward(&mut self, ml_index: usize, el_index: usize, col: usize) {
        self.ensure_editable(ml_index, el_index);
        let at_end = matches!(&self.merge_lines[ml_index].edit_lines[el_index], MergeEditLine::UserText(s) if Self::char_to_byte(s, col) >= s.len());
        if at_end {
            let ml = &mut self.merge_lines[ml_index];
            if el_index + 1 >= ml.edit_lines.len() {
                return;
            }
            drop(ml);
            self.ensure_editable(ml_index, el_index + 1);
            let ml = &mut self.merge_lines[ml_index];
            let next = match ml.edit_lines.remove(el_index + 1) {
                MergeEditLine::UserText(s) => s,
                _ => String::new(),
            };
            if let MergeEditLine::UserText(s) = &mut ml.edit_lines[el_index] {
                s.push_str(&next);
            }
        } else if let MergeEditLine::UserText(s) = &mut self.merge_lines[ml_index].edit_lines[el_index] {
            let start = Self::char_to_byte(s, col);
            let end = Self::char_to_byte(s, col + 1);
            s.replace_range(start..end, "");
        }
        self.modified = true;
    }

    /// Splits the line at `col` into two. When `auto_indent`, the new
    /// second line is prefixed with the leading whitespace of the line
    /// being split.
    pub fn split_line(&mut self, ml_index: usize, el_index: usize, col: usize, auto_indent: bool) {
        self.ensure_editable(ml_index, el_index);
        let ml = &mut self.merge_lines[ml_index];
        let s = match &ml.edit_lines[el_index] {
            MergeEditLine::UserText(s) => s.clone(),
            _ => return,
        };
        let byte = Self::char_to_byte(&s, col);
        let (head, tail) = s.split_at(byte);
        let mut new_tail = tail.to_string();
        if auto_indent {
            let indent: String = head.chars().take_while(|c| *c == ' ' || *c == '\t').collect();
            new_tail = format!("{indent}{new_tail}");
        }
        ml.edit_lines[el_index] = MergeEditLine::UserText(head.to_string());
        ml.edit_lines.insert(el_index + 1, MergeEditLine::UserText(new_tail));
        self.modified = true;
    }

    /// Flat (MergeLine index, edit-line index, display row) triples across
    /// every MergeLine, in display order. Used by delete-selection, paste
    /// and search to address a flat "screen line number".
    fn flat_index(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (mi, ml) in self.merge_lines.iter().enumerate() {
            for ei in 0..ml.edit_lines.len() {
                out.push((mi, ei));
            }
        }
        out
    }

    /// Deletes the text covered by `selection`, a range possibly spanning
    /// several edit lines. The first and last partially-covered lines are
    /// trimmed and merged into one; fully-covered intermediate lines are
    /// removed (or marked `Removed` when a MergeLine can't become empty).
    pub fn delete_selection(&mut self, selection: &Selection) {
        if !selection.contains_data() {
            return;
        }
        let flat = self.flat_index();
        let first_line = selection.begin_line();
        let last_line = selection.end_line();
        if first_line >= flat.len() {
            return;
        }
        let last_line = last_line.min(flat.len() - 1);

        let (fmi, fei) = flat[first_line];
        self.ensure_editable(fmi, fei);
        let first_col = Self::char_to_byte(
            match &self.merge_lines[fmi].edit_lines[fei] {
                MergeEditLine::UserText(s) => s,
                _ => unreachable!(),
            },
            selection.first_pos_in_line(first_line),
        );
        let head = if let MergeEditLine::UserText(s) = &self.merge_lines[fmi].edit_lines[fei] {
            s[..first_col].to_string()
        } else {
            String::new()
        };

        let (lmi, lei) = flat[last_line];
        self.ensure_editable(lmi, lei);
        let last_text = match &self.merge_lines[lmi].edit_lines[lei] {
            MergeEditLine::UserText(s) => s.clone(),
            _ => String::new(),
        };
        let last_pos = selection.last_pos_in_line(last_line);
        let last_col = if last_pos == usize::MAX { last_text.len() } else { Self::char_to_byte(&last_text, last_pos) };
        let tail = last_text[last_col.min(last_text.len())..].to_string();

        self.merge_lines[fmi].edit_lines[fei] = MergeEditLine::UserText(format!("{head}{tail}"));

        // Remove every edit line strictly between first and last (in
        // reverse so indices stay valid), including the last line itself
        // (its surviving tail was already folded into the first line).
        for line in (first_line + 1..=last_line).rev() {
            let (mi, ei) = flat[line];
            let ml = &mut self.merge_lines[mi];
            if ml.edit_lines.len() > 1 {
                ml.edit_lines.remove(ei);
            } else {
                ml.edit_lines[ei] = MergeEditLine::Removed;
            }
        }
        self.modified = true;
    }

    /// Inserts newline-separated `text` at `(ml_index, el_index, col)`.
    /// Each embedded `\n` starts a new, source-less edit line.
    pub fn paste(&mut self, ml_index: usize, el_index: usize, col: usize, text: &str) {
        self.ensure_editable(ml_index, el_index);
        let ml = &mut self.merge_lines[ml_index];
        let original = match &ml.edit_lines[el_index] {
            MergeEditLine::UserText(s) => s.clone(),
            _ => String::new(),
        };
        let byte = Self::char_to_byte(&original, col);
        let (head, tail) = original.split_at(byte);
        let mut chunks: Vec<&str> = text.split('\n').collect();
        let first_chunk = chunks.remove(0);

        let mut new_lines = vec![format!("{head}{first_chunk}")];
        let last_idx = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            if i == last_idx {
                new_lines.push(format!("{chunk}{tail}"));
            } else {
                new_lines.push((*chunk).to_string());
            }
        }
        if new_lines.len() == 1 {
            new_lines[0].push_str(tail);
        }

        ml.edit_lines[el_index] = MergeEditLine::UserText(new_lines.remove(0));
        for (offset, line) in new_lines.into_iter().enumerate() {
            ml.edit_lines.insert(el_index + 1 + offset, MergeEditLine::UserText(line));
        }
        self.modified = true;
    }

    /// Search (§4.9): case-sensitive or -insensitive forward substring
    /// search, wrapping once to the start of the document.
    pub fn search(&self, needle: &str, case_sensitive: bool, start_row: usize) -> Option<(usize, usize)> {
        if needle.is_empty() {
            return None;
        }
        let flat = self.flat_index();
        if flat.is_empty() {
            return None;
        }
        let needle_cmp = if case_sensitive { needle.to_string() } else { needle.to_lowercase() };

        let n = flat.len();
        for step in 0..=n {
            let row = (start_row + step) % n;
            let (mi, ei) = flat[row];
            let text = self.materialize(&self.merge_lines[mi].edit_lines[ei]);
            let haystack = if case_sensitive { text.clone() } else { text.to_lowercase() };
            if let Some(byte_pos) = haystack.find(&needle_cmp) {
                let col = haystack[..byte_pos].chars().count();
                return Some((row, col));
            }
            if step == n {
                break;
            }
        }
        None
    }

    /// Save (§4.8): refuses while conflicts remain; otherwise concatenates
    /// every editable line's bytes with the configured line terminator.
    /// When `write_backup` is set, an existing destination is renamed to
    /// `<path>.orig` first.
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        let unresolved = self.unresolved_conflicts();
        if unresolved > 0 {
            return Err(EngineError::UnresolvedConflicts(unresolved));
        }

        if self.options.write_backup && path.exists() {
            let backup = path.with_extension(format!(
                "{}.orig",
                path.extension().and_then(|e| e.to_str()).unwrap_or("")
            ));
            std::fs::rename(path, backup)?;
        }

        let mut out = Vec::new();
        for ml in &self.merge_lines {
            for el in &ml.edit_lines {
                if !el.is_editable_text() {
                    continue;
                }
                let text = self.materialize(el);
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(self.options.line_ending.as_bytes());
            }
        }
        std::fs::write(path, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Options {
        Options::default()
    }

    #[test]
    fn scenario_pure_insertion_saves_b() {
        // §8 scenario 1: a two-input merge has no base to prefer either side
        // over, so the inserted row starts out a conflict like any other
        // delta; "auto-merge with default={no-C}" is the caller choosing B
        // for every conflict once there's no C to weigh in.
        let mut m = Merger::new(b"a\nb\nc\n".to_vec(), b"a\nX\nb\nc\n".to_vec(), None, opts()).unwrap();
        assert_eq!(m.unresolved_conflicts(), 1);
        m.choose_global(Source::B, true, false);
        assert_eq!(m.unresolved_conflicts(), 0);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        m.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"a\nX\nb\nc\n");
    }

    #[test]
    fn scenario_pure_deletion_requires_choose() {
        let mut m = Merger::new(b"a\nb\nc\n".to_vec(), b"a\nc\n".to_vec(), None, opts()).unwrap();
        assert_eq!(m.unresolved_conflicts(), 1);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        assert!(m.save(&out).is_err());

        let idx = m.merge_lines().iter().position(|ml| ml.conflict).unwrap();
        m.choose(idx, Source::B);
        assert_eq!(m.unresolved_conflicts(), 0);
        m.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"a\nc\n");
    }

    #[test]
    fn scenario_three_way_clean_merge() {
        let m = Merger::new(
            b"a\nb\nc\n".to_vec(),
            b"a\nB\nc\n".to_vec(),
            Some(b"a\nb\nC\n".to_vec()),
            opts(),
        )
        .unwrap();
        assert_eq!(m.unresolved_conflicts(), 0);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        m.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"a\nB\nC\n");
    }

    #[test]
    fn scenario_three_way_true_conflict() {
        let m = Merger::new(b"x\n".to_vec(), b"y\n".to_vec(), Some(b"z\n".to_vec()), opts()).unwrap();
        assert_eq!(m.unresolved_conflicts(), 1);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        assert!(m.save(&out).is_err());
    }

    /// §8 scenario 5: a whitespace-only three-way conflict auto-resolves to
    /// the configured default. The fine differ compares raw bytes (it never
    /// ignores whitespace, even when `ignore_white_space` is set, matching
    /// kdiff3's char-level `fineDiff`), so all three pairs still carry a
    /// byte-level difference and the row classifies as `eBCChanged`; it's
    /// `bWhiteSpaceConflict` (driven by the line-level `a_eq_b`/`a_eq_c`
    /// flags, which *do* ignore whitespace) that turns the conflict into an
    /// automatic resolution.
    #[test]
    fn scenario_whitespace_only_conflict_auto_resolved() {
        use crate::merge::MergeDetails;

        let options = Options {
            ignore_white_space: true,
            whitespace_3_file_merge_default: Some(Source::C),
            ..opts()
        };
        let m = Merger::new(b"foo\n".to_vec(), b"foo \n".to_vec(), Some(b"foo\t\n".to_vec()), options).unwrap();

        assert_eq!(m.unresolved_conflicts(), 0);
        let ml = &m.merge_lines()[0];
        assert_eq!(ml.details, MergeDetails::BCChanged);
        assert!(ml.white_space_conflict);
        assert!(!ml.conflict);
        assert_eq!(ml.src_select, Some(Source::C));

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        m.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"foo\t\n");
    }

    #[test]
    fn choose_toggle_is_idempotent() {
        let mut m = Merger::new(b"a\nb\nc\n".to_vec(), b"a\nc\n".to_vec(), None, opts()).unwrap();
        let idx = m.merge_lines().iter().position(|ml| ml.conflict).unwrap();
        let before = m.merge_lines()[idx].edit_lines.clone();
        m.choose(idx, Source::B);
        m.choose(idx, Source::B);
        assert_eq!(m.merge_lines()[idx].edit_lines, before);
    }

    #[test]
    fn auto_solve_is_idempotent() {
        let mut m = Merger::new(b"a\nb\nc\n".to_vec(), b"a\nX\nb\nc\n".to_vec(), None, opts()).unwrap();
        m.auto_solve();
        let first = m.merge_lines().to_vec_details();
        m.auto_solve();
        let second = m.merge_lines().to_vec_details();
        assert_eq!(first, second);
    }

    trait DetailsSnapshot {
        fn to_vec_details(&self) -> Vec<(bool, Option<Source>)>;
    }
    impl DetailsSnapshot for [MergeLine] {
        fn to_vec_details(&self) -> Vec<(bool, Option<Source>)> {
            self.iter().map(|ml| (ml.conflict, ml.src_select)).collect()
        }
    }

    #[test]
    fn search_finds_substring_forward() {
        let m = Merger::new(b"alpha\nbeta\ngamma\n".to_vec(), b"alpha\nbeta\ngamma\n".to_vec(), None, opts()).unwrap();
        let found = m.search("gam", true, 0);
        assert_eq!(found, Some((2, 0)));
    }

    #[test]
    fn report_names_conflict_with_labels() {
        let m = Merger::new(b"x\n".to_vec(), b"y\n".to_vec(), Some(b"z\n".to_vec()), opts()).unwrap();
        let report = m.report(["mine", "theirs", "base"]);
        assert!(report.contains("CONFLICT"));
        assert!(report.contains("1 unresolved conflict(s)"));
    }

    /// P6: merging A with itself as B yields zero conflicts, zero deltas,
    /// and `save()` reproduces A byte-for-byte.
    #[test]
    fn self_merge_identity_two_way() {
        let text = b"alpha\nbeta\ngamma\ndelta\n".to_vec();
        let m = Merger::new(text.clone(), text.clone(), None, opts()).unwrap();
        assert_eq!(m.unresolved_conflicts(), 0);
        assert!(m.merge_lines().iter().all(|ml| !ml.delta && !ml.conflict));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        m.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), text);
    }

    /// P6 variant with a base C equal to A and B: still a clean self-merge.
    #[test]
    fn self_merge_identity_three_way() {
        let text = b"one\ntwo\nthree\n".to_vec();
        let m = Merger::new(text.clone(), text.clone(), Some(text.clone()), opts()).unwrap();
        assert_eq!(m.unresolved_conflicts(), 0);
        assert!(m.merge_lines().iter().all(|ml| !ml.delta && !ml.conflict));
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        m.save(&out).unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), text);
    }

    /// Scenario 6 (§8): a single line inserted in the middle of a long run
    /// of blank lines on both sides shows up as exactly one conflicted
    /// single-row `MergeLine`, not scattered across several small deltas
    /// anchored on the repeated blank lines around it.
    #[test]
    fn trivial_match_suppression_keeps_insertion_contiguous() {
        let mut a = Vec::new();
        for _ in 0..10 {
            a.extend_from_slice(b"\n");
        }
        a.extend_from_slice(b"end\n");

        let mut b = Vec::new();
        for _ in 0..5 {
            b.extend_from_slice(b"\n");
        }
        b.extend_from_slice(b"middle\n");
        for _ in 0..5 {
            b.extend_from_slice(b"\n");
        }
        b.extend_from_slice(b"end\n");

        let options = Options { ignore_trivial_matches: true, ..Options::default() };
        let m = Merger::new(a, b, None, options).unwrap();

        assert_eq!(m.unresolved_conflicts(), 1);
        let deltas: Vec<&MergeLine> = m.merge_lines().iter().filter(|ml| ml.delta).collect();
        assert_eq!(deltas.len(), 1, "insertion must not fragment across the blank run");
        assert_eq!(deltas[0].len, 1);
    }
}
