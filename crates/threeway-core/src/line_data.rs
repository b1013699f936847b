//! Preprocessing: turns a raw byte buffer into an ordered sequence of
//! [`LineData`] views plus per-line summary attributes.

use std::collections::HashMap;

use crate::options::Options;

/// An owned immutable byte sequence for one input. Plain `Vec<u8>` would do,
/// but a named type keeps "the thing LineData points into" visible at call
/// sites.
#[derive(Debug, Clone, Default)]
pub struct Buffer(pub Vec<u8>);

impl Buffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Buffer(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A non-owning view over one line of a [`Buffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineData {
    pub start: usize,
    pub length: usize,
    pub first_non_white_offset: usize,
    pub occurrence_count: u32,
}

impl LineData {
    pub fn bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.start + self.length]
    }

    /// Displayed width assuming tabs expand to the next multiple of `tab_size`.
    pub fn width(&self, buf: &[u8], tab_size: u32) -> u32 {
        let mut w: u32 = 0;
        for &b in self.bytes(buf) {
            if b == b'\t' {
                w = (w / tab_size + 1) * tab_size;
            } else {
                w += 1;
            }
        }
        w
    }

    pub fn is_white_line(&self) -> bool {
        self.first_non_white_offset == self.length
    }
}

fn is_white(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r')
}

/// Splits `raw` into display-view [`LineData`]. A line terminates at `\n`; a
/// preceding `\r` is stripped unless `preserve_carriage_returns`. The last
/// line may be unterminated and is still a line. Empty input yields zero
/// lines.
pub fn preprocess(raw: &[u8], options: &Options) -> Vec<LineData> {
    let mut lines = Vec::new();
    if raw.is_empty() {
        return lines;
    }

    let mut start = 0usize;
    let mut i = 0usize;
    while i < raw.len() {
        if raw[i] == b'\n' {
            let mut end = i;
            if !options.preserve_carriage_returns && end > start && raw[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(make_line(raw, start, end));
            start = i + 1;
        }
        i += 1;
    }
    if start < raw.len() {
        lines.push(make_line(raw, start, raw.len()));
    }

    prepare_occurrences(&mut lines, raw, options);
    lines
}

fn make_line(raw: &[u8], start: usize, end: usize) -> LineData {
    let length = end - start;
    let mut first_non_white_offset = length;
    for (offset, &b) in raw[start..end].iter().enumerate() {
        if !is_white(b) {
            first_non_white_offset = offset;
            break;
        }
    }
    LineData {
        start,
        length,
        first_non_white_offset,
        occurrence_count: 0,
    }
}

/// Stable key for occurrence counting: bytes after leading whitespace, with
/// interior whitespace runs collapsed to a single space.
fn occurrence_key(raw: &[u8], line: &LineData) -> Vec<u8> {
    let bytes = &raw[line.start + line.first_non_white_offset..line.start + line.length];
    let mut key = Vec::with_capacity(bytes.len());
    let mut in_white = false;
    for &b in bytes {
        if is_white(b) {
            if !in_white {
                key.push(b' ');
                in_white = true;
            }
        } else {
            key.push(b);
            in_white = false;
        }
    }
    key
}

fn prepare_occurrences(lines: &mut [LineData], raw: &[u8], _options: &Options) {
    let mut counts: HashMap<Vec<u8>, u32> = HashMap::with_capacity(lines.len());
    let keys: Vec<Vec<u8>> = lines.iter().map(|l| occurrence_key(raw, l)).collect();
    for key in &keys {
        *counts.entry(key.clone()).or_insert(0) += 1;
    }
    for (line, key) in lines.iter_mut().zip(keys.iter()) {
        line.occurrence_count = counts[key];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newline() {
        let opts = Options::default();
        let lines = preprocess(b"a\nb\nc\n", &opts);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].bytes(b"a\nb\nc\n"), b"a");
    }

    #[test]
    fn last_line_unterminated() {
        let opts = Options::default();
        let lines = preprocess(b"a\nb", &opts);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].bytes(b"a\nb"), b"b");
    }

    #[test]
    fn strips_cr_unless_preserved() {
        let raw = b"a\r\nb\r\n";
        let stripped = preprocess(raw, &Options::default());
        assert_eq!(stripped[0].bytes(raw), b"a");

        let opts = Options {
            preserve_carriage_returns: true,
            ..Options::default()
        };
        let preserved = preprocess(raw, &opts);
        assert_eq!(preserved[0].bytes(raw), b"a\r");
    }

    #[test]
    fn occurrence_count_groups_normalized_lines() {
        let raw = b"foo\nfoo\nbar\n  foo\n";
        let lines = preprocess(raw, &Options::default());
        assert_eq!(lines[0].occurrence_count, 3);
        assert_eq!(lines[2].occurrence_count, 1);
    }

    #[test]
    fn empty_input_yields_no_lines() {
        assert!(preprocess(b"", &Options::default()).is_empty());
    }
}
