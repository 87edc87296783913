//src/alignment.rs

use std::fmt;

/// Characters per alignment block.
pub const BLOCK_WIDTH: usize = 80;

/// Tick pattern repeated under the position labels, one per 10 columns.
const TICKS: &str = "|....:....";

/// Two-line positional ruler, one item per alignment block.
///
/// The first line labels every tenth column with its 0-based alignment
/// position, the second draws `|....:....` ticks. The iterator never ends;
/// `AlignmentView` stops pulling from it once the sequences run out.
#[derive(Debug, Clone)]
pub struct ScaleBar {
    width: usize,
    offset: usize,
}

impl ScaleBar {
    pub fn new(width: usize) -> Self {
        Self { width, offset: 0 }
    }
}

impl Default for ScaleBar {
    fn default() -> Self {
        Self::new(BLOCK_WIDTH)
    }
}

impl Iterator for ScaleBar {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let labels: String = (0..self.width)
            .step_by(10)
            .map(|i| format!("{:<10}", self.offset + i))
            .collect();
        let ticks = TICKS.repeat(self.width.div_ceil(10));
        self.offset += self.width;
        Some(format!("{labels}\n{ticks}"))
    }
}

/// The query, midline and subject strings of one HSP laid out in blocks.
///
/// Every block is the ruler, then `width` characters of query, midline and
/// subject. Blocks are separated by a blank line.
#[derive(Debug, Clone, Copy)]
pub struct AlignmentView<'a> {
    query: &'a str,
    midline: &'a str,
    subject: &'a str,
    width: usize,
}

impl<'a> AlignmentView<'a> {
    pub fn new(query: &'a str, midline: &'a str, subject: &'a str) -> Self {
        Self { query, midline, subject, width: BLOCK_WIDTH }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Rendered blocks; stops at the shortest of the three strings.
    pub fn blocks(&self) -> Vec<String> {
        let query = wrap(self.query, self.width);
        let midline = wrap(self.midline, self.width);
        let subject = wrap(self.subject, self.width);

        ScaleBar::new(self.width)
            .zip(query.iter().zip(midline.iter()).zip(subject.iter()))
            .map(|(scale, ((q, m), s))| format!("{scale}\n{q}\n{m}\n{s}"))
            .collect()
    }
}

impl fmt::Display for AlignmentView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.blocks().join("\n\n"))
    }
}

/// Split `s` into pieces of `n` characters; the last may be shorter (or empty).
fn wrap(s: &str, n: usize) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = s;
    loop {
        match rest.char_indices().nth(n) {
            Some((cut, _)) => {
                lines.push(&rest[..cut]);
                rest = &rest[cut..];
            }
            None => {
                lines.push(rest);
                return lines;
            }
        }
    }
}
