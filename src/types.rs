//src/types.rs

use crate::alignment::AlignmentView;

/// One parsed BLAST output file.
///
/// BLAST+ writes a single header query even for multi-query runs, so the
/// header pair (`query`, `query_length`) is the first query; every query,
/// including that one, also gets an `Iteration`.
#[derive(Debug, Clone)]
pub struct BlastReport {
    /// Program that produced the file (`blastn`, `tblastn`, ...).
    pub program: String,
    /// Database searched, as BLAST recorded it.
    pub database: String,
    pub query: String,
    pub query_length: u64,
    /// One entry per query sequence, in document order.
    pub iterations: Vec<Iteration>,
}

impl BlastReport {
    /// Total number of hits across all queries.
    pub fn hit_count(&self) -> usize {
        self.iterations.iter().map(|it| it.hits.len()).sum()
    }
}

/// Hits found for one query sequence.
#[derive(Debug, Clone)]
pub struct Iteration {
    pub query: String,
    pub query_length: u64,
    pub hits: Vec<Hit>,
}

impl Iteration {
    /// The best hit, which BLAST always lists first.
    pub fn best_hit(&self) -> Option<&Hit> {
        self.hits.first()
    }
}

/// One database subject sequence with at least one alignment to the query.
#[derive(Debug, Clone)]
pub struct Hit {
    /// `Hit_id`
    pub id: String,
    /// `Hit_def`
    pub definition: String,
    /// `Hit_accession`
    pub accession: String,
    /// Subject sequence length.
    pub length: u64,
    pub hsps: Vec<Hsp>,
}

impl Hit {
    /// The subject contig identifier.
    ///
    /// Databases built without `-parse_seqids` leave placeholder text such as
    /// "No definition line" in some of the identifier fields, so the last of
    /// (`id`, `accession`) that is not a placeholder wins.
    pub fn contig_id(&self) -> &str {
        [self.id.as_str(), self.accession.as_str()]
            .into_iter()
            .filter(|x| !x.to_lowercase().contains("no definition"))
            .last()
            .unwrap_or(self.id.as_str())
    }

    /// Product of the HSP e-values, or `None` for a hit without HSPs.
    pub fn evalue(&self) -> Option<f64> {
        if self.hsps.is_empty() {
            None
        } else {
            Some(self.hsps.iter().map(|hsp| hsp.evalue).product())
        }
    }

    /// Sum of the HSP bit scores (0 for a hit without HSPs).
    pub fn bitscore(&self) -> f64 {
        self.hsps.iter().fold(0.0, |acc, hsp| acc + hsp.bitscore)
    }
}

/// A single high-scoring pair: one local alignment within a hit.
#[derive(Debug, Clone)]
pub struct Hsp {
    pub bitscore: f64,
    pub evalue: f64,
    pub query_from: u64,
    pub query_to: u64,
    pub sub_from: u64,
    pub sub_to: u64,
    pub hit_frame: i32,
    pub identities: u64,
    pub positives: u64,
    pub gaps: u64,
    pub align_len: u64,
    pub align_query: String,
    pub align_subject: String,
    pub align_midline: String,

    /// Identities as a percentage of the query span.
    pub identity_pc: f64,
    /// Query span as a percentage of the parent hit length.
    pub query_cover: f64,
}

impl Hsp {
    /// Distance between the query coordinates (`query_to - query_from`).
    pub fn length(&self) -> u64 {
        self.query_to.abs_diff(self.query_from)
    }

    /// Fill in `identity_pc` and `query_cover` once the parent hit length is known.
    pub(crate) fn derive_stats(&mut self, parent_length: u64) {
        let span = self.length();
        self.identity_pc = percent(self.identities, span);
        self.query_cover = percent(span, parent_length);
    }

    /// The three aligned strings laid out in fixed-width blocks.
    pub fn alignment(&self) -> AlignmentView<'_> {
        AlignmentView::new(&self.align_query, &self.align_midline, &self.align_subject)
    }
}

/// `100 * part / whole`, kept within [0, 100]. A zero `whole` yields 0.
///
/// Coordinates are inclusive while the span is their difference, so a
/// gap-free HSP can count one identity more than its span.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (100.0 * part as f64 / whole as f64).clamp(0.0, 100.0)
}
