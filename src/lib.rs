// src/lib.rs
pub mod alignment;
pub mod blast;
pub mod error;
pub mod fasta;
pub mod makedb;
pub mod parse;
pub mod report;
pub mod types;
pub mod xml;

use std::fmt::Write as FmtWrite;
use std::path::Path;

pub use crate::blast::{BlastRunner, SearchOptions};
pub use crate::error::{BlastError, Result};
pub use crate::parse::{parse_report_file, BlastXmlParser, ReportParser};
pub use crate::report::{render_csv, render_report, write_csv};
pub use crate::types::{BlastReport, Hit, Hsp, Iteration};

use ahash::AHashMap;

use crate::blast::file_safe;
use crate::fasta::read_fasta;
use crate::report::{csv_field, format_sci};

/// Header of the hunt CSV.
pub const HUNT_CSV_HEADER: &str =
    "Contig_id,E-value,Bitscore,Identities,Positives,Align length,Q-cover %";

/// Best hit of one query, as one row of the hunt CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct HuntRow {
    pub query: String,
    pub contig_id: String,
    pub evalue: f64,
    pub bitscore: f64,
    pub identities: u64,
    pub positives: u64,
    /// Query span of the HSP.
    pub length: u64,
    pub query_cover: f64,
}

impl HuntRow {
    /// Row from the first hit and its first HSP, if the query has both.
    pub fn from_iteration(query: &str, it: &Iteration) -> Option<Self> {
        let hit = it.best_hit()?;
        let hsp = hit.hsps.first()?;
        Some(Self {
            query: query.to_string(),
            contig_id: hit.contig_id().to_string(),
            evalue: hsp.evalue,
            bitscore: hsp.bitscore,
            identities: hsp.identities,
            positives: hsp.positives,
            length: hsp.length(),
            query_cover: hsp.query_cover,
        })
    }
}

/// Outcome of `hunt`: one row per query with a hit, CSV generated on demand.
#[derive(Debug, Clone, Default)]
pub struct HuntResults {
    pub rows: Vec<HuntRow>,
    /// Queries searched.
    pub searched: usize,
    /// Queries without a usable hit.
    pub without_hits: Vec<String>,
}

impl HuntResults {
    /// Generate the hunt CSV text on demand
    pub fn get_csv(&self) -> String {
        let mut output = String::new();
        writeln!(output, "{}", HUNT_CSV_HEADER).unwrap();
        for row in &self.rows {
            writeln!(
                output,
                "{},{},{:.0},{},{},{},{:.0}",
                csv_field(&row.contig_id),
                format_sci(row.evalue, 2),
                row.bitscore,
                row.identities,
                row.positives,
                row.length,
                row.query_cover
            )
            .unwrap();
        }
        output
    }
}

/// Search every record of `fasta_path` against `db` and keep each query's best hit.
///
/// Query files and XML outputs are left in the runner's output directory so
/// they can be parsed again later with `parse_report_file`.
pub fn hunt(runner: &BlastRunner, program: &str, fasta_path: &Path, db: &Path) -> Result<HuntResults> {
    let records = read_fasta(fasta_path)?;
    let target = runner.log_target();
    log::info!(
        target: target,
        "Hunting {} queries from {} with {} against {}",
        records.len(),
        fasta_path.display(),
        program,
        db.display()
    );

    let mut results = HuntResults::default();
    let mut stems: AHashMap<String, String> = AHashMap::new();
    for rec in &records {
        if let Some(earlier) = claim_stem(&mut stems, &rec.id) {
            log::warn!(
                target: target,
                "{} and {} share the file name query_{}.fas; the output of {} is overwritten",
                earlier,
                rec.id,
                file_safe(&rec.id),
                earlier
            );
        }
        let report = runner.search_sequence(program, &rec.id, &rec.seq, db)?;
        results.searched += 1;

        let row = report
            .iterations
            .first()
            .and_then(|it| HuntRow::from_iteration(&rec.id, it));
        match row {
            Some(row) => results.rows.push(row),
            None => {
                log::info!(target: target, "No significant hits for {}", rec.id);
                results.without_hits.push(rec.id.clone());
            }
        }
    }

    log::info!(
        target: target,
        "{} of {} queries had hits",
        results.rows.len(),
        results.searched
    );
    Ok(results)
}

/// Record that `id` uses its file-safe stem; returns the earlier id that
/// already used the same stem, if any.
fn claim_stem(stems: &mut AHashMap<String, String>, id: &str) -> Option<String> {
    let stem = file_safe(id);
    if let Some(earlier) = stems.get(&stem) {
        return (earlier != id).then(|| earlier.clone());
    }
    stems.insert(stem, id.to_string());
    None
}
