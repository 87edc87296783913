//src/report.rs

use std::fmt::Write as FmtWrite;
use std::path::Path;

use crate::error::Result;
use crate::types::{BlastReport, Hsp};

/// Header of the per-query CSV summary.
pub const CSV_HEADER: &str =
    "Query,Length,Hit,E-value,Bitscore,Identity_percent,Alignment_length,Qcover_percent";

/// Written in place of the hit columns for a query without hits.
pub const NO_HITS_SENTINEL: &str = "No significant hits,,,,,";

/// Column width of the HSP statistics table.
const COLUMN: usize = 25;

/// Human-readable report of every query, hit and HSP.
pub fn render_report(report: &BlastReport) -> String {
    let mut out = String::new();
    writeln!(out, "### Output from {} ###", report.program).unwrap();
    writeln!(out, "DB:    {}", report.database).unwrap();
    writeln!(out, "Iterations:  {}", report.iterations.len()).unwrap();
    writeln!(out).unwrap();

    for (i, it) in report.iterations.iter().enumerate() {
        writeln!(out, "{}", "=".repeat(80)).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "Iteration {}: {} ({} bp)", i + 1, it.query, it.query_length).unwrap();
        writeln!(out).unwrap();
        writeln!(out, "Hits:  {}", it.hits.len()).unwrap();
        if it.hits.is_empty() {
            writeln!(out, "No hits found").unwrap();
            writeln!(out).unwrap();
            continue;
        }

        for (j, hit) in it.hits.iter().enumerate() {
            writeln!(out, "Hit {}: {} ({} bp)", j + 1, hit.contig_id(), hit.length).unwrap();
            writeln!(out, "{} HSPs", hit.hsps.len()).unwrap();
            writeln!(out).unwrap();
            for (k, hsp) in hit.hsps.iter().enumerate() {
                writeln!(out, "HSP {}", k + 1).unwrap();
                write_hsp_table(&mut out, hsp);
                writeln!(out).unwrap();
                writeln!(out, "{}", hsp.alignment()).unwrap();
                writeln!(out).unwrap();
                writeln!(out).unwrap();
            }
            writeln!(out).unwrap();
        }
    }
    out
}

/// The three statistic lines of one HSP, in `COLUMN`-wide columns.
fn write_hsp_table(out: &mut String, hsp: &Hsp) {
    let rows = [
        [
            format!("Identity:   {:.0}%", hsp.identity_pc),
            format!("E-value:  {}", format_sci(hsp.evalue, 2)),
            format!("Q-cover: {:.1}%", hsp.query_cover),
        ],
        [
            format!("Identities: {}/{}", hsp.identities, hsp.length()),
            format!("Bitscore: {}", hsp.bitscore),
            format!("Q-range: {}:{}", hsp.query_from, hsp.query_to),
        ],
        [
            format!("Frame:      {}", hsp.hit_frame),
            format!("Gaps:     {}", hsp.gaps),
            format!("S-range: {}:{}", hsp.sub_from, hsp.sub_to),
        ],
    ];
    for [a, b, c] in rows {
        writeln!(out, "{:<w$}{:<w$}{}", a, b, c, w = COLUMN).unwrap();
    }
}

/// One CSV row per query from its first hit and that hit's first HSP.
pub fn render_csv(report: &BlastReport) -> String {
    let mut out = String::new();
    writeln!(out, "{}", CSV_HEADER).unwrap();

    for it in &report.iterations {
        write!(out, "{},{},", csv_field(&it.query), it.query_length).unwrap();
        let Some(hit) = it.best_hit() else {
            writeln!(out, "{}", NO_HITS_SENTINEL).unwrap();
            continue;
        };

        let evalue = hit.evalue().map(|e| format_sci(e, 2)).unwrap_or_default();
        write!(out, "{},{},{:.1},", csv_field(hit.contig_id()), evalue, hit.bitscore()).unwrap();
        match hit.hsps.first() {
            Some(hsp) => writeln!(
                out,
                "{:.2},{},{:.2}",
                hsp.identity_pc, hsp.align_len, hsp.query_cover
            )
            .unwrap(),
            None => writeln!(out, ",,").unwrap(),
        }
    }
    out
}

/// Write `render_csv` output to `path`.
pub fn write_csv<P: AsRef<Path>>(report: &BlastReport, path: P) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, render_csv(report))?;
    log::info!("Output written to {}.", path.display());
    Ok(())
}

/// Quote a CSV field when it contains a separator or a quote.
pub(crate) fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// C-style scientific notation: `1.00e-50`, `2.50e+03`.
///
/// Rust prints `1.00e-50` and `2.50e3`; the exponent gets an explicit sign
/// and at least two digits here.
pub fn format_sci(value: f64, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    let Some((mantissa, exp)) = raw.split_once('e') else {
        return raw;
    };
    let (sign, digits) = match exp.strip_prefix('-') {
        Some(d) => ('-', d),
        None => ('+', exp),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}
