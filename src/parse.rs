//src/parse.rs

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use flate2::read::MultiGzDecoder;

use crate::error::{BlastError, Result};
use crate::types::{BlastReport, Hit, Hsp, Iteration};
use crate::xml::{parse_document, XmlElement};

/// Turns the text of one BLAST output file into a `BlastReport`.
///
/// Callers depend on this trait rather than on a concrete schema, so the
/// element names of a particular output format stay inside its implementor.
pub trait ReportParser {
    fn parse_str(&self, text: &str) -> Result<BlastReport>;

    /// Read `path` (gzip-compressed when it ends in `.gz`) and parse it.
    fn parse_file(&self, path: &Path) -> Result<BlastReport> {
        let text = read_to_string_maybe_gz(path)?;
        self.parse_str(&text)
    }
}

/// Parser for BLAST+ XML output (`-outfmt 5`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BlastXmlParser;

impl ReportParser for BlastXmlParser {
    fn parse_str(&self, text: &str) -> Result<BlastReport> {
        let root = parse_document(text)?;
        if root.name != "BlastOutput" {
            return Err(BlastError::MissingField {
                element: root.name,
                field: "BlastOutput".to_string(),
            });
        }

        let iterations = root
            .find_all("Iteration")
            .into_iter()
            .map(parse_iteration)
            .collect::<Result<Vec<_>>>()?;

        Ok(BlastReport {
            program: root.field_text("BlastOutput_program")?.trim().to_string(),
            database: root.field_text("BlastOutput_db")?.trim().to_string(),
            query: root.field_text("BlastOutput_query-def")?.trim().to_string(),
            query_length: number(&root, "BlastOutput_query-len")?,
            iterations,
        })
    }
}

/// Parse a BLAST XML file with the default parser.
pub fn parse_report_file<P: AsRef<Path>>(path: P) -> Result<BlastReport> {
    let path = path.as_ref();
    let report = BlastXmlParser.parse_file(path)?;
    log::debug!(
        "Parsed {}: {} iteration(s), {} hit(s)",
        path.display(),
        report.iterations.len(),
        report.hit_count()
    );
    Ok(report)
}

fn parse_iteration(el: &XmlElement) -> Result<Iteration> {
    let hits = el
        .find_all("Hit")
        .into_iter()
        .map(parse_hit)
        .collect::<Result<Vec<_>>>()?;

    Ok(Iteration {
        query: el.field_text("Iteration_query-def")?.trim().to_string(),
        query_length: number(el, "Iteration_query-len")?,
        hits,
    })
}

fn parse_hit(el: &XmlElement) -> Result<Hit> {
    let length: u64 = number(el, "Hit_len")?;
    let hsps = el
        .find_all("Hsp")
        .into_iter()
        .map(|hsp| parse_hsp(hsp, length))
        .collect::<Result<Vec<_>>>()?;

    Ok(Hit {
        id: el.field_text("Hit_id")?.trim().to_string(),
        definition: el.field_text("Hit_def")?.trim().to_string(),
        accession: el.field_text("Hit_accession")?.trim().to_string(),
        length,
        hsps,
    })
}

fn parse_hsp(el: &XmlElement, hit_length: u64) -> Result<Hsp> {
    let mut hsp = Hsp {
        bitscore: number(el, "Hsp_bit-score")?,
        evalue: number(el, "Hsp_evalue")?,
        query_from: number(el, "Hsp_query-from")?,
        query_to: number(el, "Hsp_query-to")?,
        sub_from: number(el, "Hsp_hit-from")?,
        sub_to: number(el, "Hsp_hit-to")?,
        hit_frame: number(el, "Hsp_hit-frame")?,
        identities: number(el, "Hsp_identity")?,
        positives: number(el, "Hsp_positive")?,
        gaps: number(el, "Hsp_gaps")?,
        align_len: number(el, "Hsp_align-len")?,
        align_query: el.field_text("Hsp_qseq")?.to_string(),
        align_subject: el.field_text("Hsp_hseq")?.to_string(),
        align_midline: el.field_text("Hsp_midline")?.to_string(),
        identity_pc: 0.0,
        query_cover: 0.0,
    };
    hsp.derive_stats(hit_length);
    Ok(hsp)
}

/// Parse the text of `field` with Rust's own (locale-independent) number parsing.
fn number<T: FromStr>(el: &XmlElement, field: &str) -> Result<T> {
    let raw = el.field_text(field)?.trim();
    raw.parse().map_err(|_| BlastError::InvalidNumber {
        field: field.to_string(),
        value: raw.to_string(),
    })
}

fn read_to_string_maybe_gz(path: &Path) -> Result<String> {
    let f = File::open(path)?;
    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let mut reader: Box<dyn Read> = if is_gz {
        Box::new(MultiGzDecoder::new(BufReader::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };

    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const TWO_QUERIES: &str = include_str!("../tests/data/blastn_two_queries.xml");

    fn single_hsp_doc(hsp_body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<BlastOutput>
  <BlastOutput_program>tblastn</BlastOutput_program>
  <BlastOutput_db>blast/db/F_HP_pep.fas</BlastOutput_db>
  <BlastOutput_query-def>q1</BlastOutput_query-def>
  <BlastOutput_query-len>300</BlastOutput_query-len>
  <BlastOutput_iterations>
    <Iteration>
      <Iteration_query-def>q1</Iteration_query-def>
      <Iteration_query-len>300</Iteration_query-len>
      <Iteration_hits>
        <Hit>
          <Hit_id>contig_1</Hit_id>
          <Hit_def>No definition line</Hit_def>
          <Hit_accession>contig_1</Hit_accession>
          <Hit_len>500</Hit_len>
          <Hit_hsps>
            <Hsp>{}</Hsp>
          </Hit_hsps>
        </Hit>
      </Iteration_hits>
    </Iteration>
  </BlastOutput_iterations>
</BlastOutput>"#,
            hsp_body
        )
    }

    const SAMPLE_HSP: &str = "<Hsp_bit-score>150.0</Hsp_bit-score>\
        <Hsp_evalue>1e-40</Hsp_evalue>\
        <Hsp_query-from>10</Hsp_query-from>\
        <Hsp_query-to>110</Hsp_query-to>\
        <Hsp_hit-from>1</Hsp_hit-from>\
        <Hsp_hit-to>101</Hsp_hit-to>\
        <Hsp_hit-frame>2</Hsp_hit-frame>\
        <Hsp_identity>95</Hsp_identity>\
        <Hsp_positive>97</Hsp_positive>\
        <Hsp_gaps>1</Hsp_gaps>\
        <Hsp_align-len>101</Hsp_align-len>\
        <Hsp_qseq>MKV</Hsp_qseq>\
        <Hsp_hseq>MRV</Hsp_hseq>\
        <Hsp_midline>M V</Hsp_midline>";

    #[test]
    fn header_fields() {
        let report = BlastXmlParser.parse_str(TWO_QUERIES).unwrap();
        assert_eq!(report.program, "blastn");
        assert_eq!(report.database, "blast/db/f_hp.fas");
        assert_eq!(report.query, "contig_M_1 len=120");
        assert_eq!(report.query_length, 120);
    }

    #[test]
    fn hierarchy_keeps_counts_and_order() {
        let report = BlastXmlParser.parse_str(TWO_QUERIES).unwrap();
        assert_eq!(report.iterations.len(), 2);
        assert_eq!(report.hit_count(), 2);

        let first = &report.iterations[0];
        assert_eq!(first.query, "contig_M_1 len=120");
        assert_eq!(first.query_length, 120);
        let ids: Vec<&str> = first.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["contig_F_7", "contig_F_12"]);
        assert_eq!(first.hits[0].hsps.len(), 2);
        assert_eq!(first.hits[1].hsps.len(), 1);
        assert_eq!(first.hits[0].hsps[0].query_from, 10);
        assert_eq!(first.hits[0].hsps[1].query_from, 111);

        let second = &report.iterations[1];
        assert_eq!(second.query, "contig_M_2 len=90");
        assert!(second.hits.is_empty());
    }

    #[test]
    fn hsp_fields_and_derived_stats() {
        let report = BlastXmlParser.parse_str(TWO_QUERIES).unwrap();
        let hit = &report.iterations[0].hits[0];
        assert_eq!(hit.length, 500);
        assert_eq!(hit.contig_id(), "contig_F_7");

        let hsp = &hit.hsps[0];
        assert!((hsp.bitscore - 176.4).abs() < 1e-9);
        assert!((hsp.evalue - 2e-45).abs() < 1e-55);
        assert_eq!((hsp.sub_from, hsp.sub_to), (201, 301));
        assert_eq!(hsp.hit_frame, 1);
        assert_eq!(hsp.identities, 95);
        assert_eq!(hsp.align_len, 101);
        assert_eq!(hsp.align_query.len(), 101);
        assert_eq!(hsp.align_midline.len(), 101);
        assert_eq!(hsp.identity_pc, 95.0);
        assert_eq!(hsp.query_cover, 20.0);

        let minus = &report.iterations[0].hits[1].hsps[0];
        assert_eq!(minus.hit_frame, -1);
        assert_eq!((minus.sub_from, minus.sub_to), (700, 640));
        assert_eq!(minus.gaps, 2);
        assert_eq!(minus.query_cover, 7.5);
    }

    #[test]
    fn hit_aggregates() {
        let report = BlastXmlParser.parse_str(TWO_QUERIES).unwrap();
        let hit = &report.iterations[0].hits[0];
        let evalue = hit.evalue().unwrap();
        assert!((evalue - 6e-55).abs() < 1e-65);
        assert!((hit.bitscore() - 236.4).abs() < 1e-9);
    }

    #[test]
    fn percentages_within_bounds() {
        let report = BlastXmlParser.parse_str(TWO_QUERIES).unwrap();
        for hit in &report.iterations[0].hits {
            for hsp in &hit.hsps {
                assert!((0.0..=100.0).contains(&hsp.identity_pc));
                assert!((0.0..=100.0).contains(&hsp.query_cover));
            }
        }
    }

    #[test]
    fn sample_hsp_identity_and_cover() {
        let report = BlastXmlParser.parse_str(&single_hsp_doc(SAMPLE_HSP)).unwrap();
        let hsp = &report.iterations[0].hits[0].hsps[0];
        assert_eq!(hsp.identity_pc, 95.0);
        assert_eq!(hsp.query_cover, 20.0);
        assert_eq!(hsp.positives, 97);
        assert_eq!(hsp.hit_frame, 2);
        assert_eq!(hsp.align_midline, "M V");
    }

    #[test]
    fn missing_hsp_field_fails_loudly() {
        let body = SAMPLE_HSP.replace("<Hsp_evalue>1e-40</Hsp_evalue>", "");
        match BlastXmlParser.parse_str(&single_hsp_doc(&body)) {
            Err(BlastError::MissingField { element, field }) => {
                assert_eq!(element, "Hsp");
                assert_eq!(field, "Hsp_evalue");
            }
            other => panic!("expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn malformed_number_fails_loudly() {
        let body = SAMPLE_HSP.replace(">10</Hsp_query-from>", ">1,0</Hsp_query-from>");
        match BlastXmlParser.parse_str(&single_hsp_doc(&body)) {
            Err(BlastError::InvalidNumber { field, value }) => {
                assert_eq!(field, "Hsp_query-from");
                assert_eq!(value, "1,0");
            }
            other => panic!("expected InvalidNumber, got {:?}", other),
        }
    }

    #[test]
    fn hit_without_hsps_is_tolerated() {
        let doc = single_hsp_doc("").replace("<Hsp></Hsp>", "");
        let report = BlastXmlParser.parse_str(&doc).unwrap();
        let hit = &report.iterations[0].hits[0];
        assert!(hit.hsps.is_empty());
        assert_eq!(hit.evalue(), None);
        assert_eq!(hit.bitscore(), 0.0);
    }

    #[test]
    fn other_documents_are_rejected() {
        let err = BlastXmlParser
            .parse_str("<not_blast>some garbage</not_blast>")
            .unwrap_err();
        assert!(err.to_string().contains("BlastOutput"));
    }

    #[test]
    fn reads_plain_and_gzipped_files() {
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("blastout_q.xml");
        std::fs::write(&plain, TWO_QUERIES).unwrap();
        assert_eq!(parse_report_file(&plain).unwrap().iterations.len(), 2);

        let gz = dir.path().join("blastout_q.xml.gz");
        let mut enc = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        enc.write_all(TWO_QUERIES.as_bytes()).unwrap();
        enc.finish().unwrap();
        assert_eq!(parse_report_file(&gz).unwrap().hit_count(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            parse_report_file("does/not/exist.xml"),
            Err(BlastError::Io(_))
        ));
    }
}
