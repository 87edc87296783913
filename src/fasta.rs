//src/fasta.rs

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use ahash::AHashMap;
use flate2::read::MultiGzDecoder;

use crate::error::Result;

/// One FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// First whitespace-separated token of the header.
    pub id: String,
    /// Full header line without the leading '>'.
    pub description: String,
    pub seq: String,
}

/// Records of one FASTA file, in file order.
#[derive(Debug, Clone, Default)]
pub struct FastaRecords {
    pub records: Vec<FastaRecord>,
}

impl FastaRecords {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FastaRecord> {
        self.records.iter()
    }

    /// Lookup by id. When an id repeats, the first record keeps it.
    pub fn by_id(&self) -> AHashMap<&str, &FastaRecord> {
        let mut index = AHashMap::with_capacity(self.records.len());
        for rec in &self.records {
            index.entry(rec.id.as_str()).or_insert(rec);
        }
        index
    }
}

impl<'a> IntoIterator for &'a FastaRecords {
    type Item = &'a FastaRecord;
    type IntoIter = std::slice::Iter<'a, FastaRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Read a FASTA file; `.gz` files are decompressed on the fly.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<FastaRecords> {
    let path = path.as_ref();
    let f = File::open(path)?;

    let is_gz = path
        .extension()
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::new(f))
    };

    let records = parse_records(reader)?;
    log::debug!("Read {} FASTA record(s) from {}", records.len(), path.display());
    Ok(records)
}

fn parse_records<R: BufRead>(reader: R) -> Result<FastaRecords> {
    let mut records = Vec::new();
    let mut current: Option<FastaRecord> = None;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('>') {
            if let Some(done) = current.take() {
                records.push(done);
            }
            let header = header.trim();
            current = Some(FastaRecord {
                id: header.split_whitespace().next().unwrap_or("").to_string(),
                description: header.to_string(),
                seq: String::new(),
            });
        } else if let Some(rec) = current.as_mut() {
            rec.seq.push_str(line.trim());
        }
        // sequence lines before the first header are ignored
    }
    if let Some(done) = current {
        records.push(done);
    }

    Ok(FastaRecords { records })
}

/// Write a one-record FASTA file.
pub fn write_single<P: AsRef<Path>>(path: P, id: &str, seq: &str) -> Result<()> {
    let mut f = File::create(path)?;
    write_record(&mut f, id, seq)?;
    Ok(())
}

pub(crate) fn write_record<W: Write>(w: &mut W, id: &str, seq: &str) -> std::io::Result<()> {
    writeln!(w, ">{}", id)?;
    writeln!(w, "{}", seq)?;
    w.flush()
}
