//src/error.rs

use std::path::PathBuf;

/// Everything that can go wrong between handing a query to BLAST and reading
/// its XML back.
#[derive(thiserror::Error, Debug)]
pub enum BlastError {
    /// The query FASTA file does not exist.
    #[error("query file \"{}\" not found", .0.display())]
    MissingQuery(PathBuf),

    /// None of the sentinel files of a BLAST database exist.
    #[error("no BLAST DB found for \"{}\"", .0.display())]
    MissingDatabase(PathBuf),

    /// The directory scanned for FASTA files does not exist.
    #[error("data directory \"{}\" not found", .0.display())]
    MissingDataDir(PathBuf),

    /// The external program could not be started at all.
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external program ran and exited with a non-zero status.
    #[error("{} exited with status {}: {}", .program.display(), status_label(.status), .stderr.trim())]
    ProcessFailed {
        program: PathBuf,
        status: Option<i32>,
        stderr: String,
    },

    /// An element the report schema requires is absent.
    #[error("missing <{field}> in <{element}>")]
    MissingField { element: String, field: String },

    /// A numeric element holds text that does not parse.
    #[error("invalid number in <{field}>: '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlastError>;

fn status_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
