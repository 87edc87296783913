//src/makedb.rs

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::blast::{run_tool, BlastRunner};
use crate::error::{BlastError, Result};

/// Extensions recognised as FASTA input.
pub const FASTA_EXTS: [&str; 4] = ["fa", "fas", "fsa", "fasta"];

/// Protein FASTA file stems end with this suffix (`F_HP_pep.fas`).
pub const PROTEIN_STEM_SUFFIX: &str = "_pep";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Nucleotide,
    Protein,
}

impl DbType {
    /// Value of `makeblastdb -dbtype`.
    pub fn as_arg(&self) -> &'static str {
        match self {
            DbType::Nucleotide => "nucl",
            DbType::Protein => "prot",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// One database produced by `build_databases`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltDatabase {
    pub source: PathBuf,
    /// Path to pass as `-db`.
    pub db: PathBuf,
    pub db_type: DbType,
}

/// Database type for a FASTA file name, or `None` if it is not FASTA.
pub fn db_type_for(path: &Path) -> Option<DbType> {
    let ext = path.extension()?.to_str()?;
    if !FASTA_EXTS.contains(&ext) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem.ends_with(PROTEIN_STEM_SUFFIX) {
        Some(DbType::Protein)
    } else {
        Some(DbType::Nucleotide)
    }
}

/// Run `makeblastdb` on every FASTA file in `data_dir`, writing the databases
/// to `db_dir` under the FASTA file name. Files are processed in name order
/// and the first failure stops the run.
pub fn build_databases(runner: &BlastRunner, data_dir: &Path, db_dir: &Path) -> Result<Vec<BuiltDatabase>> {
    if !data_dir.is_dir() {
        return Err(BlastError::MissingDataDir(data_dir.to_path_buf()));
    }
    std::fs::create_dir_all(db_dir)?;

    let mut inputs: Vec<(PathBuf, DbType)> = Vec::new();
    for entry in std::fs::read_dir(data_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match db_type_for(&path) {
            Some(db_type) => inputs.push((path, db_type)),
            None => log::debug!(target: runner.log_target(), "Skipping {}", path.display()),
        }
    }
    inputs.sort_by(|a, b| a.0.cmp(&b.0));

    let makeblastdb = runner.program_path("makeblastdb");
    let mut built = Vec::with_capacity(inputs.len());
    for (source, db_type) in inputs {
        // file_name is present: read_dir only yields named entries
        let name = source.file_name().unwrap_or_default();
        let db = db_dir.join(name);
        let args: Vec<OsString> = vec![
            "-in".into(),
            source.as_os_str().to_os_string(),
            "-out".into(),
            db.as_os_str().to_os_string(),
            "-dbtype".into(),
            db_type.as_arg().into(),
            "-parse_seqids".into(),
        ];

        log::info!(
            target: runner.log_target(),
            "Building {} database {}",
            db_type,
            db.display()
        );
        run_tool(&makeblastdb, &args, runner.log_target())?;
        built.push(BuiltDatabase { source, db, db_type });
    }

    log::info!(
        target: runner.log_target(),
        "BLAST databases built successfully ({})",
        built.len()
    );
    Ok(built)
}
