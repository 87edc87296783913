//src/blast.rs

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;

use crate::error::{BlastError, Result};
use crate::fasta::{write_record, write_single};
use crate::parse::parse_report_file;
use crate::types::BlastReport;

/// E-value threshold passed as `-evalue`.
pub const DEFAULT_EVALUE: f64 = 1e-50;

/// Passed as `-max_target_seqs`.
pub const DEFAULT_MAX_TARGET_SEQS: u32 = 10;

/// Where output XML and per-sequence query files go by default.
pub const DEFAULT_OUT_DIR: &str = "blast";

/// Log target used when a runner is not given one.
pub const DEFAULT_LOG_TARGET: &str = "blasthunter::blast";

/// Files `makeblastdb` always writes for a nucleotide or protein database.
/// Multi-volume databases only have the alias file (`.nal` / `.pal`).
pub const DB_SENTINEL_EXTENSIONS: [&str; 6] = ["nhr", "nin", "nal", "phr", "pin", "pal"];

/// Settings shared by every invocation of one runner.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub evalue: f64,
    pub max_target_seqs: u32,
    /// `-num_threads`; left to BLAST when `None`.
    pub num_threads: Option<u32>,
    pub out_dir: PathBuf,
    /// Directory holding the BLAST executables; `PATH` is searched when `None`.
    pub bin_dir: Option<PathBuf>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            evalue: DEFAULT_EVALUE,
            max_target_seqs: DEFAULT_MAX_TARGET_SEQS,
            num_threads: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            bin_dir: None,
        }
    }
}

/// Runs BLAST+ programs synchronously with a fixed set of flags.
///
/// Every log record a runner emits goes to its own target, so callers
/// choose how a run is labelled (and filtered) without touching global state.
#[derive(Debug, Clone)]
pub struct BlastRunner {
    options: SearchOptions,
    log_target: String,
}

impl Default for BlastRunner {
    fn default() -> Self {
        Self::new(SearchOptions::default())
    }
}

impl BlastRunner {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            options,
            log_target: DEFAULT_LOG_TARGET.to_string(),
        }
    }

    pub fn with_log_target(mut self, target: impl Into<String>) -> Self {
        self.log_target = target.into();
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    /// Full path of `program`, inside `bin_dir` when one is configured.
    pub fn program_path(&self, program: &str) -> PathBuf {
        match &self.options.bin_dir {
            Some(dir) => dir.join(program),
            None => PathBuf::from(program),
        }
    }

    /// `<out_dir>/blastout_<query file name>.xml`
    pub fn output_path_for(&self, query: &Path) -> PathBuf {
        let name = query
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "query".to_string());
        self.options.out_dir.join(format!("blastout_{}.xml", name))
    }

    /// Search `query` against `db`, writing XML to the default output path.
    pub fn search(&self, program: &str, query: &Path, db: &Path) -> Result<PathBuf> {
        let out = self.output_path_for(query);
        self.search_to(program, query, db, &out)
    }

    /// Search `query` against `db`, writing XML to `out`.
    ///
    /// Both inputs are checked before anything is spawned. On success the
    /// output path is returned for parsing.
    pub fn search_to(&self, program: &str, query: &Path, db: &Path, out: &Path) -> Result<PathBuf> {
        if !database_exists(db) {
            return Err(BlastError::MissingDatabase(db.to_path_buf()));
        }
        if !query.exists() {
            return Err(BlastError::MissingQuery(query.to_path_buf()));
        }
        ensure_parent(out)?;

        let mut args = vec![
            OsString::from("-db"),
            db.as_os_str().to_os_string(),
            OsString::from("-query"),
            query.as_os_str().to_os_string(),
        ];
        args.extend(self.common_args(out));
        if let Some(threads) = self.options.num_threads {
            args.push("-num_threads".into());
            args.push(threads.to_string().into());
        }

        log::info!(
            target: self.log_target.as_str(),
            "Running {} on {} against {}",
            program,
            query.display(),
            db.display()
        );
        run_tool(&self.program_path(program), &args, &self.log_target)?;
        Ok(out.to_path_buf())
    }

    /// Write one sequence to `<out_dir>/query_<id>.fas`, search it against
    /// `db` and parse `<out_dir>/blastout_<id>.xml`.
    pub fn search_sequence(&self, program: &str, seq_id: &str, sequence: &str, db: &Path) -> Result<BlastReport> {
        let stem = file_safe(seq_id);
        let query = self.options.out_dir.join(format!("query_{}.fas", stem));
        let out = self.options.out_dir.join(format!("blastout_{}.xml", stem));

        std::fs::create_dir_all(&self.options.out_dir)?;
        write_single(&query, seq_id, sequence)?;
        self.search_to(program, &query, db, &out)?;
        parse_report_file(&out)
    }

    /// Align two raw sequences without a database (`-subject`).
    ///
    /// Both sequences go to temporary FASTA files which are removed when this
    /// function returns, whether or not BLAST succeeded.
    pub fn pairwise(&self, program: &str, query: (&str, &str), subject: (&str, &str), out: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.options.out_dir)?;
        let query_file = temp_fasta(&self.options.out_dir, "query_", query.0, query.1)?;
        let subject_file = temp_fasta(&self.options.out_dir, "subject_", subject.0, subject.1)?;
        ensure_parent(out)?;

        let mut args = vec![
            OsString::from("-query"),
            query_file.path().as_os_str().to_os_string(),
            OsString::from("-subject"),
            subject_file.path().as_os_str().to_os_string(),
        ];
        args.extend(self.common_args(out));

        log::info!(
            target: self.log_target.as_str(),
            "Running {} on {} vs {}",
            program,
            query.0,
            subject.0
        );
        run_tool(&self.program_path(program), &args, &self.log_target)?;
        Ok(out.to_path_buf())
    }

    /// `-out`, `-outfmt 5`, `-evalue`, `-max_target_seqs`
    fn common_args(&self, out: &Path) -> Vec<OsString> {
        vec![
            "-out".into(),
            out.as_os_str().to_os_string(),
            "-outfmt".into(),
            "5".into(),
            "-evalue".into(),
            format!("{:E}", self.options.evalue).into(),
            "-max_target_seqs".into(),
            self.options.max_target_seqs.to_string().into(),
        ]
    }
}

/// True when any sentinel file of the database `db` exists.
pub fn database_exists(db: &Path) -> bool {
    DB_SENTINEL_EXTENSIONS
        .iter()
        .any(|ext| with_suffix(db, ext).exists())
}

/// `db` with `.ext` appended (not replacing an existing extension such as `.fas`).
fn with_suffix(db: &Path, ext: &str) -> PathBuf {
    let mut s = db.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn ensure_parent(out: &Path) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn temp_fasta(dir: &Path, prefix: &str, id: &str, seq: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".fas")
        .tempfile_in(dir)?;
    write_record(file.as_file_mut(), id, seq)?;
    Ok(file)
}

/// Sequence ids such as `TRINITY_DN10|c0_g1` reused as file name parts.
pub(crate) fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// Run an external tool to completion, turning a non-zero exit into
/// `ProcessFailed` with the captured stderr.
pub(crate) fn run_tool(program: &Path, args: &[OsString], log_target: &str) -> Result<()> {
    log::debug!(target: log_target, "{} {}", program.display(), join_args(args));

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| BlastError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        log::error!(target: log_target, "{} failed: {}", program.display(), stderr.trim());
        return Err(BlastError::ProcessFailed {
            program: program.to_path_buf(),
            status: output.status.code(),
            stderr,
        });
    }
    Ok(())
}

fn join_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
