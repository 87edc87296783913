use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use blasthunter::fasta::read_fasta;
use blasthunter::makedb::build_databases;
use blasthunter::{hunt, parse_report_file, render_report, write_csv, BlastReport, BlastRunner, SearchOptions};

/// Reports with more queries than this are long to print.
const MANY_QUERIES: usize = 5;

#[derive(Parser)]
#[command(name = "blasthunter", version, about = "Run BLAST+ and summarise its XML output")]
struct Cli {
    /// Directory holding the BLAST+ executables (default: search PATH)
    #[arg(long, global = true, env = "BLAST_BIN_DIR")]
    blast_bin_dir: Option<PathBuf>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a BLAST database for every FASTA file in a directory
    BuildDbs {
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        #[arg(long, default_value = "blast/db")]
        db_dir: PathBuf,
    },
    /// Search a query file against a database and print the report
    Search {
        #[command(flatten)]
        target: SearchTarget,
        #[arg(long)]
        query: PathBuf,
        /// Also write the per-query CSV summary
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Do not print the text report
        #[arg(long)]
        quiet: bool,
    },
    /// Align two sequences without a database
    Pairwise {
        #[arg(long)]
        program: String,
        #[arg(long, requires = "subject_seq", conflicts_with = "fasta")]
        query_seq: Option<String>,
        #[arg(long, requires = "query_seq")]
        subject_seq: Option<String>,
        /// FASTA file holding both sequences
        #[arg(long, requires_all = ["query_id", "subject_id"])]
        fasta: Option<PathBuf>,
        #[arg(long)]
        query_id: Option<String>,
        #[arg(long)]
        subject_id: Option<String>,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value = "blast")]
        out_dir: PathBuf,
    },
    /// Render an existing BLAST XML output
    Report {
        xml: PathBuf,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Search every FASTA record against a database and keep the best hits
    Hunt {
        #[command(flatten)]
        target: SearchTarget,
        #[arg(long)]
        fasta: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct SearchTarget {
    /// blastn, blastp, blastx, tblastn or tblastx
    #[arg(long)]
    program: String,
    #[arg(long)]
    db: PathBuf,
    #[arg(long, default_value = "blast")]
    out_dir: PathBuf,
    #[arg(long)]
    threads: Option<u32>,
}

fn spinner(color: &str, msg: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message(msg.into());
    spinner
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn runner(bin_dir: Option<PathBuf>, out_dir: PathBuf, threads: Option<u32>) -> BlastRunner {
    BlastRunner::new(SearchOptions {
        num_threads: threads,
        out_dir,
        bin_dir,
        ..Default::default()
    })
    .with_log_target("blasthunter")
}

fn print_report(report: &BlastReport) {
    if report.iterations.len() > MANY_QUERIES {
        log::warn!(
            "Report holds {} queries; printing all of them",
            report.iterations.len()
        );
    }
    print!("{}", render_report(report));
}

fn load_report(xml: &Path) -> anyhow::Result<BlastReport> {
    parse_report_file(xml).with_context(|| format!("could not parse {}", xml.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let bin_dir = cli.blast_bin_dir;

    match cli.command {
        Command::BuildDbs { data_dir, db_dir } => {
            let spinner = spinner("blue", format!("Building databases from {}...", data_dir.display()));
            let runner = runner(bin_dir, PathBuf::from("blast"), None);
            let built = build_databases(&runner, &data_dir, &db_dir)
                .context("makeblastdb failed")?;
            spinner.finish_with_message(format!("Built {} database(s) in {}.", built.len(), db_dir.display()));
        }
        Command::Search { target, query, csv, quiet } => {
            let runner = runner(bin_dir, target.out_dir, target.threads);
            let spinner = spinner("green", format!("Running {}...", target.program));
            let xml = runner
                .search(&target.program, &query, &target.db)
                .with_context(|| format!("{} search of {} failed", target.program, query.display()))?;
            spinner.finish_with_message(format!("Output in {}.", xml.display()));

            let report = load_report(&xml)?;
            if let Some(csv) = csv {
                write_csv(&report, &csv).with_context(|| format!("could not write {}", csv.display()))?;
            }
            if !quiet {
                print_report(&report);
            }
        }
        Command::Pairwise {
            program,
            query_seq,
            subject_seq,
            fasta,
            query_id,
            subject_id,
            out,
            out_dir,
        } => {
            let (query, subject) = match (query_seq, subject_seq, fasta) {
                (Some(q), Some(s), None) => (("query".to_string(), q), ("subject".to_string(), s)),
                (None, None, Some(fasta)) => {
                    let records = read_fasta(&fasta)
                        .with_context(|| format!("could not read {}", fasta.display()))?;
                    let index = records.by_id();
                    let lookup = |id: Option<String>| -> anyhow::Result<(String, String)> {
                        let id = id.ok_or_else(|| anyhow!("--query-id and --subject-id are required with --fasta"))?;
                        let rec = index
                            .get(id.as_str())
                            .ok_or_else(|| anyhow!("{} not found in {}", id, fasta.display()))?;
                        Ok((rec.id.clone(), rec.seq.clone()))
                    };
                    (lookup(query_id)?, lookup(subject_id)?)
                }
                _ => bail!("give either --query-seq and --subject-seq, or --fasta with both ids"),
            };

            let runner = runner(bin_dir, out_dir, None);
            let spinner = spinner("green", format!("Aligning {} vs {}...", query.0, subject.0));
            let xml = runner
                .pairwise(&program, (&query.0, &query.1), (&subject.0, &subject.1), &out)
                .with_context(|| format!("pairwise {} failed", program))?;
            spinner.finish_with_message(format!("Output in {}.", xml.display()));
            print_report(&load_report(&xml)?);
        }
        Command::Report { xml, csv } => {
            let report = load_report(&xml)?;
            if let Some(csv) = csv {
                write_csv(&report, &csv).with_context(|| format!("could not write {}", csv.display()))?;
            }
            print_report(&report);
        }
        Command::Hunt { target, fasta, output } => {
            let runner = runner(bin_dir, target.out_dir, target.threads);
            let spinner = spinner("yellow", format!("Hunting {} hits...", target.program));
            let results = hunt(&runner, &target.program, &fasta, &target.db)
                .with_context(|| format!("hunt over {} failed", fasta.display()))?;
            fs::write(&output, results.get_csv())
                .with_context(|| format!("could not write {}", output.display()))?;
            spinner.finish_with_message(format!(
                "{} of {} queries hit; written to {}.",
                results.rows.len(),
                results.searched,
                output.display()
            ));
        }
    }
    Ok(())
}
