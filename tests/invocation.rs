#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use blasthunter::makedb::build_databases;
use blasthunter::{hunt, parse_report_file, BlastError, BlastRunner, SearchOptions};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/blastn_two_queries.xml")
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

// One test spawns every script so no script is executed while another
// test thread still holds it open for writing.
#[test]
fn fake_blast_tools() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    let args_log = dir.path().join("args.txt");

    write_script(
        &bin,
        "blastn",
        &format!(
            "echo \"$@\" > '{}'\nout=''\nwhile [ $# -gt 0 ]; do\n  [ \"$1\" = '-out' ] && out=\"$2\"\n  shift\ndone\ncp '{}' \"$out\"",
            args_log.display(),
            fixture().display()
        ),
    );
    write_script(&bin, "tblastn", "echo 'BLAST Database error: bad volume' >&2\nexit 2");
    write_script(
        &bin,
        "makeblastdb",
        "while [ $# -gt 0 ]; do\n  [ \"$1\" = '-out' ] && touch \"$2.nhr\"\n  shift\ndone",
    );

    let runner = BlastRunner::new(SearchOptions {
        out_dir: dir.path().join("blast"),
        bin_dir: Some(bin.clone()),
        num_threads: Some(4),
        ..Default::default()
    })
    .with_log_target("invocation");

    // databases
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("f_hp.fas"), ">contig_F_7\nACGT\n").unwrap();
    let db_dir = dir.path().join("blast/db");
    let built = build_databases(&runner, &data, &db_dir).unwrap();
    assert_eq!(built.len(), 1);
    let db = built[0].db.clone();
    assert!(blasthunter::blast::database_exists(&db));

    // search writes the XML where -out says
    let query = dir.path().join("top500.fas");
    fs::write(&query, ">contig_M_1\nACGT\n>contig_M_2\nGGCC\n").unwrap();
    let xml = runner.search("blastn", &query, &db).unwrap();
    assert_eq!(xml, dir.path().join("blast/blastout_top500.fas.xml"));
    let report = parse_report_file(&xml).unwrap();
    assert_eq!(report.iterations.len(), 2);
    let args = fs::read_to_string(&args_log).unwrap();
    assert!(args.contains("-outfmt 5 -evalue 1E-50 -max_target_seqs 10 -num_threads 4"));

    // failing tool surfaces its stderr
    let err = runner.search("tblastn", &query, &db).unwrap_err();
    match err {
        BlastError::ProcessFailed { status, stderr, .. } => {
            assert_eq!(status, Some(2));
            assert!(stderr.contains("bad volume"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // pairwise uses -subject and removes its temp files
    let pair = dir.path().join("pairs/contig_M_1_vs_contig_F_7.xml");
    runner
        .pairwise("blastn", ("contig_M_1", "ACGT"), ("contig_F_7", "ACGA"), &pair)
        .unwrap();
    assert!(pair.exists());
    let args = fs::read_to_string(&args_log).unwrap();
    assert!(args.contains("-subject"));
    assert!(!args.contains("-db"));
    assert!(!args.contains("-num_threads"));
    let leftovers = fs::read_dir(dir.path().join("blast"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.starts_with("subject_") || (name.starts_with("query_") && name.ends_with(".fas"))
        })
        .count();
    assert_eq!(leftovers, 0);

    // hunt keeps the first hit of each query's own report
    let results = hunt(&runner, "blastn", &query, &db).unwrap();
    assert_eq!(results.searched, 2);
    assert_eq!(results.rows.len(), 2);
    assert!(dir.path().join("blast/query_contig_M_2.fas").exists());
    assert!(dir.path().join("blast/blastout_contig_M_2.xml").exists());
    let csv = results.get_csv();
    assert_eq!(csv.lines().nth(1).unwrap(), "contig_F_7,2.00e-45,176,95,95,100,20");
}
