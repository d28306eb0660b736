// End-to-end runs over real files: .as in, .am/.obj/.ent/.ext out.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use forge12::assembler::{run, Cli};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_micros();
    let dir = std::env::temp_dir().join(format!("forge12-it-{tag}-{now}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_source(dir: &PathBuf, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write source");
    path
}

fn cli_for(path: &PathBuf) -> Cli {
    Cli {
        infiles: vec![path.clone()],
        base: 100,
        raw: false,
        relocation_info: false,
        json: false,
    }
}

fn read(path: PathBuf) -> String {
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing artifact {}", path.display()))
}

#[test]
fn clean_run_writes_all_three_artifacts() {
    let dir = unique_temp_dir("clean");
    let src = write_source(
        &dir,
        "prog.as",
        "MAIN: mov @r3,@r5\n\
         \tstop\n\
         STR: .string \"ab\"\n\
         LIST: .data 6,-9\n\
         .entry MAIN\n\
         .extern EXTLBL\n\
         \tjmp EXTLBL ; off to the runtime\n",
    );

    let reports = run(&cli_for(&src)).expect("run");
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.error_count(), 0, "{:?}", report.diagnostics());
    assert_eq!(report.counts(), (5, 5));
    assert_eq!(report.artifacts().len(), 3);

    assert_eq!(
        read(dir.join("prog.obj")),
        "5 5\n\
         100: KA\n\
         101: Cj\n\
         102: AP\n\
         103: GJ\n\
         104: AA\n\
         105: Bh\n\
         106: Bi\n\
         107: AA\n\
         108: AG\n\
         109: /3\n"
    );
    assert_eq!(read(dir.join("prog.ent")), "MAIN 100\n");
    assert_eq!(read(dir.join("prog.ext")), "EXTLBL 104\n");
    // The expanded intermediate keeps the program but drops the comment.
    let am = read(dir.join("prog.am"));
    assert!(am.contains("MAIN: mov @r3,@r5"));
    assert!(!am.contains("off to the runtime"));
}

#[test]
fn entry_and_external_files_appear_only_when_used() {
    let dir = unique_temp_dir("plainobj");
    let src = write_source(&dir, "tiny.as", "stop\n");

    let reports = run(&cli_for(&src)).expect("run");
    assert_eq!(reports[0].error_count(), 0);
    assert_eq!(reports[0].artifacts(), &[dir.join("tiny.obj").to_string_lossy().to_string()]);
    assert_eq!(read(dir.join("tiny.obj")), "1 0\n100: AP\n");
    assert!(!dir.join("tiny.ent").exists());
    assert!(!dir.join("tiny.ext").exists());
}

#[test]
fn errors_suppress_every_artifact() {
    let dir = unique_temp_dir("errors");
    let src = write_source(&dir, "bad.as", "stop\nmov @r1,5\n");

    let reports = run(&cli_for(&src)).expect("run");
    let report = &reports[0];
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.diagnostics()[0].line(), 2);
    assert!(report.artifacts().is_empty());
    assert!(!dir.join("bad.obj").exists());
    assert!(!dir.join("bad.ent").exists());
    assert!(!dir.join("bad.ext").exists());
}

#[test]
fn macro_expansion_reaches_the_object_file() {
    let dir = unique_temp_dir("macro");
    let src = write_source(
        &dir,
        "loop.as",
        "mcro twice\n\
         inc @r1\n\
         inc @r1\n\
         endmcro\n\
         twice\n\
         stop\n",
    );

    let reports = run(&cli_for(&src)).expect("run");
    assert_eq!(reports[0].error_count(), 0, "{:?}", reports[0].diagnostics());
    assert_eq!(read(dir.join("loop.am")), "inc @r1\ninc @r1\nstop\n");
    assert_eq!(
        read(dir.join("loop.obj")),
        "5 0\n100: KH\n101: Ag\n102: KH\n103: Ag\n104: AP\n"
    );
}

#[test]
fn raw_flag_keeps_counter_addresses() {
    let dir = unique_temp_dir("raw");
    let src = write_source(&dir, "self.as", "MAIN: jmp MAIN\n");

    let mut cli = cli_for(&src);
    cli.raw = true;
    let reports = run(&cli).expect("run");
    assert_eq!(reports[0].error_count(), 0);
    assert_eq!(read(dir.join("self.obj")), "2 0\n0: GJ\n1: AA\n");
}

#[test]
fn wrong_extension_is_skipped_with_a_warning() {
    let dir = unique_temp_dir("skip");
    let src = write_source(&dir, "prog.txt", "stop\n");

    let reports = run(&cli_for(&src)).expect("run");
    let report = &reports[0];
    assert_eq!(report.error_count(), 0);
    assert_eq!(report.warning_count(), 1);
    assert!(report.artifacts().is_empty());
    assert!(report.diagnostics()[0].message().contains(".as extension"));
}

#[test]
fn missing_input_file_is_a_per_file_error() {
    let dir = unique_temp_dir("missing");
    let src = dir.join("ghost.as");

    let reports = run(&cli_for(&src)).expect("run");
    assert_eq!(reports[0].error_count(), 1);
    assert!(reports[0].artifacts().is_empty());
}

#[test]
fn preprocess_errors_also_suppress_artifacts() {
    let dir = unique_temp_dir("ppbad");
    let src = write_source(&dir, "open.as", "mcro m\nstop\n");

    let reports = run(&cli_for(&src)).expect("run");
    let report = &reports[0];
    assert_eq!(report.error_count(), 1);
    assert!(report.diagnostics()[0].message().contains("never terminated"));
    assert!(!dir.join("open.obj").exists());
}
