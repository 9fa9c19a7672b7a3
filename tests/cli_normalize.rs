use predicates::prelude::*;

const EXPORT: &str = "\
Book Id,Title,Author,ISBN,ISBN13,Exclusive Shelf
1,O Hobbit,J.R.R. Tolkien,,\"=\"\"9788595084742\"\"\",read
2,Duna,Frank Herbert,,,to-read
3,Caderno,Fulano,,,favorites
";

#[test]
fn normalize_prints_one_json_line_per_mapped_row() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let csv = temp.path().join("goodreads_library_export.csv");
    std::fs::write(&csv, EXPORT)?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfsync");
    let output = cmd
        .args(["normalize", "--csv", csv.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output)?;
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0])?;
    assert_eq!(first["title"], "O Hobbit");
    assert_eq!(first["identifier"], "9788595084742");
    assert_eq!(first["shelf"], "read");
    assert_eq!(first["target_status"], "Read");

    let second: serde_json::Value = serde_json::from_str(lines[1])?;
    assert_eq!(second["identifier"], serde_json::Value::Null);
    assert_eq!(second["target_status"], "WantToRead");
    Ok(())
}

#[test]
fn normalize_reports_missing_required_column() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let csv = temp.path().join("export.csv");
    std::fs::write(&csv, "Title,Author,ISBN13\nO Hobbit,Tolkien,123\n")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfsync");
    cmd.args(["normalize", "--csv", csv.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "required column 'Exclusive Shelf' not found",
        ));
    Ok(())
}

#[test]
fn sync_fails_before_launching_a_browser_when_csv_is_missing() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let missing = temp.path().join("missing.csv");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfsync");
    cmd.env("SHELFSYNC_WEBDRIVER_URL", "http://127.0.0.1:9")
        .args(["sync", "--csv", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("goodreads export not found"))
        .stderr(predicate::str::contains("connecting to webdriver").not());
    Ok(())
}

#[test]
fn sync_rejects_inverted_jitter_bounds() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfsync");
    cmd.args(["sync", "--jitter-min-ms", "500", "--jitter-max-ms", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not exceed jitter_max_ms"));
}

#[test]
fn log_file_receives_log_lines() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let csv = temp.path().join("export.csv");
    let log = temp.path().join("execution.log");
    std::fs::write(&csv, EXPORT)?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shelfsync");
    cmd.env("RUST_LOG", "debug")
        .args([
            "--log-file",
            log.to_str().unwrap(),
            "normalize",
            "--csv",
            csv.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));

    let logged = std::fs::read_to_string(&log)?;
    assert!(logged.contains("parsed cli"));
    assert!(logged.contains("loaded goodreads export"));
    Ok(())
}
