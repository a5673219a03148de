#![allow(missing_docs)]

use std::fs;
use std::io::Write;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use flate2::{write::GzEncoder, Compression};
use serde_json::{json, Value};
use tempfile::TempDir;

fn write_partition(root: &Path, day: u8, text: &str) {
    let dir = root.join(format!("csv-data/year=2024/month=05/day={day:02}"));
    fs::create_dir_all(&dir).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    fs::write(dir.join("part-0.csv.gz"), encoder.finish().unwrap()).unwrap();
}

fn setup_lake() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write_partition(dir.path(), 10, "city,temp\nOslo,4.5\nLima,19\n");
    write_partition(dir.path(), 11, "city,temp\nPune,31\n");
    dir
}

fn lakeq(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("lakeq");
    cmd.env_remove("LAKEQ_FILE_LIMIT")
        .env_remove("LAKEQ_BASE_PATH")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--root")
        .arg(dir.path());
    cmd
}

fn json_stdout(cmd: &mut assert_cmd::Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn dates_emits_json() {
    let dir = setup_lake();
    let json = json_stdout(lakeq(&dir).args(["--format", "json", "dates"]));
    assert_eq!(
        json,
        json!({"start_date": "2024-05-10", "end_date": "2024-05-11"})
    );
}

#[test]
fn dates_text_output() {
    let dir = setup_lake();
    let output = lakeq(&dir)
        .arg("dates")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("start_date=2024-05-10"));
    assert!(text.contains("end_date=2024-05-11"));
}

#[test]
fn schema_describes_columns() {
    let dir = setup_lake();
    let json = json_stdout(lakeq(&dir).args([
        "--format",
        "json",
        "schema",
        "--start",
        "2024-05-10",
        "--end",
        "2024-05-11",
    ]));
    assert_eq!(json["rows"], 3);
    assert_eq!(json["schema"]["kind"], "columns");
    assert_eq!(json["schema"]["columns"][1]["column_name"], "temp");
    assert_eq!(json["schema"]["columns"][1]["inferred_type"], "float");
}

#[test]
fn query_filters_rows() {
    let dir = setup_lake();
    let json = json_stdout(lakeq(&dir).args([
        "--format",
        "json",
        "query",
        "SELECT city WHERE city != 'Lima'",
        "--start",
        "2024-05-10",
        "--end",
        "2024-05-11",
    ]));
    assert_eq!(json, json!([{"city": "Oslo"}, {"city": "Pune"}]));
}

#[test]
fn file_limit_flag_truncates() {
    let dir = setup_lake();
    let json = json_stdout(lakeq(&dir).args([
        "--format",
        "json",
        "--file-limit",
        "1",
        "query",
        "SELECT *",
        "--start",
        "2024-05-10",
        "--end",
        "2024-05-11",
    ]));
    assert_eq!(json.as_array().map(Vec::len), Some(2));
}

#[test]
fn ask_with_passthrough() {
    let dir = setup_lake();
    let json = json_stdout(lakeq(&dir).args([
        "--format",
        "json",
        "ask",
        "SELECT * WHERE temp > 20",
        "--start",
        "2024-05-10",
        "--end",
        "2024-05-11",
    ]));
    assert_eq!(json["sql_query"], "SELECT * WHERE temp > 20");
    assert_eq!(json["results"], json!([{"city": "Pune", "temp": 31.0}]));
}

#[test]
fn errors_exit_nonzero() {
    let dir = setup_lake();
    lakeq(&dir)
        .args(["query", "DROP TABLE x", "--start", "2024-05-10", "--end", "2024-05-10"])
        .assert()
        .failure()
        .code(1);
    lakeq(&dir)
        .args(["schema", "--start", "2023-01-01", "--end", "2023-01-02"])
        .assert()
        .failure();
    lakeq(&dir)
        .args(["query", "SELECT *", "--start", "2024-05-10"])
        .assert()
        .failure();
}
