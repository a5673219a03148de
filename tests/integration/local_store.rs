#![allow(missing_docs)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use flate2::{write::GzEncoder, Compression};
use lakeq::{
    catalog::{PartitionCatalog, PartitionLayout},
    ingest::Ingestor,
    storage::{LocalStore, ObjectStore, StorageError},
    table::Value,
};
use tempfile::TempDir;
use time::macros::date;

fn write_gz(root: &Path, key: &str, text: &str) {
    let path = root.join(key);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(text.as_bytes()).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn lake() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    write_gz(
        dir.path(),
        "csv-data/year=2024/month=02/day=28/events.csv.gz",
        "event,count\nopen,3\nclose,1\n",
    );
    write_gz(
        dir.path(),
        "csv-data/year=2024/month=02/day=29/events.csv.gz",
        "event,count\nopen,7\n",
    );
    write_gz(
        dir.path(),
        "csv-data/year=2024/month=03/day=01/events.csv.gz",
        "event,count,user\nopen,2,ana\n",
    );
    fs::write(
        dir.path().join("csv-data/year=2024/month=03/day=01/notes.txt"),
        "skip me",
    )
    .unwrap();
    dir
}

#[test]
fn keys_are_slash_separated_relative_paths() {
    let dir = lake();
    let store = LocalStore::open(dir.path()).unwrap();
    let keys: Vec<_> = store
        .list_objects("csv-data/year=2024/month=03/")
        .unwrap()
        .into_iter()
        .map(|meta| meta.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "csv-data/year=2024/month=03/day=01/events.csv.gz",
            "csv-data/year=2024/month=03/day=01/notes.txt",
        ]
    );
    assert!(store
        .list_objects("csv-data/year=2025/")
        .unwrap()
        .is_empty());
    assert!(matches!(
        store.get_object("csv-data/missing.csv.gz"),
        Err(StorageError::NotFound(_))
    ));
}

#[test]
fn catalog_spans_month_boundary() {
    let dir = lake();
    let store = Arc::new(LocalStore::open(dir.path()).unwrap());
    let catalog = PartitionCatalog::new(store, PartitionLayout::new("csv-data"));
    let range = catalog.list_partition_dates().unwrap().unwrap();
    assert_eq!(range.start(), date!(2024 - 02 - 28));
    assert_eq!(range.end(), date!(2024 - 03 - 01));
    assert_eq!(range.num_days(), 3);
}

#[test]
fn loads_directory_tree() {
    let dir = lake();
    let store = Arc::new(LocalStore::open(dir.path()).unwrap());
    let report = Ingestor::new(store, PartitionLayout::new("csv-data/"))
        .load_range_with_report(date!(2024 - 02 - 28), date!(2024 - 03 - 01), None)
        .unwrap();
    assert_eq!(report.dates_scanned, 3);
    assert_eq!(report.files_read, 3);
    assert!(report.skipped.is_empty());

    let table = report.table;
    assert_eq!(table.column_names(), vec!["event", "count", "user"]);
    let counts: Vec<_> = table.column_values(1).cloned().collect();
    assert_eq!(
        counts,
        vec![Value::Int(3), Value::Int(1), Value::Int(7), Value::Int(2)]
    );
    let users: Vec<_> = table.column_values(2).cloned().collect();
    assert_eq!(
        users,
        vec![Value::Null, Value::Null, Value::Null, Value::from("ana")]
    );
}

#[test]
fn missing_root_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = LocalStore::open(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
}
