#![allow(missing_docs)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use flate2::{write::GzEncoder, Compression};
use lakeq::{
    catalog::{PartitionCatalog, PartitionLayout},
    config::LakeConfig,
    ingest::Ingestor,
    inspect::{describe_schema, render_sample, SchemaDescriptor},
    provider::{LanguageModel, ProviderError},
    query::{self, ExecError, ParseError, Projection},
    storage::MemoryStore,
    table::{DataType, Table, Value},
    LakeError, Orchestrator, QuestionRequest,
};
use time::macros::date;

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).expect("write gzip");
    encoder.finish().expect("finish gzip")
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.put(
        "csv-data/year=2024/month=01/day=14/part-0.csv.gz",
        gzip("id,amount\n1,10.0\n2,20.0\n"),
    );
    store.put(
        "csv-data/year=2024/month=01/day=15/part-0.csv.gz",
        gzip("id,amount,region\n3,5.0,west\n"),
    );
    store.put("csv-data/year=2024/month=01/day=15/_SUCCESS", "");
    store
}

struct ScriptedModel {
    query: String,
    seen: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(query: &str) -> Self {
        Self {
            query: query.to_owned(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "test"
    }

    fn generate_query(
        &self,
        question: &str,
        schema: &SchemaDescriptor,
        sample: &str,
    ) -> Result<String, ProviderError> {
        let mut seen = self.seen.lock().unwrap();
        seen.push(question.to_owned());
        seen.push(schema.to_string());
        seen.push(sample.to_owned());
        Ok(self.query.clone())
    }

    fn explain(
        &self,
        _question: &str,
        _query: &str,
        results: &Table,
    ) -> Result<String, ProviderError> {
        Ok(format!("{} matching rows", results.num_rows()))
    }
}

struct BrokenModel;

impl LanguageModel for BrokenModel {
    fn name(&self) -> &str {
        "broken"
    }

    fn model(&self) -> &str {
        "test"
    }

    fn generate_query(
        &self,
        _question: &str,
        _schema: &SchemaDescriptor,
        _sample: &str,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Request {
            provider: "broken".into(),
            message: "quota exceeded".into(),
        })
    }

    fn explain(&self, _: &str, _: &str, _: &Table) -> Result<String, ProviderError> {
        unreachable!("explain is never reached after a failed generation")
    }
}

fn orchestrator(store: Arc<MemoryStore>) -> Orchestrator {
    Orchestrator::new(store, LakeConfig::default()).with_today(date!(2024 - 01 - 31))
}

#[test]
fn catalog_reports_partition_bounds() {
    let range = orchestrator(seeded_store()).available_dates().unwrap();
    assert_eq!(range.start(), date!(2024 - 01 - 14));
    assert_eq!(range.end(), date!(2024 - 01 - 15));
    assert_eq!(
        serde_json::to_value(range).unwrap(),
        serde_json::json!({"start_date": "2024-01-14", "end_date": "2024-01-15"})
    );
}

#[test]
fn catalog_ignores_foreign_keys() {
    let store = seeded_store();
    store.put("csv-data/readme.md", "hello");
    store.put("csv-data/year=abc/month=01/day=01/x.csv.gz", "");
    store.put("csv-data/year=2024/month=13/day=01/x.csv.gz", "");
    store.put("other/year=2020/month=01/day=01/x.csv.gz", "");
    let catalog = PartitionCatalog::new(store, PartitionLayout::new("csv-data/"));
    assert_eq!(catalog.list_partitions().unwrap().len(), 2);
}

#[test]
fn schema_union_fills_missing_columns() {
    let table = Ingestor::new(seeded_store(), PartitionLayout::new("csv-data/"))
        .load_range(date!(2024 - 01 - 14), date!(2024 - 01 - 15), None)
        .unwrap();
    assert_eq!(table.column_names(), vec!["id", "amount", "region"]);
    assert_eq!(
        table.rows(),
        &[
            vec![Value::Int(1), Value::Float(10.0), Value::Null],
            vec![Value::Int(2), Value::Float(20.0), Value::Null],
            vec![Value::Int(3), Value::Float(5.0), Value::from("west")],
        ]
    );

    let schema = describe_schema(&table);
    let types: Vec<_> = schema.columns().iter().map(|c| c.inferred_type).collect();
    assert_eq!(
        types,
        vec![DataType::Integer, DataType::Float, DataType::String]
    );
    assert!(render_sample(&table, 2).lines().count() >= 3);
}

#[test]
fn filtered_projection_keeps_order() {
    let table = Table::new(
        vec!["id".into(), "amount".into()],
        vec![
            vec![Value::Int(1), Value::Float(10.0)],
            vec![Value::Int(2), Value::Float(20.0)],
            vec![Value::Int(3), Value::Float(5.0)],
        ],
    )
    .unwrap();
    let result = query::run("SELECT id, amount WHERE amount > 8", &table).unwrap();
    assert_eq!(
        result.rows(),
        &[
            vec![Value::Int(1), Value::Float(10.0)],
            vec![Value::Int(2), Value::Float(20.0)],
        ]
    );
    assert_eq!(query::run("SELECT *", &table).unwrap(), table);
}

#[test]
fn parse_contract() {
    let query = query::parse("SELECT * FROM ignored").unwrap();
    assert_eq!(query.columns, Projection::Wildcard);
    assert_eq!(query.filter, None);
    assert_eq!(query::parse("DROP TABLE x"), Err(ParseError::NotASelect));
}

#[test]
fn ask_runs_generated_query() {
    let model = ScriptedModel::new("SELECT id, amount WHERE amount > 8");
    let request =
        QuestionRequest::new("which orders were large?").with_dates("2024-01-14", "2024-01-15");
    let answer = orchestrator(seeded_store()).ask_with(&model, &request).unwrap();

    assert_eq!(answer.question, "which orders were large?");
    assert_eq!(answer.explanation, "2 matching rows");
    assert_eq!(
        serde_json::to_value(&answer.results).unwrap(),
        serde_json::json!([
            {"id": 1, "amount": 10.0},
            {"id": 2, "amount": 20.0},
        ])
    );

    let seen = model.seen.lock().unwrap();
    assert_eq!(seen[0], "which orders were large?");
    assert!(seen[1].starts_with("Table Schema:\n- id (integer): Example value: 1"));
    assert!(seen[2].contains("west"));
}

#[test]
fn empty_range_surfaces_not_found() {
    let model = ScriptedModel::new("SELECT *");
    let request = QuestionRequest::new("anything").with_dates("2023-06-01", "2023-06-30");
    let err = orchestrator(seeded_store())
        .ask_with(&model, &request)
        .unwrap_err();
    assert!(matches!(err, LakeError::NotFound(_)));
    assert_eq!(err.http_status(), 404);
    assert!(model.seen.lock().unwrap().is_empty());
}

#[test]
fn generated_statement_errors_surface() {
    let orchestrator = orchestrator(seeded_store());
    let request = QuestionRequest::new("q").with_dates("2024-01-14", "2024-01-15");

    let err = orchestrator
        .ask_with(&ScriptedModel::new("DROP TABLE x"), &request)
        .unwrap_err();
    assert!(matches!(err, LakeError::Parse(ParseError::NotASelect)));

    let err = orchestrator
        .ask_with(&ScriptedModel::new("SELECT z"), &request)
        .unwrap_err();
    assert!(matches!(err, LakeError::Exec(ExecError::UnknownColumn(ref c)) if c == "z"));
    assert_eq!(err.http_status(), 400);

    let err = orchestrator.ask_with(&BrokenModel, &request).unwrap_err();
    assert!(matches!(err, LakeError::Provider(_)));
    assert_eq!(err.http_status(), 502);
}

#[test]
fn file_limit_bounds_the_load() {
    let mut config = LakeConfig::default();
    config.ingest.file_limit = Some(1);
    let orchestrator =
        Orchestrator::new(seeded_store(), config).with_today(date!(2024 - 01 - 31));
    let answer = orchestrator
        .ask(&QuestionRequest::new("SELECT *").with_dates("2024-01-01", "2024-01-31"))
        .unwrap();
    assert_eq!(answer.results.num_rows(), 2);
    assert_eq!(answer.results.column_names(), vec!["id", "amount"]);
}

#[test]
fn default_window_covers_recent_partitions() {
    let answer = orchestrator(seeded_store())
        .ask(&QuestionRequest::new("SELECT * WHERE region IS NOT NULL"))
        .unwrap();
    assert_eq!(
        answer.results.rows(),
        &[vec![Value::Int(3), Value::Float(5.0), Value::from("west")]]
    );
}
