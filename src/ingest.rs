#![forbid(unsafe_code)]

//! Loads every data file of a date range into one table.
//!
//! Dates are walked in ascending order and each partition prefix is listed
//! separately. Matching objects are fetched, gunzipped when they carry a gzip
//! header, parsed as CSV with a header row and concatenated with
//! [`Table::concat`]. A file that fails to fetch, decompress or parse is
//! logged and skipped; only listing failures abort the load.

use std::io::Read;
use std::sync::Arc;

use flate2::read::MultiGzDecoder;
use thiserror::Error;
use time::Date;
use tracing::{debug, info, warn};

use crate::catalog::{dates_between, PartitionLayout};
use crate::storage::{ObjectStore, StorageError};
use crate::table::{Table, TableError, Value};

/// Suffix of the compressed CSV files picked up by default.
pub const DEFAULT_FILE_SUFFIX: &str = ".csv.gz";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reason a single file was left out of a load.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Fetching the object failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] StorageError),
    /// The gzip stream was corrupt.
    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),
    /// The payload was not UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The CSV was malformed (including rows with the wrong field count).
    #[error("csv parse failed: {0}")]
    Csv(#[from] csv::Error),
    /// The file had no header row.
    #[error("file has no header row")]
    MissingHeader,
    /// Parsed rows could not form a table.
    #[error(transparent)]
    Shape(#[from] TableError),
}

/// A file skipped during a load and why.
#[derive(Debug)]
pub struct SkippedFile {
    /// Object key of the file.
    pub key: String,
    /// What went wrong.
    pub error: FrameError,
}

/// Outcome of [`Ingestor::load_range_with_report`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Concatenated rows of every file that loaded.
    pub table: Table,
    /// Partitions listed.
    pub dates_scanned: usize,
    /// Files that loaded successfully.
    pub files_read: usize,
    /// Files that matched but failed to load.
    pub skipped: Vec<SkippedFile>,
    /// Whether the file limit left a matching file unread. The table is then
    /// a partial sample of the range.
    pub limit_reached: bool,
}

/// Reads partitioned CSV files out of an object store.
pub struct Ingestor {
    store: Arc<dyn ObjectStore>,
    layout: PartitionLayout,
    file_suffix: String,
}

impl Ingestor {
    /// Ingestor over `store` that picks up files ending in [`DEFAULT_FILE_SUFFIX`].
    pub fn new(store: Arc<dyn ObjectStore>, layout: PartitionLayout) -> Self {
        Self {
            store,
            layout,
            file_suffix: DEFAULT_FILE_SUFFIX.to_owned(),
        }
    }

    /// Overrides the suffix a key must end with to be loaded.
    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Loads `start..=end` and returns the concatenated table.
    ///
    /// With `file_limit` set, the walk stops once that many files have loaded
    /// across the whole range and the result may be partial. Files that fail
    /// to load do not count towards the limit.
    pub fn load_range(
        &self,
        start: Date,
        end: Date,
        file_limit: Option<usize>,
    ) -> Result<Table, StorageError> {
        Ok(self.load_range_with_report(start, end, file_limit)?.table)
    }

    /// Same as [`Ingestor::load_range`] but also reports what was read and skipped.
    pub fn load_range_with_report(
        &self,
        start: Date,
        end: Date,
        file_limit: Option<usize>,
    ) -> Result<LoadReport, StorageError> {
        let mut report = LoadReport::default();
        let mut frames = Vec::new();
        let limit_hit = |loaded: usize| file_limit.is_some_and(|limit| loaded >= limit);

        let mut dates = dates_between(start, end);
        'dates: while let Some(date) = dates.next() {
            if limit_hit(report.files_read) {
                report.limit_reached =
                    self.any_matching(std::iter::once(date).chain(&mut dates))?;
                break;
            }
            let prefix = self.layout.prefix_for(date);
            let objects = self.store.list_objects(&prefix)?;
            report.dates_scanned += 1;
            debug!(%prefix, objects = objects.len(), "listed partition");

            for object in objects {
                if !self.matches(&object.key) {
                    continue;
                }
                if limit_hit(report.files_read) {
                    report.limit_reached = true;
                    break 'dates;
                }
                match self.read_frame(&object.key) {
                    Ok(frame) => {
                        debug!(key = %object.key, rows = frame.num_rows(), "loaded file");
                        frames.push(frame);
                        report.files_read += 1;
                    }
                    Err(error) => {
                        warn!(key = %object.key, %error, "skipping unreadable file");
                        report.skipped.push(SkippedFile {
                            key: object.key,
                            error,
                        });
                    }
                }
            }
        }

        report.table = Table::concat(frames);
        info!(
            dates = report.dates_scanned,
            files = report.files_read,
            skipped = report.skipped.len(),
            rows = report.table.num_rows(),
            limit_reached = report.limit_reached,
            "loaded date range"
        );
        Ok(report)
    }

    fn matches(&self, key: &str) -> bool {
        key.ends_with(&self.file_suffix)
    }

    /// Whether any of `dates` holds a file this ingestor would load.
    fn any_matching(&self, dates: impl Iterator<Item = Date>) -> Result<bool, StorageError> {
        for date in dates {
            let prefix = self.layout.prefix_for(date);
            let objects = self.store.list_objects(&prefix)?;
            if objects.iter().any(|object| self.matches(&object.key)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn read_frame(&self, key: &str) -> Result<Table, FrameError> {
        let payload = self.store.get_object(key)?;
        decode_frame(&payload)
    }
}

/// Decodes one file's bytes (optionally gzip-compressed CSV) into a frame.
pub fn decode_frame(payload: &[u8]) -> Result<Table, FrameError> {
    let inflated;
    let raw = if payload.starts_with(&GZIP_MAGIC) {
        let mut buf = Vec::new();
        MultiGzDecoder::new(payload)
            .read_to_end(&mut buf)
            .map_err(FrameError::Decompress)?;
        inflated = buf;
        inflated.as_slice()
    } else {
        payload
    };
    let text = std::str::from_utf8(raw)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse_csv(text)
}

fn parse_csv(text: &str) -> Result<Table, FrameError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(FrameError::MissingHeader);
    }
    let columns = dedupe_headers(headers.iter());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Value::parse_cell).collect());
    }
    Ok(Table::new(columns, rows)?)
}

/// Trims header names, names blank ones `Unnamed: <i>` and suffixes repeats
/// with `.1`, `.2`, ... so every column in a frame is addressable.
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for (idx, raw) in headers.enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("Unnamed: {idx}")
        } else {
            trimmed.to_owned()
        };
        let mut name = base.clone();
        let mut n = 0;
        while seen.contains(&name) {
            n += 1;
            name = format!("{base}.{n}");
        }
        seen.push(name);
    }
    seen
}
