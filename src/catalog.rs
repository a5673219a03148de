#![forbid(unsafe_code)]

//! Date-partitioned key layout and partition discovery.
//!
//! Data files live under `<base>year=<Y>/month=<MM>/day=<DD>/<file>`. The
//! catalog lists the base prefix, parses every key it can and reports the
//! span of dates covered. Keys that do not follow the layout are skipped.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use time::macros::format_description;
use time::{Date, Month};
use tracing::debug;

use crate::storage::{ObjectStore, StorageError};

/// Calendar day identified by a partition key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PartitionKey {
    /// Four-digit year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u8,
    /// Day of month, 1-31.
    pub day: u8,
}

impl PartitionKey {
    /// Partition holding `date`.
    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
            day: date.day(),
        }
    }

    /// Calendar date for this partition, if the numbers form a real date.
    pub fn to_date(self) -> Option<Date> {
        let month = Month::try_from(self.month).ok()?;
        Date::from_calendar_date(self.year, month, self.day).ok()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "year={}/month={:02}/day={:02}",
            self.year, self.month, self.day
        )
    }
}

/// Key layout rooted at a base prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionLayout {
    base: String,
}

impl PartitionLayout {
    /// Layout under `base_path`. A trailing `/` is added when missing.
    pub fn new(base_path: impl Into<String>) -> Self {
        let mut base = base_path.into();
        if !base.is_empty() && !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    /// Normalised base prefix (empty, or ending in `/`).
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Listing prefix for the partition holding `date`.
    pub fn prefix_for(&self, date: Date) -> String {
        format!("{}{}/", self.base, PartitionKey::from_date(date))
    }

    /// Parses `key` into a partition.
    ///
    /// Returns `None` for anything that does not match
    /// `<base>year=<Y>/month=<M>/day=<D>/...` with integer values naming a
    /// real calendar date. Never panics.
    pub fn parse_key(&self, key: &str) -> Option<PartitionKey> {
        let rest = key.strip_prefix(self.base.as_str())?;
        let mut segments = rest.split('/');
        let year = parse_segment(segments.next()?, "year")?;
        let month = parse_segment(segments.next()?, "month")?;
        let day = parse_segment(segments.next()?, "day")?;
        // The day segment must be a directory, not the file name itself.
        segments.next()?;

        let partition = PartitionKey {
            year: i32::try_from(year).ok()?,
            month: u8::try_from(month).ok()?,
            day: u8::try_from(day).ok()?,
        };
        partition.to_date().map(|_| partition)
    }
}

fn parse_segment(segment: &str, name: &str) -> Option<i64> {
    let (key, value) = segment.split_once('=')?;
    if !key.eq_ignore_ascii_case(name) {
        return None;
    }
    value.trim().parse::<i64>().ok()
}

/// Inclusive span of calendar dates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    /// Range covering `start..=end`; `None` when `start > end`.
    pub fn new(start: Date, end: Date) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// First day of the range.
    pub fn start(&self) -> Date {
        self.start
    }

    /// Last day of the range.
    pub fn end(&self) -> Date {
        self.end
    }

    /// Number of calendar days covered.
    pub fn num_days(&self) -> u64 {
        (self.end - self.start).whole_days().unsigned_abs() + 1
    }

    /// Every date in the range, ascending.
    pub fn dates(&self) -> impl Iterator<Item = Date> {
        dates_between(self.start, self.end)
    }
}

impl Serialize for DateRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("DateRange", 2)?;
        state.serialize_field("start_date", &format_date(self.start))?;
        state.serialize_field("end_date", &format_date(self.end))?;
        state.end()
    }
}

/// Every date in `start..=end`, ascending. Empty when `start > end`.
pub fn dates_between(start: Date, end: Date) -> impl Iterator<Item = Date> {
    let first = (start <= end).then_some(start);
    std::iter::successors(first, move |date| date.next_day().filter(|next| *next <= end))
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text.trim(), format_description!("[year]-[month]-[day]"))
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Discovers which partitions exist under a layout.
pub struct PartitionCatalog {
    store: Arc<dyn ObjectStore>,
    layout: PartitionLayout,
}

impl PartitionCatalog {
    /// Catalog over `store` using `layout`.
    pub fn new(store: Arc<dyn ObjectStore>, layout: PartitionLayout) -> Self {
        Self { store, layout }
    }

    /// Sorted, de-duplicated partitions found under the base prefix.
    pub fn list_partitions(&self) -> Result<BTreeSet<PartitionKey>, StorageError> {
        let objects = self.store.list_objects(self.layout.base())?;
        let mut partitions = BTreeSet::new();
        let mut skipped = 0usize;
        for object in &objects {
            match self.layout.parse_key(&object.key) {
                Some(partition) => {
                    partitions.insert(partition);
                }
                None => skipped += 1,
            }
        }
        debug!(
            base = %self.layout.base(),
            objects = objects.len(),
            partitions = partitions.len(),
            skipped,
            "listed partitions"
        );
        Ok(partitions)
    }

    /// Earliest and latest partition dates, or `None` when nothing parses.
    pub fn list_partition_dates(&self) -> Result<Option<DateRange>, StorageError> {
        let partitions = self.list_partitions()?;
        let dates = || partitions.iter().filter_map(|p| p.to_date());
        let (Some(start), Some(end)) = (dates().min(), dates().max()) else {
            return Ok(None);
        };
        Ok(DateRange::new(start, end))
    }
}
