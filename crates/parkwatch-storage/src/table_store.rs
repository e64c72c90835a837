//! CSV table store with partition-scoped upsert.
//!
//! Every derived table is one CSV file whose first column is the video id.
//! Updates go through a whole-table read-modify-write that replaces exactly
//! one partition:
//!
//! ```text
//!   read file ──► group raw records by video ──► swap target partition
//!                                                      │
//!   rename tmp ◄── write tmp ◄── render (raw records of other videos
//!                                 copied verbatim, target rows serialized)
//! ```
//!
//! Records of other partitions are copied from the byte span they occupied
//! in the file (quoting and line endings included), so they are written back
//! byte-identical. Each table has its own async mutex held across the whole
//! cycle; concurrent writers of the same table serialize instead of losing
//! updates.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use parkwatch_models::table::VIDEO_COLUMN;
use parkwatch_models::{TableRow, VideoId};

use crate::error::{StorageError, StorageResult};
use crate::fs_utils::{read_optional, write_atomic};
use crate::layout::DataLayout;

/// Summary of one partition replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertStats {
    pub table: &'static str,
    /// Rows now stored for the target video
    pub rows_written: usize,
    /// Rows the target video had before the update
    pub rows_replaced: usize,
    /// Rows of all other videos, passed through unchanged
    pub other_rows: usize,
}

/// File-backed store for all partitioned tables.
#[derive(Clone)]
pub struct TableStore {
    layout: DataLayout,
    locks: Arc<Mutex<HashMap<&'static str, Arc<Mutex<()>>>>>,
}

impl TableStore {
    pub fn new(layout: DataLayout) -> Self {
        Self {
            layout,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Write lock for one table (or artifact), created on first use.
    pub(crate) async fn table_lock(&self, table: &'static str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(
            locks
                .entry(table)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Read every row of a table. A table that was never written is empty.
    pub async fn read_all<T: TableRow>(&self) -> StorageResult<Vec<T>> {
        let path = self.layout.table_path(T::TABLE);
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(Vec::new());
        };
        let table = RawTable::parse::<T>(&path, &bytes)?;
        let mut rows = Vec::new();
        for records in table.partitions.values() {
            rows.extend(deserialize_records::<T>(&path, &table.headers, records)?);
        }
        Ok(rows)
    }

    /// Read the rows of one video.
    pub async fn read_partition<T: TableRow>(&self, video: &VideoId) -> StorageResult<Vec<T>> {
        let path = self.layout.table_path(T::TABLE);
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(Vec::new());
        };
        let table = RawTable::parse::<T>(&path, &bytes)?;
        match table.partitions.get(video.as_str()) {
            Some(records) => deserialize_records::<T>(&path, &table.headers, records),
            None => Ok(Vec::new()),
        }
    }

    /// Videos that currently have at least one row in the table.
    pub async fn list_videos<T: TableRow>(&self) -> StorageResult<Vec<VideoId>> {
        let path = self.layout.table_path(T::TABLE);
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(Vec::new());
        };
        let table = RawTable::parse::<T>(&path, &bytes)?;
        let mut videos = Vec::with_capacity(table.partitions.len());
        for name in table.partitions.keys() {
            match VideoId::new(name.as_str()) {
                Ok(video) => videos.push(video),
                Err(e) => {
                    warn!(table = T::TABLE, video = %name, "Skipping invalid partition: {}", e)
                }
            }
        }
        Ok(videos)
    }

    /// Replace the partition of `video` with `rows`.
    ///
    /// An empty `rows` removes the partition.
    pub async fn replace_partition<T: TableRow>(
        &self,
        video: &VideoId,
        rows: Vec<T>,
    ) -> StorageResult<UpsertStats> {
        self.modify_partition(video, move |_existing: Vec<T>| Ok(rows))
            .await
    }

    /// Read-modify-write the partition of `video` under the table lock.
    ///
    /// `update` receives the current rows of the partition and returns the
    /// rows to store. Other partitions pass through byte-identical.
    pub async fn modify_partition<T, F>(
        &self,
        video: &VideoId,
        update: F,
    ) -> StorageResult<UpsertStats>
    where
        T: TableRow,
        F: FnOnce(Vec<T>) -> StorageResult<Vec<T>> + Send,
    {
        let lock = self.table_lock(T::TABLE).await;
        let _guard = lock.lock().await;

        let path = self.layout.table_path(T::TABLE);
        let mut table = match read_optional(&path).await? {
            Some(bytes) => RawTable::parse::<T>(&path, &bytes)?,
            None => RawTable::empty::<T>(),
        };

        let existing_records = table
            .partitions
            .remove(video.as_str())
            .unwrap_or_default();
        let existing = deserialize_records::<T>(&path, &table.headers, &existing_records)?;
        let rows_replaced = existing.len();

        let mut rows = update(existing)?;
        for row in &rows {
            if row.video() != video {
                return Err(StorageError::ForeignRow {
                    table: T::TABLE,
                    expected: video.to_string(),
                    found: row.video().to_string(),
                });
            }
        }
        sort_and_check_unique(&mut rows)?;

        let other_rows = table.partitions.values().map(Vec::len).sum();
        let rows_written = rows.len();

        let mut partitions: BTreeMap<String, Partition<T>> = table
            .partitions
            .into_iter()
            .map(|(name, records)| (name, Partition::Raw(records)))
            .collect();
        if !rows.is_empty() {
            partitions.insert(video.to_string(), Partition::Rows(rows));
        }

        let bytes = render::<T>(table.header_raw.as_deref(), &partitions)?;
        write_atomic(&path, &bytes).await?;

        debug!(
            table = T::TABLE,
            video = %video,
            rows_written,
            rows_replaced,
            other_rows,
            "Partition replaced"
        );

        Ok(UpsertStats {
            table: T::TABLE,
            rows_written,
            rows_replaced,
            other_rows,
        })
    }

    /// Replace the whole table (full rebuild).
    pub async fn rewrite_all<T: TableRow>(&self, mut rows: Vec<T>) -> StorageResult<usize> {
        let lock = self.table_lock(T::TABLE).await;
        let _guard = lock.lock().await;

        sort_and_check_unique(&mut rows)?;
        let count = rows.len();

        let mut partitions: BTreeMap<String, Partition<T>> = BTreeMap::new();
        for row in rows {
            let entry = partitions
                .entry(row.video().to_string())
                .or_insert_with(|| Partition::Rows(Vec::new()));
            if let Partition::Rows(list) = entry {
                list.push(row);
            }
        }

        let path = self.layout.table_path(T::TABLE);
        let bytes = render::<T>(None, &partitions)?;
        write_atomic(&path, &bytes).await?;

        debug!(table = T::TABLE, rows = count, "Table rewritten");
        Ok(count)
    }
}

/// Table contents grouped by partition, records left unparsed.
struct RawTable {
    headers: StringRecord,
    /// Header line as found on disk, terminator included
    header_raw: Option<Vec<u8>>,
    partitions: BTreeMap<String, Vec<RawRecord>>,
}

/// One record together with the exact bytes it occupied in the file.
struct RawRecord {
    record: StringRecord,
    raw: Vec<u8>,
}

impl RawTable {
    fn empty<T: TableRow>() -> Self {
        Self {
            headers: StringRecord::from(T::COLUMNS.to_vec()),
            header_raw: None,
            partitions: BTreeMap::new(),
        }
    }

    fn parse<T: TableRow>(path: &Path, bytes: &[u8]) -> StorageResult<Self> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::empty::<T>());
        }

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
        let headers = reader
            .headers()
            .map_err(|e| StorageError::csv(path, e))?
            .clone();

        if headers.iter().ne(T::COLUMNS.iter().copied()) {
            return Err(StorageError::SchemaMismatch {
                path: path.to_path_buf(),
                expected: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
                found: headers.iter().map(|c| c.to_string()).collect(),
            });
        }
        debug_assert_eq!(T::COLUMNS.first().copied(), Some(VIDEO_COLUMN));

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| StorageError::csv(path, e))?;
            let offset = record.position().map_or(0, |pos| pos.byte()) as usize;
            records.push((content_start(bytes, offset), record));
        }

        // A record spans from its first byte to the first byte of the next
        // one, so its terminator (and any blank lines after it) stay with it
        let header_end = records.first().map_or(bytes.len(), |(start, _)| *start);
        let ends: Vec<usize> = records
            .iter()
            .skip(1)
            .map(|(start, _)| *start)
            .chain(std::iter::once(bytes.len()))
            .collect();

        let mut partitions: BTreeMap<String, Vec<RawRecord>> = BTreeMap::new();
        for ((start, record), end) in records.into_iter().zip(ends) {
            let video = record.get(0).unwrap_or_default().to_string();
            partitions.entry(video).or_default().push(RawRecord {
                record,
                raw: terminated(&bytes[start..end]),
            });
        }

        Ok(Self {
            headers,
            header_raw: Some(terminated(&bytes[..header_end])),
            partitions,
        })
    }
}

/// Skip the line terminator bytes the reader leaves in front of a record.
fn content_start(bytes: &[u8], mut offset: usize) -> usize {
    while offset < bytes.len() && matches!(bytes[offset], b'\r' | b'\n') {
        offset += 1;
    }
    offset
}

/// Raw bytes of a line, with a `\n` added when the file ended without one.
fn terminated(raw: &[u8]) -> Vec<u8> {
    let mut line = raw.to_vec();
    if !matches!(line.last(), Some(b'\n' | b'\r')) {
        line.push(b'\n');
    }
    line
}

enum Partition<T> {
    /// Untouched records of another video
    Raw(Vec<RawRecord>),
    /// Freshly computed rows of the target video
    Rows(Vec<T>),
}

fn deserialize_records<T: TableRow>(
    path: &Path,
    headers: &StringRecord,
    records: &[RawRecord],
) -> StorageResult<Vec<T>> {
    records
        .iter()
        .map(|raw| {
            raw.record
                .deserialize::<T>(Some(headers))
                .map_err(|e| StorageError::csv(path, e))
        })
        .collect()
}

fn sort_and_check_unique<T: TableRow>(rows: &mut [T]) -> StorageResult<()> {
    rows.sort_by_key(|row| row.key());
    if let Some(pair) = rows.windows(2).find(|pair| pair[0].key() == pair[1].key()) {
        return Err(StorageError::DuplicateKey {
            table: T::TABLE,
            key: format!("{:?}", pair[0].key()),
        });
    }
    Ok(())
}

fn render<T: TableRow>(
    header_raw: Option<&[u8]>,
    partitions: &BTreeMap<String, Partition<T>>,
) -> StorageResult<Vec<u8>> {
    let mut out = match header_raw {
        Some(raw) => raw.to_vec(),
        None => serialize_lines(|writer| writer.write_record(T::COLUMNS))?,
    };

    for partition in partitions.values() {
        match partition {
            Partition::Raw(records) => {
                for record in records {
                    out.extend_from_slice(&record.raw);
                }
            }
            Partition::Rows(rows) => {
                out.extend(serialize_lines(|writer| {
                    rows.iter().try_for_each(|row| writer.serialize(row))
                })?);
            }
        }
    }
    Ok(out)
}

fn serialize_lines<F>(write: F) -> StorageResult<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    write(&mut writer).map_err(|e| StorageError::Serialization(e.to_string()))?;
    writer
        .into_inner()
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkwatch_models::{ActivityLabel, CrowdStatistics, FeatureRow, LabeledTrainingRow};
    use tempfile::TempDir;

    fn video(id: &str) -> VideoId {
        VideoId::new(id).unwrap()
    }

    fn feature(id: &str, second: u32, ratio: f64, people: u32) -> FeatureRow {
        FeatureRow {
            video: video(id),
            second,
            avg_motion_ratio: ratio,
            motion_std: 0.0,
            people_count: people,
        }
    }

    fn store(dir: &TempDir) -> TableStore {
        TableStore::new(DataLayout::new(dir.path()))
    }

    #[tokio::test]
    async fn test_missing_table_reads_empty() {
        let dir = TempDir::new().unwrap();
        let rows: Vec<FeatureRow> = store(&dir).read_all().await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_replace_partition_sorts_and_writes_header() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .replace_partition(&video("b"), vec![feature("b", 2, 0.5, 1), feature("b", 1, 0.25, 0)])
            .await
            .unwrap();

        let text = std::fs::read_to_string(store.layout().table_path("master_dataset")).unwrap();
        assert_eq!(
            text,
            "video,second,avg_motion_ratio,motion_std,people_count\n\
             b,1,0.25,0.0,0\n\
             b,2,0.5,0.0,1\n"
        );
    }

    #[tokio::test]
    async fn test_other_partitions_pass_through_byte_identical() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.layout().table_path("master_dataset");

        // Hand-written rows in a formatting our serializer would not produce
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "video,second,avg_motion_ratio,motion_std,people_count\n\
             a,0,0.100000,0.0,3\n\
             c,5,1e-3,0,2\n",
        )
        .unwrap();

        let stats = store
            .replace_partition(&video("b"), vec![feature("b", 0, 0.5, 1)])
            .await
            .unwrap();
        assert_eq!(stats.other_rows, 2);
        assert_eq!(stats.rows_replaced, 0);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "video,second,avg_motion_ratio,motion_std,people_count\n\
             a,0,0.100000,0.0,3\n\
             b,0,0.5,0.0,1\n\
             c,5,1e-3,0,2\n"
        );
    }

    #[tokio::test]
    async fn test_crlf_and_quoted_records_keep_their_bytes() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.layout().table_path("master_dataset");

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "video,second,avg_motion_ratio,motion_std,people_count\r\n\
             \"a\",0,0.1,0.0,3\r\n\
             \"c\",\"4\",0.2,0.0,1",
        )
        .unwrap();

        store
            .replace_partition(&video("b"), vec![feature("b", 0, 0.5, 1)])
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "video,second,avg_motion_ratio,motion_std,people_count\r\n\
             \"a\",0,0.1,0.0,3\r\n\
             b,0,0.5,0.0,1\n\
             \"c\",\"4\",0.2,0.0,1\n"
        );

        let rows: Vec<FeatureRow> = store.read_partition(&video("c")).await.unwrap();
        assert_eq!(rows, vec![feature("c", 4, 0.2, 1)]);
    }

    #[tokio::test]
    async fn test_replace_discards_previous_partition_rows() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .replace_partition(&video("a"), vec![feature("a", 0, 0.1, 1), feature("a", 1, 0.1, 1)])
            .await
            .unwrap();
        let stats = store
            .replace_partition(&video("a"), vec![feature("a", 7, 0.2, 2)])
            .await
            .unwrap();

        assert_eq!(stats.rows_replaced, 2);
        let rows: Vec<FeatureRow> = store.read_partition(&video("a")).await.unwrap();
        assert_eq!(rows, vec![feature("a", 7, 0.2, 2)]);
    }

    #[tokio::test]
    async fn test_empty_rows_remove_partition() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .replace_partition(&video("a"), vec![feature("a", 0, 0.1, 1)])
            .await
            .unwrap();
        store
            .replace_partition::<FeatureRow>(&video("a"), Vec::new())
            .await
            .unwrap();

        let videos = store.list_videos::<FeatureRow>().await.unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let dir = TempDir::new().unwrap();
        let result = store(&dir)
            .replace_partition(&video("a"), vec![feature("a", 3, 0.1, 1), feature("a", 3, 0.2, 1)])
            .await;
        assert!(matches!(result, Err(StorageError::DuplicateKey { .. })));
    }

    #[tokio::test]
    async fn test_foreign_row_rejected() {
        let dir = TempDir::new().unwrap();
        let result = store(&dir)
            .replace_partition(&video("a"), vec![feature("b", 0, 0.1, 1)])
            .await;
        assert!(matches!(result, Err(StorageError::ForeignRow { .. })));
    }

    #[tokio::test]
    async fn test_schema_mismatch_detected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.layout().table_path("crowd_statistics");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "video,max_people\nx,3\n").unwrap();

        let result = store.read_all::<CrowdStatistics>().await;
        assert!(matches!(result, Err(StorageError::SchemaMismatch { .. })));
    }

    #[tokio::test]
    async fn test_modify_partition_sees_existing_rows() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let row = |second: u32, pseudo: bool| LabeledTrainingRow {
            video: video("a"),
            second,
            avg_motion_ratio: 0.1,
            motion_std: 0.0,
            people_count: 1,
            activity_label: Some(ActivityLabel::Sitting),
            is_pseudo_label: pseudo,
        };

        store
            .replace_partition(&video("a"), vec![row(0, false)])
            .await
            .unwrap();
        store
            .modify_partition(&video("a"), |mut existing: Vec<LabeledTrainingRow>| {
                assert_eq!(existing.len(), 1);
                existing.push(row(1, true));
                Ok(existing)
            })
            .await
            .unwrap();

        let rows: Vec<LabeledTrainingRow> = store.read_all().await.unwrap();
        assert_eq!(rows, vec![row(0, false), row(1, true)]);
    }

    #[tokio::test]
    async fn test_unlabeled_corpus_rows_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.layout().table_path("master_labeled");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "video,second,avg_motion_ratio,motion_std,people_count,activity_label,is_pseudo_label\n\
             a,0,0.1,0.0,2,,False\n\
             a,1,0.2,0.0,2,walking,True\n",
        )
        .unwrap();

        let rows: Vec<LabeledTrainingRow> = store.read_all().await.unwrap();
        assert_eq!(rows[0].activity_label, None);
        assert!(!rows[0].is_pseudo_label);
        assert_eq!(rows[1].activity_label, Some(ActivityLabel::Walking));
        assert!(rows[1].is_pseudo_label);
    }

    #[tokio::test]
    async fn test_concurrent_writers_do_not_lose_partitions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("v{}", i);
                store
                    .replace_partition(&video(&id), vec![feature(&id, i, 0.1, i)])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let videos = store.list_videos::<FeatureRow>().await.unwrap();
        assert_eq!(videos.len(), 8);
    }

    #[tokio::test]
    async fn test_rewrite_all_orders_by_video_then_second() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .rewrite_all(vec![
                feature("b", 10, 0.1, 1),
                feature("a", 2, 0.1, 1),
                feature("b", 9, 0.1, 1),
            ])
            .await
            .unwrap();

        let rows: Vec<FeatureRow> = store.read_all().await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| (r.video.to_string(), r.second)).collect();
        assert_eq!(
            keys,
            vec![("a".to_string(), 2), ("b".to_string(), 9), ("b".to_string(), 10)]
        );
    }
}
