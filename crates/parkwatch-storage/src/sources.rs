//! Readers for the raw per-video inputs produced by the external analyzers.
//!
//! Motion files carry one row per frame (`frame,second,motion_pixels,motion_ratio`);
//! person-count files carry one row per sampled second
//! (`video,second,people_count`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use tokio::fs;
use tracing::{debug, warn};

use parkwatch_models::{PersonCountSample, RawMotionSample, VideoId};

use crate::error::{StorageError, StorageResult};
use crate::layout::DataLayout;

/// Source of raw samples for one video.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Per-frame motion samples, in file order.
    async fn motion_samples(&self, video: &VideoId) -> StorageResult<Vec<RawMotionSample>>;

    /// Per-second person counts, ordered by second; later duplicates win.
    async fn person_counts(&self, video: &VideoId) -> StorageResult<Vec<PersonCountSample>>;

    /// Videos that have a motion file.
    async fn videos_with_motion(&self) -> StorageResult<Vec<VideoId>>;

    /// Videos that have a person-count file.
    async fn videos_with_person_counts(&self) -> StorageResult<Vec<VideoId>>;
}

/// Reads raw inputs from the CSV files under a [`DataLayout`].
#[derive(Debug, Clone)]
pub struct CsvSampleSource {
    layout: DataLayout,
}

impl CsvSampleSource {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    async fn read_required(&self, path: &Path, what: &str) -> StorageResult<Vec<u8>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(
                format!("{} file {}", what, path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SampleSource for CsvSampleSource {
    async fn motion_samples(&self, video: &VideoId) -> StorageResult<Vec<RawMotionSample>> {
        let path = self.layout.motion_raw_path(video);
        let bytes = self.read_required(&path, "motion").await?;
        let samples = parse_motion_samples(&path, &bytes)?;
        debug!(video = %video, samples = samples.len(), "Loaded motion samples");
        Ok(samples)
    }

    async fn person_counts(&self, video: &VideoId) -> StorageResult<Vec<PersonCountSample>> {
        let path = self.layout.people_path(video);
        let bytes = self.read_required(&path, "person-count").await?;
        let samples = parse_person_counts(&path, &bytes, video)?;
        debug!(video = %video, samples = samples.len(), "Loaded person counts");
        Ok(samples)
    }

    async fn videos_with_motion(&self) -> StorageResult<Vec<VideoId>> {
        list_videos(&self.layout.motion_raw_dir(), DataLayout::MOTION_SUFFIX).await
    }

    async fn videos_with_person_counts(&self) -> StorageResult<Vec<VideoId>> {
        list_videos(&self.layout.people_dir(), DataLayout::PEOPLE_SUFFIX).await
    }
}

async fn list_videos(dir: &Path, suffix: &str) -> StorageResult<Vec<VideoId>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(stem) = name.strip_suffix(suffix) else {
            continue;
        };
        match VideoId::new(stem) {
            Ok(video) => videos.push(video),
            Err(e) => warn!(file = %name, "Ignoring raw input with invalid video id: {}", e),
        }
    }
    videos.sort();
    Ok(videos)
}

/// Column positions resolved from a header row.
struct Columns {
    path: PathBuf,
    indices: Vec<usize>,
}

impl Columns {
    /// Resolve each wanted column by its accepted names.
    fn resolve(path: &Path, headers: &StringRecord, wanted: &[&[&str]]) -> StorageResult<Self> {
        let mut indices = Vec::with_capacity(wanted.len());
        for names in wanted {
            let index = headers
                .iter()
                .position(|h| names.contains(&h.trim()))
                .ok_or_else(|| {
                    StorageError::input_format(path, 1, names[0], "missing column in header")
                })?;
            indices.push(index);
        }
        Ok(Self {
            path: path.to_path_buf(),
            indices,
        })
    }

    fn field<'r>(&self, record: &'r StringRecord, column: usize) -> &'r str {
        record.get(self.indices[column]).unwrap_or_default().trim()
    }

    fn parse<T: std::str::FromStr>(
        &self,
        record: &StringRecord,
        column: usize,
        name: &str,
    ) -> StorageResult<T>
    where
        T::Err: std::fmt::Display,
    {
        let raw = self.field(record, column);
        raw.parse::<T>().map_err(|e| {
            StorageError::input_format(
                &self.path,
                line_of(record),
                name,
                format!("cannot parse {:?}: {}", raw, e),
            )
        })
    }

    fn error(&self, record: &StringRecord, field: &str, reason: impl Into<String>) -> StorageError {
        StorageError::input_format(&self.path, line_of(record), field, reason)
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| b.is_ascii_whitespace())
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

/// Parse a per-frame motion file.
///
/// `frame_index`/`motion_pixel_count` are accepted as aliases of
/// `frame`/`motion_pixels`.
pub fn parse_motion_samples(path: &Path, bytes: &[u8]) -> StorageResult<Vec<RawMotionSample>> {
    const FRAME: usize = 0;
    const SECOND: usize = 1;
    const PIXELS: usize = 2;
    const RATIO: usize = 3;

    if is_blank(bytes) {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| StorageError::csv(path, e))?
        .clone();
    let columns = Columns::resolve(
        path,
        &headers,
        &[
            &["frame", "frame_index"],
            &["second"],
            &["motion_pixels", "motion_pixel_count"],
            &["motion_ratio"],
        ],
    )?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| StorageError::csv(path, e))?;

        let frame_index = columns.parse::<u64>(&record, FRAME, "frame")?;
        let second = columns.parse::<f64>(&record, SECOND, "second")?;
        if !second.is_finite() || second < 0.0 {
            return Err(columns.error(&record, "second", "must be a finite, non-negative number"));
        }
        let motion_pixel_count = columns.parse::<u64>(&record, PIXELS, "motion_pixels")?;
        let motion_ratio = columns.parse::<f64>(&record, RATIO, "motion_ratio")?;
        if !motion_ratio.is_finite() || !(0.0..=1.0).contains(&motion_ratio) {
            return Err(columns.error(&record, "motion_ratio", "must be within [0, 1]"));
        }

        samples.push(RawMotionSample {
            frame_index,
            second,
            motion_pixel_count,
            motion_ratio,
        });
    }

    Ok(samples)
}

/// Parse a per-second person-count file for `video`.
///
/// Rows must name `video`; when a second appears more than once the last row
/// wins.
pub fn parse_person_counts(
    path: &Path,
    bytes: &[u8],
    video: &VideoId,
) -> StorageResult<Vec<PersonCountSample>> {
    const VIDEO: usize = 0;
    const SECOND: usize = 1;
    const PEOPLE: usize = 2;

    if is_blank(bytes) {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| StorageError::csv(path, e))?
        .clone();
    let columns = Columns::resolve(
        path,
        &headers,
        &[&["video"], &["second"], &["people_count"]],
    )?;

    let mut by_second: BTreeMap<u32, u32> = BTreeMap::new();
    for record in reader.records() {
        let record = record.map_err(|e| StorageError::csv(path, e))?;

        let named = columns.field(&record, VIDEO);
        if named != video.as_str() {
            return Err(columns.error(
                &record,
                "video",
                format!("expected {:?}, found {:?}", video.as_str(), named),
            ));
        }
        let second = columns.parse::<u32>(&record, SECOND, "second")?;
        let people = columns.parse::<u32>(&record, PEOPLE, "people_count")?;

        if by_second.insert(second, people).is_some() {
            debug!(video = %video, second, "Duplicate person count, keeping last");
        }
    }

    Ok(by_second
        .into_iter()
        .map(|(second, people)| PersonCountSample::new(video.clone(), second, people))
        .collect())
}
