//! Row contract shared by every persisted table.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::video::VideoId;

/// Name of the partition column; every table stores it first.
pub const VIDEO_COLUMN: &str = "video";

/// A row of a flat table partitioned by video.
///
/// The serde field order of the implementing struct is the on-disk column
/// order, so fields must never be reordered.
pub trait TableRow: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table name; also the file stem of the table.
    const TABLE: &'static str;

    /// Header row, in serde field order.
    const COLUMNS: &'static [&'static str];

    /// Unique key within the table.
    type Key: Ord + Clone + Debug + Send;

    /// Partition this row belongs to.
    fn video(&self) -> &VideoId;

    fn key(&self) -> Self::Key;
}
