//! Feature table merge of motion aggregates and person counts.
//!
//! The key set is the union of both sources. A key with no motion entry gets
//! zero motion features and a key with no person entry gets zero people;
//! absent data is indistinguishable from a measured zero in the output.

use std::collections::BTreeMap;

use parkwatch_models::{round_to, FeatureRow, MotionSecondAggregate, PersonCountSample, VideoId};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::motion::MOTION_DECIMALS;

#[derive(Default)]
struct Entry {
    motion: Option<(f64, f64)>,
    people: Option<u32>,
}

/// Builder keyed by `(video, second)`; rejects duplicate keys per source.
#[derive(Default)]
pub struct FeatureMerge {
    entries: BTreeMap<(VideoId, u32), Entry>,
}

impl FeatureMerge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_motion(&mut self, row: &MotionSecondAggregate) -> AnalyticsResult<()> {
        let entry = self
            .entries
            .entry((row.video.clone(), row.second))
            .or_default();
        if entry.motion.is_some() {
            return Err(AnalyticsError::input_format(
                &row.video,
                format!("duplicate motion aggregate for second {}", row.second),
            ));
        }
        entry.motion = Some((row.avg_motion_ratio, row.motion_std));
        Ok(())
    }

    pub fn add_people(&mut self, sample: &PersonCountSample) -> AnalyticsResult<()> {
        let entry = self
            .entries
            .entry((sample.video.clone(), sample.second))
            .or_default();
        if entry.people.is_some() {
            return Err(AnalyticsError::input_format(
                &sample.video,
                format!("duplicate person count for second {}", sample.second),
            ));
        }
        entry.people = Some(sample.people_count);
        Ok(())
    }

    /// Rows sorted by video, then second.
    pub fn finish(self) -> Vec<FeatureRow> {
        self.entries
            .into_iter()
            .map(|((video, second), entry)| {
                let (avg, std) = entry.motion.unwrap_or((0.0, 0.0));
                FeatureRow {
                    video,
                    second,
                    avg_motion_ratio: round_to(avg, MOTION_DECIMALS),
                    motion_std: round_to(std, MOTION_DECIMALS),
                    people_count: entry.people.unwrap_or(0),
                }
            })
            .collect()
    }
}

/// Feature rows of one video (scoped mode).
///
/// Every input row must belong to `video`.
pub fn merge_partition(
    video: &VideoId,
    motion: &[MotionSecondAggregate],
    people: &[PersonCountSample],
) -> AnalyticsResult<Vec<FeatureRow>> {
    let mut merge = FeatureMerge::new();
    for row in motion {
        ensure_video(video, &row.video)?;
        merge.add_motion(row)?;
    }
    for sample in people {
        ensure_video(video, &sample.video)?;
        merge.add_people(sample)?;
    }
    Ok(merge.finish())
}

/// Feature rows of every video (full rebuild).
pub fn merge_all(
    motion: &[MotionSecondAggregate],
    people: &[PersonCountSample],
) -> AnalyticsResult<Vec<FeatureRow>> {
    let mut merge = FeatureMerge::new();
    for row in motion {
        merge.add_motion(row)?;
    }
    for sample in people {
        merge.add_people(sample)?;
    }
    Ok(merge.finish())
}

fn ensure_video(expected: &VideoId, found: &VideoId) -> AnalyticsResult<()> {
    if expected != found {
        return Err(AnalyticsError::input_format(
            expected,
            format!("row of video {} in input", found),
        ));
    }
    Ok(())
}
