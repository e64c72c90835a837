//! Per-second motion aggregation.

use std::collections::BTreeMap;

use parkwatch_models::{round_to, MotionSecondAggregate, RawMotionSample, VideoId};

use crate::error::{AnalyticsError, AnalyticsResult};

/// Decimal places of every persisted motion statistic.
pub const MOTION_DECIMALS: u32 = 6;

/// Reduce per-frame samples of one video to per-second statistics.
///
/// Samples may arrive in any order; they are grouped by `floor(second)`.
/// The output has one row per observed second, ascending.
pub fn aggregate_motion(
    video: &VideoId,
    samples: &[RawMotionSample],
) -> AnalyticsResult<Vec<MotionSecondAggregate>> {
    let mut by_second: BTreeMap<u32, Vec<f64>> = BTreeMap::new();

    for sample in samples {
        if !sample.second.is_finite() || sample.second < 0.0 || sample.second >= u32::MAX as f64 {
            return Err(AnalyticsError::input_format(
                video,
                format!(
                    "frame {} has invalid second {}",
                    sample.frame_index, sample.second
                ),
            ));
        }
        if !sample.motion_ratio.is_finite() {
            return Err(AnalyticsError::input_format(
                video,
                format!(
                    "frame {} has non-numeric motion_ratio",
                    sample.frame_index
                ),
            ));
        }

        by_second
            .entry(sample.second.floor() as u32)
            .or_default()
            .push(sample.motion_ratio);
    }

    Ok(by_second
        .into_iter()
        .map(|(second, ratios)| summarize_second(video, second, &ratios))
        .collect())
}

fn summarize_second(video: &VideoId, second: u32, ratios: &[f64]) -> MotionSecondAggregate {
    let n = ratios.len() as f64;
    let mean = ratios.iter().sum::<f64>() / n;
    let std = if ratios.len() > 1 {
        (ratios.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt()
    } else {
        0.0
    };
    let max = ratios.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = ratios.iter().copied().fold(f64::INFINITY, f64::min);

    MotionSecondAggregate {
        video: video.clone(),
        second,
        avg_motion_ratio: round_to(mean, MOTION_DECIMALS),
        motion_std: round_to(std, MOTION_DECIMALS),
        max_motion_ratio: round_to(max, MOTION_DECIMALS),
        min_motion_ratio: round_to(min, MOTION_DECIMALS),
        motion_range: round_to(max - min, MOTION_DECIMALS),
    }
}
