//! Per-video crowd and activity-mix summaries.

use parkwatch_models::{
    round_to, ActivityDistributionSummary, ActivityLabel, ActivityPrediction, CrowdStatistics,
    PersonCountSample, VideoId,
};

/// Crowd statistics over the observed person counts of one video.
///
/// Returns `None` when the video has no person counts.
pub fn crowd_statistics(video: &VideoId, samples: &[PersonCountSample]) -> Option<CrowdStatistics> {
    let first = samples.first()?;

    let mut max_people = first.people_count;
    let mut peak_second = first.second;
    let mut total: u64 = 0;

    for sample in samples {
        total += u64::from(sample.people_count);
        // Ties resolve to the earliest second
        if sample.people_count > max_people
            || (sample.people_count == max_people && sample.second < peak_second)
        {
            max_people = sample.people_count;
            peak_second = sample.second;
        }
    }

    Some(CrowdStatistics {
        video: video.clone(),
        avg_people: round_to(total as f64 / samples.len() as f64, 2),
        max_people,
        peak_second,
    })
}

/// Activity mix of one video's predictions.
///
/// Each percentage is rounded to 2 dp on its own, so the three need not sum
/// to 100. The dominant label is the most frequent one; ties go to the
/// label that comes first in [`ActivityLabel::ALL`].
pub fn activity_distribution(
    video: &VideoId,
    predictions: &[ActivityPrediction],
) -> Option<ActivityDistributionSummary> {
    if predictions.is_empty() {
        return None;
    }

    let mut counts = [0usize; 3];
    for prediction in predictions {
        counts[prediction.predicted_label.index()] += 1;
    }

    let total = predictions.len() as f64;
    let percent = |label: ActivityLabel| round_to(100.0 * counts[label.index()] as f64 / total, 2);

    let mut dominant = ActivityLabel::ALL[0];
    for label in ActivityLabel::ALL {
        if counts[label.index()] > counts[dominant.index()] {
            dominant = label;
        }
    }

    Some(ActivityDistributionSummary {
        video: video.clone(),
        sitting_percent: percent(ActivityLabel::Sitting),
        walking_percent: percent(ActivityLabel::Walking),
        high_activity_percent: percent(ActivityLabel::HighActivity),
        dominant_activity: dominant,
    })
}
