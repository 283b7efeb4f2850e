use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub generated: i64,
    pub uploaded: i64,
    pub pending_review: i64,
    /// Percent of reviewed videos that were approved; 0 when nothing reviewed.
    pub approval_rate: f64,
    /// Percent of ingested articles that reached upload; 0 when nothing ingested.
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyUploads {
    pub date: NaiveDate,
    pub uploaded: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunnelStage {
    Ingested,
    Summarized,
    AudioGenerated,
    VideoGenerated,
    Approved,
    Uploaded,
}

impl FunnelStage {
    pub const ORDER: [FunnelStage; 6] = [
        FunnelStage::Ingested,
        FunnelStage::Summarized,
        FunnelStage::AudioGenerated,
        FunnelStage::VideoGenerated,
        FunnelStage::Approved,
        FunnelStage::Uploaded,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FunnelStage::Ingested => "Ingested",
            FunnelStage::Summarized => "Summarized",
            FunnelStage::AudioGenerated => "Audio Generated",
            FunnelStage::VideoGenerated => "Video Generated",
            FunnelStage::Approved => "Approved",
            FunnelStage::Uploaded => "Uploaded",
        }
    }

    pub fn from_label(label: &str) -> Option<FunnelStage> {
        FunnelStage::ORDER.iter().find(|s| s.label() == label).copied()
    }

    pub fn rank(&self) -> usize {
        FunnelStage::ORDER
            .iter()
            .position(|s| s == self)
            .unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageCount {
    pub stage: FunnelStage,
    pub count: i64,
}

/// Re-sort funnel rows into canonical stage order, irrespective of the order
/// the datastore returned them in.
pub fn sort_funnel(mut stages: Vec<StageCount>) -> Vec<StageCount> {
    stages.sort_by_key(|s| s.stage.rank());
    stages
}

/// Null-safe percentage: zero denominator means "no data", displayed as 0.
pub fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        100.0 * numerator as f64 / denominator as f64
    }
}

/// Same, rounded to one decimal place for display.
pub fn rate_1dp(numerator: i64, denominator: i64) -> f64 {
    (rate(numerator, denominator) * 10.0).round() / 10.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationStats {
    pub avg_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStats {
    /// None when the referenced channel row was deleted (left join).
    pub channel_name: Option<String>,
    pub platform: String,
    pub total_uploads: i64,
    pub successful: i64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// One slot per widget; a failed query degrades its own widget only and the
/// error text is rendered in its place.
pub type Section<T> = std::result::Result<T, String>;

#[derive(Debug, Clone)]
pub struct AnalyticsSnapshot {
    pub kpis: Section<Kpis>,
    pub timeline: Section<Vec<DailyUploads>>,
    pub funnel: Section<Vec<StageCount>>,
    pub processing: Section<Option<DurationStats>>,
    pub turnaround: Section<Option<DurationStats>>,
    pub channels: Section<Vec<ChannelStats>>,
    pub categories: Section<Vec<LabelCount>>,
    pub sources: Section<Vec<LabelCount>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn funnel_reorders_to_canonical_stage_sequence() {
        let shuffled = vec![
            StageCount { stage: FunnelStage::Uploaded, count: 3 },
            StageCount { stage: FunnelStage::Ingested, count: 10 },
            StageCount { stage: FunnelStage::Approved, count: 4 },
            StageCount { stage: FunnelStage::Summarized, count: 9 },
            StageCount { stage: FunnelStage::VideoGenerated, count: 5 },
            StageCount { stage: FunnelStage::AudioGenerated, count: 8 },
        ];

        let labels: Vec<_> = sort_funnel(shuffled)
            .iter()
            .map(|s| s.stage.label())
            .collect();

        assert_eq!(
            labels,
            vec![
                "Ingested",
                "Summarized",
                "Audio Generated",
                "Video Generated",
                "Approved",
                "Uploaded"
            ]
        );
    }

    #[test]
    fn stage_labels_round_trip() {
        for stage in FunnelStage::ORDER {
            assert_eq!(FunnelStage::from_label(stage.label()), Some(stage));
        }
        assert_eq!(FunnelStage::from_label("Reviewed"), None);
    }

    #[test]
    fn zero_denominator_yields_zero_not_nan() {
        assert_eq!(rate(5, 0), 0.0);
        assert_eq!(rate_1dp(0, 0), 0.0);
    }

    #[test]
    fn conversion_of_three_in_ten_is_thirty_percent() {
        assert_eq!(rate_1dp(3, 10), 30.0);
    }

    #[test]
    fn rate_rounds_to_one_decimal() {
        assert_eq!(rate_1dp(1, 3), 33.3);
        assert_eq!(rate_1dp(2, 3), 66.7);
    }
}
