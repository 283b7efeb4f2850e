mod metrics;
mod video;

pub use metrics::{
    rate, rate_1dp, sort_funnel, AnalyticsSnapshot, ChannelStats, DailyUploads, DurationStats,
    FunnelStage, Kpis, LabelCount, Section, StageCount,
};
pub use video::{ChannelShorts, Short};
