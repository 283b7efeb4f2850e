use chrono::NaiveDate;
use sqlx::Row;

use crate::cache::{TtlCache, DEFAULT_TTL};
use crate::error::Result;
use crate::models::{
    rate, rate_1dp, sort_funnel, AnalyticsSnapshot, ChannelStats, DailyUploads, DurationStats,
    FunnelStage, Kpis, LabelCount, StageCount,
};
use crate::period::DateWindow;

use super::client::Db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum QueryId {
    Generated,
    Uploaded,
    PendingReview,
    ApprovalRate,
    ConversionRate,
    UploadTimeline,
    Funnel,
    ProcessingTime,
    TurnaroundTime,
    ChannelPerformance,
    Categories,
    Sources,
}

// Cache keys are (query, start, end); the window always arrives as typed
// binds, never interpolated into SQL text.
type CacheKey = (QueryId, NaiveDate, NaiveDate);

fn key(id: QueryId, window: &DateWindow) -> CacheKey {
    (id, window.start, window.end)
}

/// Windowed read queries over the pipeline schema, memoized for an hour per
/// (query, window) so repeated renders do not re-hit the datastore.
pub struct Analytics {
    db: Db,
    counts: TtlCache<CacheKey, i64>,
    rates: TtlCache<CacheKey, f64>,
    timeline: TtlCache<CacheKey, Vec<DailyUploads>>,
    funnel: TtlCache<CacheKey, Vec<StageCount>>,
    durations: TtlCache<CacheKey, Option<DurationStats>>,
    channels: TtlCache<CacheKey, Vec<ChannelStats>>,
    breakdowns: TtlCache<CacheKey, Vec<LabelCount>>,
}

impl Analytics {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            counts: TtlCache::new(),
            rates: TtlCache::new(),
            timeline: TtlCache::new(),
            funnel: TtlCache::new(),
            durations: TtlCache::new(),
            channels: TtlCache::new(),
            breakdowns: TtlCache::new(),
        }
    }

    /// Fetch every widget for one window. Each section degrades independently;
    /// a failed query becomes display text in its own slot.
    pub async fn snapshot(&self, window: &DateWindow) -> AnalyticsSnapshot {
        AnalyticsSnapshot {
            kpis: self.kpis(window).await.map_err(|e| e.to_string()),
            timeline: self.upload_timeline(window).await.map_err(|e| e.to_string()),
            funnel: self.funnel(window).await.map_err(|e| e.to_string()),
            processing: self.processing_time(window).await.map_err(|e| e.to_string()),
            turnaround: self.turnaround_time(window).await.map_err(|e| e.to_string()),
            channels: self.channel_performance(window).await.map_err(|e| e.to_string()),
            categories: self.categories(window).await.map_err(|e| e.to_string()),
            sources: self.top_sources(window).await.map_err(|e| e.to_string()),
        }
    }

    pub async fn kpis(&self, window: &DateWindow) -> Result<Kpis> {
        Ok(Kpis {
            generated: self.generated(window).await?,
            uploaded: self.uploaded(window).await?,
            pending_review: self.pending_review(window).await?,
            approval_rate: self.approval_rate(window).await?,
            conversion_rate: self.conversion_rate(window).await?,
        })
    }

    pub async fn generated(&self, window: &DateWindow) -> Result<i64> {
        self.count(
            QueryId::Generated,
            window,
            "SELECT COUNT(*) FROM video_generations \
             WHERE status = 'completed' \
             AND created_at >= $1 AND created_at < $2",
        )
        .await
    }

    pub async fn uploaded(&self, window: &DateWindow) -> Result<i64> {
        self.count(
            QueryId::Uploaded,
            window,
            "SELECT COUNT(DISTINCT video_generation_id) FROM video_uploads \
             WHERE upload_status = 'completed' \
             AND created_at >= $1 AND created_at < $2",
        )
        .await
    }

    pub async fn pending_review(&self, window: &DateWindow) -> Result<i64> {
        self.count(
            QueryId::PendingReview,
            window,
            "SELECT COUNT(*) FROM video_generations \
             WHERE reviewed_at IS NULL AND review_status IS NULL \
             AND created_at >= $1 AND created_at < $2",
        )
        .await
    }

    /// Approved over reviewed, in percent. 0 when nothing has been reviewed.
    pub async fn approval_rate(&self, window: &DateWindow) -> Result<f64> {
        self.rates
            .get_or_compute(key(QueryId::ApprovalRate, window), DEFAULT_TTL, || async move {
                let mut conn = self.db.connect().await?;
                let row = sqlx::query(
                    "SELECT \
                       COUNT(*) FILTER (WHERE review_status = 'approved'), \
                       COUNT(*) FILTER (WHERE review_status IS NOT NULL) \
                     FROM video_generations \
                     WHERE created_at >= $1 AND created_at < $2",
                )
                .bind(window.start)
                .bind(window.end_exclusive())
                .fetch_one(&mut conn)
                .await?;

                let approved: i64 = row.try_get(0)?;
                let reviewed: i64 = row.try_get(1)?;
                Ok(rate(approved, reviewed))
            })
            .await
    }

    /// Uploaded over ingested, in percent, one decimal. 0 when nothing ingested.
    pub async fn conversion_rate(&self, window: &DateWindow) -> Result<f64> {
        self.rates
            .get_or_compute(
                key(QueryId::ConversionRate, window),
                DEFAULT_TTL,
                || async move {
                    let mut conn = self.db.connect().await?;
                    let row = sqlx::query(
                        "SELECT \
                           (SELECT COUNT(DISTINCT video_generation_id) FROM video_uploads \
                            WHERE upload_status = 'completed' \
                            AND created_at >= $1 AND created_at < $2), \
                           (SELECT COUNT(*) FROM news \
                            WHERE created_at >= $1 AND created_at < $2)",
                    )
                    .bind(window.start)
                    .bind(window.end_exclusive())
                    .fetch_one(&mut conn)
                    .await?;

                    let uploaded: i64 = row.try_get(0)?;
                    let ingested: i64 = row.try_get(1)?;
                    Ok(rate_1dp(uploaded, ingested))
                },
            )
            .await
    }

    /// Distinct uploads per calendar day, ascending. Empty is "no data".
    pub async fn upload_timeline(&self, window: &DateWindow) -> Result<Vec<DailyUploads>> {
        self.timeline
            .get_or_compute(
                key(QueryId::UploadTimeline, window),
                DEFAULT_TTL,
                || async move {
                    let mut conn = self.db.connect().await?;
                    let rows = sqlx::query(
                        "SELECT created_at::date AS upload_date, \
                                COUNT(DISTINCT video_generation_id) AS videos_uploaded \
                         FROM video_uploads \
                         WHERE upload_status = 'completed' \
                         AND created_at >= $1 AND created_at < $2 \
                         GROUP BY created_at::date \
                         ORDER BY upload_date",
                    )
                    .bind(window.start)
                    .bind(window.end_exclusive())
                    .fetch_all(&mut conn)
                    .await?;

                    rows.iter()
                        .map(|row| {
                            Ok(DailyUploads {
                                date: row.try_get(0)?,
                                uploaded: row.try_get(1)?,
                            })
                        })
                        .collect()
                },
            )
            .await
    }

    /// Six independent stage counts over the same window, re-sorted client-side
    /// into the canonical stage order.
    pub async fn funnel(&self, window: &DateWindow) -> Result<Vec<StageCount>> {
        self.funnel
            .get_or_compute(key(QueryId::Funnel, window), DEFAULT_TTL, || async move {
                let mut conn = self.db.connect().await?;
                let rows = sqlx::query(
                    "SELECT 'Ingested' AS stage, COUNT(DISTINCT id) AS count \
                     FROM news \
                     WHERE created_at >= $1 AND created_at < $2 \
                     UNION ALL \
                     SELECT 'Summarized', COUNT(DISTINCT article_id) \
                     FROM article_summaries \
                     WHERE created_at >= $1 AND created_at < $2 \
                     UNION ALL \
                     SELECT 'Audio Generated', COUNT(DISTINCT article_id) \
                     FROM audio_transcripts \
                     WHERE created_at >= $1 AND created_at < $2 \
                     UNION ALL \
                     SELECT 'Video Generated', COUNT(DISTINCT id) \
                     FROM video_generations \
                     WHERE status = 'completed' \
                     AND created_at >= $1 AND created_at < $2 \
                     UNION ALL \
                     SELECT 'Approved', COUNT(DISTINCT id) \
                     FROM video_generations \
                     WHERE review_status = 'approved' \
                     AND created_at >= $1 AND created_at < $2 \
                     UNION ALL \
                     SELECT 'Uploaded', COUNT(DISTINCT video_generation_id) \
                     FROM video_uploads \
                     WHERE upload_status = 'completed' \
                     AND created_at >= $1 AND created_at < $2",
                )
                .bind(window.start)
                .bind(window.end_exclusive())
                .fetch_all(&mut conn)
                .await?;

                let mut labeled = Vec::with_capacity(rows.len());
                for row in &rows {
                    let label: String = row.try_get(0)?;
                    let count: i64 = row.try_get(1)?;
                    labeled.push((label, count));
                }
                Ok(stage_counts(labeled))
            })
            .await
    }

    /// News ingestion to video completion, excluding review.
    pub async fn processing_time(&self, window: &DateWindow) -> Result<Option<DurationStats>> {
        self.duration_stats(
            QueryId::ProcessingTime,
            window,
            "SELECT \
               ROUND(AVG(EXTRACT(EPOCH FROM (vg.completed_at - n.created_at)) / 3600)::numeric, 2)::float8, \
               ROUND(MIN(EXTRACT(EPOCH FROM (vg.completed_at - n.created_at)) / 3600)::numeric, 2)::float8, \
               ROUND(MAX(EXTRACT(EPOCH FROM (vg.completed_at - n.created_at)) / 3600)::numeric, 2)::float8 \
             FROM video_generations vg \
             JOIN news n ON vg.article_id = n.id \
             WHERE vg.status = 'completed' \
             AND vg.completed_at IS NOT NULL \
             AND vg.created_at >= $1 AND vg.created_at < $2",
        )
        .await
    }

    /// News ingestion to completed upload, including review.
    pub async fn turnaround_time(&self, window: &DateWindow) -> Result<Option<DurationStats>> {
        self.duration_stats(
            QueryId::TurnaroundTime,
            window,
            "SELECT \
               ROUND(AVG(EXTRACT(EPOCH FROM (vu.created_at - n.created_at)) / 3600)::numeric, 2)::float8, \
               ROUND(MIN(EXTRACT(EPOCH FROM (vu.created_at - n.created_at)) / 3600)::numeric, 2)::float8, \
               ROUND(MAX(EXTRACT(EPOCH FROM (vu.created_at - n.created_at)) / 3600)::numeric, 2)::float8 \
             FROM video_generations vg \
             JOIN news n ON vg.article_id = n.id \
             JOIN video_uploads vu ON vg.id = vu.video_generation_id \
             WHERE vu.upload_status = 'completed' \
             AND vu.created_at >= $1 AND vu.created_at < $2",
        )
        .await
    }

    /// Upload attempts and success rate per (channel, platform), most active
    /// first. Deleted channels stay in the result with no name.
    pub async fn channel_performance(&self, window: &DateWindow) -> Result<Vec<ChannelStats>> {
        self.channels
            .get_or_compute(
                key(QueryId::ChannelPerformance, window),
                DEFAULT_TTL,
                || async move {
                    let mut conn = self.db.connect().await?;
                    let rows = sqlx::query(
                        "SELECT c.name, u.platform, COUNT(*) AS total_uploads, \
                                COUNT(*) FILTER (WHERE u.upload_status = 'completed') AS successful \
                         FROM video_uploads u \
                         LEFT JOIN channels c ON u.channel_id = c.id \
                         WHERE u.created_at >= $1 AND u.created_at < $2 \
                         GROUP BY c.name, u.platform \
                         ORDER BY total_uploads DESC",
                    )
                    .bind(window.start)
                    .bind(window.end_exclusive())
                    .fetch_all(&mut conn)
                    .await?;

                    rows.iter()
                        .map(|row| {
                            let total: i64 = row.try_get(2)?;
                            let successful: i64 = row.try_get(3)?;
                            Ok(ChannelStats {
                                channel_name: row.try_get(0)?,
                                platform: row.try_get(1)?,
                                total_uploads: total,
                                successful,
                                success_rate: rate_1dp(successful, total),
                            })
                        })
                        .collect()
                },
            )
            .await
    }

    /// Article count per category, descending.
    pub async fn categories(&self, window: &DateWindow) -> Result<Vec<LabelCount>> {
        self.breakdown(
            QueryId::Categories,
            window,
            "SELECT category, COUNT(*) AS count \
             FROM news \
             WHERE created_at >= $1 AND created_at < $2 \
             GROUP BY category \
             ORDER BY count DESC",
        )
        .await
    }

    /// Ten busiest news sources, descending.
    pub async fn top_sources(&self, window: &DateWindow) -> Result<Vec<LabelCount>> {
        self.breakdown(
            QueryId::Sources,
            window,
            "SELECT source_name, COUNT(*) AS count \
             FROM news \
             WHERE created_at >= $1 AND created_at < $2 \
             GROUP BY source_name \
             ORDER BY count DESC \
             LIMIT 10",
        )
        .await
    }

    async fn count(&self, id: QueryId, window: &DateWindow, sql: &str) -> Result<i64> {
        self.counts
            .get_or_compute(key(id, window), DEFAULT_TTL, || async move {
                let mut conn = self.db.connect().await?;
                let row = sqlx::query(sql)
                    .bind(window.start)
                    .bind(window.end_exclusive())
                    .fetch_one(&mut conn)
                    .await?;
                Ok(row.try_get(0)?)
            })
            .await
    }

    async fn duration_stats(
        &self,
        id: QueryId,
        window: &DateWindow,
        sql: &str,
    ) -> Result<Option<DurationStats>> {
        self.durations
            .get_or_compute(key(id, window), DEFAULT_TTL, || async move {
                let mut conn = self.db.connect().await?;
                let row = sqlx::query(sql)
                    .bind(window.start)
                    .bind(window.end_exclusive())
                    .fetch_one(&mut conn)
                    .await?;

                // Aggregates over zero rows come back NULL: valid "no data"
                let avg: Option<f64> = row.try_get(0)?;
                let min: Option<f64> = row.try_get(1)?;
                let max: Option<f64> = row.try_get(2)?;

                Ok(match (avg, min, max) {
                    (Some(avg_hours), Some(min_hours), Some(max_hours)) => Some(DurationStats {
                        avg_hours,
                        min_hours,
                        max_hours,
                    }),
                    _ => None,
                })
            })
            .await
    }

    async fn breakdown(
        &self,
        id: QueryId,
        window: &DateWindow,
        sql: &str,
    ) -> Result<Vec<LabelCount>> {
        self.breakdowns
            .get_or_compute(key(id, window), DEFAULT_TTL, || async move {
                let mut conn = self.db.connect().await?;
                let rows = sqlx::query(sql)
                    .bind(window.start)
                    .bind(window.end_exclusive())
                    .fetch_all(&mut conn)
                    .await?;

                rows.iter()
                    .map(|row| {
                        Ok(LabelCount {
                            label: row.try_get(0)?,
                            count: row.try_get(1)?,
                        })
                    })
                    .collect()
            })
            .await
    }
}

fn stage_counts(rows: Vec<(String, i64)>) -> Vec<StageCount> {
    let stages = rows
        .into_iter()
        .filter_map(|(label, count)| match FunnelStage::from_label(&label) {
            Some(stage) => Some(StageCount { stage, count }),
            None => {
                tracing::warn!("Ignoring unknown funnel stage {label:?}");
                None
            }
        })
        .collect();
    sort_funnel(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_rows_are_mapped_and_reordered() {
        let rows = vec![
            ("Uploaded".to_string(), 3),
            ("Ingested".to_string(), 10),
            ("Audio Generated".to_string(), 8),
        ];

        let stages = stage_counts(rows);

        assert_eq!(
            stages,
            vec![
                StageCount { stage: FunnelStage::Ingested, count: 10 },
                StageCount { stage: FunnelStage::AudioGenerated, count: 8 },
                StageCount { stage: FunnelStage::Uploaded, count: 3 },
            ]
        );
    }

    #[test]
    fn unknown_stage_labels_are_dropped() {
        let rows = vec![
            ("Ingested".to_string(), 10),
            ("Transcoded".to_string(), 5),
        ];

        let stages = stage_counts(rows);
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].stage, FunnelStage::Ingested);
    }
}
