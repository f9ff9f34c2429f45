use photoshare_core::engagement::{PhotoMetrics, PhotoSnapshot};
use photoshare_core::types::{PhotoId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `photo_metrics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhotoMetricsRow {
    pub photo_id: PhotoId,
    pub resource_path: String,
    pub view_count: i64,
    pub rating_sum: i64,
    pub rating_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PhotoMetricsRow> for PhotoMetrics {
    fn from(row: PhotoMetricsRow) -> Self {
        PhotoMetrics::from_totals(
            row.photo_id,
            row.resource_path,
            row.view_count,
            row.rating_sum,
            row.rating_count,
        )
    }
}

/// A `photo_metrics` row joined with one viewer's score.
#[derive(Debug, Clone, FromRow)]
pub struct PhotoSnapshotRow {
    #[sqlx(flatten)]
    pub metrics: PhotoMetricsRow,
    pub user_rating: Option<i32>,
}

impl From<PhotoSnapshotRow> for PhotoSnapshot {
    fn from(row: PhotoSnapshotRow) -> Self {
        PhotoSnapshot {
            metrics: row.metrics.into(),
            user_rating: row.user_rating,
        }
    }
}
