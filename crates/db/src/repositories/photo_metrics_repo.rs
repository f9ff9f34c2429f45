//! Repository for the `photo_metrics` table.

use photoshare_core::types::{PhotoId, UserId};
use sqlx::{PgConnection, PgPool};

use crate::models::photo_metrics::{PhotoMetricsRow, PhotoSnapshotRow};

/// Column list for `photo_metrics` queries.
const COLUMNS: &str = "\
    photo_id, resource_path, view_count, rating_sum, rating_count, \
    created_at, updated_at";

/// Aggregate counters per photo.
pub struct PhotoMetricsRepo;

impl PhotoMetricsRepo {
    /// Insert a zeroed row unless one already exists, then return the stored row.
    pub async fn create_if_absent(
        pool: &PgPool,
        photo_id: PhotoId,
        resource_path: &str,
    ) -> Result<PhotoMetricsRow, sqlx::Error> {
        sqlx::query(
            "INSERT INTO photo_metrics (photo_id, resource_path) \
             VALUES ($1, $2) \
             ON CONFLICT (photo_id) DO NOTHING",
        )
        .bind(photo_id)
        .bind(resource_path)
        .execute(pool)
        .await?;

        let query = format!("SELECT {COLUMNS} FROM photo_metrics WHERE photo_id = $1");
        sqlx::query_as::<_, PhotoMetricsRow>(&query)
            .bind(photo_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        photo_id: PhotoId,
    ) -> Result<Option<PhotoMetricsRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM photo_metrics WHERE photo_id = $1");
        sqlx::query_as::<_, PhotoMetricsRow>(&query)
            .bind(photo_id)
            .fetch_optional(pool)
            .await
    }

    /// Read a photo's row and `user_id`'s score in one statement, so both
    /// come from the same snapshot. `user_rating` is NULL when `user_id` is
    /// `None` or has not rated the photo.
    pub async fn find_with_user_rating(
        pool: &PgPool,
        photo_id: PhotoId,
        user_id: Option<UserId>,
    ) -> Result<Option<PhotoSnapshotRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS}, \
                    (SELECT r.score FROM photo_ratings r \
                     WHERE r.photo_id = m.photo_id AND r.user_id = $2) AS user_rating \
             FROM photo_metrics m \
             WHERE m.photo_id = $1"
        );
        sqlx::query_as::<_, PhotoSnapshotRow>(&query)
            .bind(photo_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Delete a photo; ratings and views cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, photo_id: PhotoId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM photo_metrics WHERE photo_id = $1")
            .bind(photo_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Increment `view_count` in place. Returns the new count, or `None`
    /// if the photo does not exist.
    ///
    /// The row stays locked until the surrounding transaction ends.
    pub async fn increment_views(
        conn: &mut PgConnection,
        photo_id: PhotoId,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE photo_metrics \
             SET view_count = view_count + 1, updated_at = now() \
             WHERE photo_id = $1 \
             RETURNING view_count",
        )
        .bind(photo_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.map(|(count,)| count))
    }

    /// Lock a photo's row for the rest of the transaction.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        photo_id: PhotoId,
    ) -> Result<Option<PhotoMetricsRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM photo_metrics WHERE photo_id = $1 FOR UPDATE");
        sqlx::query_as::<_, PhotoMetricsRow>(&query)
            .bind(photo_id)
            .fetch_optional(conn)
            .await
    }

    /// Adjust the rating totals by the given deltas.
    pub async fn apply_rating_delta(
        conn: &mut PgConnection,
        photo_id: PhotoId,
        sum_delta: i64,
        count_delta: i64,
    ) -> Result<PhotoMetricsRow, sqlx::Error> {
        let query = format!(
            "UPDATE photo_metrics \
             SET rating_sum = rating_sum + $2, \
                 rating_count = rating_count + $3, \
                 updated_at = now() \
             WHERE photo_id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhotoMetricsRow>(&query)
            .bind(photo_id)
            .bind(sum_delta)
            .bind(count_delta)
            .fetch_one(conn)
            .await
    }
}
