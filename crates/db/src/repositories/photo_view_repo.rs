//! Repository for the append-only `photo_views` log.

use photoshare_core::engagement::ClientMetadata;
use photoshare_core::types::{PhotoId, Timestamp, UserId};
use sqlx::{PgConnection, PgPool};

use crate::models::photo_view::{PhotoViewRow, RecentViewCount};

/// Column list for `photo_views` queries.
const COLUMNS: &str = "id, photo_id, viewer_id, ip_address, user_agent, viewed_at";

pub struct PhotoViewRepo;

impl PhotoViewRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        photo_id: PhotoId,
        viewer_id: Option<UserId>,
        metadata: &ClientMetadata,
    ) -> Result<PhotoViewRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO photo_views (photo_id, viewer_id, ip_address, user_agent) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhotoViewRow>(&query)
            .bind(photo_id)
            .bind(viewer_id)
            .bind(metadata.ip_address.as_deref())
            .bind(&metadata.user_agent)
            .fetch_one(conn)
            .await
    }

    /// Per-photo view totals since `since`, served by the `viewed_at` index.
    pub async fn counts_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<RecentViewCount>, sqlx::Error> {
        sqlx::query_as::<_, RecentViewCount>(
            "SELECT photo_id, COUNT(*) AS view_count \
             FROM photo_views \
             WHERE viewed_at >= $1 \
             GROUP BY photo_id",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }
}
