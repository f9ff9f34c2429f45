//! Repository for the `photo_ratings` table.

use photoshare_core::types::{PhotoId, UserId};
use sqlx::{PgConnection, PgPool};

use crate::models::photo_rating::PhotoRatingRow;

/// Column list for `photo_ratings` queries.
const COLUMNS: &str = "id, photo_id, user_id, score, submitted_at, updated_at";

pub struct PhotoRatingRepo;

impl PhotoRatingRepo {
    /// Current score of `user_id` for `photo_id`, if any.
    pub async fn find_score(
        conn: &mut PgConnection,
        photo_id: PhotoId,
        user_id: UserId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT score FROM photo_ratings WHERE photo_id = $1 AND user_id = $2",
        )
        .bind(photo_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
        Ok(row.map(|(score,)| score))
    }

    /// Insert the rating or replace the existing score for this user.
    ///
    /// `submitted_at` keeps the first submission time.
    pub async fn upsert(
        conn: &mut PgConnection,
        photo_id: PhotoId,
        user_id: UserId,
        score: i32,
    ) -> Result<PhotoRatingRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO photo_ratings (photo_id, user_id, score) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_photo_ratings_photo_user \
             DO UPDATE SET score = EXCLUDED.score, updated_at = now() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PhotoRatingRow>(&query)
            .bind(photo_id)
            .bind(user_id)
            .bind(score)
            .fetch_one(conn)
            .await
    }

    /// All ratings for a photo, newest submission first.
    pub async fn list_for_photo(
        pool: &PgPool,
        photo_id: PhotoId,
    ) -> Result<Vec<PhotoRatingRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM photo_ratings \
             WHERE photo_id = $1 \
             ORDER BY submitted_at DESC, user_id"
        );
        sqlx::query_as::<_, PhotoRatingRow>(&query)
            .bind(photo_id)
            .fetch_all(pool)
            .await
    }
}
