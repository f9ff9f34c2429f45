use photoshare_core::engagement::RatingEntry;
use photoshare_core::types::{DbId, PhotoId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `photo_ratings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhotoRatingRow {
    pub id: DbId,
    pub photo_id: PhotoId,
    pub user_id: DbId,
    pub score: i32,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PhotoRatingRow> for RatingEntry {
    fn from(row: PhotoRatingRow) -> Self {
        RatingEntry {
            photo_id: row.photo_id,
            user_id: row.user_id,
            score: row.score,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
        }
    }
}
