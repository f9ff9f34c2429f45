use photoshare_core::types::{DbId, PhotoId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `photo_views` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PhotoViewRow {
    pub id: DbId,
    pub photo_id: PhotoId,
    pub viewer_id: Option<DbId>,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub viewed_at: Timestamp,
}

/// Recent view total for one photo, as returned by the trending query.
#[derive(Debug, Clone, FromRow)]
pub struct RecentViewCount {
    pub photo_id: PhotoId,
    pub view_count: i64,
}
