//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Reads take `&PgPool`; steps of a multi-statement write take the open
//! transaction's `&mut PgConnection`.

pub mod photo_metrics_repo;
pub mod photo_rating_repo;
pub mod photo_view_repo;

pub use photo_metrics_repo::PhotoMetricsRepo;
pub use photo_rating_repo::PhotoRatingRepo;
pub use photo_view_repo::PhotoViewRepo;
