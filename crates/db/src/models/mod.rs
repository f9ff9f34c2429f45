//! Row structs for the engagement tables.
//!
//! Each submodule holds a `FromRow` struct matching one table and the
//! conversion into its `photoshare_core` domain type.

pub mod photo_metrics;
pub mod photo_rating;
pub mod photo_view;
