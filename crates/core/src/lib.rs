//! Engagement metrics and signed media access for PhotoShare.
//!
//! Pure domain logic with no database dependency. Storage backends plug in
//! through the [`store::EngagementStore`] and [`store::ViewHistory`] traits;
//! an in-process implementation lives in [`memory`], the PostgreSQL one in
//! `photoshare_db`.

pub mod engagement;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod signing;
pub mod store;
pub mod trending;
pub mod types;
