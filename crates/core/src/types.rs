/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Photos are identified by UUID, matching the upload service.
pub type PhotoId = uuid::Uuid;

/// Opaque user identity supplied by the upstream authentication layer.
pub type UserId = DbId;
