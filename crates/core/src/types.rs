/// All database primary keys are PostgreSQL BIGSERIAL (or caller-supplied
/// BIGINT for queue jobs).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
