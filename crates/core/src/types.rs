/// Server-assigned QR code identifiers (the back-end uses integer primary keys).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
