/// Job identifier. Generated server-side (UUID v4) and never reused.
pub type JobId = uuid::Uuid;

/// UTC timestamp used for `created_at` / `updated_at`.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current time as a [`Timestamp`].
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
