/// Milliseconds since the Unix epoch, as stored in `created_at_ms`/
/// `updated_at_ms`/`rotated_at_ms`.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
