use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Parses an upstream `createTime` as RFC 3339, falling back to now on any
/// parse failure or absence.
pub fn parse_create_time_or_now(create_time: Option<&str>) -> i64 {
    create_time
        .and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
        .unwrap_or_else(OffsetDateTime::now_utc)
        .unix_timestamp()
}
