use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Generate a new id: `<prefix>_<lowercase ulid>`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}_{}", ulid::Ulid::new().to_string().to_lowercase())
}

pub fn now_rfc3339() -> String {
    format_rfc3339(OffsetDateTime::now_utc())
}

pub fn format_rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_default()
}

/// Today's UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    OffsetDateTime::now_utc().date().to_string()
}

/// Parse the timestamp shapes found in stored state.
///
/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts);
    }
    let local = time::format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]")
        .ok()?;
    if let Ok(ts) = PrimitiveDateTime::parse(s, &local) {
        return Some(ts.assume_utc());
    }
    let day = time::format_description::parse("[year]-[month]-[day]").ok()?;
    Date::parse(s, &day)
        .ok()
        .map(|d| d.midnight().assume_utc())
}
