//! Lenient deserializers for inconsistent API shapes
//!
//! The task API serializes user references either as a bare id (`"assigned_to": 3`)
//! or as a nested user object (`"assigned_to": {"id": 3, "username": ...}`), and
//! dates either as RFC 3339 timestamps or as plain `YYYY-MM-DD` dates. Models
//! normalize both here so the rest of the client sees a single shape.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

use super::user::UserId;

#[derive(Deserialize)]
#[serde(untagged)]
enum UserRef {
    Id(UserId),
    Nested { id: UserId },
}

/// Deserializes an optional user reference into its id
pub fn user_ref<'de, D>(deserializer: D) -> Result<Option<UserId>, D::Error>
where
    D: Deserializer<'de>,
{
    let reference = Option::<UserRef>::deserialize(deserializer)?;
    Ok(reference.map(|r| match r {
        UserRef::Id(id) => id,
        UserRef::Nested { id } => id,
    }))
}

/// Parses a timestamp or a date-only string
///
/// Date-only values are interpreted as midnight UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}

/// Deserializes an optional timestamp that may also be a plain date
pub fn flexible_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_datetime(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date or timestamp: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "user_ref")]
        user: Option<UserId>,

        #[serde(default, deserialize_with = "flexible_datetime")]
        due: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_user_ref_accepts_bare_id() {
        let holder: Holder = serde_json::from_str(r#"{"user": 3}"#).unwrap();
        assert_eq!(holder.user, Some(3));
    }

    #[test]
    fn test_user_ref_accepts_nested_user() {
        let holder: Holder =
            serde_json::from_str(r#"{"user": {"id": 5, "username": "bob", "role": "user"}}"#)
                .unwrap();
        assert_eq!(holder.user, Some(5));
    }

    #[test]
    fn test_user_ref_accepts_null_and_missing() {
        let holder: Holder = serde_json::from_str(r#"{"user": null}"#).unwrap();
        assert_eq!(holder.user, None);

        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(holder.user, None);
    }

    #[test]
    fn test_flexible_datetime_accepts_plain_date() {
        let holder: Holder = serde_json::from_str(r#"{"due": "2024-03-01"}"#).unwrap();
        let due = holder.due.unwrap();
        assert_eq!((due.year(), due.month(), due.day()), (2024, 3, 1));
    }

    #[test]
    fn test_flexible_datetime_accepts_offset_timestamp() {
        let holder: Holder =
            serde_json::from_str(r#"{"due": "2024-03-01T12:00:00+02:00"}"#).unwrap();
        assert_eq!(holder.due.unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_flexible_datetime_rejects_garbage() {
        let result: Result<Holder, _> = serde_json::from_str(r#"{"due": "next tuesday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_date_is_none() {
        let holder: Holder = serde_json::from_str(r#"{"due": ""}"#).unwrap();
        assert!(holder.due.is_none());
    }
}
