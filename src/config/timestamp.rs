//! Serde helpers for `DateTime<Utc>` fields in `config.toml`.
//!
//! Timestamps are written as native TOML offset datetimes
//! (`created_at = 2025-01-01T00:00:00Z`). Reading accepts those, quoted
//! RFC 3339 strings, local datetimes (taken as UTC) and bare dates
//! (midnight UTC).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use toml::value::Datetime;

pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::Error;

    to_toml(at).map_err(S::Error::custom)?.serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = toml::Value::deserialize(deserializer)?;
    from_value(&value).map_err(D::Error::custom)
}

/// Same as the parent module, for optional fields.
pub mod option {
    use super::*;

    pub fn serialize<S>(at: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error;

        match at {
            Some(at) => to_toml(at).map_err(S::Error::custom)?.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        let value: Option<toml::Value> = Option::deserialize(deserializer)?;
        value
            .as_ref()
            .map(from_value)
            .transpose()
            .map_err(D::Error::custom)
    }
}

fn to_toml(at: &DateTime<Utc>) -> Result<Datetime, String> {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        .parse::<Datetime>()
        .map_err(|e| format!("cannot encode timestamp {at}: {e}"))
}

fn from_value(value: &toml::Value) -> Result<DateTime<Utc>, String> {
    match value {
        toml::Value::Datetime(datetime) => from_toml(datetime),
        toml::Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp '{text}': {e}")),
        other => Err(format!(
            "invalid type: {}, expected a datetime",
            other.type_str()
        )),
    }
}

fn from_toml(datetime: &Datetime) -> Result<DateTime<Utc>, String> {
    let text = datetime.to_string();
    let parsed = match (datetime.date, datetime.time, datetime.offset) {
        (Some(_), Some(_), Some(_)) => {
            DateTime::parse_from_rfc3339(&text).map(|at| at.with_timezone(&Utc))
        }
        (Some(_), Some(_), None) => {
            NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f").map(|at| at.and_utc())
        }
        (Some(_), None, _) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
            .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc()),
        (None, _, _) => return Err(format!("time '{text}' has no date")),
    };
    parsed.map_err(|e| format!("invalid timestamp '{text}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "crate::config::timestamp")]
        at: DateTime<Utc>,
        #[serde(default, with = "crate::config::timestamp::option", skip_serializing_if = "Option::is_none")]
        seen: Option<DateTime<Utc>>,
    }

    fn jan_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn native_and_quoted_forms_both_load() {
        let native: Stamped = toml::from_str("at = 2025-01-01T00:00:00Z").unwrap();
        let quoted: Stamped = toml::from_str("at = \"2025-01-01T00:00:00Z\"").unwrap();
        assert_eq!(native.at, jan_first());
        assert_eq!(quoted.at, jan_first());
        assert_eq!(native.seen, None);
    }

    #[test]
    fn offsets_are_normalised_to_utc() {
        let parsed: Stamped =
            toml::from_str("at = 2025-01-01T02:30:00+02:30\nseen = 2025-01-01T00:00:00Z").unwrap();
        assert_eq!(parsed.at, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(parsed.seen, Some(jan_first()));
    }

    #[test]
    fn local_datetime_and_date_are_taken_as_utc() {
        let local: Stamped = toml::from_str("at = 2025-01-01T00:00:00").unwrap();
        let date: Stamped = toml::from_str("at = 2025-01-01").unwrap();
        assert_eq!(local.at, jan_first());
        assert_eq!(date.at, jan_first());
    }

    #[test]
    fn written_unquoted_with_full_precision() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let text = toml::to_string(&Stamped { at, seen: None }).unwrap();
        assert_eq!(text.trim(), "at = 2025-06-01T12:00:00.123456789Z");

        let back: Stamped = toml::from_str(&text).unwrap();
        assert_eq!(back.at, at);
    }

    #[test]
    fn rejects_time_only_and_non_dates() {
        assert!(toml::from_str::<Stamped>("at = 07:32:00").is_err());
        assert!(toml::from_str::<Stamped>("at = 42").is_err());
        assert!(toml::from_str::<Stamped>("at = \"yesterday\"").is_err());
    }
}
