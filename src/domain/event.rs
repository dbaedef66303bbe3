//! Inbound location events
//!
//! Coordinates arrive as whatever the device sent: numbers, strings,
//! placeholder tokens like "D$Q", or nothing at all. They are kept raw here
//! and sanitized by `services::sanitizer` before any zone logic sees them.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;

/// Raw coordinate value as received on the wire
#[derive(Debug, Clone, PartialEq)]
pub enum RawCoordinate {
    Number(f64),
    Text(String),
    /// Booleans, arrays, objects. Never numeric.
    Other(serde_json::Value),
}

impl RawCoordinate {
    /// Classify one JSON value from its source text. Numbers are parsed here
    /// rather than by serde_json, so a literal beyond f64 range becomes
    /// infinity instead of failing the whole event.
    pub fn from_json_text(text: &str) -> Self {
        match text.as_bytes().first() {
            Some(b'"') => match serde_json::from_str::<String>(text) {
                Ok(s) => RawCoordinate::Text(s),
                Err(_) => RawCoordinate::Other(serde_json::Value::String(text.to_string())),
            },
            Some(b'-' | b'0'..=b'9') => match text.parse::<f64>() {
                Ok(v) => RawCoordinate::Number(v),
                Err(_) => RawCoordinate::Text(text.to_string()),
            },
            _ => RawCoordinate::Other(
                serde_json::from_str(text)
                    .unwrap_or_else(|_| serde_json::Value::String(text.to_string())),
            ),
        }
    }
}

impl From<&str> for RawCoordinate {
    fn from(s: &str) -> Self {
        RawCoordinate::Text(s.to_string())
    }
}

impl From<f64> for RawCoordinate {
    fn from(v: f64) -> Self {
        RawCoordinate::Number(v)
    }
}

impl std::fmt::Display for RawCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawCoordinate::Number(v) => write!(f, "{v}"),
            RawCoordinate::Text(s) => write!(f, "{s:?}"),
            RawCoordinate::Other(v) => write!(f, "{v}"),
        }
    }
}

/// GPS report for a single vehicle
#[derive(Debug, Clone, Deserialize)]
pub struct LocationEvent {
    pub vehicle_id: String,
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub latitude: Option<RawCoordinate>,
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub longitude: Option<RawCoordinate>,
    /// ISO 8601 string or epoch milliseconds; None means "now"
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LocationEvent {
    pub fn new(
        vehicle_id: impl Into<String>,
        latitude: impl Into<RawCoordinate>,
        longitude: impl Into<RawCoordinate>,
    ) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Parse an ISO 8601 timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<Option<RawCoordinate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Box<RawValue>> = Option::deserialize(deserializer)?;
    Ok(raw.map(|raw| RawCoordinate::from_json_text(raw.get())))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an ISO 8601 string or epoch milliseconds")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(TimestampVisitor)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            parse_timestamp(value)
                .map(Some)
                .ok_or_else(|| E::custom(format!("invalid timestamp {value:?}")))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            let ms = i64::try_from(value).map_err(|_| E::custom("epoch milliseconds overflow"))?;
            self.visit_i64(ms)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Utc.timestamp_millis_opt(value)
                .single()
                .map(Some)
                .ok_or_else(|| E::custom(format!("epoch milliseconds out of range: {value}")))
        }
    }

    deserializer.deserialize_option(TimestampVisitor)
}
