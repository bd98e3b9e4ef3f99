use std::{fmt, path::PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// Data sets requested from WeatherKit on every call.
pub const DATA_SETS: &str = "currentWeather,forecastNextHour,forecastDaily,weatherAlerts";

/// Payload of an `APPLE_WEATHERKIT_REQUEST` event.
///
/// Every field is optional: the front-end is trusted to send what it has,
/// and absent values simply render empty in the token and URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherKitRequest {
    #[serde(
        rename = "appleDeveloperTeamId",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_id: Option<String>,

    #[serde(
        rename = "appleServiceId",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_id: Option<String>,

    #[serde(
        rename = "appleKeyId",
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<Coordinate>,

    #[serde(
        default,
        deserialize_with = "lenient_coordinate",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<Coordinate>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub language: Option<String>,

    #[serde(
        rename = "appleWeatherKitKeyPath",
        default,
        deserialize_with = "lenient_path",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_path: Option<PathBuf>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub timezone: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub country_code: Option<String>,

    /// Opaque value echoed back so the caller can correlate replies.
    /// An explicit `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_id: Option<Value>,
}

impl WeatherKitRequest {
    /// Token identifier: `<teamId>.<serviceId>`.
    pub fn token_id(&self) -> String {
        format!("{}.{}", text(&self.team_id), text(&self.service_id))
    }
}

/// Absent values render as the empty string. Nothing is validated here, so a
/// request missing fields reaches WeatherKit malformed and is rejected there.
pub(crate) fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or_default()
}

/// Accepts any JSON scalar where text is expected; `null` counts as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_path<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer).map(|path| path.map(PathBuf::from))
}

fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<Coordinate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::Number(n) => Some(Coordinate::Number(n)),
        Value::String(s) => Some(Coordinate::Text(s)),
        other => Some(Coordinate::Text(other.to_string())),
    })
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A latitude or longitude exactly as the caller sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(Number),
    Text(String),
}

impl From<f64> for Coordinate {
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => Coordinate::Number(n),
            None => Coordinate::Text(value.to_string()),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Number(n) => write!(f, "{n}"),
            Coordinate::Text(s) => f.write_str(s),
        }
    }
}

/// Parsed WeatherKit body with the caller's `instanceId` attached.
pub type WeatherReport = Map<String, Value>;
