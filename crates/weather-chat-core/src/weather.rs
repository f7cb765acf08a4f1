//! Best-effort extraction of structured weather data.
//!
//! The agent may return its weather tool's JSON result embedded in free text.
//! An object is treated as weather data when it has a `temperature` field, either
//! at the top level or inside a `result` member.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::types::WeatherData;

fn embedded_object() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)\{.*"temperature".*\}"#).expect("embedded object pattern is valid")
    })
}

/// Interpret a JSON value as weather data.
///
/// Returns `None` if neither the value nor its `result` member has a `temperature`
/// field, or if the fields have unusable types.
#[must_use]
pub fn weather_from_value(value: &Value) -> Option<WeatherData> {
    let candidate = if value.get("temperature").is_some() {
        value
    } else {
        value.get("result").filter(|r| r.get("temperature").is_some())?
    };

    match serde_json::from_value(candidate.clone()) {
        Ok(weather) => Some(weather),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed weather payload");
            None
        }
    }
}

/// Scan free text for an embedded JSON object carrying weather data.
///
/// First tries the widest `{ ... "temperature" ... }` span; if that does not parse
/// (e.g. prose with stray braces around the object), falls back to parsing from
/// each `{` in turn. Any failure yields `None`.
#[must_use]
pub fn extract_weather_data(text: &str) -> Option<WeatherData> {
    let span = embedded_object().find(text)?;

    if let Ok(value) = serde_json::from_str::<Value>(span.as_str()) {
        if let Some(weather) = weather_from_value(&value) {
            return Some(weather);
        }
    }

    let region = span.as_str();
    region
        .match_indices('{')
        .filter_map(|(offset, _)| {
            serde_json::Deserializer::from_str(&region[offset..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
        })
        .find_map(|value| weather_from_value(&value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn extracts_object_from_plain_json() {
        let text = r#"{"temperature":20,"feelsLike":19,"humidity":55,"windSpeed":3,"windGust":7,"conditions":"Sunny","location":"Paris"}"#;
        let weather = extract_weather_data(text).unwrap();
        assert!((weather.temperature - 20.0).abs() < f64::EPSILON);
        assert_eq!(weather.location, "Paris");
    }

    #[test]
    fn extracts_object_embedded_in_prose() {
        let text = r#"Here is the report: {"temperature": 12.5, "conditions": "Rain", "location": "London"} Stay dry!"#;
        let weather = extract_weather_data(text).unwrap();
        assert_eq!(weather.conditions, "Rain");
    }

    #[test]
    fn falls_back_when_widest_span_is_not_json() {
        let text = r#"Use {braces} wisely. {"temperature": 3, "location": "Oslo"} and {more}"#;
        let weather = extract_weather_data(text).unwrap();
        assert_eq!(weather.location, "Oslo");
    }

    #[test]
    fn no_temperature_means_no_weather() {
        assert!(extract_weather_data("It is sunny today.").is_none());
        assert!(extract_weather_data(r#"{"humidity": 40}"#).is_none());
        assert!(extract_weather_data(r#"{"temperature": "#).is_none());
    }

    #[test]
    fn value_with_nested_result() {
        let value = json!({"toolCallId": "call-1", "result": {"temperature": 20, "location": "Rome"}});
        let weather = weather_from_value(&value).unwrap();
        assert_eq!(weather.location, "Rome");

        assert!(weather_from_value(&json!({"result": {"humidity": 1}})).is_none());
        assert!(weather_from_value(&json!({"temperature": {"value": 1}})).is_none());
    }
}
