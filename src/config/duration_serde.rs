//! Serde helpers for human-readable durations in configuration

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

/// Serde functions for `Duration` accepting `"10s"`, `"250ms"` or plain seconds
pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration_str = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&duration_str)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl<'de> Visitor<'de> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("seconds as a number or a human-readable duration like '10s'")
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(seconds))
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                humantime::parse_duration(value)
                    .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

/// Parse a default duration constant, falling back to zero on a malformed literal
pub fn parse_default(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "duration")]
        timeout: Duration,
    }

    #[test]
    fn test_human_readable_durations() {
        let parsed: Holder = toml::from_str(r#"timeout = "250ms""#).unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(250));

        let parsed: Holder = toml::from_str(r#"timeout = "1m30s""#).unwrap();
        assert_eq!(parsed.timeout, Duration::from_secs(90));

        let parsed: Holder = toml::from_str("timeout = 12").unwrap();
        assert_eq!(parsed.timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        assert!(toml::from_str::<Holder>(r#"timeout = "soon""#).is_err());
        assert!(toml::from_str::<Holder>("timeout = -3").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let rendered = toml::to_string(&Holder {
            timeout: Duration::from_secs(10),
        })
        .unwrap();
        assert_eq!(rendered.trim(), r#"timeout = "10s""#);
    }

    #[test]
    fn test_parse_default() {
        assert_eq!(parse_default("200ms"), Duration::from_millis(200));
        assert_eq!(parse_default("nonsense"), Duration::ZERO);
    }
}
