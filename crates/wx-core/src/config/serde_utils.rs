//! Shared serde helpers for configuration types

/// Duration written as whole seconds, or as a suffixed string.
///
/// Whole-second durations serialize as a bare integer (`ping_interval = 10`).
/// Anything finer serializes as milliseconds (`ping_timeout = "1500ms"`).
/// Deserialization accepts an integer number of seconds or a string with an
/// `ms`, `s` or `m` suffix.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct Config {
///     #[serde(with = "wx_core::config::serde_utils::duration_secs")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_secs {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DurationVisitor)
    }

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("seconds as an integer, or a string like \"500ms\", \"5s\", \"1m\"")
        }

        fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Duration, E> {
            Ok(Duration::from_secs(secs))
        }

        fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Duration, E> {
            u64::try_from(secs)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must not be negative"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
            parse(value).ok_or_else(|| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    fn parse(value: &str) -> Option<Duration> {
        let value = value.trim();
        if let Some(ms) = value.strip_suffix("ms") {
            return ms.trim().parse().ok().map(Duration::from_millis);
        }
        if let Some(secs) = value.strip_suffix('s') {
            return secs.trim().parse().ok().map(Duration::from_secs);
        }
        if let Some(mins) = value.strip_suffix('m') {
            return mins
                .trim()
                .parse::<u64>()
                .ok()
                .map(|m| Duration::from_secs(m * 60));
        }
        value.parse().ok().map(Duration::from_secs)
    }
}
