/*!
 * Serde helpers shared by reports and configuration.
 *
 * Reports render durations as whole milliseconds rather than serde's
 * default `{secs, nanos}` struct encoding, so JSON consumers can read
 * `duration_ms: 12` directly.
 */

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// `#[serde(with = "duration_ms")]` for `Duration` fields
pub mod duration_ms {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize, Deserialize)]
    struct Timed {
        #[serde(rename = "duration_ms", with = "duration_ms")]
        duration: Duration,
    }

    #[test]
    fn test_duration_renders_as_integers() {
        let timed = Timed {
            duration: Duration::from_micros(12_900),
        };

        let json = serde_json::to_value(&timed).unwrap();
        assert_eq!(json["duration_ms"], 12);

        let parsed: Timed = serde_json::from_str(r#"{"duration_ms":1500}"#).unwrap();
        assert_eq!(parsed.duration, Duration::from_millis(1500));
    }
}
