//! Deserialisation helpers for exchange payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::time::{Duration, UNIX_EPOCH};

/// Construct a [`DateTime<Utc>`] from a [`Duration`] since the unix epoch.
pub fn datetime_utc_from_epoch_duration(duration: Duration) -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH + duration)
}

/// Deserialize a `u64` milliseconds value as a [`DateTime<Utc>`].
pub fn de_u64_epoch_ms_as_datetime_utc<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer)
        .map(|epoch_ms| datetime_utc_from_epoch_duration(Duration::from_millis(epoch_ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Deserialize)]
    struct Timestamped {
        #[serde(deserialize_with = "de_u64_epoch_ms_as_datetime_utc")]
        time: DateTime<Utc>,
    }

    #[test]
    fn test_de_u64_epoch_ms_as_datetime_utc() {
        let actual = serde_json::from_str::<Timestamped>(r#"{"time": 1672304486865}"#).unwrap();

        assert_eq!(
            actual.time,
            Utc.timestamp_millis_opt(1672304486865).unwrap()
        );
        assert!(serde_json::from_str::<Timestamped>(r#"{"time": "oops"}"#).is_err());
    }
}
