//! Serde helpers that store a [`Duration`] as whole milliseconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "super")]
        wait: Duration,
    }

    #[test]
    fn duration_is_written_as_millis() {
        let json = serde_json::to_string(&Holder {
            wait: Duration::from_millis(1500),
        })
        .unwrap();
        assert_eq!(json, r#"{"wait":1500}"#);
    }

    #[test]
    fn negative_millis_are_rejected() {
        let parsed: Result<Holder, _> = serde_json::from_str(r#"{"wait":-5}"#);
        assert!(parsed.is_err());
    }
}
