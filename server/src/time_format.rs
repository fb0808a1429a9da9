//! Serde helpers that (de)serialise `DateTime<Utc>` as the RFC-3339 `…Z`
//! strings spec §3.1 requires, rather than chrono's default `+00:00` suffix.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::Error as DeError, Deserialize, Deserializer, Serializer};

pub fn to_rfc3339_z(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub mod required {
    use super::*;

    pub fn serialize<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&to_rfc3339_z(*dt))
    }

    pub fn deserialize<'de, D>(d: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_z_suffix() {
        let dt = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let s = to_rfc3339_z(dt);
        assert!(s.ends_with('Z'), "expected Z suffix, got {s}");
    }
}
