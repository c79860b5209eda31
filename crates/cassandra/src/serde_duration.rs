//! Serde support for durations written as strings like "250ms", "30s",
//! "5m", or "2h". Bare numbers are rejected so a unit is always explicit.

use std::time::Duration;

use serde::de::Unexpected;
use serde::{Deserialize, Deserializer, Serializer};

const EXPECTED: &str = "a duration such as \"250ms\" or \"30s\"";

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    parse(&s).ok_or_else(|| serde::de::Error::invalid_value(Unexpected::Str(&s), &EXPECTED))
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(*duration))
}

pub mod opt {
    use super::{EXPECTED, Duration, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => super::parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::invalid_value(Unexpected::Str(&s), &EXPECTED)),
            None => Ok(None),
        }
    }

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(duration) => serializer.serialize_str(&super::format(*duration)),
            None => serializer.serialize_none(),
        }
    }
}

fn parse(s: &str) -> Option<Duration> {
    let s = s.trim();
    let unit_start = s.find(|c: char| !c.is_ascii_digit() && c != '.')?;
    let (value, unit) = s.split_at(unit_start);
    let value: f64 = value.parse().ok()?;

    let seconds = match unit {
        "ms" => value / 1_000.0,
        "s" => value,
        "m" => value * 60.0,
        "h" => value * 3_600.0,
        _ => return None,
    };

    Duration::try_from_secs_f64(seconds).ok()
}

fn format(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1_000 || millis % 1_000 != 0 {
        format!("{millis}ms")
    } else {
        format!("{}s", duration.as_secs())
    }
}
