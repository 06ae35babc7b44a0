//! `DateTime<Utc>` codecs for documents that are both stored and returned.
//!
//! The MongoDB driver serializes through a non human-readable BSON
//! serializer, where values are written as BSON dates. JSON output stays
//! RFC 3339. Reads accept either a BSON date or an RFC 3339 string.

use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::{self, Bson};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

fn write<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if serializer.is_human_readable() {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    } else {
        bson::DateTime::from_chrono(*date).serialize(serializer)
    }
}

fn read(value: Bson) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Bson::Null => Ok(None),
        Bson::DateTime(date) => Ok(Some(date.to_chrono())),
        Bson::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .map(|date| Some(date.with_timezone(&Utc)))
            .map_err(|e| format!("invalid date '{}': {}", text, e)),
        other => Err(format!("expected a date, found {:?}", other.element_type())),
    }
}

struct Stored<'a>(&'a DateTime<Utc>);

impl Serialize for Stored<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        write(self.0, serializer)
    }
}

struct Loaded(DateTime<Utc>);

impl<'de> Deserialize<'de> for Loaded {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match read(Bson::deserialize(deserializer)?).map_err(D::Error::custom)? {
            Some(date) => Ok(Loaded(date)),
            None => Err(D::Error::custom("date is required")),
        }
    }
}

pub mod datetime {
    use super::*;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        write(date, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Loaded::deserialize(deserializer).map(|loaded| loaded.0)
    }
}

pub mod opt_datetime {
    use super::*;

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => write(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Bson>::deserialize(deserializer)? {
            Some(value) => read(value).map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

pub mod vec_datetime {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(dates: &[DateTime<Utc>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(dates.len()))?;
        for date in dates {
            seq.serialize_element(&Stored(date))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let loaded = Vec::<Loaded>::deserialize(deserializer)?;
        Ok(loaded.into_iter().map(|loaded| loaded.0).collect())
    }
}
