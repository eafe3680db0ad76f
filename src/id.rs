use compact_str::{CompactString, ToCompactString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque event identifier.
///
/// The feed hands out ids either as JSON strings or as integers; both are
/// normalized to their string form so `"42"` and `42` compare equal.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EventId {
    value: CompactString,
}

impl EventId {
    pub fn new<S: Into<CompactString>>(id: S) -> Self {
        Self { value: id.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<u64> for EventId {
    fn from(value: u64) -> Self {
        Self::new(value.to_compact_string())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> Result<EventId, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        use std::fmt;

        struct EventIdVisitor;

        impl<'de> Visitor<'de> for EventIdVisitor {
            type Value = EventId;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing an event ID")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EventId::new(value))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EventId::new(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EventId::from(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(EventId::new(value.to_compact_string()))
            }
        }

        deserializer.deserialize_any(EventIdVisitor)
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
