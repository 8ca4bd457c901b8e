//! Record type.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, InvalidInputError};
use crate::types::{Collection, RecordId};

/// Arbitrary record fields owned by the caller.
pub type Fields = serde_json::Map<String, Value>;

/// Keys the store manages itself; they never appear in [`Record::fields`].
const SYSTEM_KEYS: [&str; 6] = [
    "id",
    "collectionId",
    "collectionName",
    "created",
    "updated",
    "expand",
];

/// A record from the remote store.
///
/// On the wire a record is a flat JSON object: system keys (`id`,
/// `collectionName`, `created`, `updated`, `expand`) next to the caller's
/// fields. In memory the two are kept apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Store-assigned identifier.
    pub id: RecordId,

    /// The collection this record lives in.
    pub collection: Collection,

    /// Creation time; the ordering key for feeds.
    pub created: DateTime<Utc>,

    /// Last modification time.
    pub updated: DateTime<Utc>,

    /// Caller-owned fields.
    pub fields: Fields,

    /// Expanded relations, keyed by [`Expand::key`](super::Expand::key).
    pub expand: Fields,
}

impl Record {
    /// Parse a record from its flat JSON shape.
    ///
    /// `collection` is used when the object carries no `collectionName`.
    pub fn from_json(collection: &Collection, value: Value) -> Result<Self, Error> {
        let Value::Object(mut obj) = value else {
            return Err(InvalidInputError::Other {
                message: "record must be a JSON object".to_string(),
            }
            .into());
        };

        let id = match obj.remove("id") {
            Some(Value::String(s)) => RecordId::new(s)?,
            _ => {
                return Err(InvalidInputError::Other {
                    message: "record is missing a string 'id'".to_string(),
                }
                .into());
            }
        };

        let collection = match obj.get("collectionName").and_then(Value::as_str) {
            Some(name) => Collection::new(name)?,
            None => collection.clone(),
        };

        let created = obj
            .get("created")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let updated = obj
            .get("updated")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .unwrap_or(created);

        let expand = match obj.remove("expand") {
            Some(Value::Object(map)) => map,
            _ => Fields::new(),
        };

        for key in SYSTEM_KEYS {
            obj.remove(key);
        }

        Ok(Self {
            id,
            collection,
            created,
            updated,
            fields: obj,
            expand,
        })
    }

    /// Render the record back to its flat JSON shape.
    pub fn to_json(&self) -> Value {
        let mut obj = self.fields.clone();
        obj.insert("id".to_string(), Value::String(self.id.to_string()));
        obj.insert(
            "collectionName".to_string(),
            Value::String(self.collection.to_string()),
        );
        obj.insert(
            "created".to_string(),
            Value::String(format_timestamp(&self.created)),
        );
        obj.insert(
            "updated".to_string(),
            Value::String(format_timestamp(&self.updated)),
        );
        if !self.expand.is_empty() {
            obj.insert("expand".to_string(), Value::Object(self.expand.clone()));
        }
        Value::Object(obj)
    }

    /// Get a caller field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Get a caller field as a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Get a relation field as a record id.
    pub fn get_id(&self, field: &str) -> Option<RecordId> {
        self.get_str(field).and_then(|s| RecordId::new(s).ok())
    }

    /// Get an expanded relation.
    pub fn expanded(&self, key: &str) -> Option<&Value> {
        self.expand.get(key)
    }

    /// Look up a system or caller field by name, as filters and sorts see it.
    pub fn lookup(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::String(self.id.to_string())),
            "created" => Some(Value::String(format_timestamp(&self.created))),
            "updated" => Some(Value::String(format_timestamp(&self.updated))),
            _ => self.fields.get(field).cloned(),
        }
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let collection = value
            .get("collectionName")
            .and_then(Value::as_str)
            .ok_or_else(|| serde::de::Error::missing_field("collectionName"))
            .and_then(|name| Collection::new(name).map_err(serde::de::Error::custom))?;
        Record::from_json(&collection, value).map_err(serde::de::Error::custom)
    }
}

/// Parse a store timestamp.
///
/// Accepts RFC 3339 as well as the space-separated `2024-05-01 10:00:00.123Z`
/// form many record stores emit.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let trimmed = s.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp the way records carry it on the wire.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn posts() -> Collection {
        Collection::new("posts").unwrap()
    }

    #[test]
    fn parses_flat_record() {
        let record = Record::from_json(
            &posts(),
            json!({
                "id": "p1",
                "collectionId": "pbc_123",
                "collectionName": "posts",
                "created": "2024-05-01 10:00:00.123Z",
                "updated": "2024-05-01 11:00:00.000Z",
                "content": "hello",
                "user_id": "u1",
                "expand": {"user_id": {"id": "u1", "name": "Ada"}}
            }),
        )
        .unwrap();

        assert_eq!(record.id.as_str(), "p1");
        assert_eq!(record.get_str("content"), Some("hello"));
        assert_eq!(record.get_id("user_id").unwrap().as_str(), "u1");
        assert!(record.get("collectionId").is_none());
        assert_eq!(record.expanded("user_id").unwrap()["name"], "Ada");
        assert_eq!(
            record.created,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                + chrono::Duration::milliseconds(123)
        );
    }

    #[test]
    fn rejects_missing_id() {
        assert!(Record::from_json(&posts(), json!({"content": "x"})).is_err());
        assert!(Record::from_json(&posts(), json!("not an object")).is_err());
    }

    #[test]
    fn falls_back_to_given_collection() {
        let record = Record::from_json(&posts(), json!({"id": "p1"})).unwrap();
        assert_eq!(record.collection.as_str(), "posts");
    }

    #[test]
    fn json_shape_keeps_system_keys() {
        let record = Record::from_json(
            &posts(),
            json!({"id": "p1", "created": "2024-05-01T10:00:00Z", "content": "hi"}),
        )
        .unwrap();
        let value = record.to_json();
        assert_eq!(value["id"], "p1");
        assert_eq!(value["collectionName"], "posts");
        assert_eq!(value["created"], "2024-05-01 10:00:00.000Z");
        assert!(value.get("expand").is_none());
    }

    #[test]
    fn lookup_sees_system_fields() {
        let record =
            Record::from_json(&posts(), json!({"id": "p1", "user_id": "u1"})).unwrap();
        assert_eq!(record.lookup("id"), Some(json!("p1")));
        assert_eq!(record.lookup("user_id"), Some(json!("u1")));
        assert_eq!(record.lookup("missing"), None);
    }
}
