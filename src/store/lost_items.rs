//! Lost item rows as stored in the `lost_items` table

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{Record, StoreError};

/// Table holding the board's entries
pub const LOST_ITEMS_TABLE: &str = "lost_items";

/// Ordering column for the board
pub const CREATED_AT: &str = "created_at";

/// Optional column that older schemas do not have
pub const STUDENT_ID: &str = "student_id";

/// Format used for `date_found` on the wire
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store-assigned row id, kept opaque (uuid or bigint depending on the schema)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Signed(id) => Self(id.to_string()),
            RawId::Unsigned(id) => Self(id.to_string()),
        })
    }
}

/// `timestamptz` values, or `timestamp` values read as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp `{}`", raw)))
}

fn deserialize_optional_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp `{}`", raw))),
        None => Ok(None),
    }
}

/// A persisted lost item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LostItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub location: String,
    pub date_found: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LostItem {
    pub fn from_record(record: Record) -> Result<Self, StoreError> {
        serde_json::from_value(record.into())
            .map_err(|e| StoreError::Parse(format!("invalid lost item row: {}", e)))
    }
}

/// New lost item for insertion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewLostItem {
    pub name: String,
    pub description: String,
    pub location: String,
    #[serde(serialize_with = "serialize_date")]
    pub date_found: NaiveDate,
    pub image_data: Option<String>,
    pub student_id: String,
}

impl NewLostItem {
    /// Wire record including every column
    pub fn to_record(&self) -> Record {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            // Struct of strings always serializes to an object
            _ => Record::new(),
        }
    }
}

fn serialize_date<S: serde::Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&date.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn new_item_record_uses_wire_names() {
        let item = NewLostItem {
            name: "Red Bag".into(),
            description: "Small red backpack".into(),
            location: "Library".into(),
            date_found: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            image_data: None,
            student_id: "06211".into(),
        };

        let record = item.to_record();
        assert_eq!(record["date_found"], json!("2024-03-01"));
        assert_eq!(record["student_id"], json!("06211"));
        assert_eq!(record["image_data"], json!(null));
        assert_eq!(record.len(), 6);
    }

    #[test]
    fn row_without_student_id_parses() {
        let row = json!({
            "id": "6f1c2a4e-9a7b-4c55-8d1e-0f2b3c4d5e6f",
            "name": "Umbrella",
            "description": "Black, folding",
            "location": "Gym",
            "date_found": "2024-02-11",
            "image_data": null,
            "created_at": "2024-02-11T08:30:00+00:00"
        });
        let Value::Object(record) = row else { unreachable!() };

        let item = LostItem::from_record(record).unwrap();
        assert_eq!(item.student_id, None);
        assert_eq!(item.updated_at, None);
        assert_eq!(item.date_found, NaiveDate::from_ymd_opt(2024, 2, 11).unwrap());
    }

    #[test]
    fn bigint_id_and_naive_timestamp_parse() {
        let row = json!({
            "id": 7,
            "name": "Calculator",
            "description": "Casio, name scratched off",
            "location": "Room 204",
            "date_found": "2024-05-20",
            "created_at": "2024-05-20 10:15:00.123456",
            "updated_at": null
        });
        let Value::Object(record) = row else { unreachable!() };

        let item = LostItem::from_record(record).unwrap();
        assert_eq!(item.id.as_str(), "7");
        assert_eq!(
            item.created_at,
            Utc.with_ymd_and_hms(2024, 5, 20, 10, 15, 0).unwrap()
                + chrono::Duration::microseconds(123_456)
        );
        assert_eq!(serde_json::to_value(&item).unwrap()["id"], json!("7"));
    }

    #[test]
    fn garbage_timestamp_is_a_parse_error() {
        let row = json!({
            "id": "a1",
            "name": "Cap",
            "description": "Blue",
            "location": "Gym",
            "date_found": "2024-05-20",
            "created_at": "yesterday"
        });
        let Value::Object(record) = row else { unreachable!() };
        assert!(matches!(LostItem::from_record(record), Err(StoreError::Parse(_))));
    }

    #[test]
    fn malformed_row_is_a_parse_error() {
        let mut record = Record::new();
        record.insert("name".into(), json!("No id"));
        assert!(matches!(
            LostItem::from_record(record),
            Err(StoreError::Parse(_))
        ));
    }
}
