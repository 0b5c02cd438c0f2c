// SPDX-License-Identifier: MIT OR Apache-2.0

use super::schema::{FieldType, Schema, SchemaId, TUPLE_HEADER_LEN};
use super::tuple_store::TupleRef;
use crate::core::event::value::AttributeValue;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::sync::Arc;

/// Read-only, zero-copy view of one stored tuple
///
/// Cloning shares the payload. Typed accessors return `None` when the index is
/// out of range or the field has another type.
#[derive(Clone)]
pub struct TupleView {
    position: u64,
    schema: Arc<Schema>,
    data: Arc<[u8]>,
}

impl TupleView {
    /// Wrap a payload produced by [`Schema::encode`]
    pub fn from_encoded(position: u64, schema: Arc<Schema>, data: Arc<[u8]>) -> Self {
        debug_assert!(data.len() >= schema.fixed_len());
        Self {
            position,
            schema,
            data,
        }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[inline]
    pub fn tuple_ref(&self) -> TupleRef {
        TupleRef::new(self.position)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn schema_id(&self) -> SchemaId {
        self.schema.id
    }

    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.read_i64(0)
    }

    #[inline]
    pub fn ingestion_timestamp(&self) -> i64 {
        self.read_i64(8)
    }

    pub fn field_count(&self) -> usize {
        self.schema.field_count()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn read_i64(&self, at: usize) -> i64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.data[at..at + 8]);
        i64::from_le_bytes(raw)
    }

    #[inline]
    fn slot(&self, index: usize, expected: FieldType) -> Option<[u8; 8]> {
        let field = self.schema.field(index)?;
        if field.field_type != expected {
            return None;
        }
        let at = Schema::slot_offset(index);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.data.get(at..at + 8)?);
        Some(raw)
    }

    pub fn get_long(&self, index: usize) -> Option<i64> {
        self.slot(index, FieldType::Long).map(i64::from_le_bytes)
    }

    pub fn get_double(&self, index: usize) -> Option<f64> {
        self.slot(index, FieldType::Double).map(f64::from_le_bytes)
    }

    pub fn get_bool(&self, index: usize) -> Option<bool> {
        self.slot(index, FieldType::Bool)
            .map(|raw| u64::from_le_bytes(raw) != 0)
    }

    pub fn get_datetime(&self, index: usize) -> Option<DateTime<Utc>> {
        let millis = self.slot(index, FieldType::DateTime).map(i64::from_le_bytes)?;
        Utc.timestamp_millis_opt(millis).single()
    }

    pub fn get_str(&self, index: usize) -> Option<&str> {
        let offset = u64::from_le_bytes(self.slot(index, FieldType::String)?) as usize;
        if offset < TUPLE_HEADER_LEN {
            return None;
        }
        let len_bytes: [u8; 4] = self.data.get(offset..offset + 4)?.try_into().ok()?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let bytes = self.data.get(offset + 4..offset + 4 + len)?;
        std::str::from_utf8(bytes).ok()
    }

    /// Owned value of one field
    pub fn get_value(&self, index: usize) -> Option<AttributeValue> {
        match self.schema.field(index)?.field_type {
            FieldType::Long => self.get_long(index).map(AttributeValue::Long),
            FieldType::Double => self.get_double(index).map(AttributeValue::Double),
            FieldType::Bool => self.get_bool(index).map(AttributeValue::Bool),
            FieldType::String => self
                .get_str(index)
                .map(|s| AttributeValue::String(s.to_string())),
            FieldType::DateTime => self.get_datetime(index).map(AttributeValue::DateTime),
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<AttributeValue> {
        self.get_value(self.schema.field_index(name)?)
    }

    /// `(name, value)` for every field, in schema order
    pub fn named_values(&self) -> Vec<(String, AttributeValue)> {
        self.schema
            .fields()
            .iter()
            .enumerate()
            .filter_map(|(i, f)| self.get_value(i).map(|v| (f.name.clone(), v)))
            .collect()
    }
}

impl fmt::Debug for TupleView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleView")
            .field("position", &self.position)
            .field("schema", &self.schema.name)
            .field("timestamp", &self.timestamp())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::tuple::schema::Field;

    fn view() -> TupleView {
        let schema = Arc::new(Schema::new(
            0,
            "T",
            vec![
                Field {
                    name: "n".into(),
                    field_type: FieldType::Long,
                },
                Field {
                    name: "name".into(),
                    field_type: FieldType::String,
                },
                Field {
                    name: "ok".into(),
                    field_type: FieldType::Bool,
                },
                Field {
                    name: "at".into(),
                    field_type: FieldType::DateTime,
                },
            ],
        ));
        let at = AttributeValue::datetime_from_millis(1_000).unwrap();
        let data = schema
            .encode(42, 43, &[(-5i64).into(), "héllo".into(), true.into(), at])
            .unwrap();
        TupleView::from_encoded(9, schema, data.into())
    }

    #[test]
    fn test_typed_accessors() {
        let v = view();
        assert_eq!(v.timestamp(), 42);
        assert_eq!(v.ingestion_timestamp(), 43);
        assert_eq!(v.get_long(0), Some(-5));
        assert_eq!(v.get_str(1), Some("héllo"));
        assert_eq!(v.get_bool(2), Some(true));
        assert_eq!(v.get_datetime(3).unwrap().timestamp_millis(), 1_000);
    }

    #[test]
    fn test_datetime_keeps_millisecond_precision() {
        let schema = Arc::new(Schema::new(
            0,
            "D",
            vec![Field {
                name: "at".into(),
                field_type: FieldType::DateTime,
            }],
        ));
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let data = schema.encode(0, 0, &[at.into()]).unwrap();
        let v = TupleView::from_encoded(0, schema, data.into());
        let read = v.get_datetime(0).unwrap();
        assert_eq!(read.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(read.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn test_wrong_type_or_index_is_none() {
        let v = view();
        assert_eq!(v.get_double(0), None);
        assert_eq!(v.get_long(1), None);
        assert_eq!(v.get_value(10), None);
    }

    #[test]
    fn test_named_values() {
        let v = view();
        assert_eq!(v.get_by_name("name"), Some(AttributeValue::from("héllo")));
        let names: Vec<String> = v.named_values().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["n", "name", "ok", "at"]);
    }
}
