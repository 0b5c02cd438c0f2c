// SPDX-License-Identifier: MIT OR Apache-2.0

//! Packed tuple schemas
//!
//! ```text
//! ┌──────────────┬──────────────┬────────┬────────┬─────┬──────────────────────────┐
//! │ event ts i64 │ ingest ts i64│ slot 0 │ slot 1 │ ... │ variable area            │
//! │ 8 bytes      │ 8 bytes      │ 8 B    │ 8 B    │     │ [u32 len][utf-8 bytes].. │
//! └──────────────┴──────────────┴────────┴────────┴─────┴──────────────────────────┘
//! ```
//!
//! All integers are little endian. LONG, DOUBLE, BOOL and DATETIME (epoch
//! millis, truncated from the value's nanoseconds) live directly in their slot; a STRING slot holds the byte offset of
//! its length-prefixed bytes in the variable area. Field access is therefore
//! O(1) by field index and never scans the payload.

use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::value::AttributeValue;
use crate::query_api::definition::attribute::{Attribute, Type as AttributeType};

pub type SchemaId = u32;

/// Bytes before the first field slot: event timestamp and ingestion timestamp
pub const TUPLE_HEADER_LEN: usize = 16;
pub const SLOT_WIDTH: usize = 8;

/// Field types with a packed representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Long,
    Double,
    Bool,
    String,
    /// Epoch milliseconds; sub-millisecond precision is dropped on append
    DateTime,
}

impl FieldType {
    /// `None` for attribute types that cannot be packed
    pub fn from_attribute_type(t: AttributeType) -> Option<Self> {
        match t {
            AttributeType::LONG => Some(FieldType::Long),
            AttributeType::DOUBLE => Some(FieldType::Double),
            AttributeType::BOOL => Some(FieldType::Bool),
            AttributeType::STRING => Some(FieldType::String),
            AttributeType::DATETIME => Some(FieldType::DateTime),
            AttributeType::OBJECT => None,
        }
    }

    pub fn attribute_type(self) -> AttributeType {
        match self {
            FieldType::Long => AttributeType::LONG,
            FieldType::Double => AttributeType::DOUBLE,
            FieldType::Bool => AttributeType::BOOL,
            FieldType::String => AttributeType::STRING,
            FieldType::DateTime => AttributeType::DATETIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
}

/// Ordered, immutable field layout of one event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub id: SchemaId,
    pub name: String,
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(id: SchemaId, name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            id,
            name: name.into(),
            fields,
        }
    }

    /// Build from catalog attributes; `None` if any attribute cannot be packed
    pub fn from_attributes(id: SchemaId, name: &str, attributes: &[Attribute]) -> Option<Self> {
        let fields = attributes
            .iter()
            .map(|a| {
                FieldType::from_attribute_type(a.attribute_type).map(|field_type| Field {
                    name: a.name.clone(),
                    field_type,
                })
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self::new(id, name, fields))
    }

    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Length of the header plus all fixed slots
    #[inline]
    pub fn fixed_len(&self) -> usize {
        TUPLE_HEADER_LEN + SLOT_WIDTH * self.fields.len()
    }

    #[inline]
    pub(crate) fn slot_offset(index: usize) -> usize {
        TUPLE_HEADER_LEN + SLOT_WIDTH * index
    }

    /// Pack one tuple; values must match the field types in order
    ///
    /// A LONG value is accepted for a DOUBLE field and widened.
    pub fn encode(
        &self,
        timestamp: i64,
        ingestion_timestamp: i64,
        values: &[AttributeValue],
    ) -> EventFluxResult<Vec<u8>> {
        if values.len() != self.fields.len() {
            return Err(EventFluxError::schema_mismatch(
                self.id,
                format!(
                    "'{}' expects {} fields, got {}",
                    self.name,
                    self.fields.len(),
                    values.len()
                ),
            ));
        }

        let variable_len: usize = values
            .iter()
            .map(|v| match v {
                AttributeValue::String(s) => 4 + s.len(),
                _ => 0,
            })
            .sum();
        let mut buf = Vec::with_capacity(self.fixed_len() + variable_len);
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(&ingestion_timestamp.to_le_bytes());
        buf.resize(self.fixed_len(), 0);

        for (index, (field, value)) in self.fields.iter().zip(values).enumerate() {
            let slot: [u8; 8] = match (field.field_type, value) {
                (FieldType::Long, AttributeValue::Long(v)) => v.to_le_bytes(),
                (FieldType::Double, AttributeValue::Double(v)) => v.to_le_bytes(),
                (FieldType::Double, AttributeValue::Long(v)) => (*v as f64).to_le_bytes(),
                (FieldType::Bool, AttributeValue::Bool(v)) => (*v as u64).to_le_bytes(),
                (FieldType::DateTime, AttributeValue::DateTime(v)) => {
                    v.timestamp_millis().to_le_bytes()
                }
                (FieldType::String, AttributeValue::String(s)) => {
                    let len = u32::try_from(s.len()).map_err(|_| {
                        EventFluxError::schema_mismatch(
                            self.id,
                            format!("field '{}' exceeds the maximum string length", field.name),
                        )
                    })?;
                    let offset = buf.len() as u64;
                    buf.extend_from_slice(&len.to_le_bytes());
                    buf.extend_from_slice(s.as_bytes());
                    offset.to_le_bytes()
                }
                (expected, got) => {
                    return Err(EventFluxError::schema_mismatch(
                        self.id,
                        format!(
                            "field '{}' expects {}, got {}",
                            field.name,
                            expected.attribute_type(),
                            got.get_type()
                        ),
                    ))
                }
            };
            let at = Self::slot_offset(index);
            buf[at..at + SLOT_WIDTH].copy_from_slice(&slot);
        }
        Ok(buf)
    }
}
