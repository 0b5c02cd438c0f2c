// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event Catalog - Schema Management
//!
//! Tracks event type and stream definitions. Registering an event type assigns
//! it a dense numeric id which doubles as the id of its packed tuple schema,
//! so a tuple's schema id is also its event type id.

use crate::core::stream::tuple::schema::{Schema, SchemaId};
use crate::query_api::definition::attribute::{Attribute, Type as AttributeType};
use crate::query_api::definition::{EventDefinition, StreamDefinition};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::error::CatalogError;

/// Resolved view of one registered event type
#[derive(Debug, Clone)]
pub struct EventTypeInfo {
    pub id: SchemaId,
    pub name: String,
    pub attributes: Vec<Attribute>,
    attribute_ids: HashMap<String, usize>,
    /// Packed layout; `None` when an attribute has no tuple representation
    pub schema: Option<Arc<Schema>>,
}

impl EventTypeInfo {
    /// Field index of an attribute
    pub fn attribute_index(&self, attribute: &str) -> Option<usize> {
        self.attribute_ids.get(attribute).copied()
    }

    pub fn attribute_type(&self, attribute: &str) -> Option<AttributeType> {
        self.attribute_index(attribute)
            .map(|i| self.attributes[i].attribute_type)
    }

    /// First attribute whose type cannot be stored in a tuple
    pub fn unsupported_attribute(&self) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type == AttributeType::OBJECT)
    }
}

/// Lookup contract the compiler and the store rely on
pub trait CatalogLookup: Send + Sync {
    fn event_type(&self, name: &str) -> Option<Arc<EventTypeInfo>>;

    fn event_type_by_id(&self, id: SchemaId) -> Option<Arc<EventTypeInfo>>;

    /// Number of registered event types; ids are `0..event_type_count()`
    fn event_type_count(&self) -> usize;

    fn stream(&self, name: &str) -> Option<Arc<StreamDefinition>>;

    fn event_type_exists(&self, name: &str) -> bool {
        self.event_type(name).is_some()
    }

    fn resolve_attribute(&self, event_type: &str, attribute: &str) -> Result<usize, CatalogError> {
        let info = self
            .event_type(event_type)
            .ok_or_else(|| CatalogError::UnknownEventType(event_type.to_string()))?;
        info.attribute_index(attribute)
            .ok_or_else(|| CatalogError::UnknownAttribute {
                event_type: event_type.to_string(),
                attribute: attribute.to_string(),
            })
    }
}

/// In-memory catalog of event types and streams
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    event_types: Vec<Arc<EventTypeInfo>>,
    event_type_ids: HashMap<String, SchemaId>,
    streams: HashMap<String, Arc<StreamDefinition>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event type and return its id
    pub fn register_event_type(
        &mut self,
        definition: EventDefinition,
    ) -> Result<SchemaId, CatalogError> {
        if self.event_type_ids.contains_key(&definition.name) {
            return Err(CatalogError::DuplicateEventType(definition.name));
        }

        let mut attribute_ids = HashMap::with_capacity(definition.attributes.len());
        for (index, attr) in definition.attributes.iter().enumerate() {
            if attribute_ids.insert(attr.name.clone(), index).is_some() {
                return Err(CatalogError::DuplicateAttribute {
                    event_type: definition.name.clone(),
                    attribute: attr.name.clone(),
                });
            }
        }

        let id = self.event_types.len() as SchemaId;
        let schema = Schema::from_attributes(id, &definition.name, &definition.attributes).map(Arc::new);
        if schema.is_none() {
            log::debug!(
                "Event type '{}' has attributes without a tuple representation; it cannot be queried",
                definition.name
            );
        }

        self.event_type_ids.insert(definition.name.clone(), id);
        self.event_types.push(Arc::new(EventTypeInfo {
            id,
            name: definition.name,
            attributes: definition.attributes,
            attribute_ids,
            schema,
        }));
        Ok(id)
    }

    /// Register a stream; every member event type must already be known
    pub fn register_stream(&mut self, definition: StreamDefinition) -> Result<(), CatalogError> {
        if self.streams.contains_key(&definition.name) {
            return Err(CatalogError::DuplicateStream(definition.name));
        }
        if let Some(missing) = definition
            .event_types
            .iter()
            .find(|name| !self.event_type_ids.contains_key(name.as_str()))
        {
            return Err(CatalogError::UnknownEventType(missing.clone()));
        }
        self.streams
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Every type an attribute of this name has across event types
    pub fn get_possible_attribute_types(&self, attribute: &str) -> BTreeSet<AttributeType> {
        self.event_types
            .iter()
            .filter_map(|info| info.attribute_type(attribute))
            .collect()
    }

    /// Names of the event types declaring an attribute of this name
    pub fn get_compatible_event_types(&self, attribute: &str) -> Vec<&str> {
        self.event_types
            .iter()
            .filter(|info| info.attribute_index(attribute).is_some())
            .map(|info| info.name.as_str())
            .collect()
    }

    pub fn get_event_type_names(&self) -> Vec<&str> {
        self.event_types.iter().map(|i| i.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.event_types.is_empty() && self.streams.is_empty()
    }
}

impl CatalogLookup for Catalog {
    fn event_type(&self, name: &str) -> Option<Arc<EventTypeInfo>> {
        self.event_type_ids
            .get(name)
            .map(|&id| Arc::clone(&self.event_types[id as usize]))
    }

    fn event_type_by_id(&self, id: SchemaId) -> Option<Arc<EventTypeInfo>> {
        self.event_types.get(id as usize).map(Arc::clone)
    }

    fn event_type_count(&self) -> usize {
        self.event_types.len()
    }

    fn stream(&self, name: &str) -> Option<Arc<StreamDefinition>> {
        self.streams.get(name).map(Arc::clone)
    }
}
