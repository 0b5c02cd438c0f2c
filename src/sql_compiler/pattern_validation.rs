// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern Validation Module
//!
//! Query-level checks run before any automaton is built: window and limit
//! bounds, event types and streams against the catalog, and the variables
//! used by projections and correlations. Per-filter checks happen while the
//! formula is compiled, where the scope of each filter is known.

use crate::query_api::definition::attribute::Type as AttributeType;
use crate::query_api::expression::IndexedVariable;
use crate::query_api::query::{Query, Select, Within};
use crate::sql_compiler::catalog::CatalogLookup;
use crate::sql_compiler::error::CompileError;
use crate::sql_compiler::type_inference::comparison_kind;
use std::collections::{BTreeMap, BTreeSet};

/// Pattern validator
pub struct PatternValidator;

impl PatternValidator {
    /// Validate a query against the catalog
    ///
    /// Checks, in order:
    /// 1. the window has a non-zero bound
    /// 2. the limit is at least one
    /// 3. every `FROM` stream exists
    /// 4. every event type of the formula exists and has a tuple representation
    /// 5. selected variables are bound by the formula
    /// 6. correlations reference bound variables and comparable attributes
    pub fn validate(query: &Query, catalog: &dyn CatalogLookup) -> Result<(), CompileError> {
        Self::validate_window(&query.within)?;

        if query.limit == Some(0) {
            return Err(CompileError::InvalidLimit(
                "LIMIT must be at least 1".to_string(),
            ));
        }

        for stream in &query.from {
            if catalog.stream(stream).is_none() {
                return Err(CompileError::UnknownStream(stream.clone()));
            }
        }

        for name in query.formula.event_types() {
            let info = catalog
                .event_type(name)
                .ok_or_else(|| CompileError::UnknownEventType(name.to_string()))?;
            if let Some(attr) = info.unsupported_attribute() {
                return Err(CompileError::UnsupportedFieldType {
                    event_type: info.name.clone(),
                    attribute: attr.name.clone(),
                    attribute_type: attr.attribute_type,
                });
            }
        }

        let bindings = query.formula.bindings();

        if let Select::Variables(names) = &query.select {
            if let Some(unknown) = names.iter().find(|n| !bindings.contains_key(n.as_str())) {
                return Err(CompileError::UnknownVariable(unknown.clone()));
            }
        }

        for correlation in &query.correlations {
            let left = Self::correlation_types(&correlation.left, &bindings, catalog)?;
            let right = Self::correlation_types(&correlation.right, &bindings, catalog)?;
            for &l in &left {
                for &r in &right {
                    comparison_kind(l, correlation.op, r)?;
                }
            }
        }

        Ok(())
    }

    fn validate_window(within: &Within) -> Result<(), CompileError> {
        match within {
            Within::Events(0) => Err(CompileError::InvalidWindow(
                "WITHIN 0 EVENTS can never hold a match".to_string(),
            )),
            Within::EventTime(0) | Within::IngestionTime(0) => Err(CompileError::InvalidWindow(
                "time window must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Attribute types an indexed variable may take across the event types it binds
    fn correlation_types(
        var: &IndexedVariable,
        bindings: &BTreeMap<&str, BTreeSet<&str>>,
        catalog: &dyn CatalogLookup,
    ) -> Result<BTreeSet<AttributeType>, CompileError> {
        let event_types = bindings
            .get(var.variable.as_str())
            .ok_or_else(|| CompileError::UnknownVariable(var.variable.clone()))?;

        let mut types = BTreeSet::new();
        for name in event_types {
            if let Some(ty) = catalog
                .event_type(name)
                .and_then(|info| info.attribute_type(&var.attribute_name))
            {
                types.insert(ty);
            }
        }
        if types.is_empty() {
            return Err(CompileError::unknown_attribute(
                &var.variable,
                &var.attribute_name,
            ));
        }
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_api::definition::{EventDefinition, StreamDefinition};
    use crate::query_api::pattern::{CompareOp, Formula};
    use crate::query_api::query::Correlation;
    use crate::sql_compiler::catalog::Catalog;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .register_event_type(EventDefinition::new("S").attribute("value", AttributeType::LONG))
            .unwrap();
        catalog
            .register_event_type(
                EventDefinition::new("T")
                    .attribute("value", AttributeType::DOUBLE)
                    .attribute("name", AttributeType::STRING),
            )
            .unwrap();
        catalog
            .register_stream(StreamDefinition::new("Stocks").event_type("S"))
            .unwrap();
        catalog
    }

    fn seq() -> Formula {
        Formula::event("S").followed_by(Formula::event("T").with_role("t"))
    }

    #[test]
    fn test_valid_query() {
        let query = Query::new(seq())
            .from_stream("Stocks")
            .within(Within::Events(10))
            .select(Select::Variables(vec!["t".into()]))
            .correlate(Correlation::new(
                IndexedVariable::new_with_last("value").of_variable("S"),
                CompareOp::LessThan,
                IndexedVariable::new_with_index("value", 0).of_variable("t"),
            ));
        assert!(PatternValidator::validate(&query, &catalog()).is_ok());
    }

    #[test]
    fn test_zero_bounds_rejected() {
        let catalog = catalog();
        let query = Query::new(seq()).within(Within::Events(0));
        assert!(matches!(
            PatternValidator::validate(&query, &catalog),
            Err(CompileError::InvalidWindow(_))
        ));
        let query = Query::new(seq()).limit(0);
        assert!(matches!(
            PatternValidator::validate(&query, &catalog),
            Err(CompileError::InvalidLimit(_))
        ));
    }

    #[test]
    fn test_unknown_names_rejected() {
        let catalog = catalog();
        let query = Query::new(Formula::event("Nope"));
        assert_eq!(
            PatternValidator::validate(&query, &catalog),
            Err(CompileError::UnknownEventType("Nope".into()))
        );
        let query = Query::new(seq()).from_stream("Bonds");
        assert_eq!(
            PatternValidator::validate(&query, &catalog),
            Err(CompileError::UnknownStream("Bonds".into()))
        );
        let query = Query::new(seq()).select(Select::Variables(vec!["u".into()]));
        assert_eq!(
            PatternValidator::validate(&query, &catalog),
            Err(CompileError::UnknownVariable("u".into()))
        );
    }

    #[test]
    fn test_correlation_type_mismatch() {
        let query = Query::new(seq()).correlate(Correlation::new(
            IndexedVariable::new_with_last("value").of_variable("S"),
            CompareOp::Equal,
            IndexedVariable::new_with_last("name").of_variable("T"),
        ));
        assert!(matches!(
            PatternValidator::validate(&query, &catalog()),
            Err(CompileError::TypeMismatch { .. })
        ));
    }
}
