// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pattern formulas
//!
//! ```text
//! H                event type leaf
//! H AS x           role binding
//! A : B            contiguous sequencing (nothing may intervene)
//! A ; B            non-contiguous sequencing (irrelevant events are skipped)
//! A OR B           disjunction
//! A :+             contiguous iteration
//! A +              non-contiguous iteration
//! A FILTER x[p]    restrict the events bound to `x` to those satisfying `p`
//! ```

use super::predicate::Predicate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Filter attached to a formula with `FILTER`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// `variable[predicate]` where variable is an event type name or a role
    Atomic {
        variable: String,
        predicate: Predicate,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn atomic(variable: impl Into<String>, predicate: Predicate) -> Self {
        Filter::Atomic {
            variable: variable.into(),
            predicate,
        }
    }

    pub fn and(left: Filter, right: Filter) -> Self {
        Filter::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Filter::Or(Box::new(left), Box::new(right))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Atomic {
                variable,
                predicate,
            } => write!(f, "{}[{}]", variable, predicate),
            Filter::And(l, r) => write!(f, "({} AND {})", l, r),
            Filter::Or(l, r) => write!(f, "({} OR {})", l, r),
        }
    }
}

/// Pattern formula tree
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Formula {
    EventType {
        name: String,
        role: Option<String>,
    },
    As(Box<Formula>, String),
    ContiguousSeq(Box<Formula>, Box<Formula>),
    NonContiguousSeq(Box<Formula>, Box<Formula>),
    Or(Box<Formula>, Box<Formula>),
    ContiguousIter(Box<Formula>),
    NonContiguousIter(Box<Formula>),
    Filter(Box<Formula>, Filter),
}

impl Formula {
    pub fn event(name: impl Into<String>) -> Self {
        Formula::EventType {
            name: name.into(),
            role: None,
        }
    }

    /// Event type leaf already bound to a role
    pub fn bound_event(name: impl Into<String>, role: impl Into<String>) -> Self {
        Formula::EventType {
            name: name.into(),
            role: Some(role.into()),
        }
    }

    pub fn with_role(self, role: impl Into<String>) -> Self {
        Formula::As(Box::new(self), role.into())
    }

    /// `self : next`
    pub fn followed_immediately_by(self, next: Formula) -> Self {
        Formula::ContiguousSeq(Box::new(self), Box::new(next))
    }

    /// `self ; next`
    pub fn followed_by(self, next: Formula) -> Self {
        Formula::NonContiguousSeq(Box::new(self), Box::new(next))
    }

    pub fn or(self, other: Formula) -> Self {
        Formula::Or(Box::new(self), Box::new(other))
    }

    /// `self :+`
    pub fn contiguous_iteration(self) -> Self {
        Formula::ContiguousIter(Box::new(self))
    }

    /// `self +`
    pub fn iteration(self) -> Self {
        Formula::NonContiguousIter(Box::new(self))
    }

    pub fn filter(self, filter: Filter) -> Self {
        Formula::Filter(Box::new(self), filter)
    }

    /// Event type names referenced by leaves
    pub fn event_types(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect(&mut out, &mut BTreeSet::new());
        out
    }

    /// Roles introduced with `AS` or bound on leaves
    pub fn roles(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect(&mut BTreeSet::new(), &mut out);
        out
    }

    /// Every name usable as a variable: event type names and roles
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = self.event_types();
        names.extend(self.roles());
        names
    }

    /// Map each variable to the event types whose events it can bind
    ///
    /// An event type name binds its own leaves; a role binds every leaf below
    /// the `AS` (or the leaf carrying it).
    pub fn bindings(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut out: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        self.bind(&mut Vec::new(), &mut out);
        out
    }

    fn bind<'a>(&'a self, roles: &mut Vec<&'a str>, out: &mut BTreeMap<&'a str, BTreeSet<&'a str>>) {
        match self {
            Formula::EventType { name, role } => {
                out.entry(name.as_str()).or_default().insert(name);
                for r in roles.iter().copied().chain(role.as_deref()) {
                    out.entry(r).or_default().insert(name);
                }
            }
            Formula::As(inner, role) => {
                roles.push(role);
                inner.bind(roles, out);
                roles.pop();
            }
            Formula::ContiguousSeq(l, r) | Formula::NonContiguousSeq(l, r) | Formula::Or(l, r) => {
                l.bind(roles, out);
                r.bind(roles, out);
            }
            Formula::ContiguousIter(inner)
            | Formula::NonContiguousIter(inner)
            | Formula::Filter(inner, _) => inner.bind(roles, out),
        }
    }

    fn collect<'a>(&'a self, events: &mut BTreeSet<&'a str>, roles: &mut BTreeSet<&'a str>) {
        match self {
            Formula::EventType { name, role } => {
                events.insert(name);
                if let Some(role) = role {
                    roles.insert(role);
                }
            }
            Formula::As(inner, role) => {
                roles.insert(role);
                inner.collect(events, roles);
            }
            Formula::ContiguousSeq(l, r) | Formula::NonContiguousSeq(l, r) | Formula::Or(l, r) => {
                l.collect(events, roles);
                r.collect(events, roles);
            }
            Formula::ContiguousIter(inner)
            | Formula::NonContiguousIter(inner)
            | Formula::Filter(inner, _) => inner.collect(events, roles),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::EventType { name, role: None } => f.write_str(name),
            Formula::EventType {
                name,
                role: Some(role),
            } => write!(f, "{} AS {}", name, role),
            Formula::As(inner, role) => write!(f, "({}) AS {}", inner, role),
            Formula::ContiguousSeq(l, r) => write!(f, "({} : {})", l, r),
            Formula::NonContiguousSeq(l, r) => write!(f, "({} ; {})", l, r),
            Formula::Or(l, r) => write!(f, "({} OR {})", l, r),
            Formula::ContiguousIter(inner) => write!(f, "{}:+", inner),
            Formula::NonContiguousIter(inner) => write!(f, "{}+", inner),
            Formula::Filter(inner, filter) => write!(f, "({} FILTER {})", inner, filter),
        }
    }
}
