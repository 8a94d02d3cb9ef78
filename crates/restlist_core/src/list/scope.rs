//! Scope resolution.
//!
//! # Responsibility
//! - Turn a record's scope values into a structured equality predicate.
//! - Expose the predicate for both current and previous (persisted) values.
//!
//! # Invariants
//! - Predicate terms follow declaration order.
//! - No scope attributes means the universal predicate (whole table).
//! - Missing values resolve to `ScopeValue::Null` (`IS NULL` term).

use crate::list::config::ResolvedListConfig;
use crate::model::record::{ListRecord, ScopeValue, ScopeValues};
use std::fmt::{Display, Formatter};

/// Conjunction of `column = value` / `column IS NULL` terms.
///
/// Storage backends translate the terms into their own query mechanism;
/// `Display` is only meant for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScopePredicate {
    terms: Vec<(String, ScopeValue)>,
}

impl ScopePredicate {
    /// Predicate matching every row.
    pub fn universal() -> Self {
        Self::default()
    }

    pub fn is_universal(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&str, &ScopeValue)> {
        self.terms
            .iter()
            .map(|(column, value)| (column.as_str(), value))
    }
}

impl Display for ScopePredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, (column, value)) in self.terms.iter().enumerate() {
            if index > 0 {
                write!(f, " AND ")?;
            }
            match value {
                ScopeValue::Null => write!(f, "{column} IS NULL")?,
                other => write!(f, "{column} = {other}")?,
            }
        }
        Ok(())
    }
}

/// Builds scope predicates for one resolved list configuration.
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    config: ResolvedListConfig,
}

impl ScopeResolver {
    pub fn new(config: ResolvedListConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolvedListConfig {
        &self.config
    }

    /// Predicate for the given values. Each attribute is looked up by column
    /// name first, then by declared name.
    pub fn scope_condition(&self, values: &ScopeValues) -> ScopePredicate {
        let terms = self
            .config
            .scope
            .iter()
            .map(|attribute| {
                let value = values
                    .get(&attribute.column)
                    .or_else(|| values.get(&attribute.declared))
                    .cloned()
                    .unwrap_or_default();
                (attribute.column.clone(), value)
            })
            .collect();
        ScopePredicate { terms }
    }

    /// Predicate for the record's persisted (pre-change) values.
    pub fn scope_condition_was(&self, persisted: &ListRecord) -> ScopePredicate {
        self.scope_condition(&persisted.scope)
    }

    /// Predicate after overlaying `changes` on the persisted values.
    pub fn scope_condition_with(
        &self,
        persisted: &ListRecord,
        changes: Option<&ScopeValues>,
    ) -> ScopePredicate {
        let Some(changes) = changes.filter(|changes| !changes.is_empty()) else {
            return self.scope_condition_was(persisted);
        };
        let mut predicate = self.scope_condition_was(persisted);
        for (term, attribute) in predicate.terms.iter_mut().zip(&self.config.scope) {
            if let Some(value) = changes
                .get(&attribute.column)
                .or_else(|| changes.get(&attribute.declared))
            {
                term.1 = value.clone();
            }
        }
        predicate
    }
}
