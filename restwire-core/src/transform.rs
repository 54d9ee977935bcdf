//! # Versioned Transform Pipeline
//!
//! A small rule-chain engine that migrates payloads between contract versions.
//!
//! Rules are registered under a [`TransformKey`] `(name, version, direction)`. Transforming a
//! payload that is at version `v` selects every rule with the same name and direction whose
//! version sorts strictly after `v`, orders them by version and applies them one after the other,
//! feeding the output of each rule into the next one.
//!
//! ```rust
//! use restwire_core::transform::{TransformKey, TransformPipeline};
//! use restwire_core::BoxError;
//! use serde_json::{Value, json};
//!
//! let mut pipeline = TransformPipeline::new();
//! pipeline.add_rule(
//!     TransformKey::output("order", "2024-06-15"),
//!     |mut v: Value| -> Result<Value, BoxError> {
//!         v["currency"] = json!("EUR");
//!         Ok(v)
//!     },
//! )?;
//!
//! let migrated = pipeline.transform(&TransformKey::output("order", "2024-01-01"), json!({ "id": 1 }))?;
//! assert_eq!(migrated, json!({ "id": 1, "currency": "EUR" }));
//! # Ok::<(), restwire_core::transform::TransformError>(())
//! ```
//!
//! A payload that is already at the latest registered version has no rule to go through, which
//! is reported as [`TransformError::NoMatchingRules`] rather than silently returning the input.
mod key;
mod rule;

pub use key::*;
pub use rule::*;

use crate::BoxError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Errors produced by the transform pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Rule with key '{0}' already exists")]
    DuplicateKey(TransformKey),
    #[error("Rule with key '{0}' not found")]
    RuleNotFound(TransformKey),
    #[error(
        "No rules found with key '{name}', direction '{direction}' and version greater than '{version}'"
    )]
    NoMatchingRules {
        name: String,
        direction: TransformDirection,
        version: String,
    },
    #[error("At least one key must be provided")]
    EmptyKeys,
    #[error("Key '{0}' must target a single direction to select rules")]
    AmbiguousDirection(TransformKey),
    #[error("Rule '{key}' failed: {source}")]
    Rule {
        key: TransformKey,
        #[source]
        source: BoxError,
    },
    #[error("Failed to decode the transformed payload: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A registry of versioned transform rules.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    rules: HashMap<TransformKey, Arc<dyn TransformRule>>,
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule.
    ///
    /// A `Both` key stores the rule under the `Input` and the `Output` direction.
    ///
    /// # Returns
    ///
    /// * `Ok(&mut Self)` - The pipeline, for chaining.
    /// * `Err(TransformError::DuplicateKey)` - If a rule already exists for the key (or for
    ///   either direction of a `Both` key). Nothing is registered in that case.
    pub fn add_rule(
        &mut self,
        key: TransformKey,
        rule: impl TransformRule + 'static,
    ) -> Result<&mut Self, TransformError> {
        self.add_shared_rule(key, Arc::new(rule))
    }

    /// Registers the same rule under several keys.
    ///
    /// Keys are processed in order and registration stops at the first duplicate.
    pub fn add_rule_for_keys(
        &mut self,
        rule: impl TransformRule + 'static,
        keys: impl IntoIterator<Item = TransformKey>,
    ) -> Result<&mut Self, TransformError> {
        let rule: Arc<dyn TransformRule> = Arc::new(rule);
        let mut keys = keys.into_iter().peekable();

        if keys.peek().is_none() {
            return Err(TransformError::EmptyKeys);
        }

        for key in keys {
            self.add_shared_rule(key, rule.clone())?;
        }

        Ok(self)
    }

    fn add_shared_rule(
        &mut self,
        key: TransformKey,
        rule: Arc<dyn TransformRule>,
    ) -> Result<&mut Self, TransformError> {
        if let Some(existing) = expand(&key).find(|k| self.rules.contains_key(k)) {
            return Err(TransformError::DuplicateKey(existing));
        }

        for stored in expand(&key) {
            self.rules.insert(stored, rule.clone());
        }

        Ok(self)
    }

    /// Registers a rule unless the key is taken.
    ///
    /// Returns `false`, keeping the existing rule, if a rule already exists for the key.
    pub fn try_add_rule(&mut self, key: TransformKey, rule: impl TransformRule + 'static) -> bool {
        self.add_rule(key, rule).is_ok()
    }

    /// Inserts or overwrites the rule stored under `key`.
    pub fn replace_rule(
        &mut self,
        key: TransformKey,
        rule: impl TransformRule + 'static,
    ) -> &mut Self {
        let rule: Arc<dyn TransformRule> = Arc::new(rule);
        for stored in expand(&key) {
            self.rules.insert(stored, rule.clone());
        }
        self
    }

    /// Removes the rule stored under `key`, returning whether one existed.
    pub fn remove_rule(&mut self, key: &TransformKey) -> bool {
        expand(key).fold(false, |removed, k| self.rules.remove(&k).is_some() || removed)
    }

    /// Checks whether a rule is stored under `key` (under both directions for a `Both` key).
    pub fn has_rule(&self, key: &TransformKey) -> bool {
        expand(key).all(|k| self.rules.contains_key(&k))
    }

    /// Returns the rule stored under `key`. A `Both` key resolves to the `Input` rule.
    pub fn get_rule(&self, key: &TransformKey) -> Option<Arc<dyn TransformRule>> {
        expand(key).find_map(|k| self.rules.get(&k).cloned())
    }

    /// Same as [`Self::get_rule`] but fails with `RuleNotFound` when nothing is stored.
    pub fn get_required_rule(
        &self,
        key: &TransformKey,
    ) -> Result<Arc<dyn TransformRule>, TransformError> {
        self.get_rule(key)
            .ok_or_else(|| TransformError::RuleNotFound(key.clone()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Selects the migration chain for a payload currently at `key.version`.
    ///
    /// # Returns
    ///
    /// * `Ok(rules)` - Every rule with the same name and direction and a strictly greater
    ///   version, in ascending version order.
    /// * `Err(TransformError::NoMatchingRules)` - If no such rule exists.
    /// * `Err(TransformError::AmbiguousDirection)` - If `key` uses the `Both` direction.
    pub fn get_required_rules(
        &self,
        key: &TransformKey,
    ) -> Result<Vec<(TransformKey, Arc<dyn TransformRule>)>, TransformError> {
        if key.direction == TransformDirection::Both {
            return Err(TransformError::AmbiguousDirection(key.clone()));
        }

        let mut matching: Vec<_> = self
            .rules
            .iter()
            .filter(|(k, _)| {
                k.name == key.name
                    && k.direction == key.direction
                    && k.version.as_str() > key.version.as_str()
            })
            .map(|(k, rule)| (k.clone(), rule.clone()))
            .collect();

        if matching.is_empty() {
            return Err(TransformError::NoMatchingRules {
                name: key.name.clone(),
                direction: key.direction,
                version: key.version.clone(),
            });
        }

        matching.sort_by(|(a, _), (b, _)| a.version.cmp(&b.version));
        Ok(matching)
    }

    /// Migrates `value` through every rule newer than `key.version`, in version order.
    pub fn transform(&self, key: &TransformKey, value: Value) -> Result<Value, TransformError> {
        self.get_required_rules(key)?
            .into_iter()
            .try_fold(value, |value, (rule_key, rule)| {
                rule.transform(value).map_err(|source| TransformError::Rule {
                    key: rule_key,
                    source,
                })
            })
    }

    /// Asynchronous variant of [`Self::transform`].
    ///
    /// Rules are awaited one at a time: each rule consumes the output of the previous one.
    pub async fn transform_async(
        &self,
        key: &TransformKey,
        value: Value,
    ) -> Result<Value, TransformError> {
        let mut value = value;

        for (rule_key, rule) in self.get_required_rules(key)? {
            value = rule
                .transform_async(value)
                .await
                .map_err(|source| TransformError::Rule {
                    key: rule_key,
                    source,
                })?;
        }

        Ok(value)
    }

    /// Migrates `value` and decodes the result into `T` with the client's JSON codec.
    pub fn transform_into<T: DeserializeOwned>(
        &self,
        key: &TransformKey,
        value: Value,
    ) -> Result<T, TransformError> {
        let value = self.transform(key, value)?;
        Ok(crate::transport::codec::from_value(value)?)
    }
}

fn expand(key: &TransformKey) -> impl Iterator<Item = TransformKey> + '_ {
    key.direction.expand().map(|d| key.with_direction(d))
}
