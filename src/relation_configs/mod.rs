// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Relation config reconciliation.
//!
//! A relation's configuration is split into facets (comment, table
//! properties, ...). For each facet a [`ComponentProcessor`] builds a
//! [`DatabricksComponentConfig`] twice: from the live relation's
//! introspection results and from the model declaration. Comparing the two
//! [`DatabricksRelationConfig`]s yields a [`RelationChangeSet`] that tells the
//! host whether the relation can be altered in place or must be rebuilt.
//!
//! New facets are added by registering a processor in a [`ProcessorRegistry`].

pub mod comment;
pub mod model;
pub mod results;
pub mod tblproperties;

use crate::error::Result;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub use comment::{CommentConfig, CommentProcessor};
pub use model::{ModelDeclaration, ModelNode};
pub use results::{
    DescribeExtended, DescribeExtendedLabel, IntrospectionTable, RelationResults,
    RelationResultsBuilder, RelationResultsKey,
};
pub use tblproperties::{TblPropertiesConfig, TblPropertiesProcessor};

/// Configuration of one facet of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabricksComponentConfig {
    Comment(CommentConfig),
    TblProperties(TblPropertiesConfig),
}

impl DatabricksComponentConfig {
    pub fn name(&self) -> &'static str {
        match self {
            DatabricksComponentConfig::Comment(_) => CommentProcessor::NAME,
            DatabricksComponentConfig::TblProperties(_) => TblPropertiesProcessor::NAME,
        }
    }

    /// Whether a change to this facet forces the relation to be rebuilt.
    pub fn requires_full_refresh(&self) -> bool {
        match self {
            DatabricksComponentConfig::Comment(c) => c.requires_full_refresh(),
            DatabricksComponentConfig::TblProperties(c) => c.requires_full_refresh(),
        }
    }
}

/// Builds the config of one facet.
pub trait ComponentProcessor: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// From the live relation.
    fn from_relation_results(&self, results: &RelationResults) -> Result<DatabricksComponentConfig>;

    /// From the model declaration.
    fn from_model_node(&self, model: &dyn ModelNode) -> Result<DatabricksComponentConfig>;
}

/// Facet name to processor.
#[derive(Debug, Clone)]
pub struct ProcessorRegistry {
    processors: IndexMap<&'static str, Arc<dyn ComponentProcessor>>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CommentProcessor));
        registry.register(Arc::new(TblPropertiesProcessor));
        registry
    }
}

impl ProcessorRegistry {
    /// An empty registry. [`ProcessorRegistry::default`] has the built-in facets.
    pub fn new() -> Self {
        Self {
            processors: IndexMap::new(),
        }
    }

    /// Registers `processor` under its name, replacing any previous one.
    pub fn register(&mut self, processor: Arc<dyn ComponentProcessor>) {
        self.processors.insert(processor.name(), processor);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ComponentProcessor>> {
        self.processors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.processors.keys().copied()
    }

    pub fn processors(&self) -> impl Iterator<Item = &Arc<dyn ComponentProcessor>> {
        self.processors.values()
    }
}

/// All facet configs of one relation, keyed by facet name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabricksRelationConfig {
    config: IndexMap<String, DatabricksComponentConfig>,
}

impl DatabricksRelationConfig {
    /// Keys each component by its facet name.
    pub fn new(components: impl IntoIterator<Item = DatabricksComponentConfig>) -> Self {
        Self::from_named(components.into_iter().map(|c| (c.name().to_string(), c)))
    }

    fn from_named(components: impl IntoIterator<Item = (String, DatabricksComponentConfig)>) -> Self {
        Self {
            config: components.into_iter().collect(),
        }
    }

    /// Runs every registered processor against the live relation. Each
    /// component is keyed by the name its processor is registered under.
    pub fn from_relation_results(
        registry: &ProcessorRegistry,
        results: &RelationResults,
    ) -> Result<Self> {
        let components = registry
            .processors()
            .map(|p| -> Result<_> { Ok((p.name().to_string(), p.from_relation_results(results)?)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_named(components))
    }

    /// Runs every registered processor against the model declaration.
    pub fn from_model_node(registry: &ProcessorRegistry, model: &dyn ModelNode) -> Result<Self> {
        let components = registry
            .processors()
            .map(|p| -> Result<_> { Ok((p.name().to_string(), p.from_model_node(model)?)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_named(components))
    }

    pub fn get_config(&self, name: &str) -> Option<&DatabricksComponentConfig> {
        self.config.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &DatabricksComponentConfig> {
        self.config.values()
    }

    /// Changes needed to turn `existing` into `self`. A facet missing from
    /// `existing` counts as changed.
    pub fn get_changeset(&self, existing: &DatabricksRelationConfig) -> RelationChangeSet {
        let mut changes = IndexMap::new();
        for (name, desired) in &self.config {
            if Some(desired) != existing.config.get(name) {
                debug!("Relation config component '{}' changed", name);
                changes.insert(name.clone(), desired.clone());
            }
        }
        RelationChangeSet { changes }
    }
}

/// Facets whose desired config differs from the live relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationChangeSet {
    changes: IndexMap<String, DatabricksComponentConfig>,
}

impl RelationChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn requires_full_refresh(&self) -> bool {
        self.changes.values().any(|c| c.requires_full_refresh())
    }

    pub fn get(&self, name: &str) -> Option<&DatabricksComponentConfig> {
        self.changes.get(name)
    }

    pub fn changes(&self) -> impl Iterator<Item = (&str, &DatabricksComponentConfig)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }
}
