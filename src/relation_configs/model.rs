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

//! The declared side of a relation: what the model asks for.

use serde::Deserialize;
use serde_json::{Map, Value};

/// A model as seen by the component processors.
pub trait ModelNode {
    fn relation_name(&self) -> Option<&str>;
    fn description(&self) -> Option<&str>;
    /// Adapter-specific keys of the model's config (`tblproperties`,
    /// `databricks_compute`, ...).
    fn config_extra(&self) -> &Map<String, Value>;
}

/// Serde-deserializable [`ModelNode`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelDeclaration {
    #[serde(default)]
    pub relation_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl ModelNode for ModelDeclaration {
    fn relation_name(&self) -> Option<&str> {
        self.relation_name.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn config_extra(&self) -> &Map<String, Value> {
        &self.config
    }
}
