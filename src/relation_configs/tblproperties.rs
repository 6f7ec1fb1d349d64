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

//! Table properties (`TBLPROPERTIES`).

use crate::error::{Error, Result};
use crate::relation_configs::results::{RelationResults, RelationResultsKey};
use crate::relation_configs::{ComponentProcessor, DatabricksComponentConfig, ModelNode};
use indexmap::IndexMap;
use serde_json::Value;

/// Properties managed by Databricks itself.
pub const DEFAULT_IGNORE_LIST: &[&str] = &["pipelines.pipelineId"];

#[derive(Debug, Clone)]
pub struct TblPropertiesConfig {
    pub tblproperties: IndexMap<String, String>,
    /// Keys left out of equality.
    pub ignore_list: Vec<String>,
}

impl Default for TblPropertiesConfig {
    fn default() -> Self {
        Self::new(IndexMap::new())
    }
}

impl TblPropertiesConfig {
    pub fn new(tblproperties: IndexMap<String, String>) -> Self {
        Self {
            tblproperties,
            ignore_list: DEFAULT_IGNORE_LIST.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn with_ignore_list(mut self, ignore_list: Vec<String>) -> Self {
        self.ignore_list = ignore_list;
        self
    }

    pub fn requires_full_refresh(&self) -> bool {
        true
    }

    fn is_ignored(&self, key: &str) -> bool {
        self.ignore_list.iter().any(|ignored| ignored == key)
    }

    fn without_ignored<'a>(&'a self, other: &Self) -> IndexMap<&'a str, &'a str> {
        self.tblproperties
            .iter()
            .filter(|(k, _)| !self.is_ignored(k) && !other.is_ignored(k))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

// Order-insensitive. Keys on either side's ignore list are left out.
impl PartialEq for TblPropertiesConfig {
    fn eq(&self, other: &Self) -> bool {
        self.without_ignored(other) == other.without_ignored(self)
    }
}

impl Eq for TblPropertiesConfig {}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TblPropertiesProcessor;

impl TblPropertiesProcessor {
    pub const NAME: &'static str = "tblproperties";
}

impl ComponentProcessor for TblPropertiesProcessor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn from_relation_results(&self, results: &RelationResults) -> Result<DatabricksComponentConfig> {
        let mut tblproperties = IndexMap::new();
        if let Some(table) = results.get(RelationResultsKey::ShowTblProperties) {
            for row in table.rows() {
                let key = row.first().cloned().flatten().unwrap_or_default();
                let value = row.get(1).cloned().flatten().unwrap_or_default();
                tblproperties.insert(key, value);
            }
        }
        Ok(DatabricksComponentConfig::TblProperties(
            TblPropertiesConfig::new(tblproperties),
        ))
    }

    fn from_model_node(&self, model: &dyn ModelNode) -> Result<DatabricksComponentConfig> {
        let tblproperties = match model.config_extra().get(Self::NAME) {
            None => IndexMap::new(),
            Some(value) if is_falsy(value) => IndexMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), stringify(v)))
                .collect(),
            Some(_) => return Err(Error::runtime("tblproperties must be a dictionary")),
        };
        Ok(DatabricksComponentConfig::TblProperties(
            TblPropertiesConfig::new(tblproperties),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::relation_configs::{IntrospectionTable, ModelDeclaration};
    use serde_json::json;

    fn props(pairs: &[(&str, &str)]) -> TblPropertiesConfig {
        TblPropertiesConfig::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn model(config: Value) -> ModelDeclaration {
        serde_json::from_value(json!({ "config": config })).unwrap()
    }

    #[test]
    fn test_equality_ignores_pipeline_id() {
        let a = props(&[("prop", "1"), ("pipelines.pipelineId", "abc")]);
        let b = props(&[("prop", "1"), ("pipelines.pipelineId", "def")]);
        let c = props(&[("prop", "1")]);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, props(&[("prop", "2")]));
    }

    #[test]
    fn test_equality_is_order_insensitive() {
        assert_eq!(
            props(&[("a", "1"), ("b", "2")]),
            props(&[("b", "2"), ("a", "1")])
        );
    }

    #[test]
    fn test_custom_ignore_list() {
        let a = props(&[("a", "1"), ("delta.x", "1")]).with_ignore_list(vec!["delta.x".into()]);
        let b = props(&[("a", "1"), ("delta.x", "2")]);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(props(&[("a", "2")]).with_ignore_list(vec!["delta.x".into()]), b);
    }

    #[test]
    fn test_declared_values_match_live_rows() {
        let results = RelationResults::builder()
            .with_show_tblproperties(IntrospectionTable::from_rows(
                &["key", "value"],
                &[&["delta.appendOnly", "true"], &["ratio", "1.0"], &["n", "3"]],
            ))
            .build();
        let live = TblPropertiesProcessor.from_relation_results(&results).unwrap();
        let declared = TblPropertiesProcessor
            .from_model_node(&model(json!({
                "tblproperties": {"delta.appendOnly": true, "ratio": 1.0, "n": 3}
            })))
            .unwrap();
        assert_eq!(declared, live);

        // Booleans are lowercase, the way the table reports them back.
        let DatabricksComponentConfig::TblProperties(declared) = declared else {
            panic!("expected tblproperties");
        };
        assert_eq!(declared.tblproperties["delta.appendOnly"], "true");
        assert_eq!(declared.tblproperties["ratio"], "1.0");
    }

    #[test]
    fn test_from_relation_results() {
        let results = RelationResults::builder()
            .with_show_tblproperties(IntrospectionTable::from_rows(
                &["key", "value"],
                &[&["prop", "f1"], &["other", "f2"]],
            ))
            .build();
        let config = TblPropertiesProcessor.from_relation_results(&results).unwrap();
        assert_eq!(
            config,
            DatabricksComponentConfig::TblProperties(props(&[("prop", "f1"), ("other", "f2")]))
        );

        let config = TblPropertiesProcessor
            .from_relation_results(&RelationResults::default())
            .unwrap();
        assert_eq!(
            config,
            DatabricksComponentConfig::TblProperties(TblPropertiesConfig::default())
        );
    }

    #[test]
    fn test_from_model_node() {
        let config = TblPropertiesProcessor
            .from_model_node(&model(json!({"tblproperties": {"prop": 1, "flag": true, "s": "x"}})))
            .unwrap();
        assert_eq!(
            config,
            DatabricksComponentConfig::TblProperties(props(&[
                ("prop", "1"),
                ("flag", "true"),
                ("s", "x")
            ]))
        );
    }

    #[test]
    fn test_from_model_node_missing_or_falsy() {
        for config in [json!({}), json!({"tblproperties": null}), json!({"tblproperties": {}})] {
            let result = TblPropertiesProcessor.from_model_node(&model(config)).unwrap();
            assert_eq!(
                result,
                DatabricksComponentConfig::TblProperties(TblPropertiesConfig::default())
            );
        }
    }

    #[test]
    fn test_from_model_node_not_a_mapping() {
        let err = TblPropertiesProcessor
            .from_model_node(&model(json!({"tblproperties": ["a", "b"]})))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.message(), "tblproperties must be a dictionary");
    }
}
