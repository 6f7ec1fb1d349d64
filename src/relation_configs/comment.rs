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

//! Relation comment.

use crate::error::Result;
use crate::relation_configs::results::{DescribeExtended, RelationResults, RelationResultsKey};
use crate::relation_configs::{ComponentProcessor, DatabricksComponentConfig, ModelNode};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentConfig {
    pub comment: Option<String>,
}

impl CommentConfig {
    pub fn new(comment: Option<String>) -> Self {
        Self { comment }
    }

    /// Comments have no in-place alter path.
    pub fn requires_full_refresh(&self) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CommentProcessor;

impl CommentProcessor {
    pub const NAME: &'static str = "comment";
}

impl ComponentProcessor for CommentProcessor {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn from_relation_results(&self, results: &RelationResults) -> Result<DatabricksComponentConfig> {
        let comment = results
            .get(RelationResultsKey::DescribeExtended)
            .and_then(|table| DescribeExtended::from_table(table).comment().map(str::to_string));
        Ok(DatabricksComponentConfig::Comment(CommentConfig::new(comment)))
    }

    fn from_model_node(&self, model: &dyn ModelNode) -> Result<DatabricksComponentConfig> {
        Ok(DatabricksComponentConfig::Comment(CommentConfig::new(
            model.description().map(str::to_string),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation_configs::{IntrospectionTable, ModelDeclaration};

    #[test]
    fn test_from_relation_results() {
        let results = RelationResults::builder()
            .with_describe_extended(IntrospectionTable::from_rows(
                &["col_name", "data_type", "comment"],
                &[
                    &["id", "int", "primary key"],
                    &["Comment", "This is the table comment", ""],
                ],
            ))
            .build();

        let config = CommentProcessor.from_relation_results(&results).unwrap();
        assert_eq!(
            config,
            DatabricksComponentConfig::Comment(CommentConfig::new(Some(
                "This is the table comment".to_string()
            )))
        );
    }

    #[test]
    fn test_from_relation_results_without_comment() {
        let results = RelationResults::builder()
            .with_describe_extended(IntrospectionTable::from_rows(
                &["col_name", "data_type", "comment"],
                &[&["id", "int", ""]],
            ))
            .build();
        let config = CommentProcessor.from_relation_results(&results).unwrap();
        assert_eq!(config, DatabricksComponentConfig::Comment(CommentConfig::default()));

        let config = CommentProcessor
            .from_relation_results(&RelationResults::default())
            .unwrap();
        assert_eq!(config, DatabricksComponentConfig::Comment(CommentConfig::default()));
    }

    #[test]
    fn test_from_model_node() {
        let model = ModelDeclaration {
            description: Some("a description".to_string()),
            ..Default::default()
        };
        let config = CommentProcessor.from_model_node(&model).unwrap();
        assert_eq!(
            config,
            DatabricksComponentConfig::Comment(CommentConfig::new(Some(
                "a description".to_string()
            )))
        );

        let config = CommentProcessor
            .from_model_node(&ModelDeclaration::default())
            .unwrap();
        assert_eq!(config, DatabricksComponentConfig::Comment(CommentConfig::default()));
    }
}
