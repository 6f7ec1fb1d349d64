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

//! Introspection results for a relation.
//!
//! The host runs a fixed set of queries against a live relation and hands
//! their result tables over keyed by query name. Tables arrive either as
//! plain rows or as the Arrow batches the Databricks SQL driver returns.

use crate::error::{Error, Result};
use arrow_array::cast::AsArray;
use arrow_array::RecordBatch;
use arrow_schema::DataType;
use std::collections::HashMap;
use std::fmt;

/// A query result: column names plus ordered rows of nullable string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectionTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl IntrospectionTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Convenience constructor for tables without nulls.
    pub fn from_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| Some(cell.to_string())).collect())
                .collect(),
        }
    }

    /// Concatenates `batches`. All batches must share the first one's schema
    /// and every column must be a string column.
    pub fn from_record_batches(batches: &[RecordBatch]) -> Result<Self> {
        let Some(first) = batches.first() else {
            return Ok(Self::default());
        };
        let schema = first.schema();
        let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

        let mut rows = Vec::new();
        for batch in batches {
            if batch.num_columns() != columns.len() {
                return Err(Error::internal(format!(
                    "Expected {} columns in introspection result, got {}",
                    columns.len(),
                    batch.num_columns()
                )));
            }
            for row in 0..batch.num_rows() {
                let cells = (0..batch.num_columns())
                    .map(|col| get_optional_string_value(batch, col, row))
                    .collect::<Result<Vec<_>>>()?;
                rows.push(cells);
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }
}

fn get_optional_string_value(batch: &RecordBatch, col_idx: usize, row: usize) -> Result<Option<String>> {
    let array = batch.column(col_idx);
    if array.is_null(row) {
        return Ok(None);
    }
    match array.data_type() {
        DataType::Utf8 => Ok(Some(array.as_string::<i32>().value(row).to_string())),
        DataType::LargeUtf8 => Ok(Some(array.as_string::<i64>().value(row).to_string())),
        dt => Err(Error::internal(format!(
            "Expected string column '{}' in introspection result, got {:?}",
            batch.schema().field(col_idx).name(),
            dt
        ))),
    }
}

/// Well-known introspection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationResultsKey {
    DescribeExtended,
    ShowTblProperties,
    InformationSchemaViews,
    InformationSchemaTags,
}

impl RelationResultsKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationResultsKey::DescribeExtended => "describe_extended",
            RelationResultsKey::ShowTblProperties => "show_tblproperties",
            RelationResultsKey::InformationSchemaViews => "information_schema.views",
            RelationResultsKey::InformationSchemaTags => "information_schema.tags",
        }
    }
}

impl fmt::Display for RelationResultsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Introspection tables of one relation.
#[derive(Debug, Clone, Default)]
pub struct RelationResults {
    tables: HashMap<RelationResultsKey, IntrospectionTable>,
}

impl RelationResults {
    pub fn builder() -> RelationResultsBuilder {
        RelationResultsBuilder::default()
    }

    pub fn get(&self, key: RelationResultsKey) -> Option<&IntrospectionTable> {
        self.tables.get(&key)
    }

    pub fn contains(&self, key: RelationResultsKey) -> bool {
        self.tables.contains_key(&key)
    }
}

#[derive(Debug, Default)]
pub struct RelationResultsBuilder {
    tables: HashMap<RelationResultsKey, IntrospectionTable>,
}

impl RelationResultsBuilder {
    pub fn with(mut self, key: RelationResultsKey, table: IntrospectionTable) -> Self {
        self.tables.insert(key, table);
        self
    }

    pub fn with_describe_extended(self, table: IntrospectionTable) -> Self {
        self.with(RelationResultsKey::DescribeExtended, table)
    }

    pub fn with_show_tblproperties(self, table: IntrospectionTable) -> Self {
        self.with(RelationResultsKey::ShowTblProperties, table)
    }

    pub fn with_info_schema_views(self, table: IntrospectionTable) -> Self {
        self.with(RelationResultsKey::InformationSchemaViews, table)
    }

    pub fn with_info_schema_tags(self, table: IntrospectionTable) -> Self {
        self.with(RelationResultsKey::InformationSchemaTags, table)
    }

    pub fn build(self) -> RelationResults {
        RelationResults {
            tables: self.tables,
        }
    }
}

/// Labels of the detailed-information section of `DESCRIBE TABLE EXTENDED`
/// that the adapter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescribeExtendedLabel {
    Comment,
    Owner,
    Type,
    Provider,
    Location,
    CreatedTime,
}

impl DescribeExtendedLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescribeExtendedLabel::Comment => "Comment",
            DescribeExtendedLabel::Owner => "Owner",
            DescribeExtendedLabel::Type => "Type",
            DescribeExtendedLabel::Provider => "Provider",
            DescribeExtendedLabel::Location => "Location",
            DescribeExtendedLabel::CreatedTime => "Created Time",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Comment" => Some(DescribeExtendedLabel::Comment),
            "Owner" => Some(DescribeExtendedLabel::Owner),
            "Type" => Some(DescribeExtendedLabel::Type),
            "Provider" => Some(DescribeExtendedLabel::Provider),
            "Location" => Some(DescribeExtendedLabel::Location),
            "Created Time" => Some(DescribeExtendedLabel::CreatedTime),
            _ => None,
        }
    }
}

/// Typed lookup over a `DESCRIBE TABLE EXTENDED` result.
///
/// The first row whose first cell is a known label wins; unknown labels
/// (column rows, section headers) are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeExtended {
    values: HashMap<DescribeExtendedLabel, Option<String>>,
}

impl DescribeExtended {
    pub fn from_table(table: &IntrospectionTable) -> Self {
        let mut values = HashMap::new();
        for row in table.rows() {
            let Some(label) = row
                .first()
                .and_then(|cell| cell.as_deref())
                .and_then(DescribeExtendedLabel::from_label)
            else {
                continue;
            };
            values
                .entry(label)
                .or_insert_with(|| row.get(1).cloned().flatten());
        }
        Self { values }
    }

    /// `None` when the label is absent or its value is null.
    pub fn get(&self, label: DescribeExtendedLabel) -> Option<&str> {
        self.values.get(&label)?.as_deref()
    }

    pub fn contains(&self, label: DescribeExtendedLabel) -> bool {
        self.values.contains_key(&label)
    }

    pub fn comment(&self) -> Option<&str> {
        self.get(DescribeExtendedLabel::Comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Int32Array, StringArray};
    use arrow_schema::{Field, Schema};
    use std::sync::Arc;

    fn describe_extended() -> IntrospectionTable {
        IntrospectionTable::from_rows(
            &["col_name", "data_type", "comment"],
            &[
                &["id", "int", ""],
                &["", "", ""],
                &["# Detailed Table Information", "", ""],
                &["Catalog", "main", ""],
                &["Comment", "orders table", ""],
                &["Owner", "someone@example.com", ""],
                &["Created Time", "Mon Jan 01 00:00:00 UTC 2024", ""],
                &["Comment", "shadowed", ""],
            ],
        )
    }

    #[test]
    fn test_describe_extended_lookup() {
        let describe = DescribeExtended::from_table(&describe_extended());
        assert_eq!(describe.comment(), Some("orders table"));
        assert_eq!(
            describe.get(DescribeExtendedLabel::Owner),
            Some("someone@example.com")
        );
        assert!(describe.contains(DescribeExtendedLabel::CreatedTime));
        assert_eq!(describe.get(DescribeExtendedLabel::Location), None);
    }

    #[test]
    fn test_label_round_trip() {
        for label in [
            DescribeExtendedLabel::Comment,
            DescribeExtendedLabel::CreatedTime,
        ] {
            assert_eq!(DescribeExtendedLabel::from_label(label.as_str()), Some(label));
        }
        assert_eq!(DescribeExtendedLabel::from_label("Catalog"), None);
    }

    #[test]
    fn test_results_builder() {
        let results = RelationResults::builder()
            .with_describe_extended(describe_extended())
            .build();
        assert!(results.contains(RelationResultsKey::DescribeExtended));
        assert!(results.get(RelationResultsKey::ShowTblProperties).is_none());
        assert_eq!(RelationResultsKey::ShowTblProperties.to_string(), "show_tblproperties");
    }

    #[test]
    fn test_from_record_batches() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("key", DataType::Utf8, false),
            Field::new("value", DataType::Utf8, true),
        ]));
        let first = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["a", "b"])),
                Arc::new(StringArray::from(vec![Some("1"), None])),
            ],
        )
        .unwrap();
        let second = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["c"])),
                Arc::new(StringArray::from(vec![Some("3")])),
            ],
        )
        .unwrap();

        let table = IntrospectionTable::from_record_batches(&[first, second]).unwrap();
        assert_eq!(table.columns(), &["key".to_string(), "value".to_string()]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, 1), Some("1"));
        assert_eq!(table.cell(1, 1), None);
        assert_eq!(table.cell(2, 0), Some("c"));
        assert_eq!(table.column_index("value"), Some(1));
    }

    #[test]
    fn test_from_record_batches_rejects_non_string_columns() {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int32, false)]));
        let batch =
            RecordBatch::try_new(schema, vec![Arc::new(Int32Array::from(vec![1]))]).unwrap();
        assert!(IntrospectionTable::from_record_batches(&[batch]).is_err());
        assert!(IntrospectionTable::from_record_batches(&[])
            .unwrap()
            .is_empty());
    }
}
