use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{codec::decode_json, validate, Result, SmartObjectsClient};

/// Searchable dataset description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub fields: Vec<DataSetField>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetField {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_level_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive_type: Option<String>,
}

/// Tabular search result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    /// Index of the column labelled `label`.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.label == label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Outcome of a query validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryValidation {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(rename = "validationErrors", default)]
    pub validation_errors: Vec<String>,
}

/// Search ("restitution"): `search/...` endpoints.
#[derive(Clone, Copy, Debug)]
pub struct SearchClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> SearchClient<'a> {
    pub(crate) fn new(client: &'a SmartObjectsClient) -> Self {
        Self { client }
    }

    /// Lists the datasets that can be queried.
    pub async fn datasets(&self) -> Result<Vec<DataSet>> {
        let response = self
            .client
            .send_request(Method::GET, "search/datasets", None)
            .await?;
        decode_json(&response)
    }

    /// Runs a basic search. `query` is the JSON query document.
    pub async fn search(&self, query: &str) -> Result<ResultSet> {
        validate::not_blank(query, "query cannot be blank.")?;

        let response = self
            .client
            .send_request(Method::POST, "search/basic", Some(query))
            .await?;
        decode_json(&response)
    }

    pub async fn validate_query(&self, query: &str) -> Result<QueryValidation> {
        validate::not_blank(query, "query cannot be blank.")?;

        let response = self
            .client
            .send_request(Method::POST, "search/validateQuery", Some(query))
            .await?;
        decode_json(&response)
    }
}

#[cfg(test)]
mod tests {
    use crate::{codec::decode_json, DataSet, ResultSet};

    #[test]
    fn result_set_decodes_columns_and_rows() {
        let result: ResultSet = decode_json(
            r#"{"columns":[{"label":"x_device_id","type":"TEXT"},{"label":"count","type":"LONG"}],
                "rows":[["dev-1", 3],["dev-2", 5]]}"#,
        )
        .expect("must decode");

        assert_eq!(result.column_index("count"), Some(1));
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1][1], serde_json::json!(5));
    }

    #[test]
    fn dataset_fields_use_camel_case() {
        let datasets: Vec<DataSet> = decode_json(
            r#"[{"key":"event","displayName":"Events","fields":[
                {"key":"x_timestamp","highLevelType":"DATETIME","containerType":"none","primitiveType":"datetime"}]}]"#,
        )
        .expect("must decode");

        assert_eq!(datasets[0].display_name.as_deref(), Some("Events"));
        assert_eq!(
            datasets[0].fields[0].high_level_type.as_deref(),
            Some("DATETIME")
        );
    }
}
