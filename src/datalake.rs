use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    client::segment,
    codec::{decode_json, encode_json},
    validate, Result, SmartObjectsClient,
};

/// Single data row ingested into a dataset.
pub type DatasetRecord = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldType {
    pub high_level_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetField {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl DatasetField {
    pub fn new(key: impl Into<String>, high_level_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            display_name: None,
            description: None,
            field_type: FieldType {
                high_level_type: high_level_type.into(),
            },
        }
    }
}

/// Custom dataset stored in the datalake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(rename = "datasetKey")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<DatasetField>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDatasetField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Dataset management and ingestion: `datalake/...` endpoints.
#[derive(Clone, Copy, Debug)]
pub struct DatalakeClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> DatalakeClient<'a> {
    pub(crate) fn new(client: &'a SmartObjectsClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Dataset>> {
        let response = self
            .client
            .send_request(Method::GET, "datalake/datasets", None)
            .await?;
        decode_json(&response)
    }

    pub async fn get(&self, dataset_key: &str) -> Result<Dataset> {
        validate::not_blank(dataset_key, "datasetKey cannot be blank.")?;

        let response = self
            .client
            .send_request(Method::GET, &dataset_path(dataset_key), None)
            .await?;
        decode_json(&response)
    }

    pub async fn create(&self, dataset: &Dataset) -> Result<()> {
        validate::not_blank(&dataset.key, "datasetKey cannot be blank.")?;
        for field in &dataset.fields {
            validate::not_blank(&field.key, "fieldKey cannot be blank.")?;
        }

        let body = encode_json(dataset)?;
        self.client
            .send_request(Method::POST, "datalake/datasets", Some(&body))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, dataset_key: &str) -> Result<()> {
        validate::not_blank(dataset_key, "datasetKey cannot be blank.")?;

        self.client
            .send_request(Method::DELETE, &dataset_path(dataset_key), None)
            .await?;
        Ok(())
    }

    pub async fn add_field(&self, dataset_key: &str, field: &DatasetField) -> Result<()> {
        validate::not_blank(dataset_key, "datasetKey cannot be blank.")?;
        validate::not_blank(&field.key, "fieldKey cannot be blank.")?;

        let body = encode_json(field)?;
        self.client
            .send_request(
                Method::POST,
                &format!("{}/fields", dataset_path(dataset_key)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn update_field(
        &self,
        dataset_key: &str,
        field_key: &str,
        update: &UpdateDatasetField,
    ) -> Result<()> {
        validate::not_blank(dataset_key, "datasetKey cannot be blank.")?;
        validate::not_blank(field_key, "fieldKey cannot be blank.")?;

        let body = encode_json(update)?;
        self.client
            .send_request(
                Method::PUT,
                &format!("{}/fields/{}", dataset_path(dataset_key), segment(field_key)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    /// Ingests up to 1000 records into the dataset.
    pub async fn send(&self, dataset_key: &str, records: &[DatasetRecord]) -> Result<()> {
        validate::not_blank(dataset_key, "datasetKey cannot be blank.")?;
        validate::batch_size(
            records,
            "Dataset records list cannot be empty or biger that 1000.",
        )?;

        let body = encode_json(records)?;
        self.client
            .send_request(
                Method::POST,
                &format!("{}/data", dataset_path(dataset_key)),
                Some(&body),
            )
            .await?;
        Ok(())
    }
}

fn dataset_path(dataset_key: &str) -> String {
    format!("datalake/datasets/{}", segment(dataset_key))
}

#[cfg(test)]
mod tests {
    use super::{dataset_path, Dataset, DatasetField};
    use crate::codec::{decode_json, encode_json};

    #[test]
    fn dataset_uses_dataset_key_on_the_wire() {
        let dataset = Dataset {
            key: "weather".to_owned(),
            display_name: Some("Weather".to_owned()),
            description: None,
            fields: vec![DatasetField::new("temperature", "DOUBLE")],
        };

        let json = encode_json(&dataset).expect("must encode");
        assert!(json.contains(r#""datasetKey":"weather""#));
        assert!(json.contains(r#""type":{"highLevelType":"DOUBLE"}"#));

        let decoded: Dataset = decode_json(&json).expect("must decode");
        assert_eq!(decoded, dataset);
    }

    #[test]
    fn dataset_keys_are_path_encoded() {
        assert_eq!(dataset_path("a b"), "datalake/datasets/a%20b");
    }
}
