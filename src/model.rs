//! Data model export and sandbox-only model edition.

use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    client::segment,
    codec::{decode_json, encode_json},
    validate, Result, SmartObjectsClient, SmartObjectsError,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeType {
    pub high_level_type: String,
    #[serde(default = "default_container_type")]
    pub container_type: String,
}

fn default_container_type() -> String {
    "none".to_owned()
}

impl AttributeType {
    pub fn new(high_level_type: impl Into<String>) -> Self {
        Self {
            high_level_type: high_level_type.into(),
            container_type: default_container_type(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeseries {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub event_type_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectAttribute {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub object_type_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerAttribute {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventType {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `scheduled`, `unscheduled`, `rule` or `system`.
    pub origin: String,
    #[serde(default)]
    pub timeseries_keys: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectType {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub object_attributes_keys: Vec<String>,
}

/// Full data model of a namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default)]
    pub event_types: Vec<EventType>,
    #[serde(default)]
    pub object_types: Vec<ObjectType>,
    #[serde(default)]
    pub object_attributes: Vec<ObjectAttribute>,
    #[serde(default)]
    pub owner_attributes: Vec<OwnerAttribute>,
    #[serde(default)]
    pub timeseries: Vec<Timeseries>,
}

/// Display name and description change for a model entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Read access to the data model: `model/...` endpoints.
#[derive(Clone, Copy, Debug)]
pub struct ModelClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> ModelClient<'a> {
    pub(crate) fn new(client: &'a SmartObjectsClient) -> Self {
        Self { client }
    }

    pub async fn export(&self) -> Result<Model> {
        self.get("model/export").await
    }

    pub async fn event_types(&self) -> Result<Vec<EventType>> {
        self.get("model/eventTypes").await
    }

    pub async fn object_types(&self) -> Result<Vec<ObjectType>> {
        self.get("model/objectTypes").await
    }

    pub async fn object_attributes(&self) -> Result<Vec<ObjectAttribute>> {
        self.get("model/objectAttributes").await
    }

    pub async fn owner_attributes(&self) -> Result<Vec<OwnerAttribute>> {
        self.get("model/ownerAttributes").await
    }

    pub async fn timeseries(&self) -> Result<Vec<Timeseries>> {
        self.get("model/timeseries").await
    }

    /// Model edition operations, only available outside production.
    pub fn sandbox(&self) -> Result<SandboxModelClient<'a>> {
        if !self.client.config().environment().allows_sandbox_operations() {
            return Err(SmartObjectsError::validation(
                "model edition is only available in the sandbox environment.",
            ));
        }
        Ok(SandboxModelClient {
            client: self.client,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.client.send_request(Method::GET, path, None).await?;
        decode_json(&response)
    }
}

/// Sandbox-only model edition.
#[derive(Clone, Copy, Debug)]
pub struct SandboxModelClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> SandboxModelClient<'a> {
    pub async fn create_timeseries(&self, timeseries: &[Timeseries]) -> Result<()> {
        validate::not_empty(timeseries, "Timeseries list cannot be empty.")?;
        for entry in timeseries {
            validate::not_blank(&entry.key, "key cannot be blank.")?;
        }
        self.post("model/timeseries", timeseries).await
    }

    pub async fn update_timeseries(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        self.update("model/timeseries", key, update).await
    }

    pub async fn deploy_timeseries(&self, key: &str) -> Result<()> {
        self.deploy("model/timeseries", key).await
    }

    pub async fn create_object_attributes(&self, attributes: &[ObjectAttribute]) -> Result<()> {
        validate::not_empty(attributes, "ObjectAttribute list cannot be empty.")?;
        for entry in attributes {
            validate::not_blank(&entry.key, "key cannot be blank.")?;
        }
        self.post("model/objectAttributes", attributes).await
    }

    pub async fn update_object_attribute(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        self.update("model/objectAttributes", key, update).await
    }

    pub async fn deploy_object_attribute(&self, key: &str) -> Result<()> {
        self.deploy("model/objectAttributes", key).await
    }

    pub async fn create_owner_attributes(&self, attributes: &[OwnerAttribute]) -> Result<()> {
        validate::not_empty(attributes, "OwnerAttribute list cannot be empty.")?;
        for entry in attributes {
            validate::not_blank(&entry.key, "key cannot be blank.")?;
        }
        self.post("model/ownerAttributes", attributes).await
    }

    pub async fn update_owner_attribute(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        self.update("model/ownerAttributes", key, update).await
    }

    pub async fn deploy_owner_attribute(&self, key: &str) -> Result<()> {
        self.deploy("model/ownerAttributes", key).await
    }

    pub async fn create_event_types(&self, event_types: &[EventType]) -> Result<()> {
        validate::not_empty(event_types, "EventType list cannot be empty.")?;
        for entry in event_types {
            validate::not_blank(&entry.key, "key cannot be blank.")?;
        }
        self.post("model/eventTypes", event_types).await
    }

    pub async fn update_event_type(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        self.update("model/eventTypes", key, update).await
    }

    pub async fn delete_event_type(&self, key: &str) -> Result<()> {
        self.delete("model/eventTypes", key).await
    }

    pub async fn create_object_types(&self, object_types: &[ObjectType]) -> Result<()> {
        validate::not_empty(object_types, "ObjectType list cannot be empty.")?;
        for entry in object_types {
            validate::not_blank(&entry.key, "key cannot be blank.")?;
        }
        self.post("model/objectTypes", object_types).await
    }

    pub async fn update_object_type(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        self.update("model/objectTypes", key, update).await
    }

    pub async fn delete_object_type(&self, key: &str) -> Result<()> {
        self.delete("model/objectTypes", key).await
    }

    pub async fn add_timeseries_to_event_type(
        &self,
        event_type_key: &str,
        timeseries_key: &str,
    ) -> Result<()> {
        validate::not_blank(event_type_key, "key cannot be blank.")?;
        validate::not_blank(timeseries_key, "key cannot be blank.")?;
        self.post(
            &format!("model/eventTypes/{}/timeseries", segment(event_type_key)),
            &[timeseries_key],
        )
        .await
    }

    pub async fn remove_timeseries_from_event_type(
        &self,
        event_type_key: &str,
        timeseries_key: &str,
    ) -> Result<()> {
        validate::not_blank(event_type_key, "key cannot be blank.")?;
        self.delete(
            &format!("model/eventTypes/{}/timeseries", segment(event_type_key)),
            timeseries_key,
        )
        .await
    }

    pub async fn add_object_attribute_to_object_type(
        &self,
        object_type_key: &str,
        object_attribute_key: &str,
    ) -> Result<()> {
        validate::not_blank(object_type_key, "key cannot be blank.")?;
        validate::not_blank(object_attribute_key, "key cannot be blank.")?;
        self.post(
            &format!(
                "model/objectTypes/{}/objectAttributes",
                segment(object_type_key)
            ),
            &[object_attribute_key],
        )
        .await
    }

    pub async fn remove_object_attribute_from_object_type(
        &self,
        object_type_key: &str,
        object_attribute_key: &str,
    ) -> Result<()> {
        validate::not_blank(object_type_key, "key cannot be blank.")?;
        self.delete(
            &format!(
                "model/objectTypes/{}/objectAttributes",
                segment(object_type_key)
            ),
            object_attribute_key,
        )
        .await
    }

    /// Removes every non-deployed entity from the sandbox model.
    pub async fn reset(&self) -> Result<()> {
        self.client
            .send_request(Method::POST, "model/reset", None)
            .await?;
        Ok(())
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let body = encode_json(body)?;
        self.client
            .send_request(Method::POST, path, Some(&body))
            .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, update: &UpdateEntity) -> Result<()> {
        validate::not_blank(key, "key cannot be blank.")?;
        let body = encode_json(update)?;
        self.client
            .send_request(
                Method::PUT,
                &format!("{collection}/{}", segment(key)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    async fn deploy(&self, collection: &str, key: &str) -> Result<()> {
        validate::not_blank(key, "key cannot be blank.")?;
        self.client
            .send_request(
                Method::POST,
                &format!("{collection}/{}/deploy", segment(key)),
                None,
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<()> {
        validate::not_blank(key, "key cannot be blank.")?;
        self.client
            .send_request(
                Method::DELETE,
                &format!("{collection}/{}", segment(key)),
                None,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{codec::decode_json, Model};

    #[test]
    fn model_export_decodes() {
        let model: Model = decode_json(
            r#"{
                "eventTypes":[{"key":"temp","origin":"scheduled","timeseriesKeys":["celsius"]}],
                "objectTypes":[{"key":"thermostat","objectAttributesKeys":["model"]}],
                "objectAttributes":[{"key":"model","type":{"highLevelType":"TEXT","containerType":"none"},"objectTypeKeys":["thermostat"]}],
                "ownerAttributes":[{"key":"age","displayName":"Age","type":{"highLevelType":"INT"}}],
                "timeseries":[{"key":"celsius","type":{"highLevelType":"DOUBLE"},"eventTypeKeys":["temp"]}],
                "orphans":{}
            }"#,
        )
        .expect("must decode");

        assert_eq!(model.event_types[0].timeseries_keys, vec!["celsius"]);
        assert_eq!(model.object_types[0].object_attributes_keys, vec!["model"]);
        assert_eq!(model.owner_attributes[0].attribute_type.container_type, "none");
        assert_eq!(model.timeseries[0].attribute_type.high_level_type, "DOUBLE");
    }
}
