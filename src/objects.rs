use std::collections::HashMap;

use reqwest::Method;

use crate::{
    client::segment,
    codec::{decode_existence, decode_json, encode_json},
    validate, BatchResult, JsonCodec, Result, SmartObject, SmartObjectsClient, SmartObjectsError,
};

/// Smart object management: `objects/...` endpoints.
#[derive(Clone, Copy, Debug)]
pub struct ObjectsClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> ObjectsClient<'a> {
    pub(crate) fn new(client: &'a SmartObjectsClient) -> Self {
        Self { client }
    }

    /// Registers a new object.
    pub async fn create(&self, object: &SmartObject) -> Result<()> {
        validate::not_blank(object.device_id(), "x_device_id cannot be blank.")?;
        validate::not_blank(
            object.object_type().unwrap_or_default(),
            "x_object_type cannot be blank.",
        )?;

        let body = object.to_json()?;
        self.client
            .send_request(Method::POST, "objects", Some(&body))
            .await?;
        Ok(())
    }

    /// Creates or updates up to 1000 objects in one call.
    pub async fn create_update(&self, objects: &[SmartObject]) -> Result<Vec<BatchResult>> {
        validate::batch_size(
            objects,
            "Object body list cannot be empty or biger that 1000.",
        )?;
        for object in objects {
            validate::not_blank(object.device_id(), "x_device_id cannot be blank.")?;
        }

        let body = SmartObject::list_to_json(objects)?;
        let response = self
            .client
            .send_request(Method::PUT, "objects", Some(&body))
            .await?;
        decode_json(&response)
    }

    /// Updates the object identified by `device_id`.
    pub async fn update(&self, object: &SmartObject, device_id: &str) -> Result<()> {
        validate::not_blank(device_id, "deviceId cannot be blank.")?;

        let body = object.to_json()?;
        self.client
            .send_request(
                Method::PUT,
                &format!("objects/{}", segment(device_id)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, device_id: &str) -> Result<()> {
        validate::not_blank(device_id, "deviceId cannot be blank.")?;

        self.client
            .send_request(
                Method::DELETE,
                &format!("objects/{}", segment(device_id)),
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn exists(&self, device_id: &str) -> Result<bool> {
        validate::not_blank(device_id, "deviceId cannot be blank.")?;

        let response = self
            .client
            .send_request(
                Method::GET,
                &format!("objects/exists/{}", segment(device_id)),
                None,
            )
            .await?;
        decode_existence(&response)?
            .remove(device_id)
            .ok_or_else(|| {
                SmartObjectsError::Decode(format!(
                    "existence reply does not mention '{device_id}': {response}"
                ))
            })
    }

    /// Checks up to 1000 device ids in one call.
    pub async fn exist<S: AsRef<str>>(&self, device_ids: &[S]) -> Result<HashMap<String, bool>> {
        validate::batch_size(
            device_ids,
            "List of deviceIds cannot be empty or biger that 1000.",
        )?;

        let ids: Vec<&str> = device_ids.iter().map(AsRef::as_ref).collect();
        let body = encode_json(&ids)?;
        let response = self
            .client
            .send_request(Method::POST, "objects/exists", Some(&body))
            .await?;
        decode_existence(&response)
    }
}
