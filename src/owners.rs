use std::collections::HashMap;

use reqwest::Method;

use crate::{
    client::segment,
    codec::{decode_existence, decode_json, encode_json},
    validate,
    wire::PasswordUpdate,
    BatchResult, ClaimOrUnclaim, JsonCodec, Owner, Result, SmartObjectsClient, SmartObjectsError,
};

/// Owner management: `owners/...` endpoints.
#[derive(Clone, Copy, Debug)]
pub struct OwnersClient<'a> {
    client: &'a SmartObjectsClient,
}

impl<'a> OwnersClient<'a> {
    pub(crate) fn new(client: &'a SmartObjectsClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, owner: &Owner) -> Result<()> {
        validate::not_blank(owner.username(), "username cannot be blank.")?;

        let body = owner.to_json()?;
        self.client
            .send_request(Method::POST, "owners", Some(&body))
            .await?;
        Ok(())
    }

    /// Creates or updates up to 1000 owners in one call.
    pub async fn create_update(&self, owners: &[Owner]) -> Result<Vec<BatchResult>> {
        validate::batch_size(owners, "Owner body list cannot be empty or biger that 1000.")?;
        for owner in owners {
            validate::not_blank(owner.username(), "username cannot be blank.")?;
        }

        let body = Owner::list_to_json(owners)?;
        let response = self
            .client
            .send_request(Method::PUT, "owners", Some(&body))
            .await?;
        decode_json(&response)
    }

    pub async fn update(&self, owner: &Owner, username: &str) -> Result<()> {
        validate::not_blank(username, "username cannot be blank.")?;

        let body = owner.to_json()?;
        self.client
            .send_request(
                Method::PUT,
                &format!("owners/{}", segment(username)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn delete(&self, username: &str) -> Result<()> {
        validate::not_blank(username, "username cannot be blank.")?;

        self.client
            .send_request(
                Method::DELETE,
                &format!("owners/{}", segment(username)),
                None,
            )
            .await?;
        Ok(())
    }

    /// Links the object `device_id` to the owner.
    pub async fn claim(&self, username: &str, device_id: &str) -> Result<()> {
        self.claim_action(username, device_id, "claim").await
    }

    /// Removes the link between the object `device_id` and the owner.
    pub async fn unclaim(&self, username: &str, device_id: &str) -> Result<()> {
        self.claim_action(username, device_id, "unclaim").await
    }

    pub async fn batch_claim(&self, claims: &[ClaimOrUnclaim]) -> Result<Vec<BatchResult>> {
        self.batch_claim_action(claims, "owners/claim").await
    }

    pub async fn batch_unclaim(&self, unclaims: &[ClaimOrUnclaim]) -> Result<Vec<BatchResult>> {
        self.batch_claim_action(unclaims, "owners/unclaim").await
    }

    pub async fn update_password(&self, username: &str, password: &str) -> Result<()> {
        validate::not_blank(username, "username cannot be blank.")?;
        validate::not_blank(password, "password cannot be blank.")?;

        let body = encode_json(&PasswordUpdate {
            x_password: password,
        })?;
        self.client
            .send_request(
                Method::PUT,
                &format!("owners/{}/password", segment(username)),
                Some(&body),
            )
            .await?;
        Ok(())
    }

    pub async fn exists(&self, username: &str) -> Result<bool> {
        validate::not_blank(username, "username cannot be blank.")?;

        let response = self
            .client
            .send_request(
                Method::GET,
                &format!("owners/exists/{}", segment(username)),
                None,
            )
            .await?;
        decode_existence(&response)?
            .remove(username)
            .ok_or_else(|| {
                SmartObjectsError::Decode(format!(
                    "existence reply does not mention '{username}': {response}"
                ))
            })
    }

    /// Checks up to 1000 usernames in one call.
    pub async fn exist<S: AsRef<str>>(&self, usernames: &[S]) -> Result<HashMap<String, bool>> {
        validate::batch_size(
            usernames,
            "List of usernames cannot be empty or biger that 1000.",
        )?;

        let names: Vec<&str> = usernames.iter().map(AsRef::as_ref).collect();
        let body = encode_json(&names)?;
        let response = self
            .client
            .send_request(Method::POST, "owners/exists", Some(&body))
            .await?;
        decode_existence(&response)
    }

    async fn claim_action(&self, username: &str, device_id: &str, action: &str) -> Result<()> {
        validate::not_blank(username, "username cannot be blank.")?;
        validate::not_blank(device_id, "deviceId cannot be blank.")?;

        self.client
            .send_request(
                Method::POST,
                &format!(
                    "owners/{}/objects/{}/{action}",
                    segment(username),
                    segment(device_id)
                ),
                None,
            )
            .await?;
        Ok(())
    }

    async fn batch_claim_action(
        &self,
        entries: &[ClaimOrUnclaim],
        path: &str,
    ) -> Result<Vec<BatchResult>> {
        validate::batch_size(entries, "Claim body list cannot be empty or biger that 1000.")?;
        for entry in entries {
            validate::not_blank(&entry.username, "username cannot be blank.")?;
            validate::not_blank(&entry.device_id, "deviceId cannot be blank.")?;
        }

        let body = encode_json(entries)?;
        let response = self
            .client
            .send_request(Method::POST, path, Some(&body))
            .await?;
        decode_json(&response)
    }
}
