//! Blocking counterparts of every async operation.
//!
//! Calls run on a runtime owned by the [`BlockingClient`] and the caller
//! waits on the task with a runtime-agnostic executor, so a blocking call
//! never needs the calling thread to drive it. It is safe to use from plain
//! threads and from threads that already belong to another tokio runtime.
//! Errors come back exactly as the async call returned them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use reqwest::Method;
use tokio::runtime::{Handle, Runtime};
use uuid::Uuid;

use crate::{
    BatchResult, ClaimOrUnclaim, ClientConfig, DataSet, Dataset, DatasetField, DatasetRecord,
    Event, EventResult, EventType, Model, ObjectAttribute, ObjectType, Owner, OwnerAttribute,
    QueryValidation, Result, ResultSet, SmartObject, SmartObjectsClient, SmartObjectsError,
    Timeseries, UpdateDatasetField, UpdateEntity,
};

/// Runtime shut down without waiting, so dropping a client inside an async
/// context does not panic.
struct OwnedRuntime {
    runtime: Option<Runtime>,
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Blocking client for the SmartObjects REST API.
#[derive(Clone)]
pub struct BlockingClient {
    client: SmartObjectsClient,
    handle: Handle,
    _runtime: Arc<OwnedRuntime>,
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .finish()
    }
}

impl BlockingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("smartobjects-blocking")
            .enable_all()
            .build()
            .map_err(|err| {
                SmartObjectsError::Config(format!("could not start blocking runtime: {err}"))
            })?;

        Ok(Self {
            client: SmartObjectsClient::new(config)?,
            handle: runtime.handle().clone(),
            _runtime: Arc::new(OwnedRuntime {
                runtime: Some(runtime),
            }),
        })
    }

    /// Creates a client and fetches the OAuth2 token right away.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.authorization()?;
        Ok(client)
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// The async client sharing this client's connection pool and token.
    pub fn async_client(&self) -> &SmartObjectsClient {
        &self.client
    }

    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    pub fn dispose(&self) {
        self.client.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.client.is_disposed()
    }

    pub fn authorization(&self) -> Result<String> {
        self.call(|client| async move { client.authorization().await })
    }

    pub fn send_request(
        &self,
        method: Method,
        relative_path: &str,
        body: Option<&str>,
    ) -> Result<String> {
        let relative_path = relative_path.to_owned();
        let body = body.map(str::to_owned);
        self.call(move |client| async move {
            client
                .send_request(method, &relative_path, body.as_deref())
                .await
        })
    }

    pub fn objects(&self) -> BlockingObjectsClient<'_> {
        BlockingObjectsClient { blocking: self }
    }

    pub fn owners(&self) -> BlockingOwnersClient<'_> {
        BlockingOwnersClient { blocking: self }
    }

    pub fn events(&self) -> BlockingEventsClient<'_> {
        BlockingEventsClient { blocking: self }
    }

    pub fn search(&self) -> BlockingSearchClient<'_> {
        BlockingSearchClient { blocking: self }
    }

    pub fn model(&self) -> BlockingModelClient<'_> {
        BlockingModelClient { blocking: self }
    }

    pub fn datalake(&self) -> BlockingDatalakeClient<'_> {
        BlockingDatalakeClient { blocking: self }
    }

    /// Runs `operation` on the owned runtime and waits for its result.
    ///
    /// The task's own `Result` is returned unchanged. A panic inside the
    /// task resumes on the caller; a task cancelled by runtime shutdown
    /// reports [`SmartObjectsError::Disposed`].
    fn call<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(SmartObjectsClient) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let task = self.handle.spawn(operation(self.client.clone()));
        match futures::executor::block_on(task) {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(SmartObjectsError::Disposed),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingObjectsClient<'a> {
    blocking: &'a BlockingClient,
}

impl BlockingObjectsClient<'_> {
    pub fn create(&self, object: &SmartObject) -> Result<()> {
        let object = object.clone();
        self.blocking
            .call(move |client| async move { client.objects().create(&object).await })
    }

    pub fn create_update(&self, objects: &[SmartObject]) -> Result<Vec<BatchResult>> {
        let objects = objects.to_vec();
        self.blocking
            .call(move |client| async move { client.objects().create_update(&objects).await })
    }

    pub fn update(&self, object: &SmartObject, device_id: &str) -> Result<()> {
        let object = object.clone();
        let device_id = device_id.to_owned();
        self.blocking.call(move |client| async move {
            client.objects().update(&object, &device_id).await
        })
    }

    pub fn delete(&self, device_id: &str) -> Result<()> {
        let device_id = device_id.to_owned();
        self.blocking
            .call(move |client| async move { client.objects().delete(&device_id).await })
    }

    pub fn exists(&self, device_id: &str) -> Result<bool> {
        let device_id = device_id.to_owned();
        self.blocking
            .call(move |client| async move { client.objects().exists(&device_id).await })
    }

    pub fn exist<S: AsRef<str>>(&self, device_ids: &[S]) -> Result<HashMap<String, bool>> {
        let device_ids = owned_strings(device_ids);
        self.blocking
            .call(move |client| async move { client.objects().exist(&device_ids).await })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingOwnersClient<'a> {
    blocking: &'a BlockingClient,
}

impl BlockingOwnersClient<'_> {
    pub fn create(&self, owner: &Owner) -> Result<()> {
        let owner = owner.clone();
        self.blocking
            .call(move |client| async move { client.owners().create(&owner).await })
    }

    pub fn create_update(&self, owners: &[Owner]) -> Result<Vec<BatchResult>> {
        let owners = owners.to_vec();
        self.blocking
            .call(move |client| async move { client.owners().create_update(&owners).await })
    }

    pub fn update(&self, owner: &Owner, username: &str) -> Result<()> {
        let owner = owner.clone();
        let username = username.to_owned();
        self.blocking
            .call(move |client| async move { client.owners().update(&owner, &username).await })
    }

    pub fn delete(&self, username: &str) -> Result<()> {
        let username = username.to_owned();
        self.blocking
            .call(move |client| async move { client.owners().delete(&username).await })
    }

    pub fn claim(&self, username: &str, device_id: &str) -> Result<()> {
        let username = username.to_owned();
        let device_id = device_id.to_owned();
        self.blocking.call(move |client| async move {
            client.owners().claim(&username, &device_id).await
        })
    }

    pub fn unclaim(&self, username: &str, device_id: &str) -> Result<()> {
        let username = username.to_owned();
        let device_id = device_id.to_owned();
        self.blocking.call(move |client| async move {
            client.owners().unclaim(&username, &device_id).await
        })
    }

    pub fn batch_claim(&self, claims: &[ClaimOrUnclaim]) -> Result<Vec<BatchResult>> {
        let claims = claims.to_vec();
        self.blocking
            .call(move |client| async move { client.owners().batch_claim(&claims).await })
    }

    pub fn batch_unclaim(&self, unclaims: &[ClaimOrUnclaim]) -> Result<Vec<BatchResult>> {
        let unclaims = unclaims.to_vec();
        self.blocking
            .call(move |client| async move { client.owners().batch_unclaim(&unclaims).await })
    }

    pub fn update_password(&self, username: &str, password: &str) -> Result<()> {
        let username = username.to_owned();
        let password = password.to_owned();
        self.blocking.call(move |client| async move {
            client.owners().update_password(&username, &password).await
        })
    }

    pub fn exists(&self, username: &str) -> Result<bool> {
        let username = username.to_owned();
        self.blocking
            .call(move |client| async move { client.owners().exists(&username).await })
    }

    pub fn exist<S: AsRef<str>>(&self, usernames: &[S]) -> Result<HashMap<String, bool>> {
        let usernames = owned_strings(usernames);
        self.blocking
            .call(move |client| async move { client.owners().exist(&usernames).await })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingEventsClient<'a> {
    blocking: &'a BlockingClient,
}

impl BlockingEventsClient<'_> {
    pub fn send(&self, events: &[Event]) -> Result<Vec<EventResult>> {
        let events = events.to_vec();
        self.blocking
            .call(move |client| async move { client.events().send(&events).await })
    }

    pub fn send_to_object(&self, device_id: &str, events: &[Event]) -> Result<Vec<EventResult>> {
        let device_id = device_id.to_owned();
        let events = events.to_vec();
        self.blocking.call(move |client| async move {
            client.events().send_to_object(&device_id, &events).await
        })
    }

    pub fn exists(&self, event_id: Uuid) -> Result<bool> {
        self.blocking
            .call(move |client| async move { client.events().exists(event_id).await })
    }

    pub fn exist(&self, event_ids: &[Uuid]) -> Result<HashMap<Uuid, bool>> {
        let event_ids = event_ids.to_vec();
        self.blocking
            .call(move |client| async move { client.events().exist(&event_ids).await })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingSearchClient<'a> {
    blocking: &'a BlockingClient,
}

impl BlockingSearchClient<'_> {
    pub fn datasets(&self) -> Result<Vec<DataSet>> {
        self.blocking
            .call(|client| async move { client.search().datasets().await })
    }

    pub fn search(&self, query: &str) -> Result<ResultSet> {
        let query = query.to_owned();
        self.blocking
            .call(move |client| async move { client.search().search(&query).await })
    }

    pub fn validate_query(&self, query: &str) -> Result<QueryValidation> {
        let query = query.to_owned();
        self.blocking
            .call(move |client| async move { client.search().validate_query(&query).await })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingModelClient<'a> {
    blocking: &'a BlockingClient,
}

impl<'a> BlockingModelClient<'a> {
    pub fn export(&self) -> Result<Model> {
        self.blocking
            .call(|client| async move { client.model().export().await })
    }

    pub fn event_types(&self) -> Result<Vec<EventType>> {
        self.blocking
            .call(|client| async move { client.model().event_types().await })
    }

    pub fn object_types(&self) -> Result<Vec<ObjectType>> {
        self.blocking
            .call(|client| async move { client.model().object_types().await })
    }

    pub fn object_attributes(&self) -> Result<Vec<ObjectAttribute>> {
        self.blocking
            .call(|client| async move { client.model().object_attributes().await })
    }

    pub fn owner_attributes(&self) -> Result<Vec<OwnerAttribute>> {
        self.blocking
            .call(|client| async move { client.model().owner_attributes().await })
    }

    pub fn timeseries(&self) -> Result<Vec<Timeseries>> {
        self.blocking
            .call(|client| async move { client.model().timeseries().await })
    }

    pub fn sandbox(&self) -> Result<BlockingSandboxModelClient<'a>> {
        self.blocking.client.model().sandbox()?;
        Ok(BlockingSandboxModelClient {
            blocking: self.blocking,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingSandboxModelClient<'a> {
    blocking: &'a BlockingClient,
}

impl BlockingSandboxModelClient<'_> {
    pub fn create_timeseries(&self, timeseries: &[Timeseries]) -> Result<()> {
        let timeseries = timeseries.to_vec();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.create_timeseries(&timeseries).await
        })
    }

    pub fn update_timeseries(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        let key = key.to_owned();
        let update = update.clone();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.update_timeseries(&key, &update).await
        })
    }

    pub fn deploy_timeseries(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.deploy_timeseries(&key).await
        })
    }

    pub fn create_object_attributes(&self, attributes: &[ObjectAttribute]) -> Result<()> {
        let attributes = attributes.to_vec();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .create_object_attributes(&attributes)
                .await
        })
    }

    pub fn update_object_attribute(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        let key = key.to_owned();
        let update = update.clone();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .update_object_attribute(&key, &update)
                .await
        })
    }

    pub fn deploy_object_attribute(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.deploy_object_attribute(&key).await
        })
    }

    pub fn create_owner_attributes(&self, attributes: &[OwnerAttribute]) -> Result<()> {
        let attributes = attributes.to_vec();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .create_owner_attributes(&attributes)
                .await
        })
    }

    pub fn update_owner_attribute(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        let key = key.to_owned();
        let update = update.clone();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .update_owner_attribute(&key, &update)
                .await
        })
    }

    pub fn deploy_owner_attribute(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.deploy_owner_attribute(&key).await
        })
    }

    pub fn create_event_types(&self, event_types: &[EventType]) -> Result<()> {
        let event_types = event_types.to_vec();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.create_event_types(&event_types).await
        })
    }

    pub fn update_event_type(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        let key = key.to_owned();
        let update = update.clone();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.update_event_type(&key, &update).await
        })
    }

    pub fn delete_event_type(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.delete_event_type(&key).await
        })
    }

    pub fn create_object_types(&self, object_types: &[ObjectType]) -> Result<()> {
        let object_types = object_types.to_vec();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.create_object_types(&object_types).await
        })
    }

    pub fn update_object_type(&self, key: &str, update: &UpdateEntity) -> Result<()> {
        let key = key.to_owned();
        let update = update.clone();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.update_object_type(&key, &update).await
        })
    }

    pub fn delete_object_type(&self, key: &str) -> Result<()> {
        let key = key.to_owned();
        self.blocking.call(move |client| async move {
            client.model().sandbox()?.delete_object_type(&key).await
        })
    }

    pub fn add_timeseries_to_event_type(
        &self,
        event_type_key: &str,
        timeseries_key: &str,
    ) -> Result<()> {
        let event_type_key = event_type_key.to_owned();
        let timeseries_key = timeseries_key.to_owned();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .add_timeseries_to_event_type(&event_type_key, &timeseries_key)
                .await
        })
    }

    pub fn remove_timeseries_from_event_type(
        &self,
        event_type_key: &str,
        timeseries_key: &str,
    ) -> Result<()> {
        let event_type_key = event_type_key.to_owned();
        let timeseries_key = timeseries_key.to_owned();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .remove_timeseries_from_event_type(&event_type_key, &timeseries_key)
                .await
        })
    }

    pub fn add_object_attribute_to_object_type(
        &self,
        object_type_key: &str,
        object_attribute_key: &str,
    ) -> Result<()> {
        let object_type_key = object_type_key.to_owned();
        let object_attribute_key = object_attribute_key.to_owned();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .add_object_attribute_to_object_type(&object_type_key, &object_attribute_key)
                .await
        })
    }

    pub fn remove_object_attribute_from_object_type(
        &self,
        object_type_key: &str,
        object_attribute_key: &str,
    ) -> Result<()> {
        let object_type_key = object_type_key.to_owned();
        let object_attribute_key = object_attribute_key.to_owned();
        self.blocking.call(move |client| async move {
            client
                .model()
                .sandbox()?
                .remove_object_attribute_from_object_type(&object_type_key, &object_attribute_key)
                .await
        })
    }

    pub fn reset(&self) -> Result<()> {
        self.blocking
            .call(|client| async move { client.model().sandbox()?.reset().await })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BlockingDatalakeClient<'a> {
    blocking: &'a BlockingClient,
}

impl BlockingDatalakeClient<'_> {
    pub fn list(&self) -> Result<Vec<Dataset>> {
        self.blocking
            .call(|client| async move { client.datalake().list().await })
    }

    pub fn get(&self, dataset_key: &str) -> Result<Dataset> {
        let dataset_key = dataset_key.to_owned();
        self.blocking
            .call(move |client| async move { client.datalake().get(&dataset_key).await })
    }

    pub fn create(&self, dataset: &Dataset) -> Result<()> {
        let dataset = dataset.clone();
        self.blocking
            .call(move |client| async move { client.datalake().create(&dataset).await })
    }

    pub fn delete(&self, dataset_key: &str) -> Result<()> {
        let dataset_key = dataset_key.to_owned();
        self.blocking
            .call(move |client| async move { client.datalake().delete(&dataset_key).await })
    }

    pub fn add_field(&self, dataset_key: &str, field: &DatasetField) -> Result<()> {
        let dataset_key = dataset_key.to_owned();
        let field = field.clone();
        self.blocking.call(move |client| async move {
            client.datalake().add_field(&dataset_key, &field).await
        })
    }

    pub fn update_field(
        &self,
        dataset_key: &str,
        field_key: &str,
        update: &UpdateDatasetField,
    ) -> Result<()> {
        let dataset_key = dataset_key.to_owned();
        let field_key = field_key.to_owned();
        let update = update.clone();
        self.blocking.call(move |client| async move {
            client
                .datalake()
                .update_field(&dataset_key, &field_key, &update)
                .await
        })
    }

    pub fn send(&self, dataset_key: &str, records: &[DatasetRecord]) -> Result<()> {
        let dataset_key = dataset_key.to_owned();
        let records = records.to_vec();
        self.blocking.call(move |client| async move {
            client.datalake().send(&dataset_key, &records).await
        })
    }
}

fn owned_strings<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values.iter().map(|value| value.as_ref().to_owned()).collect()
}
