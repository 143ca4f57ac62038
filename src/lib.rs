//! `smartobjects-http` is an async and blocking HTTP client for the
//! SmartObjects REST API.
//!
//! Every call goes through [`SmartObjectsClient::send_request`], which
//! attaches an OAuth2 (or static) bearer token, gzips request bodies and maps
//! HTTP failures to [`SmartObjectsError`]. Domain clients sit on top:
//! - [`SmartObjectsClient::objects`]
//! - [`SmartObjectsClient::owners`]
//! - [`SmartObjectsClient::events`]
//! - [`SmartObjectsClient::search`]
//! - [`SmartObjectsClient::model`]
//! - [`SmartObjectsClient::datalake`]
//!
//! [`BlockingClient`] exposes the same operations for synchronous callers.

mod client;
mod codec;
mod credentials;
mod datalake;
mod error;
mod events;
mod model;
mod objects;
mod options;
mod owners;
mod search;
mod types;
mod validate;
mod value;
mod wire;

pub mod blocking;

pub use blocking::BlockingClient;
pub use client::SmartObjectsClient;
pub use codec::JsonCodec;
pub use credentials::{Token, EXPIRY_MARGIN};
pub use datalake::{
    DatalakeClient, Dataset, DatasetField, DatasetRecord, FieldType, UpdateDatasetField,
};
pub use error::SmartObjectsError;
pub use events::EventsClient;
pub use model::{
    AttributeType, EventType, Model, ModelClient, ObjectAttribute, ObjectType, OwnerAttribute,
    SandboxModelClient, Timeseries, UpdateEntity,
};
pub use objects::ObjectsClient;
pub use options::{
    ClientConfig, ClientConfigBuilder, Credentials, Environment, ExponentialBackoffConfig,
    RetryCallback, DEFAULT_BASE_PATH, DEFAULT_COMPRESSION_ENABLED,
    DEFAULT_MAX_RESPONSE_BUFFER_SIZE, DEFAULT_PORT, DEFAULT_SCHEME, DEFAULT_TIMEOUT,
    PRODUCTION_HOST, SANDBOX_HOST,
};
pub use owners::OwnersClient;
pub use search::{ColumnDefinition, DataSet, DataSetField, QueryValidation, ResultSet, SearchClient};
pub use types::{
    Attributes, BatchResult, ClaimOrUnclaim, Event, EventBuilder, EventResult, Owner,
    OwnerBuilder, ResultState, SmartObject, SmartObjectBuilder,
};
pub use validate::MAX_BATCH_SIZE;
pub use value::AttributeValue;

pub type Result<T> = std::result::Result<T, SmartObjectsError>;
