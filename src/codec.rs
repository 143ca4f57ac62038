//! JSON encoding of owners, smart objects and events.
//!
//! Protocol fields are prefixed with `x_` and share the JSON object with the
//! flattened free-form attributes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::{AttributeValue, Attributes, Event, Owner, Result, SmartObject, SmartObjectsError};

pub(crate) const USERNAME: &str = "username";
pub(crate) const PASSWORD: &str = "x_password";
pub(crate) const REGISTRATION_DATE: &str = "x_registration_date";
pub(crate) const EVENT_ID: &str = "event_id";
pub(crate) const DEVICE_ID: &str = "x_device_id";
pub(crate) const OBJECT_TYPE: &str = "x_object_type";
pub(crate) const OWNER: &str = "x_owner";
pub(crate) const EVENT_TYPE: &str = "x_event_type";
pub(crate) const TIMESTAMP: &str = "x_timestamp";
pub(crate) const OBJECT: &str = "x_object";

const OWNER_FIELDS: &[&str] = &[USERNAME, PASSWORD, REGISTRATION_DATE, EVENT_ID];
const OBJECT_FIELDS: &[&str] = &[DEVICE_ID, OBJECT_TYPE, REGISTRATION_DATE, OWNER, EVENT_ID];
const EVENT_FIELDS: &[&str] = &[EVENT_ID, EVENT_TYPE, TIMESTAMP, OBJECT];

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Converts an entity to and from its JSON representation.
pub trait JsonCodec: Sized {
    /// Encodes the entity as a JSON object.
    fn to_map(&self) -> Result<Map<String, Value>>;

    /// Decodes the entity from a JSON object.
    fn from_map(map: Map<String, Value>) -> Result<Self>;

    fn to_json(&self) -> Result<String> {
        Ok(Value::Object(self.to_map()?).to_string())
    }

    fn list_to_json(items: &[Self]) -> Result<String> {
        let values = items
            .iter()
            .map(|item| item.to_map().map(Value::Object))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Array(values).to_string())
    }

    fn from_json(json: &str) -> Result<Self> {
        match parse_json(json)? {
            Value::Object(map) => Self::from_map(map),
            _ => Err(SmartObjectsError::Decode("expected a JSON object".to_owned())),
        }
    }

    fn list_from_json(json: &str) -> Result<Vec<Self>> {
        match parse_json(json)? {
            Value::Array(values) => values
                .into_iter()
                .map(|value| match value {
                    Value::Object(map) => Self::from_map(map),
                    _ => Err(SmartObjectsError::Decode(
                        "expected an array of JSON objects".to_owned(),
                    )),
                })
                .collect(),
            _ => Err(SmartObjectsError::Decode("expected a JSON array".to_owned())),
        }
    }
}

impl JsonCodec for Owner {
    fn to_map(&self) -> Result<Map<String, Value>> {
        let mut map = encode_attributes(self.attributes(), OWNER_FIELDS)?;
        map.insert(USERNAME.to_owned(), Value::from(self.username()));
        if let Some(password) = self.password() {
            map.insert(PASSWORD.to_owned(), Value::from(password));
        }
        if let Some(date) = self.registration_date() {
            map.insert(REGISTRATION_DATE.to_owned(), Value::from(format_date(date)));
        }
        if let Some(event_id) = self.event_id() {
            map.insert(EVENT_ID.to_owned(), Value::from(event_id.to_string()));
        }
        Ok(map)
    }

    fn from_map(mut map: Map<String, Value>) -> Result<Self> {
        let username = take_text(&mut map, USERNAME)?;
        let password = take_text(&mut map, PASSWORD)?;
        let registration_date = take_date(&mut map, REGISTRATION_DATE)?;
        let event_id = take_guid(&mut map, EVENT_ID)?;
        let attributes = decode_attributes(map)?;

        let username = username.ok_or_else(|| missing_field(USERNAME))?;
        let mut builder = Owner::builder(username).attributes(attributes);
        if let Some(password) = password {
            builder = builder.password(password);
        }
        if let Some(date) = registration_date {
            builder = builder.registration_date(date);
        }
        if let Some(event_id) = event_id {
            builder = builder.event_id(event_id);
        }
        Ok(builder.build())
    }
}

impl JsonCodec for SmartObject {
    fn to_map(&self) -> Result<Map<String, Value>> {
        let mut map = encode_attributes(self.attributes(), OBJECT_FIELDS)?;
        map.insert(DEVICE_ID.to_owned(), Value::from(self.device_id()));
        if let Some(object_type) = self.object_type() {
            map.insert(OBJECT_TYPE.to_owned(), Value::from(object_type));
        }
        if let Some(date) = self.registration_date() {
            map.insert(REGISTRATION_DATE.to_owned(), Value::from(format_date(date)));
        }
        if let Some(username) = self.owner_username() {
            let mut owner = Map::new();
            owner.insert(USERNAME.to_owned(), Value::from(username));
            map.insert(OWNER.to_owned(), Value::Object(owner));
        }
        if let Some(event_id) = self.event_id() {
            map.insert(EVENT_ID.to_owned(), Value::from(event_id.to_string()));
        }
        Ok(map)
    }

    fn from_map(mut map: Map<String, Value>) -> Result<Self> {
        let device_id = take_text(&mut map, DEVICE_ID)?;
        let object_type = take_text(&mut map, OBJECT_TYPE)?;
        let registration_date = take_date(&mut map, REGISTRATION_DATE)?;
        let owner = match take_object(&mut map, OWNER)? {
            Some(mut owner) => take_text(&mut owner, USERNAME)?,
            None => None,
        };
        let event_id = take_guid(&mut map, EVENT_ID)?;
        let attributes = decode_attributes(map)?;

        let device_id = device_id.ok_or_else(|| missing_field(DEVICE_ID))?;
        let mut builder = SmartObject::builder(device_id).attributes(attributes);
        if let Some(object_type) = object_type {
            builder = builder.object_type(object_type);
        }
        if let Some(date) = registration_date {
            builder = builder.registration_date(date);
        }
        if let Some(username) = owner {
            builder = builder.owner(username);
        }
        if let Some(event_id) = event_id {
            builder = builder.event_id(event_id);
        }
        Ok(builder.build())
    }
}

impl JsonCodec for Event {
    fn to_map(&self) -> Result<Map<String, Value>> {
        let mut map = encode_attributes(self.attributes(), EVENT_FIELDS)?;
        if let Some(event_id) = self.event_id() {
            map.insert(EVENT_ID.to_owned(), Value::from(event_id.to_string()));
        }
        map.insert(EVENT_TYPE.to_owned(), Value::from(self.event_type()));
        if let Some(timestamp) = self.timestamp() {
            map.insert(TIMESTAMP.to_owned(), Value::from(format_date(timestamp)));
        }
        let mut object = Map::new();
        object.insert(DEVICE_ID.to_owned(), Value::from(self.device_id()));
        map.insert(OBJECT.to_owned(), Value::Object(object));
        Ok(map)
    }

    fn from_map(mut map: Map<String, Value>) -> Result<Self> {
        let event_id = take_guid(&mut map, EVENT_ID)?;
        let event_type = take_text(&mut map, EVENT_TYPE)?;
        let timestamp = take_date(&mut map, TIMESTAMP)?;
        let device_id = match take_object(&mut map, OBJECT)? {
            Some(mut object) => take_text(&mut object, DEVICE_ID)?,
            None => None,
        };
        let attributes = decode_attributes(map)?;

        let event_type = event_type.ok_or_else(|| missing_field(EVENT_TYPE))?;
        let device_id = device_id.ok_or_else(|| missing_field(DEVICE_ID))?;
        let mut builder = Event::builder(event_type, device_id).attributes(attributes);
        if let Some(event_id) = event_id {
            builder = builder.event_id(event_id);
        }
        if let Some(timestamp) = timestamp {
            builder = builder.timestamp(timestamp);
        }
        Ok(builder.build())
    }
}

pub(crate) fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|err| SmartObjectsError::Decode(format!("could not encode request body: {err}")))
}

pub(crate) fn decode_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|err| SmartObjectsError::Decode(format!("invalid JSON: {err}; body: {json}")))
}

pub(crate) fn parse_json(json: &str) -> Result<Value> {
    decode_json(json)
}

/// Flattens `[{"id": bool}, ...]` existence replies into one map.
pub(crate) fn decode_existence(json: &str) -> Result<HashMap<String, bool>> {
    let entries = match parse_json(json)? {
        Value::Array(entries) => entries,
        Value::Object(map) => vec![Value::Object(map)],
        _ => {
            return Err(SmartObjectsError::Decode(format!(
                "unexpected existence reply: {json}"
            )))
        }
    };

    let mut flattened = HashMap::new();
    for entry in entries {
        let Value::Object(map) = entry else {
            return Err(SmartObjectsError::Decode(format!(
                "unexpected existence entry in reply: {json}"
            )));
        };
        for (id, exists) in map {
            match exists {
                Value::Bool(exists) => {
                    flattened.insert(id, exists);
                }
                _ => return Err(SmartObjectsError::type_mismatch(id, "BOOLEAN")),
            }
        }
    }
    Ok(flattened)
}

fn missing_field(field: &str) -> SmartObjectsError {
    SmartObjectsError::Decode(format!("missing required field '{field}'"))
}

fn take_text(map: &mut Map<String, Value>, field: &str) -> Result<Option<String>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(SmartObjectsError::type_mismatch(field, "TEXT")),
    }
}

fn take_date(map: &mut Map<String, Value>, field: &str) -> Result<Option<DateTime<Utc>>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => DateTime::parse_from_rfc3339(&value)
            .map(|date| Some(date.with_timezone(&Utc)))
            .map_err(|_| SmartObjectsError::type_mismatch(field, "DATETIME")),
        Some(_) => Err(SmartObjectsError::type_mismatch(field, "DATETIME")),
    }
}

fn take_guid(map: &mut Map<String, Value>, field: &str) -> Result<Option<Uuid>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Uuid::parse_str(&value)
            .map(Some)
            .map_err(|_| SmartObjectsError::type_mismatch(field, "GUID")),
        Some(_) => Err(SmartObjectsError::type_mismatch(field, "GUID")),
    }
}

fn take_object(map: &mut Map<String, Value>, field: &str) -> Result<Option<Map<String, Value>>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(object)) => Ok(Some(object)),
        Some(_) => Err(SmartObjectsError::type_mismatch(field, "OBJECT")),
    }
}

/// Encodes free attributes; keys that collide with the entity's own
/// protocol fields are rejected.
fn encode_attributes(attributes: &Attributes, reserved: &[&str]) -> Result<Map<String, Value>> {
    attributes
        .iter()
        .map(|(key, value)| {
            if reserved.contains(&key.as_str()) {
                return Err(SmartObjectsError::validation(format!(
                    "attribute '{key}' conflicts with a reserved field."
                )));
            }
            Ok((key.clone(), encode_attribute(key, value)?))
        })
        .collect()
}

fn encode_attribute(key: &str, value: &AttributeValue) -> Result<Value> {
    Ok(match value {
        AttributeValue::Text(value) => Value::from(value.as_str()),
        AttributeValue::Int(value) => Value::from(*value),
        AttributeValue::Float(value) => Number::from_f64(*value)
            .map(Value::Number)
            .ok_or_else(|| {
                SmartObjectsError::validation(format!(
                    "attribute '{key}' holds non-finite float value '{value}'"
                ))
            })?,
        AttributeValue::Bool(value) => Value::from(*value),
        AttributeValue::TextList(values) => {
            Value::Array(values.iter().map(|value| Value::from(value.as_str())).collect())
        }
    })
}

fn decode_attributes(map: Map<String, Value>) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for (key, value) in map {
        if let Some(value) = decode_attribute(&key, value)? {
            attributes.insert(key, value);
        }
    }
    Ok(attributes)
}

fn decode_attribute(key: &str, value: Value) -> Result<Option<AttributeValue>> {
    match value {
        Value::Null => Ok(None),
        Value::String(value) => Ok(Some(AttributeValue::Text(value))),
        Value::Bool(value) => Ok(Some(AttributeValue::Bool(value))),
        Value::Number(number) => match number.as_i64() {
            Some(value) => Ok(Some(AttributeValue::Int(value))),
            None => number
                .as_f64()
                .map(|value| Some(AttributeValue::Float(value)))
                .ok_or_else(|| SmartObjectsError::type_mismatch(key, "ATTRIBUTE")),
        },
        Value::Array(values) => values
            .into_iter()
            .map(|value| match value {
                Value::String(value) => Ok(value),
                _ => Err(SmartObjectsError::type_mismatch(key, "ATTRIBUTE")),
            })
            .collect::<Result<Vec<_>>>()
            .map(|values| Some(AttributeValue::TextList(values))),
        Value::Object(_) => Err(SmartObjectsError::type_mismatch(key, "ATTRIBUTE")),
    }
}
