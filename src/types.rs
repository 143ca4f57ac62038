use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AttributeValue;

/// Read-only attribute map attached to an entity.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Dates travel with second precision, so entities store them that way.
pub(crate) fn truncate_to_seconds(date: DateTime<Utc>) -> DateTime<Utc> {
    date - Duration::nanoseconds(i64::from(date.timestamp_subsec_nanos()))
}

/// Owner (user) of smart objects.
#[derive(Clone, Debug, PartialEq)]
pub struct Owner {
    username: String,
    password: Option<String>,
    registration_date: Option<DateTime<Utc>>,
    event_id: Option<Uuid>,
    attributes: Attributes,
}

impl Owner {
    pub fn builder(username: impl Into<String>) -> OwnerBuilder {
        OwnerBuilder {
            owner: Owner {
                username: username.into(),
                password: None,
                registration_date: None,
                event_id: None,
                attributes: Attributes::new(),
            },
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn registration_date(&self) -> Option<DateTime<Utc>> {
        self.registration_date
    }

    pub fn event_id(&self) -> Option<Uuid> {
        self.event_id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Builder for [`Owner`].
#[derive(Clone, Debug)]
pub struct OwnerBuilder {
    owner: Owner,
}

impl OwnerBuilder {
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.owner.password = Some(password.into());
        self
    }

    pub fn registration_date(mut self, date: DateTime<Utc>) -> Self {
        self.owner.registration_date = Some(truncate_to_seconds(date));
        self
    }

    pub fn event_id(mut self, event_id: Uuid) -> Self {
        self.owner.event_id = Some(event_id);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.owner.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes<I, K>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        self.owner
            .attributes
            .extend(attributes.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    pub fn build(self) -> Owner {
        self.owner
    }
}

/// Device registered on the platform.
#[derive(Clone, Debug, PartialEq)]
pub struct SmartObject {
    device_id: String,
    object_type: Option<String>,
    registration_date: Option<DateTime<Utc>>,
    owner_username: Option<String>,
    event_id: Option<Uuid>,
    attributes: Attributes,
}

impl SmartObject {
    pub fn builder(device_id: impl Into<String>) -> SmartObjectBuilder {
        SmartObjectBuilder {
            object: SmartObject {
                device_id: device_id.into(),
                object_type: None,
                registration_date: None,
                owner_username: None,
                event_id: None,
                attributes: Attributes::new(),
            },
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn object_type(&self) -> Option<&str> {
        self.object_type.as_deref()
    }

    pub fn registration_date(&self) -> Option<DateTime<Utc>> {
        self.registration_date
    }

    pub fn owner_username(&self) -> Option<&str> {
        self.owner_username.as_deref()
    }

    pub fn event_id(&self) -> Option<Uuid> {
        self.event_id
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Builder for [`SmartObject`].
#[derive(Clone, Debug)]
pub struct SmartObjectBuilder {
    object: SmartObject,
}

impl SmartObjectBuilder {
    pub fn object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object.object_type = Some(object_type.into());
        self
    }

    pub fn registration_date(mut self, date: DateTime<Utc>) -> Self {
        self.object.registration_date = Some(truncate_to_seconds(date));
        self
    }

    pub fn owner(mut self, username: impl Into<String>) -> Self {
        self.object.owner_username = Some(username.into());
        self
    }

    pub fn event_id(mut self, event_id: Uuid) -> Self {
        self.object.event_id = Some(event_id);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.object.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes<I, K>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        self.object
            .attributes
            .extend(attributes.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    pub fn build(self) -> SmartObject {
        self.object
    }
}

/// Time-stamped event emitted by a smart object.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    event_id: Option<Uuid>,
    event_type: String,
    device_id: String,
    timestamp: Option<DateTime<Utc>>,
    attributes: Attributes,
}

impl Event {
    pub fn builder(event_type: impl Into<String>, device_id: impl Into<String>) -> EventBuilder {
        EventBuilder {
            event: Event {
                event_id: None,
                event_type: event_type.into(),
                device_id: device_id.into(),
                timestamp: None,
                attributes: Attributes::new(),
            },
        }
    }

    pub fn event_id(&self) -> Option<Uuid> {
        self.event_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// Builder for [`Event`].
#[derive(Clone, Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn event_id(mut self, event_id: Uuid) -> Self {
        self.event.event_id = Some(event_id);
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.event.timestamp = Some(truncate_to_seconds(timestamp));
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.event.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes<I, K>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        self.event
            .attributes
            .extend(attributes.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

/// Outcome of one entry in a batch write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultState {
    Success,
    Error,
}

/// Per-entity result of a batch create/update/claim call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub id: String,
    pub result: ResultState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-event result of an event ingestion call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResult {
    pub id: Uuid,
    pub result: ResultState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "objectExists",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub object_exists: Option<bool>,
}

/// Claim or unclaim of a device by an owner, used by batch calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimOrUnclaim {
    pub username: String,
    #[serde(rename = "x_device_id")]
    pub device_id: String,
}

impl ClaimOrUnclaim {
    pub fn new(username: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            device_id: device_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};

    use crate::{AttributeValue, Event, Owner, SmartObject};

    #[test]
    fn builders_copy_attributes() {
        let owner = Owner::builder("alice")
            .password("secret")
            .attribute("age", 31)
            .attributes([("city", AttributeValue::text("Montreal"))])
            .build();

        assert_eq!(owner.username(), "alice");
        assert_eq!(owner.password(), Some("secret"));
        assert_eq!(owner.attributes().len(), 2);
        assert_eq!(owner.attributes()["age"], AttributeValue::Int(31));
    }

    #[test]
    fn dates_are_truncated_to_seconds() {
        let date = Utc
            .with_ymd_and_hms(2016, 1, 2, 3, 4, 5)
            .single()
            .expect("valid date")
            .with_nanosecond(123_456_789)
            .expect("valid nanos");

        let object = SmartObject::builder("dev-1").registration_date(date).build();
        let stored = object.registration_date().expect("date set");
        assert_eq!(stored.nanosecond(), 0);
        assert_eq!(stored.second(), 5);

        let event = Event::builder("temp", "dev-1").timestamp(date).build();
        assert_eq!(event.timestamp(), Some(stored));
    }
}
